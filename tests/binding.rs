mod common;

use common::{FakeDelay, FakePin};
use sx127x::Led;

#[test]
fn led_blinks_active_high() {
    let pin = FakePin::default();
    let delay = FakeDelay::default();
    let mut led = Led::new(pin.clone(), delay.clone(), true);

    led.blink(2, 30, 20).unwrap();

    assert_eq!(pin.levels(), [true, false, true, false]);
    assert_eq!(delay.elapsed_ms(), 100);
}

#[test]
fn led_wired_to_vcc_is_inverted() {
    let pin = FakePin::default();
    let mut led = Led::new(pin.clone(), FakeDelay::default(), false);

    led.set(true).unwrap();
    led.set(false).unwrap();

    assert_eq!(pin.levels(), [false, true]);
}

#[test]
fn zero_blinks_leave_led_alone() {
    let pin = FakePin::default();
    let delay = FakeDelay::default();
    let mut led = Led::new(pin.clone(), delay.clone(), true);

    led.blink(0, 100, 100).unwrap();

    assert!(pin.levels().is_empty());
    assert_eq!(delay.elapsed_ms(), 0);
}
