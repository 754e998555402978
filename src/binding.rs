//! Board binding capabilities
//!
//! SPI, reset and delay come from `embedded-hal`. What the HAL traits do not
//! cover lives here:
//! - Enabling and disabling the rising-edge interrupt on a DIO line
//! - The named set of DIO lines a board wires up
//! - Blinking an on-board LED
//!
//! Implementations are board specific and constructed by the application.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::error::Error;

/// A GPIO line whose rising edge can raise an interrupt.
///
/// The handler itself is registered by the board support code; the driver
/// only switches the edge detection on and off.
pub trait InterruptPin {
    /// Error type of the underlying GPIO.
    type Error: core::fmt::Debug;

    /// Starts raising interrupts on rising edges.
    fn listen_rising_edge(&mut self) -> Result<(), Self::Error>;

    /// Stops raising interrupts.
    fn unlisten(&mut self) -> Result<(), Self::Error>;
}

/// The DIO lines of one transceiver, by the LoRa event each one carries.
///
/// Only `rx_done` is used by the receive path. The others are carried so a
/// board can hand over its complete wiring in one value.
pub struct DioLines<P> {
    /// DIO0 mapping 00, RxDone
    pub rx_done: Option<P>,
    /// DIO1 mapping 00, RxTimeout
    pub rx_timeout: Option<P>,
    /// DIO3 mapping 01, ValidHeader
    pub valid_header: Option<P>,
    /// DIO3 mapping 00, CadDone
    pub cad_done: Option<P>,
    /// DIO4 mapping 00, CadDetected
    pub cad_detected: Option<P>,
    /// DIO3 mapping 10, PayloadCrcError
    pub payload_crc_error: Option<P>,
}

impl<P> DioLines<P> {
    /// Only the RxDone line connected.
    pub fn rx_done(pin: P) -> Self {
        Self {
            rx_done: Some(pin),
            ..Self::default()
        }
    }
}

impl<P> Default for DioLines<P> {
    fn default() -> Self {
        Self {
            rx_done: None,
            rx_timeout: None,
            valid_header: None,
            cad_done: None,
            cad_detected: None,
            payload_crc_error: None,
        }
    }
}

/// On-board LED
pub struct Led<P, D> {
    pin: P,
    delay: D,
    high_is_on: bool,
}

impl<P, D> Led<P, D>
where
    P: OutputPin,
    D: DelayNs,
{
    /// Wraps an LED pin. `high_is_on` is false for LEDs wired to VCC.
    pub fn new(pin: P, delay: D, high_is_on: bool) -> Self {
        Self {
            pin,
            delay,
            high_is_on,
        }
    }

    /// Turns the LED on or off.
    pub fn set(&mut self, on: bool) -> Result<(), Error> {
        if on == self.high_is_on {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        }
        .map_err(|_| Error::Pin)
    }

    /// Blinks `times` times, blocking for the whole sequence.
    pub fn blink(&mut self, times: u8, on_ms: u32, off_ms: u32) -> Result<(), Error> {
        for _ in 0..times {
            self.set(true)?;
            self.delay.delay_ms(on_ms);
            self.set(false)?;
            self.delay.delay_ms(off_ms);
        }
        Ok(())
    }

    /// Releases the pin and delay.
    pub fn release(self) -> (P, D) {
        (self.pin, self.delay)
    }
}
