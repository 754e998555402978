//! Receive dispatcher
//!
//! Delivers packets received in continuous mode to an application callback.
//!
//! The RxDone interrupt does no bus traffic. The board's handler only calls
//! [`RxSignal::raise`], and the application drains the signal from its main
//! loop with [`ReceiveDispatcher::poll`]. On async executors
//! [`ReceiveDispatcher::wait`] awaits the rising edge directly.
//!
//! When the radio is used from more than one context on a preemptive
//! platform, keep it in a [`Shared`] so every multi-step register sequence
//! runs under one critical section. Transmit through [`Shared::send`], which
//! releases the critical section between TX_DONE polls. Calling
//! [`Sx127x::send`] inside [`Shared::lock`] would mask interrupts for the
//! whole time on air.
//!
//! # Example
//! ```no_run
//! use sx127x::{DioLines, ReceiveDispatcher, RxSignal, Sx127x};
//!
//! static RX_DONE: RxSignal = RxSignal::new();
//!
//! // Called from the board's DIO0 interrupt handler
//! fn on_dio0() {
//!     RX_DONE.raise();
//! }
//!
//! # fn example<SPI, RESET, DELAY, PIN>(
//! #     radio: &mut Sx127x<SPI, RESET, DELAY>,
//! #     dio0: PIN,
//! # ) -> Result<(), sx127x::Error>
//! # where
//! #     SPI: embedded_hal::spi::SpiDevice,
//! #     RESET: embedded_hal::digital::OutputPin,
//! #     DELAY: embedded_hal::delay::DelayNs,
//! #     PIN: sx127x::InterruptPin,
//! # {
//! let mut dispatcher = ReceiveDispatcher::new(DioLines::rx_done(dio0));
//! dispatcher.on_receive(radio, Some(|radio: &mut Sx127x<SPI, RESET, DELAY>, payload: &[u8]| {
//!     let rssi = radio.packet_rssi();
//!     let _ = (payload, rssi);
//! }))?;
//! radio.receive(0)?;
//!
//! loop {
//!     dispatcher.poll(radio, &RX_DONE)?;
//! }
//! # }
//! ```

use core::cell::{Cell, RefCell};

use critical_section::Mutex;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiDevice;
use embedded_hal_async::digital::Wait;

use crate::binding::{DioLines, InterruptPin};
use crate::config::MAX_PACKET_LENGTH;
use crate::error::Error;
use crate::radio::Sx127x;
use crate::registers::{DioMapping1, Irq};

/// "Packet ready" event raised from interrupt context.
pub struct RxSignal {
    pending: Mutex<Cell<bool>>,
}

impl RxSignal {
    /// Creates a signal with no pending event. Usable in a `static`.
    pub const fn new() -> Self {
        Self {
            pending: Mutex::new(Cell::new(false)),
        }
    }

    /// Marks a packet as ready. Safe to call from an interrupt handler.
    pub fn raise(&self) {
        critical_section::with(|cs| self.pending.borrow(cs).set(true));
    }

    /// Consumes the pending event, if any.
    pub fn take(&self) -> bool {
        critical_section::with(|cs| self.pending.borrow(cs).replace(false))
    }
}

impl Default for RxSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Counters kept by the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DispatchStats {
    /// Packets dropped for a payload CRC mismatch
    pub crc_errors: u32,
    /// Packets read out of the FIFO
    pub delivered: u32,
}

/// Routes RxDone events to a receive callback.
///
/// The callback gets the radio back so it can query [`Sx127x::packet_rssi`]
/// and [`Sx127x::packet_snr`]. Continuous receive stays armed, the callback
/// should not call `receive` again.
pub struct ReceiveDispatcher<P, F> {
    lines: DioLines<P>,
    callback: Option<F>,
    stats: DispatchStats,
    buffer: [u8; MAX_PACKET_LENGTH],
}

impl<P, F> ReceiveDispatcher<P, F> {
    /// Creates a dispatcher with no callback registered.
    pub fn new(lines: DioLines<P>) -> Self {
        Self {
            lines,
            callback: None,
            stats: DispatchStats::default(),
            buffer: [0; MAX_PACKET_LENGTH],
        }
    }

    /// Returns the CRC drop and delivery counters.
    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// Whether a callback is registered.
    pub fn is_armed(&self) -> bool {
        self.callback.is_some()
    }

    /// Releases the DIO lines.
    pub fn release(self) -> DioLines<P> {
        self.lines
    }

    /// Registers the receive callback, or detaches it with `None`.
    ///
    /// Registering routes RxDone to DIO0 and enables the rising-edge
    /// interrupt on the RxDone line. Detaching disables the interrupt and
    /// leaves the DIO mapping alone.
    ///
    /// # Errors
    /// * `Error::NotArmed` - a callback was given but no RxDone line exists
    /// * `Error::Pin` - the interrupt could not be switched
    pub fn on_receive<SPI, RESET, DELAY>(
        &mut self,
        radio: &mut Sx127x<SPI, RESET, DELAY>,
        callback: Option<F>,
    ) -> Result<(), Error>
    where
        SPI: SpiDevice,
        RESET: OutputPin,
        DELAY: DelayNs,
        P: InterruptPin,
    {
        match callback {
            Some(callback) => {
                let line = self.lines.rx_done.as_mut().ok_or(Error::NotArmed)?;
                radio.set_dio_mapping(DioMapping1::default())?;
                line.listen_rising_edge().map_err(|err| {
                    log::warn!("dispatch::on_receive listen failed: {err:?}");
                    Error::Pin
                })?;
                self.callback = Some(callback);
                log::debug!("dispatch::on_receive armed");
            }
            None => {
                if let Some(line) = self.lines.rx_done.as_mut() {
                    line.unlisten().map_err(|err| {
                        log::warn!("dispatch::on_receive unlisten failed: {err:?}");
                        Error::Pin
                    })?;
                }
                self.callback = None;
                log::debug!("dispatch::on_receive detached");
            }
        }
        Ok(())
    }

    /// Handles one RxDone event.
    ///
    /// Reads and clears the interrupt flags. A packet with a CRC error is
    /// dropped and counted. Otherwise the payload is read from the FIFO and
    /// handed to the callback.
    ///
    /// Returns the length of the packet read, `None` when nothing was read.
    pub fn handle_rx_done<SPI, RESET, DELAY>(
        &mut self,
        radio: &mut Sx127x<SPI, RESET, DELAY>,
    ) -> Result<Option<usize>, Error>
    where
        SPI: SpiDevice,
        RESET: OutputPin,
        DELAY: DelayNs,
        F: FnMut(&mut Sx127x<SPI, RESET, DELAY>, &[u8]),
    {
        let irq = radio.irq_flags()?;

        if irq.contains(Irq::PAYLOAD_CRC_ERROR) {
            self.stats.crc_errors = self.stats.crc_errors.wrapping_add(1);
            log::warn!("dispatch::handle_rx_done dropped packet with CRC error");
            return Ok(None);
        }
        if !irq.contains(Irq::RX_DONE) {
            log::trace!("dispatch::handle_rx_done spurious event, flags {irq:?}");
            return Ok(None);
        }

        let length = radio.read_payload(&mut self.buffer)?;
        self.stats.delivered = self.stats.delivered.wrapping_add(1);
        log::trace!("dispatch::handle_rx_done {length} bytes");

        if let Some(callback) = self.callback.as_mut() {
            callback(radio, &self.buffer[..length]);
        }
        Ok(Some(length))
    }

    /// Handles the event pending on `signal`, if any.
    pub fn poll<SPI, RESET, DELAY>(
        &mut self,
        radio: &mut Sx127x<SPI, RESET, DELAY>,
        signal: &RxSignal,
    ) -> Result<Option<usize>, Error>
    where
        SPI: SpiDevice,
        RESET: OutputPin,
        DELAY: DelayNs,
        F: FnMut(&mut Sx127x<SPI, RESET, DELAY>, &[u8]),
    {
        if signal.take() {
            self.handle_rx_done(radio)
        } else {
            Ok(None)
        }
    }

    /// Waits for a rising edge on the RxDone line, then handles it.
    ///
    /// # Errors
    /// * `Error::NotArmed` - there is no RxDone line
    /// * `Error::Pin` - waiting on the line failed
    pub async fn wait<SPI, RESET, DELAY>(
        &mut self,
        radio: &mut Sx127x<SPI, RESET, DELAY>,
    ) -> Result<Option<usize>, Error>
    where
        SPI: SpiDevice,
        RESET: OutputPin,
        DELAY: DelayNs,
        P: Wait,
        F: FnMut(&mut Sx127x<SPI, RESET, DELAY>, &[u8]),
    {
        let line = self.lines.rx_done.as_mut().ok_or(Error::NotArmed)?;
        line.wait_for_rising_edge().await.map_err(|_| Error::Pin)?;
        self.handle_rx_done(radio)
    }
}

/// A value shared between the main flow and interrupt handlers.
///
/// Each access runs inside a critical section, which makes it suitable for a
/// `static` holding the radio on preemptive platforms.
pub struct Shared<T> {
    inner: Mutex<RefCell<Option<T>>>,
}

impl<T> Shared<T> {
    /// Creates an empty handle. Usable in a `static`.
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(None)),
        }
    }

    /// Stores `value`, returning the previous one.
    pub fn install(&self, value: T) -> Option<T> {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).replace(value))
    }

    /// Removes the stored value.
    pub fn take(&self) -> Option<T> {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).take())
    }

    /// Runs `f` on the stored value inside a critical section.
    ///
    /// Returns `None` when nothing is installed.
    pub fn lock<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).as_mut().map(f))
    }
}

impl<SPI, RESET, DELAY> Shared<Sx127x<SPI, RESET, DELAY>>
where
    SPI: SpiDevice,
    RESET: OutputPin,
    DELAY: DelayNs,
{
    /// Sends one packet on the shared radio.
    ///
    /// Packet assembly and the switch to transmit run under one critical
    /// section. The wait for TX_DONE then polls every millisecond on `delay`,
    /// taking the critical section only for each flag read. The bound and the
    /// timeout behavior match [`Sx127x::send`].
    ///
    /// # Errors
    /// * `Error::NotInstalled` - no radio is installed
    /// * `Error::TxTimeout` - TX_DONE did not arrive in time, the radio is in standby
    pub fn send<D: DelayNs>(
        &self,
        payload: &[u8],
        implicit_header: bool,
        delay: &mut D,
    ) -> Result<usize, Error> {
        let (sent, timeout_ms) = self
            .lock(|radio| -> Result<_, Error> {
                radio.begin_packet(implicit_header)?;
                let sent = radio.write(payload)?;
                Ok((sent, radio.start_transmit()?))
            })
            .ok_or(Error::NotInstalled)??;

        let mut waited_ms = 0;
        while !self
            .lock(|radio| radio.poll_tx_done())
            .ok_or(Error::NotInstalled)??
        {
            if waited_ms >= timeout_ms {
                self.lock(|radio| radio.abort_transmit(waited_ms))
                    .ok_or(Error::NotInstalled)??;
                return Err(Error::TxTimeout);
            }
            delay.delay_ms(1);
            waited_ms += 1;
        }
        Ok(sent)
    }
}

impl<T> Default for Shared<T> {
    fn default() -> Self {
        Self::new()
    }
}
