//! SX127x LoRa transceiver driver
//!
//! [`Sx127x`] owns the register interface together with the reset pin and a
//! delay provider, and implements:
//! - Chip identification and the configuration sequence
//! - The operating mode state machine (sleep, standby, transmit, receive)
//! - Packet assembly in the FIFO and blocking transmission
//! - Continuous and polled single reception
//! - Packet RSSI and SNR
//!
//! The operating mode is always read back from the chip. The chip leaves
//! transmit and single receive on its own, so any cached copy would drift.
//!
//! # Example
//! ```no_run
//! use sx127x::{Config, PaOutput, Sx127x};
//!
//! # fn example<SPI, RESET, DELAY>(spi: SPI, reset: RESET, delay: DELAY) -> Result<(), sx127x::Error>
//! # where
//! #     SPI: embedded_hal::spi::SpiDevice,
//! #     RESET: embedded_hal::digital::OutputPin,
//! #     DELAY: embedded_hal::delay::DelayNs,
//! # {
//! let config = Config::new(868_000_000)
//!     .set_tx_power(14, PaOutput::PaBoost)
//!     .set_spreading_factor(9)
//!     .set_crc(true);
//!
//! let mut radio = Sx127x::new(spi, reset, delay, config);
//! radio.reset()?;
//! radio.init()?;
//!
//! radio.send(b"hello", false)?;
//! radio.receive(0)?;
//! # Ok(())
//! # }
//! ```

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiDevice;

use crate::config::{self, Config, PaOutput, EXPECTED_VERSION, MAX_PACKET_LENGTH};
use crate::device::Device;
use crate::error::Error;
use crate::registers::*;

/// Guard added to the derived transmit bound.
const TX_GUARD_MS: u32 = 100;

/// Hold time of each reset pin level.
const RESET_HOLD_MS: u32 = 50;

/// SX1276/77/78/79 LoRa transceiver
pub struct Sx127x<SPI, RESET, DELAY> {
    device: Device<SPI>,
    reset: RESET,
    delay: DELAY,
    config: Config,
    /// Header mode last written to modem configuration 1, `None` until the
    /// first write after (re)configuration
    implicit_header: Option<bool>,
}

impl<SPI, RESET, DELAY> Sx127x<SPI, RESET, DELAY> {
    /// Creates a driver instance. No bus traffic happens until [`Sx127x::init`].
    ///
    /// # Arguments
    /// * `spi` - SPI device with the radio's chip select
    /// * `reset` - Output wired to the radio's NRESET pin
    /// * `delay` - Delay provider used for reset timing and transmit polling
    /// * `config` - Modulation parameters applied by `init`
    pub fn new(spi: SPI, reset: RESET, delay: DELAY, config: Config) -> Self {
        Self {
            device: Device::new(spi),
            reset,
            delay,
            config,
            implicit_header: None,
        }
    }

    /// The parameters currently applied, or pending the next `init`.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Releases the SPI device, reset pin and delay.
    pub fn release(self) -> (SPI, RESET, DELAY) {
        (self.device.release(), self.reset, self.delay)
    }
}

impl<SPI, RESET, DELAY> Sx127x<SPI, RESET, DELAY>
where
    SPI: SpiDevice,
    RESET: OutputPin,
    DELAY: DelayNs,
{
    /// Pulses NRESET low, then waits for the chip to come back up.
    pub fn reset(&mut self) -> Result<(), Error> {
        self.reset.set_low().map_err(|_| Error::Pin)?;
        self.delay.delay_ms(RESET_HOLD_MS);
        self.reset.set_high().map_err(|_| Error::Pin)?;
        self.delay.delay_ms(RESET_HOLD_MS);
        Ok(())
    }

    /// Identifies the chip and applies the stored configuration.
    ///
    /// # Sequence
    /// 1. Check the version register
    /// 2. Sleep, so the LoRa mode bit can be set
    /// 3. Frequency, bandwidth, LNA boost, AGC, TX power, header mode,
    ///    spreading factor, coding rate, preamble, sync word, CRC
    /// 4. FIFO base addresses
    /// 5. Standby
    ///
    /// Low data rate optimization is enabled whenever symbols are longer
    /// than 16 ms, here and on every later bandwidth or spreading factor
    /// change.
    ///
    /// # Errors
    /// * `Error::UnsupportedFrequency` - nothing is written to the chip
    /// * `Error::VersionMismatch` - the chip did not identify as SX127x
    pub fn init(&mut self) -> Result<(), Error> {
        let frf = config::frequency_registers(self.config.frequency)?;

        let version = self.version()?;
        if version != EXPECTED_VERSION {
            log::warn!("sx127x::init unexpected version 0x{version:02x}");
            return Err(Error::VersionMismatch(version));
        }

        self.sleep()?;

        let config = self.config;
        self.device.write_register(CarrierFrequency { frf })?;
        self.set_signal_bandwidth(config.signal_bandwidth)?;

        self.device.modify_register(|lna: &mut Lna| lna.boost_hf = 0b11)?;
        self.device.write_register(ModemConfig3 {
            low_data_rate_optimize: config.low_data_rate_optimize(),
            agc_auto_on: true,
        })?;

        self.set_tx_power(config.tx_power_level, config.pa_output)?;
        self.implicit_header = None;
        self.set_implicit_header(config.implicit_header)?;
        self.set_spreading_factor(config.spreading_factor)?;
        self.set_coding_rate(config.coding_rate)?;
        self.set_preamble_length(config.preamble_length)?;
        self.set_sync_word(config.sync_word)?;
        self.enable_crc(config.enable_crc)?;

        self.device.write_register(FifoTxBaseAddr {
            address: config.fifo_tx_base,
        })?;
        self.device.write_register(FifoRxBaseAddr {
            address: config.fifo_rx_base,
        })?;

        self.standby()?;
        log::debug!("sx127x::init done {config:?}");
        Ok(())
    }

    /// Replaces the configuration and runs the full `init` sequence again.
    ///
    /// The previous configuration is kept if the frequency is unsupported.
    pub fn reconfigure(&mut self, config: Config) -> Result<(), Error> {
        config::frequency_registers(config.frequency)?;
        self.config = config;
        self.init()
    }

    /// Silicon version.
    pub fn version(&mut self) -> Result<u8, Error> {
        let version: Version = self.device.read_register()?;
        Ok(version.value)
    }

    /// Current transceiver mode, read from the chip.
    pub fn mode(&mut self) -> Result<Mode, Error> {
        let op_mode: OpMode = self.device.read_register()?;
        Ok(op_mode.mode)
    }

    /// Switches the LoRa modem to `mode`.
    pub fn set_mode(&mut self, mode: Mode) -> Result<(), Error> {
        log::trace!("sx127x::set_mode {mode:?}");
        self.device.write_register(OpMode::lora(mode))?;
        Ok(())
    }

    /// Enters sleep mode with the LoRa modem selected.
    pub fn sleep(&mut self) -> Result<(), Error> {
        self.set_mode(Mode::Sleep)
    }

    /// Enters standby mode.
    pub fn standby(&mut self) -> Result<(), Error> {
        self.set_mode(Mode::Standby)
    }

    /// Tunes to a supported carrier frequency.
    ///
    /// # Errors
    /// * `Error::UnsupportedFrequency` - the chip is left untouched
    pub fn set_frequency(&mut self, frequency: u32) -> Result<(), Error> {
        let frf = config::frequency_registers(frequency)?;
        self.device.write_register(CarrierFrequency { frf })?;
        self.config.frequency = frequency;
        Ok(())
    }

    /// Selects the narrowest bandwidth bin not below `bandwidth` Hz.
    ///
    /// Low data rate optimization follows the new symbol length.
    pub fn set_signal_bandwidth(&mut self, bandwidth: u32) -> Result<(), Error> {
        let bin = config::bandwidth_bin(bandwidth);
        self.device
            .modify_register(|reg: &mut ModemConfig1| reg.bandwidth = bin)?;
        self.config.signal_bandwidth = bandwidth;
        self.update_low_data_rate_optimize()
    }

    /// Sets the spreading factor, clamped to 6..=12, with the detection
    /// tuning and low data rate optimization it requires.
    pub fn set_spreading_factor(&mut self, spreading_factor: u8) -> Result<(), Error> {
        let spreading_factor = config::clamp_spreading_factor(spreading_factor);
        let (optimize, threshold) = config::detection_settings(spreading_factor);

        self.device.write_register(DetectionOptimize { value: optimize })?;
        self.device.write_register(DetectionThreshold { value: threshold })?;
        self.device
            .modify_register(|reg: &mut ModemConfig2| reg.spreading_factor = spreading_factor)?;
        self.config.spreading_factor = spreading_factor;
        self.update_low_data_rate_optimize()
    }

    /// Sets the coding rate to `4/denominator`, denominator clamped to 5..=8.
    pub fn set_coding_rate(&mut self, denominator: u8) -> Result<(), Error> {
        let coding_rate = config::coding_rate_field(denominator);
        self.device
            .modify_register(|reg: &mut ModemConfig1| reg.coding_rate = coding_rate)?;
        self.config.coding_rate = coding_rate + 4;
        Ok(())
    }

    /// Sets the preamble length in symbols.
    pub fn set_preamble_length(&mut self, length: u16) -> Result<(), Error> {
        self.device.write_register(PreambleLength { length })?;
        self.config.preamble_length = length;
        Ok(())
    }

    /// Sets the sync word.
    pub fn set_sync_word(&mut self, sync_word: u8) -> Result<(), Error> {
        self.device.write_register(SyncWord { value: sync_word })?;
        self.config.sync_word = sync_word;
        Ok(())
    }

    /// Enables or disables the payload CRC.
    pub fn enable_crc(&mut self, enable: bool) -> Result<(), Error> {
        self.device
            .modify_register(|reg: &mut ModemConfig2| reg.rx_payload_crc_on = enable)?;
        self.config.enable_crc = enable;
        Ok(())
    }

    /// Sets the TX power level on the given amplifier path, clamped to the
    /// range of that path.
    pub fn set_tx_power(&mut self, level: i8, output: PaOutput) -> Result<(), Error> {
        self.device.write_register(config::pa_config(level, output))?;
        self.config.tx_power_level = config::clamp_tx_power(level, output);
        self.config.pa_output = output;
        Ok(())
    }

    /// Selects implicit or explicit header mode.
    ///
    /// The register is only written when the mode changes. The cached mode
    /// is updated once the write has gone through.
    pub fn set_implicit_header(&mut self, implicit: bool) -> Result<(), Error> {
        if self.implicit_header != Some(implicit) {
            self.device
                .modify_register(|reg: &mut ModemConfig1| reg.implicit_header = implicit)?;
            self.implicit_header = Some(implicit);
        }
        Ok(())
    }

    /// Whether the modem is in implicit header mode.
    pub fn implicit_header(&self) -> bool {
        self.implicit_header.unwrap_or(self.config.implicit_header)
    }

    /// Starts assembling a packet: standby, header mode, FIFO pointer at the
    /// transmit base and an empty payload.
    pub fn begin_packet(&mut self, implicit_header: bool) -> Result<(), Error> {
        self.standby()?;
        self.set_implicit_header(implicit_header)?;

        self.device.write_register(FifoAddrPtr {
            address: self.config.fifo_tx_base,
        })?;
        self.device.write_register(PayloadLength { length: 0 })?;
        Ok(())
    }

    /// Appends `buffer` to the packet being assembled.
    ///
    /// Bytes beyond the FIFO space left after the transmit base are dropped.
    /// Returns the number of bytes queued.
    pub fn write(&mut self, buffer: &[u8]) -> Result<usize, Error> {
        let current: PayloadLength = self.device.read_register()?;
        let current = current.length as usize;

        let capacity = MAX_PACKET_LENGTH
            .saturating_sub(self.config.fifo_tx_base as usize)
            .saturating_sub(current);
        let size = buffer.len().min(capacity);
        if size < buffer.len() {
            log::debug!("sx127x::write truncated {} bytes to {size}", buffer.len());
        }

        self.device.write_fifo(&buffer[..size])?;
        self.device.write_register(PayloadLength {
            length: (current + size) as u8,
        })?;
        Ok(size)
    }

    /// Transmits the assembled packet and blocks until the chip reports
    /// TX done, then clears the flag.
    ///
    /// The wait is bounded by [`Config::tx_timeout_ms`], or by twice the
    /// packet's time on air plus a guard when that is unset.
    ///
    /// Do not call this inside [`crate::Shared::lock`], the whole wait would
    /// run in one critical section. Use [`crate::Shared::send`] instead.
    ///
    /// # Errors
    /// * `Error::TxTimeout` - the chip is forced back to standby
    pub fn end_packet(&mut self) -> Result<(), Error> {
        let timeout_ms = self.start_transmit()?;

        let mut waited_ms = 0;
        while !self.poll_tx_done()? {
            if waited_ms >= timeout_ms {
                return self.abort_transmit(waited_ms);
            }
            self.delay.delay_ms(1);
            waited_ms += 1;
        }
        Ok(())
    }

    /// Starts transmitting the assembled packet without waiting for it.
    ///
    /// Returns the bound in ms within which [`Sx127x::poll_tx_done`] should
    /// report completion.
    pub fn start_transmit(&mut self) -> Result<u32, Error> {
        let length: PayloadLength = self.device.read_register()?;
        let timeout_ms = self.tx_timeout_ms(length.length as usize);

        self.set_mode(Mode::Transmit)?;
        log::trace!("sx127x::start_transmit {} bytes", length.length);
        Ok(timeout_ms)
    }

    /// Checks for TX done, clearing the flag when it is set.
    pub fn poll_tx_done(&mut self) -> Result<bool, Error> {
        let irq: IrqFlags = self.device.read_register()?;
        if !irq.flags.contains(Irq::TX_DONE) {
            return Ok(false);
        }

        self.device.write_register(IrqFlags {
            flags: Irq::TX_DONE,
        })?;
        Ok(true)
    }

    /// Forces standby after the transmit bound expired.
    pub(crate) fn abort_transmit(&mut self, waited_ms: u32) -> Result<(), Error> {
        log::warn!("sx127x::transmit no TX done after {waited_ms} ms");
        self.standby()?;
        Err(Error::TxTimeout)
    }

    /// Sends `payload` as one packet, blocking until it is on air.
    ///
    /// Returns the number of bytes sent, which is less than `payload.len()`
    /// when the payload does not fit the FIFO.
    pub fn send(&mut self, payload: &[u8], implicit_header: bool) -> Result<usize, Error> {
        self.begin_packet(implicit_header)?;
        let sent = self.write(payload)?;
        self.end_packet()?;
        Ok(sent)
    }

    /// Enters continuous receive.
    ///
    /// A non-zero `size` selects implicit header mode with that fixed payload
    /// length; zero selects explicit header mode.
    pub fn receive(&mut self, size: u8) -> Result<(), Error> {
        self.set_implicit_header(size > 0)?;
        if size > 0 {
            self.device.write_register(PayloadLength { length: size })?;
        }

        self.set_mode(Mode::ReceiveContinuous)
    }

    /// Polled single receive.
    ///
    /// Returns `true` when exactly RX done is flagged, meaning a packet with
    /// a good CRC is waiting in the FIFO and the chip is back in standby.
    /// Otherwise, unless a single receive is already running, rewinds the
    /// FIFO pointer and starts one. Meant to be called in a loop.
    pub fn received_packet(&mut self, size: u8) -> Result<bool, Error> {
        let irq = self.irq_flags()?;

        self.set_implicit_header(size > 0)?;
        if size > 0 {
            self.device.write_register(PayloadLength { length: size })?;
        }

        if irq == Irq::RX_DONE {
            return Ok(true);
        }

        let op_mode: OpMode = self.device.read_register()?;
        if op_mode != OpMode::lora(Mode::ReceiveSingle) {
            self.device.write_register(FifoAddrPtr {
                address: self.config.fifo_rx_base,
            })?;
            self.set_mode(Mode::ReceiveSingle)?;
        }
        Ok(false)
    }

    /// Copies the last received packet into `buffer`.
    ///
    /// The length comes from the payload length register in implicit header
    /// mode and from the received byte count otherwise. Returns the number of
    /// bytes copied, at most `buffer.len()`.
    pub fn read_payload(&mut self, buffer: &mut [u8]) -> Result<usize, Error> {
        let current: FifoRxCurrentAddr = self.device.read_register()?;
        self.device.write_register(FifoAddrPtr {
            address: current.address,
        })?;

        let length = if self.implicit_header() {
            let reg: PayloadLength = self.device.read_register()?;
            reg.length
        } else {
            let reg: RxNbBytes = self.device.read_register()?;
            reg.count
        };

        let length = (length as usize).min(buffer.len());
        self.device.read_fifo(&mut buffer[..length])?;
        Ok(length)
    }

    /// Reads the interrupt flags and clears the ones that were set.
    pub fn irq_flags(&mut self) -> Result<Irq, Error> {
        let irq: IrqFlags = self.device.read_register()?;
        self.device.write_register(irq)?;
        Ok(irq.flags)
    }

    /// Routes chip events to the DIO0..DIO3 pins.
    pub fn set_dio_mapping(&mut self, mapping: DioMapping1) -> Result<(), Error> {
        self.device.write_register(mapping)?;
        Ok(())
    }

    /// RSSI of the last packet in dBm.
    pub fn packet_rssi(&mut self) -> Result<i16, Error> {
        let rssi: PktRssiValue = self.device.read_register()?;
        Ok(rssi.value as i16 - self.config.rssi_offset())
    }

    /// SNR of the last packet in dB.
    pub fn packet_snr(&mut self) -> Result<f32, Error> {
        let snr: PktSnrValue = self.device.read_register()?;
        Ok(snr.value as f32 * 0.25)
    }

    fn update_low_data_rate_optimize(&mut self) -> Result<(), Error> {
        let enable = self.config.low_data_rate_optimize();
        self.device
            .modify_register(|reg: &mut ModemConfig3| reg.low_data_rate_optimize = enable)?;
        Ok(())
    }

    fn tx_timeout_ms(&self, payload_len: usize) -> u32 {
        self.config.tx_timeout_ms.unwrap_or_else(|| {
            let packet = Config {
                implicit_header: self.implicit_header(),
                ..self.config
            };
            let airtime_ms = packet.time_on_air_us(payload_len).div_ceil(1000);
            ((2 * airtime_ms).min(u32::MAX as u64) as u32).saturating_add(TX_GUARD_MS)
        })
    }
}
