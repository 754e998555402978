//! Modulation parameters and their register encodings
//!
//! [`Config`] carries everything the initialization sequence writes to the
//! chip. The free functions in this module turn each parameter into the
//! value the chip expects; they are pure so they can be checked without
//! hardware.
//!
//! # Encoding Rules
//! - Carrier frequency: closed lookup table, unknown values are rejected
//! - Bandwidth: first bin at or above the request (ceiling, not nearest)
//! - Spreading factor: clamped to 6..=12, 6 needs its own detection tuning
//! - Coding rate: denominator clamped to 5..=8, stored as `denominator - 4`
//! - TX power: clamped per amplifier path

use crate::error::Error;
use crate::registers::PaConfig;

/// Largest LoRa payload, and the end of the FIFO window used for it.
pub const MAX_PACKET_LENGTH: usize = 255;

/// Silicon version reported by SX1276/77/78/79.
pub const EXPECTED_VERSION: u8 = 0x12;

/// Supported carrier frequencies (Hz) and their synthesizer words.
///
/// The word is `frequency * 2^19 / 32 MHz`, MSB first.
pub const FREQUENCY_TABLE: [(u32, [u8; 3]); 6] = [
    (169_000_000, [0x2A, 0x40, 0x00]),
    (433_000_000, [0x6C, 0x40, 0x00]),
    (434_000_000, [0x6C, 0x80, 0x00]),
    (866_000_000, [0xD8, 0x80, 0x00]),
    (868_000_000, [0xD9, 0x00, 0x00]),
    (915_000_000, [0xE4, 0xC0, 0x00]),
];

/// Bandwidth bins (Hz) selectable in modem configuration 1, index = bin.
pub const BANDWIDTH_BINS: [u32; 9] = [
    7_800, 10_400, 15_600, 20_800, 31_250, 41_700, 62_500, 125_000, 250_000,
];

/// Bin used when the request exceeds every entry of [`BANDWIDTH_BINS`].
pub const WIDEST_BANDWIDTH_BIN: u8 = 9;

/// Boundary between the low and high frequency RF ports.
const HIGH_FREQUENCY_PORT_HZ: u32 = 868_000_000;

/// Power amplifier output the antenna is wired to
///
/// Board specific, the chip cannot detect it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PaOutput {
    /// RFO pin, 0 to 14 dBm
    Rfo,
    /// PA_BOOST pin, 2 to 17 dBm
    #[default]
    PaBoost,
}

/// Transceiver configuration
///
/// Defaults match a freshly reset chip talking on 915 MHz:
/// 125 kHz, SF8, 4/5, 8 symbol preamble, explicit header, sync word 0x12,
/// CRC off, 2 dBm on PA_BOOST.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Carrier frequency in Hz, one of [`FREQUENCY_TABLE`]
    pub frequency: u32,
    /// TX power level, clamped per [`PaOutput`]
    pub tx_power_level: i8,
    /// Amplifier path used for transmission
    pub pa_output: PaOutput,
    /// Signal bandwidth in Hz
    pub signal_bandwidth: u32,
    /// Spreading factor, 6 to 12
    pub spreading_factor: u8,
    /// Coding rate denominator, 5 to 8
    pub coding_rate: u8,
    /// Preamble length in symbols
    pub preamble_length: u16,
    /// Use implicit header mode
    pub implicit_header: bool,
    /// LoRa sync word
    pub sync_word: u8,
    /// Append and check a payload CRC
    pub enable_crc: bool,
    /// FIFO offset where transmitted packets are assembled
    pub fifo_tx_base: u8,
    /// FIFO offset where received packets are stored
    pub fifo_rx_base: u8,
    /// Upper bound for a transmission in milliseconds.
    /// `None` derives it from the time on air of each packet
    pub tx_timeout_ms: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            frequency: 915_000_000,
            tx_power_level: 2,
            pa_output: PaOutput::PaBoost,
            signal_bandwidth: 125_000,
            spreading_factor: 8,
            coding_rate: 5,
            preamble_length: 8,
            implicit_header: false,
            sync_word: 0x12,
            enable_crc: false,
            fifo_tx_base: 0x00,
            fifo_rx_base: 0x00,
            tx_timeout_ms: None,
        }
    }
}

impl Config {
    /// Default configuration on the given carrier frequency.
    pub fn new(frequency: u32) -> Self {
        Self {
            frequency,
            ..Self::default()
        }
    }

    /// Sets the carrier frequency in Hz.
    pub fn set_frequency(mut self, frequency: u32) -> Self {
        self.frequency = frequency;
        self
    }

    /// Sets the TX power level and amplifier path.
    pub fn set_tx_power(mut self, level: i8, output: PaOutput) -> Self {
        self.tx_power_level = level;
        self.pa_output = output;
        self
    }

    /// Sets the signal bandwidth in Hz.
    pub fn set_signal_bandwidth(mut self, bandwidth: u32) -> Self {
        self.signal_bandwidth = bandwidth;
        self
    }

    /// Sets the spreading factor.
    pub fn set_spreading_factor(mut self, spreading_factor: u8) -> Self {
        self.spreading_factor = spreading_factor;
        self
    }

    /// Sets the coding rate denominator.
    pub fn set_coding_rate(mut self, denominator: u8) -> Self {
        self.coding_rate = denominator;
        self
    }

    /// Sets the preamble length.
    pub fn set_preamble_length(mut self, length: u16) -> Self {
        self.preamble_length = length;
        self
    }

    /// Selects implicit or explicit header mode.
    pub fn set_implicit_header(mut self, implicit: bool) -> Self {
        self.implicit_header = implicit;
        self
    }

    /// Sets the sync word.
    pub fn set_sync_word(mut self, sync_word: u8) -> Self {
        self.sync_word = sync_word;
        self
    }

    /// Enables or disables the payload CRC.
    pub fn set_crc(mut self, enable: bool) -> Self {
        self.enable_crc = enable;
        self
    }

    /// Sets the FIFO base addresses for transmit and receive.
    pub fn set_fifo_base(mut self, tx: u8, rx: u8) -> Self {
        self.fifo_tx_base = tx;
        self.fifo_rx_base = rx;
        self
    }

    /// Bounds every transmission to `timeout_ms`.
    pub fn set_tx_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.tx_timeout_ms = Some(timeout_ms);
        self
    }

    /// Whether the low data rate optimization must be enabled.
    ///
    /// Uses the bandwidth bin actually selected for `signal_bandwidth`.
    pub fn low_data_rate_optimize(&self) -> bool {
        low_data_rate_optimize(
            bin_bandwidth(bandwidth_bin(self.signal_bandwidth)),
            clamp_spreading_factor(self.spreading_factor),
        )
    }

    /// Airtime of a packet with `payload_len` bytes, in microseconds.
    ///
    /// Follows Semtech AN1200.13 using the bandwidth bin actually selected.
    pub fn time_on_air_us(&self, payload_len: usize) -> u64 {
        let sf = clamp_spreading_factor(self.spreading_factor) as i64;
        let bandwidth = bin_bandwidth(bandwidth_bin(self.signal_bandwidth)) as u64;
        let symbol_us = (1_000_000u64 << sf) / bandwidth;

        let preamble_us = (4 * self.preamble_length as u64 + 17) * symbol_us / 4;

        let de = self.low_data_rate_optimize() as i64;
        let numerator = 8 * payload_len as i64 - 4 * sf + 28 + 16 * self.enable_crc as i64
            - 20 * self.implicit_header as i64;
        let denominator = 4 * (sf - 2 * de);
        let blocks = if numerator > 0 {
            (numerator + denominator - 1) / denominator
        } else {
            0
        };
        let cr = coding_rate_field(self.coding_rate) as i64;
        let payload_symbols = 8 + blocks * (cr + 4);

        preamble_us + payload_symbols as u64 * symbol_us
    }

    /// RSSI offset of the RF port serving the configured frequency.
    pub fn rssi_offset(&self) -> i16 {
        rssi_offset(self.frequency)
    }
}

/// Synthesizer word for a supported carrier frequency.
///
/// # Errors
/// * `Error::UnsupportedFrequency` - `frequency` is not in [`FREQUENCY_TABLE`]
pub fn frequency_registers(frequency: u32) -> Result<[u8; 3], Error> {
    FREQUENCY_TABLE
        .iter()
        .find(|(hz, _)| *hz == frequency)
        .map(|(_, frf)| *frf)
        .ok_or(Error::UnsupportedFrequency(frequency))
}

/// Index of the first bandwidth bin at or above `bandwidth`, or
/// [`WIDEST_BANDWIDTH_BIN`] when the request exceeds them all.
pub fn bandwidth_bin(bandwidth: u32) -> u8 {
    BANDWIDTH_BINS
        .iter()
        .position(|&bin| bandwidth <= bin)
        .map(|index| index as u8)
        .unwrap_or(WIDEST_BANDWIDTH_BIN)
}

/// Bandwidth in Hz of a bin returned by [`bandwidth_bin`].
pub fn bin_bandwidth(bin: u8) -> u32 {
    BANDWIDTH_BINS
        .get(bin as usize)
        .copied()
        .unwrap_or(500_000)
}

/// Spreading factor limited to what the LoRa modem supports.
pub fn clamp_spreading_factor(spreading_factor: u8) -> u8 {
    spreading_factor.clamp(6, 12)
}

/// Detection optimize and detection threshold values for a spreading factor.
pub fn detection_settings(spreading_factor: u8) -> (u8, u8) {
    if clamp_spreading_factor(spreading_factor) == 6 {
        (0xC5, 0x0C)
    } else {
        (0xC3, 0x0A)
    }
}

/// Coding rate field of modem configuration 1 for a denominator.
pub fn coding_rate_field(denominator: u8) -> u8 {
    denominator.clamp(5, 8) - 4
}

/// PA configuration for a power level on the given output.
///
/// - RFO: level clamped to 0..=14, encoded as `0x70 | level`
/// - PA_BOOST: level clamped to 2..=17, encoded as `0x80 | (level - 2)`
pub fn pa_config(level: i8, output: PaOutput) -> PaConfig {
    let level = clamp_tx_power(level, output);
    match output {
        PaOutput::Rfo => PaConfig {
            pa_select: false,
            max_power: 0x07,
            output_power: level as u8,
        },
        PaOutput::PaBoost => PaConfig {
            pa_select: true,
            max_power: 0x00,
            output_power: (level - 2) as u8,
        },
    }
}

/// TX power level limited to the range of the amplifier path.
pub fn clamp_tx_power(level: i8, output: PaOutput) -> i8 {
    match output {
        PaOutput::Rfo => level.clamp(0, 14),
        PaOutput::PaBoost => level.clamp(2, 17),
    }
}

/// True when the symbol period `2^sf / bandwidth` exceeds 16 ms.
pub fn low_data_rate_optimize(bandwidth: u32, spreading_factor: u8) -> bool {
    (1000u64 << spreading_factor) > 16 * bandwidth as u64
}

/// Offset subtracted from the raw packet RSSI: 164 on the low frequency
/// port, 157 from 868 MHz upwards.
pub fn rssi_offset(frequency: u32) -> i16 {
    if frequency < HIGH_FREQUENCY_PORT_HZ {
        164
    } else {
        157
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_table_frequency_has_its_word() {
        for (hz, frf) in FREQUENCY_TABLE {
            assert_eq!(frequency_registers(hz), Ok(frf));
        }
        assert_eq!(frequency_registers(915_000_000), Ok([228, 192, 0]));
        assert_eq!(frequency_registers(169_000_000), Ok([42, 64, 0]));
    }

    #[test]
    fn unlisted_frequency_is_rejected() {
        assert_eq!(
            frequency_registers(915_100_000),
            Err(Error::UnsupportedFrequency(915_100_000))
        );
        assert_eq!(frequency_registers(0), Err(Error::UnsupportedFrequency(0)));
    }

    #[test]
    fn bandwidth_selects_ceiling_bin() {
        assert_eq!(bandwidth_bin(20_000), 3);
        assert_eq!(bandwidth_bin(7_800), 0);
        assert_eq!(bandwidth_bin(1), 0);
        assert_eq!(bandwidth_bin(125_000), 7);
        assert_eq!(bandwidth_bin(125_001), 8);
        assert_eq!(bandwidth_bin(250_000), 8);
        assert_eq!(bandwidth_bin(500_000), WIDEST_BANDWIDTH_BIN);
    }

    #[test]
    fn spreading_factor_six_uses_its_own_detection_pair() {
        assert_eq!(detection_settings(6), (0xC5, 0x0C));
        for sf in 7..=12 {
            assert_eq!(detection_settings(sf), (0xC3, 0x0A));
        }
        // clamped up to 6 first
        assert_eq!(detection_settings(5), (0xC5, 0x0C));
        assert_eq!(clamp_spreading_factor(13), 12);
    }

    #[test]
    fn coding_rate_is_denominator_minus_four() {
        assert_eq!(coding_rate_field(5), 1);
        assert_eq!(coding_rate_field(8), 4);
        assert_eq!(coding_rate_field(2), 1);
        assert_eq!(coding_rate_field(9), 4);
    }

    #[test]
    fn boost_power_is_clamped_to_two_through_seventeen() {
        let encode = |level| {
            use regiface::ToByteArray;
            pa_config(level, PaOutput::PaBoost).to_bytes().unwrap()[0]
        };
        assert_eq!(encode(2), 0x80);
        assert_eq!(encode(17), 0x8F);
        assert_eq!(encode(20), 0x8F);
        assert_eq!(encode(-3), 0x80);
    }

    #[test]
    fn rfo_power_is_clamped_to_fourteen() {
        use regiface::ToByteArray;
        assert_eq!(pa_config(0, PaOutput::Rfo).to_bytes().unwrap(), [0x70]);
        assert_eq!(pa_config(14, PaOutput::Rfo).to_bytes().unwrap(), [0x7E]);
        assert_eq!(pa_config(15, PaOutput::Rfo).to_bytes().unwrap(), [0x7E]);
    }

    #[test]
    fn low_data_rate_optimize_above_sixteen_ms_symbols() {
        // 2^12 / 125 kHz = 32.8 ms
        assert!(low_data_rate_optimize(125_000, 12));
        // 2^11 / 125 kHz = 16.4 ms
        assert!(low_data_rate_optimize(125_000, 11));
        // 2^10 / 125 kHz = 8.2 ms
        assert!(!low_data_rate_optimize(125_000, 10));
        assert!(!Config::default().low_data_rate_optimize());
    }

    #[test]
    fn tx_power_clamp_follows_output() {
        assert_eq!(clamp_tx_power(20, PaOutput::PaBoost), 17);
        assert_eq!(clamp_tx_power(0, PaOutput::PaBoost), 2);
        assert_eq!(clamp_tx_power(-3, PaOutput::Rfo), 0);
        assert_eq!(clamp_tx_power(15, PaOutput::Rfo), 14);
    }

    #[test]
    fn low_data_rate_optimize_uses_selected_bin() {
        // 100 kHz selects the 125 kHz bin: 2^11 / 125 kHz = 16.4 ms
        assert!(Config::default()
            .set_spreading_factor(11)
            .set_signal_bandwidth(100_000)
            .low_data_rate_optimize());
        // 127 kHz selects 250 kHz: 8.2 ms, although 2^11 / 127 kHz is 16.1 ms
        assert!(!Config::default()
            .set_spreading_factor(11)
            .set_signal_bandwidth(127_000)
            .low_data_rate_optimize());
    }

    #[test]
    fn rssi_offset_switches_at_868_mhz() {
        assert_eq!(rssi_offset(915_000_000), 157);
        assert_eq!(rssi_offset(868_000_000), 157);
        assert_eq!(rssi_offset(433_000_000), 164);
    }

    #[test]
    fn time_on_air_matches_calculator() {
        // SF7, 125 kHz, 4/5, 8 symbol preamble, explicit header, CRC on,
        // 10 byte payload: 41.216 ms
        let config = Config::default().set_spreading_factor(7).set_crc(true);
        assert_eq!(config.time_on_air_us(10), 41_216);
    }
}
