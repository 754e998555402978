//! LoRa modem registers
//!
//! This module contains the registers that shape the LoRa modulation and
//! packet format:
//! - Bandwidth, coding rate and header mode
//! - Spreading factor and payload CRC
//! - Low data rate optimization and AGC
//! - Preamble length and sync word
//! - Detection tuning for spreading factor 6
//! - Signal quality of the last received packet
//!
//! Transmitter and receiver must agree on every field here except the
//! AGC setting, or no packet will be demodulated.

use core::convert::Infallible;

use regiface::{register, FromByteArray, ReadableRegister, ToByteArray, WritableRegister};

/// Modem configuration 1 (address: 0x1D)
///
/// # Bit Layout
/// - Bits 7:4: bandwidth bin (0 = 7.8 kHz ... 9 = 500 kHz)
/// - Bits 3:1: coding rate, `denominator - 4`
/// - Bit 0: implicit header mode
#[register(0x1Du8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct ModemConfig1 {
    /// Signal bandwidth bin
    pub bandwidth: u8,
    /// Coding rate field, 1 (4/5) to 4 (4/8)
    pub coding_rate: u8,
    /// Implicit header mode on
    pub implicit_header: bool,
}

/// Modem configuration 2 (address: 0x1E)
///
/// # Bit Layout
/// - Bits 7:4: spreading factor
/// - Bit 3: continuous transmit mode
/// - Bit 2: payload CRC on
/// - Bits 1:0: RX timeout MSB
#[register(0x1Eu8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct ModemConfig2 {
    /// Spreading factor, 6 to 12
    pub spreading_factor: u8,
    /// Continuous transmit mode
    pub tx_continuous: bool,
    /// Generate and check payload CRC
    pub rx_payload_crc_on: bool,
    /// Symbol timeout, bits 9:8
    pub symb_timeout_msb: u8,
}

/// Modem configuration 3 (address: 0x26)
#[register(0x26u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ReadableRegister, WritableRegister)]
pub struct ModemConfig3 {
    /// Mandated when the symbol length exceeds 16 ms
    pub low_data_rate_optimize: bool,
    /// LNA gain set by the internal AGC loop
    pub agc_auto_on: bool,
}

/// Preamble length (address: 0x20, burst 0x20..=0x21)
///
/// Length in symbols, not counting the 4.25 fixed symbols the modem adds.
#[register(0x20u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct PreambleLength {
    /// Preamble length in symbols
    pub length: u16,
}

/// LoRa detection optimize (address: 0x31)
///
/// `0xC5` for spreading factor 6, `0xC3` otherwise.
#[register(0x31u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct DetectionOptimize {
    #[allow(missing_docs)]
    pub value: u8,
}

/// LoRa detection threshold (address: 0x37)
///
/// `0x0C` for spreading factor 6, `0x0A` otherwise.
#[register(0x37u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct DetectionThreshold {
    #[allow(missing_docs)]
    pub value: u8,
}

/// LoRa sync word (address: 0x39)
///
/// # Important Notes
/// - 0x34 is reserved for LoRaWAN public networks
/// - Default value after reset is 0x12
#[register(0x39u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct SyncWord {
    #[allow(missing_docs)]
    pub value: u8,
}

/// SNR estimate of the last packet (address: 0x19)
///
/// Two's complement, 0.25 dB per LSB.
#[register(0x19u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister)]
pub struct PktSnrValue {
    #[allow(missing_docs)]
    pub value: i8,
}

/// RSSI of the last packet (address: 0x1A)
///
/// Raw value; RSSI in dBm is `value - 157` on the high frequency port and
/// `value - 164` on the low frequency port.
#[register(0x1Au8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister)]
pub struct PktRssiValue {
    #[allow(missing_docs)]
    pub value: u8,
}

impl FromByteArray for ModemConfig1 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            bandwidth: bytes[0] >> 4,
            coding_rate: (bytes[0] >> 1) & 0x07,
            implicit_header: bytes[0] & 0x01 != 0,
        })
    }
}

impl ToByteArray for ModemConfig1 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([((self.bandwidth & 0x0F) << 4)
            | ((self.coding_rate & 0x07) << 1)
            | self.implicit_header as u8])
    }
}

impl FromByteArray for ModemConfig2 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            spreading_factor: bytes[0] >> 4,
            tx_continuous: bytes[0] & 0x08 != 0,
            rx_payload_crc_on: bytes[0] & 0x04 != 0,
            symb_timeout_msb: bytes[0] & 0x03,
        })
    }
}

impl ToByteArray for ModemConfig2 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([((self.spreading_factor & 0x0F) << 4)
            | ((self.tx_continuous as u8) << 3)
            | ((self.rx_payload_crc_on as u8) << 2)
            | (self.symb_timeout_msb & 0x03)])
    }
}

impl FromByteArray for ModemConfig3 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            low_data_rate_optimize: bytes[0] & 0x08 != 0,
            agc_auto_on: bytes[0] & 0x04 != 0,
        })
    }
}

impl ToByteArray for ModemConfig3 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([((self.low_data_rate_optimize as u8) << 3) | ((self.agc_auto_on as u8) << 2)])
    }
}

impl FromByteArray for PreambleLength {
    type Error = Infallible;
    type Array = [u8; 2];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            length: u16::from_be_bytes(bytes),
        })
    }
}

impl ToByteArray for PreambleLength {
    type Error = Infallible;
    type Array = [u8; 2];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok(self.length.to_be_bytes())
    }
}

impl FromByteArray for DetectionOptimize {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self { value: bytes[0] })
    }
}

impl ToByteArray for DetectionOptimize {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.value])
    }
}

impl FromByteArray for DetectionThreshold {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self { value: bytes[0] })
    }
}

impl ToByteArray for DetectionThreshold {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.value])
    }
}

impl FromByteArray for SyncWord {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self { value: bytes[0] })
    }
}

impl ToByteArray for SyncWord {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.value])
    }
}

impl FromByteArray for PktSnrValue {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            value: bytes[0] as i8,
        })
    }
}

impl FromByteArray for PktRssiValue {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self { value: bytes[0] })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modem_config_1_keeps_fields_apart() {
        let config = ModemConfig1 {
            bandwidth: 7,
            coding_rate: 1,
            implicit_header: true,
        };
        assert_eq!(config.to_bytes(), Ok([0x73]));
        assert_eq!(ModemConfig1::from_bytes([0x73]), Ok(config));
    }

    #[test]
    fn modem_config_2_spreading_factor_in_high_nibble() {
        let config = ModemConfig2::from_bytes([0x74]).unwrap();
        assert_eq!(config.spreading_factor, 7);
        assert!(config.rx_payload_crc_on);
        assert!(!config.tx_continuous);
    }

    #[test]
    fn snr_is_signed() {
        assert_eq!(PktSnrValue::from_bytes([0xF8]).unwrap().value, -8);
    }
}
