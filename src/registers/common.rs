//! Common registers
//!
//! This module contains the registers shared by every modem mode:
//! - Operating mode and LoRa mode selection
//! - Carrier frequency
//! - Power amplifier selection and output level
//! - LNA gain and boost
//! - Silicon version
//!
//! The long-range mode bit in [`OpMode`] can only be changed while the chip
//! is in sleep mode.

use core::convert::Infallible;

use regiface::{register, FromByteArray, ReadableRegister, ToByteArray, WritableRegister};

/// Transceiver operating mode
///
/// Encoded in bits 2:0 of the operating mode register. The driver only ever
/// enters [`Mode::Sleep`], [`Mode::Standby`], [`Mode::Transmit`],
/// [`Mode::ReceiveContinuous`] and [`Mode::ReceiveSingle`]; the synthesizer
/// and CAD modes are listed because the chip may report them while passing
/// through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Sleep mode, lowest power. Required to switch the long-range bit
    Sleep = 0x0,
    /// Standby mode, crystal running
    Standby = 0x1,
    /// Frequency synthesis, TX
    FrequencySynthesisTx = 0x2,
    /// Transmit the packet queued in the FIFO, then return to standby
    Transmit = 0x3,
    /// Frequency synthesis, RX
    FrequencySynthesisRx = 0x4,
    /// Receive until told otherwise
    ReceiveContinuous = 0x5,
    /// Receive a single packet, then return to standby
    ReceiveSingle = 0x6,
    /// Channel activity detection
    ChannelActivityDetection = 0x7,
}

impl From<u8> for Mode {
    fn from(value: u8) -> Self {
        match value & 0x07 {
            0x0 => Self::Sleep,
            0x1 => Self::Standby,
            0x2 => Self::FrequencySynthesisTx,
            0x3 => Self::Transmit,
            0x4 => Self::FrequencySynthesisRx,
            0x5 => Self::ReceiveContinuous,
            0x6 => Self::ReceiveSingle,
            _ => Self::ChannelActivityDetection,
        }
    }
}

/// Operating mode register (address: 0x01)
///
/// Selects the modem (LoRa or FSK/OOK) and the transceiver mode.
///
/// # Important Notes
/// - `long_range` may only be modified in sleep mode
/// - The chip leaves transmit and single receive on its own, so the mode
///   must be read back rather than remembered
#[register(0x01u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct OpMode {
    /// LoRa modem selected
    pub long_range: bool,
    /// Transceiver mode
    pub mode: Mode,
}

impl OpMode {
    /// LoRa modem in the given mode
    pub const fn lora(mode: Mode) -> Self {
        Self {
            long_range: true,
            mode,
        }
    }
}

/// Carrier frequency register (address: 0x06, burst 0x06..=0x08)
///
/// 24-bit synthesizer word, most significant byte first.
/// The new frequency takes effect on the write of the least significant byte.
#[register(0x06u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct CarrierFrequency {
    /// MSB, MID, LSB
    pub frf: [u8; 3],
}

/// PA configuration register (address: 0x09)
///
/// # Output Paths
/// - RFO pin: `pa_select = false`, power = max_power-dependent + output_power
/// - PA_BOOST pin: `pa_select = true`, power = 2 + output_power dBm
#[register(0x09u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct PaConfig {
    /// Route output through PA_BOOST
    pub pa_select: bool,
    /// Maximum power on the RFO path, bits 6:4
    pub max_power: u8,
    /// Output power, bits 3:0
    pub output_power: u8,
}

/// LNA register (address: 0x0C)
#[register(0x0Cu8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct Lna {
    /// LNA gain, bits 7:5
    pub gain: u8,
    /// Low frequency boost, bits 4:3
    pub boost_lf: u8,
    /// High frequency boost, bits 1:0. `0b11` selects 150% LNA current
    pub boost_hf: u8,
}

/// Version register (address: 0x42)
///
/// Reads 0x12 on SX1276/77/78/79 silicon.
#[register(0x42u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister)]
pub struct Version {
    /// Full revision in bits 7:4, metal mask revision in bits 3:0
    pub value: u8,
}

impl FromByteArray for OpMode {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            long_range: bytes[0] & 0x80 != 0,
            mode: Mode::from(bytes[0]),
        })
    }
}

impl ToByteArray for OpMode {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([((self.long_range as u8) << 7) | self.mode as u8])
    }
}

impl FromByteArray for CarrierFrequency {
    type Error = Infallible;
    type Array = [u8; 3];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self { frf: bytes })
    }
}

impl ToByteArray for CarrierFrequency {
    type Error = Infallible;
    type Array = [u8; 3];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok(self.frf)
    }
}

impl FromByteArray for PaConfig {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            pa_select: bytes[0] & 0x80 != 0,
            max_power: (bytes[0] >> 4) & 0x07,
            output_power: bytes[0] & 0x0F,
        })
    }
}

impl ToByteArray for PaConfig {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([((self.pa_select as u8) << 7)
            | ((self.max_power & 0x07) << 4)
            | (self.output_power & 0x0F)])
    }
}

impl FromByteArray for Lna {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            gain: (bytes[0] >> 5) & 0x07,
            boost_lf: (bytes[0] >> 3) & 0x03,
            boost_hf: bytes[0] & 0x03,
        })
    }
}

impl ToByteArray for Lna {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([((self.gain & 0x07) << 5) | ((self.boost_lf & 0x03) << 3) | (self.boost_hf & 0x03)])
    }
}

impl FromByteArray for Version {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self { value: bytes[0] })
    }
}
