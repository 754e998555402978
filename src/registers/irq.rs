//! Interrupt related registers
//!
//! The LoRa modem raises eight interrupt sources. Each one latches a bit in
//! [`IrqFlags`] and can be routed to one of the DIO pins through
//! [`DioMapping1`].
//!
//! Flags are cleared by writing a one to the corresponding bit.

use bitflags::bitflags;
use core::convert::Infallible;

use regiface::{register, FromByteArray, ReadableRegister, ToByteArray, WritableRegister};

bitflags! {
    /// LoRa interrupt sources
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Irq: u8 {
        /// Timeout in single receive mode
        const RX_TIMEOUT = 1 << 7;
        /// Packet reception complete
        const RX_DONE = 1 << 6;
        /// Payload CRC mismatch
        const PAYLOAD_CRC_ERROR = 1 << 5;
        /// Valid header received in receive mode
        const VALID_HEADER = 1 << 4;
        /// Packet transmission complete
        const TX_DONE = 1 << 3;
        /// Channel activity detection finished
        const CAD_DONE = 1 << 2;
        /// Frequency hop requested
        const FHSS_CHANGE_CHANNEL = 1 << 1;
        /// Channel activity detected during CAD
        const CAD_DETECTED = 1;
    }
}

/// IRQ flags (address: 0x12)
///
/// # Important Notes
/// - Writing a set bit clears that flag, writing the value just read
///   clears exactly the flags that were observed
/// - A successful reception in single receive mode leaves only
///   [`Irq::RX_DONE`] set
#[register(0x12u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct IrqFlags {
    #[allow(missing_docs)]
    pub flags: Irq,
}

/// DIO mapping 1 (address: 0x40)
///
/// Two bits per pin, DIO0 in bits 7:6 through DIO3 in bits 1:0.
///
/// # LoRa Mapping 00
/// - DIO0: RxDone
/// - DIO1: RxTimeout
/// - DIO2: FhssChangeChannel
/// - DIO3: CadDone
#[register(0x40u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ReadableRegister, WritableRegister)]
pub struct DioMapping1 {
    #[allow(missing_docs)]
    pub dio0: u8,
    #[allow(missing_docs)]
    pub dio1: u8,
    #[allow(missing_docs)]
    pub dio2: u8,
    #[allow(missing_docs)]
    pub dio3: u8,
}

impl FromByteArray for IrqFlags {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            flags: Irq::from_bits_retain(bytes[0]),
        })
    }
}

impl ToByteArray for IrqFlags {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.flags.bits()])
    }
}

impl FromByteArray for DioMapping1 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            dio0: bytes[0] >> 6,
            dio1: (bytes[0] >> 4) & 0x03,
            dio2: (bytes[0] >> 2) & 0x03,
            dio3: bytes[0] & 0x03,
        })
    }
}

impl ToByteArray for DioMapping1 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([((self.dio0 & 0x03) << 6)
            | ((self.dio1 & 0x03) << 4)
            | ((self.dio2 & 0x03) << 2)
            | (self.dio3 & 0x03)])
    }
}
