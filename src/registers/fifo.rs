//! FIFO related registers
//!
//! The LoRa modem shares a single 256 byte FIFO between transmit and receive.
//! Access goes through [`Fifo`] at the position held in [`FifoAddrPtr`],
//! which auto-increments on every data byte.
//!
//! # Important Notes
//! - The FIFO is only accessible in standby, sleep clears it
//! - The pointer must be repositioned before switching between a transmit
//!   and a receive access, the two paths share it
//! - After a reception the packet starts at [`FifoRxCurrentAddr`]

use core::convert::Infallible;

use regiface::{register, FromByteArray, ReadableRegister, ToByteArray, WritableRegister};

macro_rules! fifo_byte_register {
    ($(#[$meta:meta])* $name:ident, $field:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ReadableRegister, WritableRegister)]
        pub struct $name {
            #[allow(missing_docs)]
            pub $field: u8,
        }

        impl FromByteArray for $name {
            type Error = Infallible;
            type Array = [u8; 1];

            fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
                Ok(Self { $field: bytes[0] })
            }
        }

        impl ToByteArray for $name {
            type Error = Infallible;
            type Array = [u8; 1];

            fn to_bytes(self) -> Result<Self::Array, Self::Error> {
                Ok([self.$field])
            }
        }
    };
}

fifo_byte_register!(
    /// FIFO data register (address: 0x00)
    ///
    /// Single byte view. Bulk access is done with [`crate::Device::read_fifo`]
    /// and [`crate::Device::write_fifo`], which stream through this address.
    #[register(0x00u8)]
    Fifo,
    value
);

fifo_byte_register!(
    /// FIFO SPI pointer (address: 0x0D)
    #[register(0x0Du8)]
    FifoAddrPtr,
    address
);

fifo_byte_register!(
    /// Write base address in FIFO data buffer for the TX modulator (address: 0x0E)
    #[register(0x0Eu8)]
    FifoTxBaseAddr,
    address
);

fifo_byte_register!(
    /// Read base address in FIFO data buffer for the RX demodulator (address: 0x0F)
    #[register(0x0Fu8)]
    FifoRxBaseAddr,
    address
);

fifo_byte_register!(
    /// Start address of the last packet received (address: 0x10)
    ///
    /// Read-only.
    #[register(0x10u8)]
    FifoRxCurrentAddr,
    address
);

fifo_byte_register!(
    /// Number of payload bytes of the last packet received (address: 0x13)
    ///
    /// Only meaningful in explicit header mode.
    #[register(0x13u8)]
    RxNbBytes,
    count
);

fifo_byte_register!(
    /// Payload length (address: 0x22)
    ///
    /// # Important Notes
    /// - On transmit, the number of bytes queued for the next packet
    /// - On receive in implicit header mode, the expected payload length
    /// - Must not be zero when entering receive in implicit header mode
    #[register(0x22u8)]
    PayloadLength,
    length
);
