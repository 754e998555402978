//! SX127x Register Interface
//!
//! This module provides the wire protocol used to talk to SX127x series
//! radios over SPI. Every access is a single SPI transaction made of:
//! - One address byte, bit 7 clear for a read and set for a write
//! - One or more data bytes
//!
//! Multi-byte accesses rely on the chip's burst mode: the address
//! auto-increments after each data byte, except for the FIFO register
//! which streams through the FIFO buffer instead.
//!
//! The interface is built around the `Device<SPI>` struct which wraps an
//! [`embedded_hal::spi::SpiDevice`]. Chip select is driven by the
//! `SpiDevice` implementation for the duration of each transaction.
//!
//! # Example
//! ```no_run
//! use sx127x::{Device, Version};
//!
//! # fn example<SPI: embedded_hal::spi::SpiDevice>(spi: SPI) -> Result<(), sx127x::RegisterError> {
//! let mut device = Device::new(spi);
//!
//! // Read a register
//! let version: Version = device.read_register()?;
//!
//! // Write to the FIFO at the current pointer
//! device.write_fifo(&[0x01, 0x02, 0x03])?;
//! # Ok(())
//! # }
//! ```

use core::convert::Infallible;

use embedded_hal::spi::{Operation, SpiDevice};
use regiface::{
    errors::Error as RegifaceError, ByteArray, ReadableRegister, Register, WritableRegister,
};

use crate::registers::Fifo;

/// Address bit selecting a write access.
const WRITE_ACCESS: u8 = 0x80;

/// Main register interface for the SX127x radio.
///
/// This struct wraps an SPI device and provides typed register access
/// together with bulk FIFO transfers.
pub struct Device<SPI> {
    spi: SPI,
}

impl<SPI> Device<SPI> {
    /// Creates a new Device instance wrapping the provided SPI device.
    ///
    /// # Arguments
    /// * `spi` - An SPI device implementing the embedded-hal `SpiDevice` trait
    pub fn new(spi: SPI) -> Self {
        Self { spi }
    }

    /// Releases the underlying SPI device.
    ///
    /// This method consumes the Device instance and returns the wrapped SPI interface.
    pub fn release(self) -> SPI {
        self.spi
    }
}

impl<SPI> Device<SPI>
where
    SPI: SpiDevice,
{
    /// Reads a register value from the device.
    ///
    /// # Type Parameters
    /// * `R` - Register type implementing ReadableRegister with a u8 address
    ///
    /// # Errors
    /// * `RegifaceError::BusError` - SPI communication failed
    /// * `RegifaceError::DeserializationError` - Failed to parse register value
    pub fn read_register<R>(&mut self) -> Result<R, RegifaceError>
    where
        R: ReadableRegister<IdType = u8>,
    {
        let mut raw_value = R::Array::new();

        self.spi
            .transaction(&mut [
                Operation::Write(&[R::id() & !WRITE_ACCESS]),
                Operation::Read(raw_value.as_mut()),
            ])
            .map_err(|_| RegifaceError::BusError)?;

        R::from_bytes(raw_value).map_err(|_| RegifaceError::DeserializationError)
    }

    /// Writes a value to a device register.
    ///
    /// # Type Parameters
    /// * `R` - Register type implementing WritableRegister with a u8 address
    ///
    /// # Arguments
    /// * `register` - The register value to write
    ///
    /// # Errors
    /// * `RegifaceError::BusError` - SPI communication failed
    pub fn write_register<R>(&mut self, register: R) -> Result<(), RegifaceError>
    where
        R: WritableRegister<IdType = u8, Error = Infallible>,
    {
        let raw_value = match register.to_bytes() {
            Ok(raw_value) => raw_value,
            Err(never) => match never {},
        };

        self.spi
            .transaction(&mut [
                Operation::Write(&[R::id() | WRITE_ACCESS]),
                Operation::Write(raw_value.as_ref()),
            ])
            .map_err(|_| RegifaceError::BusError)
    }

    /// Reads a register, lets `f` modify it and writes the result back.
    ///
    /// The two accesses are separate transactions; callers sharing the
    /// device between contexts must hold their lock across the call.
    pub fn modify_register<R, F>(&mut self, f: F) -> Result<R, RegifaceError>
    where
        R: ReadableRegister<IdType = u8> + WritableRegister<IdType = u8, Error = Infallible> + Copy,
        F: FnOnce(&mut R),
    {
        let mut register: R = self.read_register()?;
        f(&mut register);
        self.write_register(register)?;
        Ok(register)
    }

    /// Writes bytes to the FIFO at the current FIFO pointer.
    ///
    /// The chip advances the pointer by `bytes.len()`.
    ///
    /// # Errors
    /// * `RegifaceError::BusError` - SPI communication failed
    pub fn write_fifo(&mut self, bytes: &[u8]) -> Result<(), RegifaceError> {
        if bytes.is_empty() {
            return Ok(());
        }

        self.spi
            .transaction(&mut [
                Operation::Write(&[Fifo::id() | WRITE_ACCESS]),
                Operation::Write(bytes),
            ])
            .map_err(|_| RegifaceError::BusError)
    }

    /// Reads bytes from the FIFO starting at the current FIFO pointer.
    ///
    /// # Errors
    /// * `RegifaceError::BusError` - SPI communication failed
    pub fn read_fifo(&mut self, bytes: &mut [u8]) -> Result<(), RegifaceError> {
        if bytes.is_empty() {
            return Ok(());
        }

        self.spi
            .transaction(&mut [
                Operation::Write(&[Fifo::id() & !WRITE_ACCESS]),
                Operation::Read(bytes),
            ])
            .map_err(|_| RegifaceError::BusError)
    }
}
