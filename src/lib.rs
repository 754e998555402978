#![no_std]
//! SX127x LoRa Radio Driver
//!
//! This crate provides a type-safe interface for the Semtech SX1276/77/78/79
//! LoRa transceivers, as found on HopeRF RFM95/96/98 and similar modules.
//!
//! # Features
//! - Supported channels: 169, 433, 434, 866, 868 and 915 MHz
//! - LoRa: SF6-12, BW 7.8-500kHz, CR 4/5-4/8
//! - Output power on the RFO or PA_BOOST path
//! - Blocking transmission with a bounded wait
//! - Continuous receive with interrupt driven dispatch, or polled single receive
//! - Packet RSSI and SNR
//!
//! # Architecture
//! The driver is organized into several modules:
//!
//! - [`registers`]: Typed register map built on `regiface`
//! - [`device`]: Register and FIFO access over an `embedded-hal` SPI device
//! - [`config`]: Modulation parameters and their register encodings
//! - [`radio`]: The [`Sx127x`] transceiver driver
//! - [`dispatch`]: Delivery of received packets from the RxDone interrupt
//! - [`binding`]: Board capabilities not covered by `embedded-hal`
//!
//! # Usage
//! Bring-up follows a fixed sequence:
//!
//! 1. Build a [`Config`] for the channel and modulation in use
//! 2. Create an [`Sx127x`] from the SPI device, reset pin and a delay
//! 3. Pulse reset, then call [`Sx127x::init`]
//! 4. Send with [`Sx127x::send`], or arm reception with
//!    [`ReceiveDispatcher::on_receive`] and [`Sx127x::receive`]
//!
//! # Important Notes
//! - The operating mode is always read back from the chip
//! - Transmit and receive share the FIFO, the driver rewinds the FIFO
//!   pointer before every transfer
//! - Only the RxDone interrupt line is used
//!
//! # Example
//! ```no_run
//! use embedded_hal::{delay::DelayNs, digital::OutputPin, spi::SpiDevice};
//! use sx127x::{Config, Error, Sx127x};
//!
//! fn bring_up<SPI, RESET, DELAY>(
//!     spi: SPI,
//!     reset: RESET,
//!     delay: DELAY,
//! ) -> Result<Sx127x<SPI, RESET, DELAY>, Error>
//! where
//!     SPI: SpiDevice,
//!     RESET: OutputPin,
//!     DELAY: DelayNs,
//! {
//!     let mut radio = Sx127x::new(spi, reset, delay, Config::new(915_000_000));
//!     radio.reset()?;
//!     radio.init()?;
//!
//!     Ok(radio)
//! }
//! ```

pub use regiface::errors::Error as RegisterError;

pub mod binding;
pub mod config;
pub mod device;
pub mod dispatch;
pub mod error;
pub mod radio;
pub mod registers;

pub use binding::{DioLines, InterruptPin, Led};
pub use config::{Config, PaOutput};
pub use device::Device;
pub use dispatch::{DispatchStats, ReceiveDispatcher, RxSignal, Shared};
pub use error::Error;
pub use radio::Sx127x;
pub use registers::*;
