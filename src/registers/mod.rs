//! Register definitions for the SX127x LoRa modem
//! Generated from the SX1276/77/78/79 datasheet, rev. 7
//!
//! Every register has a 7-bit address. A read sends the address with bit 7
//! clear, a write sends it with bit 7 set followed by the value.

mod common;
mod fifo;
mod irq;
mod modem;

pub use common::*;
pub use fifo::*;
pub use irq::*;
pub use modem::*;
