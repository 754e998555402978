//! Driver error type

use regiface::errors::Error as RegifaceError;

/// Errors reported by the transceiver driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// SPI communication failed
    Bus,
    /// A register value could not be decoded
    Deserialization,
    /// A GPIO operation on the reset, LED or interrupt pin failed
    Pin,
    /// The version register did not hold the expected silicon id.
    /// Usually a wiring fault or a different chip on the bus
    VersionMismatch(u8),
    /// The carrier frequency (Hz) is not one of the supported channels
    UnsupportedFrequency(u32),
    /// The chip did not report TX done within the transmit bound
    TxTimeout,
    /// No RxDone interrupt line is available to wait on
    NotArmed,
    /// Nothing is installed in the [`crate::Shared`] handle
    NotInstalled,
}

impl From<RegifaceError> for Error {
    fn from(err: RegifaceError) -> Self {
        match err {
            RegifaceError::BusError => Error::Bus,
            _ => Error::Deserialization,
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Bus => write!(f, "SPI bus error"),
            Error::Deserialization => write!(f, "invalid register value"),
            Error::Pin => write!(f, "GPIO error"),
            Error::VersionMismatch(version) => {
                write!(f, "unexpected chip version 0x{version:02x}")
            }
            Error::UnsupportedFrequency(hz) => write!(f, "unsupported frequency {hz} Hz"),
            Error::TxTimeout => write!(f, "transmission timed out"),
            Error::NotArmed => write!(f, "no RxDone interrupt line"),
            Error::NotInstalled => write!(f, "shared radio not installed"),
        }
    }
}
