//! Error types for tunedcopy.
//!
//! The copy path itself never fails; these cover configuration, registry
//! construction and the benchmark driver.

use thiserror::Error;

/// Crate error type.
#[derive(Error, Debug)]
pub enum Error {
    /// A tunable is out of its accepted range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Layered configuration could not be extracted.
    #[error("Configuration load error: {0}")]
    ConfigLoad(#[from] Box<figment::Error>),

    /// A registry needs at least one kernel to select from.
    #[error("Variant registry must contain at least one kernel")]
    EmptyRegistry,

    /// No kernel with this tag exists in the host catalogue.
    #[error("Unknown memcpy variant: {0}")]
    UnknownVariant(u32),

    /// Benchmark driver argument is out of range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Post-run validation found a byte that was not copied correctly.
    #[error("Incorrect result at offset {offset}: expected {expected:#04x}, found {found:#04x}")]
    Validation {
        /// Offset of the first mismatching byte.
        offset: usize,
        /// Byte the pattern requires.
        expected: u8,
        /// Byte actually present.
        found: u8,
    },
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
