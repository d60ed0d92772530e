//! Configuration Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// An explicitly requested configuration file does not exist.
    #[display("configuration file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// The configuration file's extension names no known format.
    #[display("unsupported configuration format: {_0}")]
    UnsupportedFormat(#[error(not(source))] String),
    /// A source could not be parsed, or a value has the wrong type.
    #[display("could not load configuration")]
    Load,
    /// A value parsed but is out of range or unknown.
    #[display("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ErrorKind {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ErrorKind::Invalid { field, reason: reason.into() }
    }

    /// Configuration never fixes itself; nothing here is retryable.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
