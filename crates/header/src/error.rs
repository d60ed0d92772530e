//! Header Error Types

use derive_more::{Display, Error};

/// A header transform error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for header operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input ended before the header did.
    #[display("input is {actual} bytes, shorter than the {expected}-byte header")]
    Truncated { expected: u64, actual: u64 },
    /// Reading the input or writing the output failed.
    #[display("I/O error during header transform")]
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Io)
    }
}
