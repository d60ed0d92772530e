//! Compression Error Types

use derive_more::{Display, Error};

/// A compression error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for compression operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The compressed stream is truncated or not in the expected format.
    #[display("corrupt compressed data")]
    Corrupt,
    /// A format name that isn't gzip, XZ or none.
    #[display("unsupported compression: {_0}")]
    Unsupported(#[error(not(source))] String),
    /// Reading the source or writing the destination failed.
    #[display("I/O error")]
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exn::ResultExt;

    #[test]
    fn test_only_io_is_retryable() {
        assert!(!ErrorKind::Corrupt.is_retryable());
        assert!(!ErrorKind::Unsupported("bz2".to_string()).is_retryable());
        assert!(ErrorKind::Io.is_retryable());
    }

    #[test]
    fn test_raise_keeps_kind() {
        let source = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short member");
        let err: Result<()> = Err(source).or_raise(|| ErrorKind::Corrupt);
        assert_eq!(*err.unwrap_err(), ErrorKind::Corrupt);
        assert_eq!(ErrorKind::Unsupported("zstd".to_string()).to_string(), "unsupported compression: zstd");
    }
}
