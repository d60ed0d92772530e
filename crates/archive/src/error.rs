//! Archive Error Types
//!
//! Container and writer failures. Compression failures keep the compress
//! crate's frame as a child of the archive frame.

use derive_more::{Display, Error};
use rekit_compress::error::{Error as CompressionError, ErrorKind as CompressionErrorKind};
use std::io::Error as IoError;
use std::path::{Path, PathBuf};

/// An archive error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for archive operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("no such file: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    #[display("permission denied: {}", _0.display())]
    PermissionDenied(#[error(not(source))] PathBuf),
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// A catalog name that would land outside the output root.
    #[display("invalid path: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
    /// A container that identified correctly but can't be read through.
    #[display("corrupt container: {}", _0.display())]
    Corrupt(#[error(not(source))] PathBuf),
    /// An output format recognised by name but without a writer.
    #[display("no writer for output format: {_0}")]
    UnsupportedFormat(#[error(not(source))] String),
    #[display("compression error: {_0}")]
    Compression(CompressionErrorKind),
    /// A format name, date or fingerprint that doesn't parse.
    #[display("invalid value: {_0}")]
    InvalidValue(#[error(not(source))] String),
}

impl ErrorKind {
    #[track_caller]
    pub fn compression(err: CompressionError) -> Error {
        let kind = (*err).clone();
        err.raise(ErrorKind::Compression(kind))
    }

    /// Classify an I/O failure on `path`.
    pub fn io(err: IoError, path: &Path) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
            _ => ErrorKind::Io(err),
        }
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_)) || matches!(self, Self::Compression(kind) if kind.is_retryable())
    }
}
