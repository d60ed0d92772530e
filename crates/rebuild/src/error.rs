//! Rebuild Error Types
//!
//! Most failures during a rebuild are confined to one key, file or item and
//! are logged where they happen. Only the variants that can escape a
//! per-entry step live here.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A rebuild error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for rebuild operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The output root does not exist and could not be created.
    #[display("cannot create output directory: {}", _0.display())]
    OutputRoot(#[error(not(source))] PathBuf),
    /// An entry's bytes could not be read or spooled.
    #[display("entry content unavailable")]
    Source,
    /// Content could not be hashed.
    #[display("hashing failed")]
    Hash,
    /// An output container failed to write an item.
    #[display("writing output failed")]
    Write,
    /// A header could not be stripped.
    #[display("header transform failed")]
    Header,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Source | ErrorKind::Write)
    }
}
