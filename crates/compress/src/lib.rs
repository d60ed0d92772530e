//! # Rekit Compress
//!
//! The two codecs depot files are stored with, gzip and XZ, behind one
//! [`Compression`] enum:
//!
//! - naming and detection (extensions, configuration names, magic bytes);
//! - streaming encode/decode ([`Compression::compress_stream`],
//!   [`Compression::wrap_reader`]);
//! - [`PeekableReader`], to sniff a copier header or a container signature
//!   before deciding how to read the rest;
//! - [`torrent`], the deterministic gzip framing whose header carries the
//!   payload's MD5, CRC32 and size.
//!
//! Encoders always run at the highest level: depot files are written once
//! and read many times.

mod codec;
pub mod error;
mod format;
mod peekable;
pub mod torrent;

pub use crate::peekable::PeekableReader;

/// How a single-entry file is compressed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Compression {
    /// Stored as-is.
    #[default]
    None,
    /// `.gz`
    Gzip,
    /// `.xz`
    Xz,
}
