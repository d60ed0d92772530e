//! TorrentGZ framing.
//!
//! A TorrentGZ file is a single gzip member with a fixed 40-byte header: no
//! timestamp, no file name, and one 28-byte `FEXTRA` field describing the
//! payload (MD5, CRC32, uncompressed size). Because the header is
//! deterministic, two tools compressing the same payload produce identical
//! files, and the payload's hashes can be read without inflating anything.
//!
//! ```text
//! 1F 8B 08 04 | 00 00 00 00 | 00 | 00 | 1C 00 | md5[16] | crc32 (BE) | size (LE u64)
//! ```

use crate::Compression;
use crate::error::{ErrorKind, Result};
use crate::codec::GZIP_LEVEL;
use exn::ResultExt;
use flate2::write::DeflateEncoder;
use std::io::{self, Read, Write};

/// Total header length, including the extra field.
pub const HEADER_LEN: usize = 40;
const PREFIX: [u8; 12] = [0x1F, 0x8B, 0x08, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x1C, 0x00];
const SHA1_HEX_LEN: usize = 40;

/// Payload description carried in a TorrentGZ header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TorrentGzipHeader {
    pub md5: [u8; 16],
    pub crc32: u32,
    pub size: u64,
}

impl TorrentGzipHeader {
    /// Parse a header from the leading bytes of a file. Returns `None` when
    /// the bytes are not a TorrentGZ header.
    #[must_use]
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < HEADER_LEN || bytes[..PREFIX.len()] != PREFIX {
            return None;
        }
        let extra = &bytes[PREFIX.len()..HEADER_LEN];
        let md5 = extra[..16].try_into().ok()?;
        let crc32 = u32::from_be_bytes(extra[16..20].try_into().ok()?);
        let size = u64::from_le_bytes(extra[20..28].try_into().ok()?);
        Some(Self { md5, crc32, size })
    }

    /// Read and parse the header from the start of `reader`.
    ///
    /// Short input is not an error; it simply isn't a TorrentGZ file.
    pub fn read_from<R: Read>(reader: R) -> Result<Option<Self>> {
        let mut head = Vec::with_capacity(HEADER_LEN);
        reader.take(HEADER_LEN as u64).read_to_end(&mut head).or_raise(|| ErrorKind::Io)?;
        Ok(Self::parse(&head))
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[..PREFIX.len()].copy_from_slice(&PREFIX);
        bytes[12..28].copy_from_slice(&self.md5);
        bytes[28..32].copy_from_slice(&self.crc32.to_be_bytes());
        bytes[32..40].copy_from_slice(&self.size.to_le_bytes());
        bytes
    }

    /// Write a complete TorrentGZ member: this header, an already-deflated
    /// body, then the standard gzip trailer.
    ///
    /// Returns the number of bytes written.
    pub fn write_member<B: Read, W: Write>(&self, mut deflated: B, mut writer: W) -> Result<u64> {
        writer.write_all(&self.to_bytes()).or_raise(|| ErrorKind::Io)?;
        let body = io::copy(&mut deflated, &mut writer).or_raise(|| ErrorKind::Io)?;
        writer.write_all(&self.crc32.to_le_bytes()).or_raise(|| ErrorKind::Io)?;
        // ISIZE is the payload size modulo 2^32.
        writer.write_all(&(self.size as u32).to_le_bytes()).or_raise(|| ErrorKind::Io)?;
        writer.flush().or_raise(|| ErrorKind::Io)?;
        Ok(HEADER_LEN as u64 + body + 8)
    }
}

/// Raw-deflate everything from `reader` into `writer` at the best level,
/// producing the body of a TorrentGZ member.
///
/// Returns the number of uncompressed bytes consumed and the writer.
pub fn deflate_stream<R: Read, W: Write>(mut reader: R, writer: W) -> Result<(u64, W)> {
    let mut encoder = DeflateEncoder::new(writer, GZIP_LEVEL);
    let size = io::copy(&mut reader, &mut encoder).or_raise(|| ErrorKind::Io)?;
    Ok((size, encoder.finish().or_raise(|| ErrorKind::Io)?))
}

/// Whether a file name has the canonical depot form: 40 lowercase hex
/// characters followed by the format's extension.
#[must_use]
pub fn is_torrent_file_name(file_name: &str, format: Compression) -> bool {
    let ext = format.extension();
    if ext.is_empty() || file_name.len() != SHA1_HEX_LEN + ext.len() || !file_name.ends_with(ext) {
        return false;
    }
    file_name[..SHA1_HEX_LEN].bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// The SHA1 a canonical depot file name encodes, if it has one.
#[must_use]
pub fn sha1_from_file_name(file_name: &str, format: Compression) -> Option<&str> {
    is_torrent_file_name(file_name, format).then(|| &file_name[..SHA1_HEX_LEN])
}
