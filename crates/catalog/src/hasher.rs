//! Streaming content hashing.

use crate::error::{ErrorKind, Result};
use crate::hashes::{HashKind, Hashes};
use exn::ResultExt;
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};
use std::io::{self, Read};
use tracing::instrument;

const BUFFER_SIZE: usize = 64 * 1024;

/// How many hash kinds to compute while reading content.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HashLevel {
    /// CRC32 only; the quick-scan mode.
    CrcOnly,
    /// CRC32, MD5 and SHA1.
    #[default]
    Standard,
    /// Every supported kind.
    All,
}

impl HashLevel {
    #[must_use]
    pub fn includes(&self, kind: HashKind) -> bool {
        match self {
            HashLevel::CrcOnly => kind == HashKind::Crc,
            HashLevel::Standard => matches!(kind, HashKind::Crc | HashKind::Md5 | HashKind::Sha1),
            HashLevel::All => true,
        }
    }

    /// Pick the level for a scan, honouring the quick-scan flag.
    #[must_use]
    pub fn for_scan(quick: bool) -> Self {
        match quick {
            true => HashLevel::CrcOnly,
            false => HashLevel::Standard,
        }
    }
}

/// Size and hashes of a stream of content.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Fingerprint {
    pub size: u64,
    pub hashes: Hashes,
}

/// A [`Read`] adapter that hashes everything passing through it.
///
/// Wrap a source before handing it to an encoder to learn the content's
/// identity in the same pass as writing it.
pub struct HashingReader<R> {
    inner: R,
    size: u64,
    crc: crc32fast::Hasher,
    md5: Option<Md5>,
    sha1: Option<Sha1>,
    sha256: Option<Sha256>,
    sha384: Option<Sha384>,
    sha512: Option<Sha512>,
}

impl<R: Read> HashingReader<R> {
    pub fn new(inner: R, level: HashLevel) -> Self {
        Self {
            inner,
            size: 0,
            crc: crc32fast::Hasher::new(),
            md5: level.includes(HashKind::Md5).then(Md5::new),
            sha1: level.includes(HashKind::Sha1).then(Sha1::new),
            sha256: level.includes(HashKind::Sha256).then(Sha256::new),
            sha384: level.includes(HashKind::Sha384).then(Sha384::new),
            sha512: level.includes(HashKind::Sha512).then(Sha512::new),
        }
    }

    /// Bytes read through the adapter so far.
    pub fn bytes_read(&self) -> u64 {
        self.size
    }

    /// Stop hashing and produce the fingerprint of everything read so far.
    pub fn finish(self) -> Fingerprint {
        let mut hashes = Hashes::new().with(HashKind::Crc, format!("{:08x}", self.crc.finalize()));
        if let Some(h) = self.md5 {
            hashes.set(HashKind::Md5, hex::encode(h.finalize()));
        }
        if let Some(h) = self.sha1 {
            hashes.set(HashKind::Sha1, hex::encode(h.finalize()));
        }
        if let Some(h) = self.sha256 {
            hashes.set(HashKind::Sha256, hex::encode(h.finalize()));
        }
        if let Some(h) = self.sha384 {
            hashes.set(HashKind::Sha384, hex::encode(h.finalize()));
        }
        if let Some(h) = self.sha512 {
            hashes.set(HashKind::Sha512, hex::encode(h.finalize()));
        }
        Fingerprint { size: self.size, hashes }
    }

    fn update(&mut self, data: &[u8]) {
        self.size += data.len() as u64;
        self.crc.update(data);
        if let Some(h) = self.md5.as_mut() {
            h.update(data);
        }
        if let Some(h) = self.sha1.as_mut() {
            h.update(data);
        }
        if let Some(h) = self.sha256.as_mut() {
            h.update(data);
        }
        if let Some(h) = self.sha384.as_mut() {
            h.update(data);
        }
        if let Some(h) = self.sha512.as_mut() {
            h.update(data);
        }
    }
}

impl<R: Read> Read for HashingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.update(&buf[..n]);
        Ok(n)
    }
}

/// Hash a reader to exhaustion.
#[instrument(level = "debug", skip(reader), fields(size))]
pub fn fingerprint<R: Read>(reader: R, level: HashLevel) -> Result<Fingerprint> {
    let mut hashing = HashingReader::new(reader, level);
    let mut buffer = vec![0u8; BUFFER_SIZE];
    loop {
        let n = hashing.read(&mut buffer).or_raise(|| ErrorKind::Io)?;
        if n == 0 {
            break;
        }
    }
    let fingerprint = hashing.finish();
    tracing::Span::current().record("size", fingerprint.size);
    Ok(fingerprint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const EMPTY_MD5: &str = "d41d8cd98f00b204e9800998ecf8427e";
    const EMPTY_SHA1: &str = "da39a3ee5e6b4b0d3255bfef95601890afd80709";

    #[test]
    fn test_fingerprint_empty() {
        let fp = fingerprint(io::empty(), HashLevel::Standard).unwrap();
        assert_eq!(fp.size, 0);
        assert_eq!(fp.hashes.get(HashKind::Crc), Some("00000000"));
        assert_eq!(fp.hashes.get(HashKind::Md5), Some(EMPTY_MD5));
        assert_eq!(fp.hashes.get(HashKind::Sha1), Some(EMPTY_SHA1));
        assert_eq!(fp.hashes.get(HashKind::Sha256), None);
    }

    #[test]
    fn test_fingerprint_known_value() {
        let fp = fingerprint(&b"123456789"[..], HashLevel::All).unwrap();
        assert_eq!(fp.size, 9);
        assert_eq!(fp.hashes.get(HashKind::Crc), Some("cbf43926"));
        assert_eq!(fp.hashes.get(HashKind::Sha1), Some("f7c3bc1d808e04732adf679965ccc34ca7ae3441"));
        assert_eq!(
            fp.hashes.get(HashKind::Sha256),
            Some("15e2b0d3c33891ebb0f1ef609ec419420c20e320ce94c65fbc8c3312448eb225")
        );
        assert!(fp.hashes.get(HashKind::Sha512).is_some());
    }

    #[rstest]
    #[case(HashLevel::CrcOnly, &[HashKind::Crc])]
    #[case(HashLevel::Standard, &[HashKind::Crc, HashKind::Md5, HashKind::Sha1])]
    #[case(HashLevel::All, &HashKind::ALL)]
    fn test_level_kinds(#[case] level: HashLevel, #[case] expected: &[HashKind]) {
        let fp = fingerprint(&b"rom"[..], level).unwrap();
        assert_eq!(fp.hashes.iter().map(|(kind, _)| kind).collect::<Vec<_>>(), expected);
    }

    #[test]
    fn test_hashing_reader_passthrough() {
        let mut reader = HashingReader::new(&b"passthrough"[..], HashLevel::CrcOnly);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"passthrough");
        assert_eq!(reader.bytes_read(), 11);
        assert_eq!(reader.finish().size, 11);
    }
}
