//! Disk and media images that record their own identity.
//!
//! A CHD header carries the MD5 and/or SHA1 of the uncompressed disk, and an
//! AaruFormat image keeps a checksum block for the media it holds. Catalogs
//! list those hashes, never hashes of the image file itself.

use crate::entry::{AARU_MAGIC, CHD_MAGIC, DIC_MAGIC};
use crate::error::{ErrorKind, Result};
use rekit_catalog::{HashKind, Hashes, ItemKind};
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::ops::Range;
use std::path::Path;

/// Longest CHD header (v5).
const CHD_HEADER_LEN: usize = 124;
/// Identifier, application name, four version bytes and the media type.
const AARU_INDEX_POINTER: u64 = 80;
const AARU_INDEX: &[u8; 4] = b"INDX";
const AARU_INDEX2: &[u8; 4] = b"IDX2";
const AARU_CHECKSUMS: &[u8; 4] = b"CKSM";
const AARU_MAX_CHECKSUM_LEN: u32 = 1024;

/// The hashes an image declares for its content.
///
/// `None` for kinds other than [`ItemKind::Disk`] and [`ItemKind::Media`],
/// for header versions not understood here, and for truncated images or
/// images that declare nothing.
///
/// # Errors
/// I/O failures other than running out of bytes.
pub fn declared_hashes(path: &Path, kind: ItemKind) -> Result<Option<Hashes>> {
    if !matches!(kind, ItemKind::Disk | ItemKind::Media) {
        return Ok(None);
    }
    let file = File::open(path).map_err(|e| ErrorKind::io(e, path))?;
    let mut reader = BufReader::new(file);
    let found = match kind {
        ItemKind::Disk => {
            let mut header = Vec::with_capacity(CHD_HEADER_LEN);
            reader.take(CHD_HEADER_LEN as u64).read_to_end(&mut header).map(|_| chd_hashes(&header))
        },
        _ => aaru_hashes(&mut reader),
    };
    match found {
        Ok(hashes) => Ok(hashes),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => exn::bail!(ErrorKind::io(e, path)),
    }
}

/// MD5 and SHA1 from a CHD header, by version:
///
/// | version | MD5    | SHA1    |
/// |---------|--------|---------|
/// | 1, 2    | 44..60 |         |
/// | 3       | 44..60 | 80..100 |
/// | 4       |        | 48..68  |
/// | 5       |        | 84..104 |
fn chd_hashes(header: &[u8]) -> Option<Hashes> {
    if !header.starts_with(CHD_MAGIC) {
        return None;
    }
    let version = u32::from_be_bytes(header.get(12..16)?.try_into().ok()?);
    let (md5, sha1): (Option<Range<usize>>, Option<Range<usize>>) = match version {
        1 | 2 => (Some(44..60), None),
        3 => (Some(44..60), Some(80..100)),
        4 => (None, Some(48..68)),
        5 => (None, Some(84..104)),
        _ => return None,
    };
    let mut hashes = Hashes::new();
    for (kind, range) in [(HashKind::Md5, md5), (HashKind::Sha1, sha1)] {
        // All zeroes: the image was never finalised.
        if let Some(bytes) = range.and_then(|range| header.get(range))
            && bytes.iter().any(|byte| *byte != 0)
        {
            hashes.set(kind, hex::encode(bytes));
        }
    }
    (!hashes.is_empty()).then_some(hashes)
}

/// MD5, SHA1 and SHA256 from the checksum block an AaruFormat index points
/// at. Integers are little-endian.
fn aaru_hashes<R: Read + Seek>(reader: &mut R) -> io::Result<Option<Hashes>> {
    let magic: [u8; 8] = read_array(reader)?;
    if &magic[..] != AARU_MAGIC && &magic[..] != DIC_MAGIC {
        return Ok(None);
    }
    reader.seek(SeekFrom::Start(AARU_INDEX_POINTER))?;
    let index = u64::from_le_bytes(read_array(reader)?);

    reader.seek(SeekFrom::Start(index))?;
    let tag: [u8; 4] = read_array(reader)?;
    let entries = match &tag {
        AARU_INDEX => u64::from(u16::from_le_bytes(read_array(reader)?)),
        AARU_INDEX2 => u64::from_le_bytes(read_array(reader)?),
        _ => return Ok(None),
    };
    let _crc64: [u8; 8] = read_array(reader)?;

    let mut checksums = None;
    for _ in 0..entries {
        let block: [u8; 4] = read_array(reader)?;
        let _data_type: [u8; 2] = read_array(reader)?;
        let offset = u64::from_le_bytes(read_array(reader)?);
        if &block == AARU_CHECKSUMS {
            checksums = Some(offset);
            break;
        }
    }
    let Some(offset) = checksums else {
        return Ok(None);
    };

    reader.seek(SeekFrom::Start(offset))?;
    if &read_array::<4>(reader)? != AARU_CHECKSUMS {
        return Ok(None);
    }
    let _length: [u8; 4] = read_array(reader)?;
    let [count] = read_array::<1>(reader)?;
    let mut hashes = Hashes::new();
    for _ in 0..count {
        let [algorithm] = read_array::<1>(reader)?;
        let length = u32::from_le_bytes(read_array(reader)?);
        if length > AARU_MAX_CHECKSUM_LEN {
            return Ok(None);
        }
        let mut value = vec![0u8; length as usize];
        reader.read_exact(&mut value)?;
        let kind = match algorithm {
            1 => HashKind::Md5,
            2 => HashKind::Sha1,
            3 => HashKind::Sha256,
            // SpamSum and anything newer.
            _ => continue,
        };
        hashes.set(kind, hex::encode(&value));
    }
    Ok((!hashes.is_empty()).then_some(hashes))
}

fn read_array<const N: usize>(reader: &mut impl Read) -> io::Result<[u8; N]> {
    let mut buffer = [0u8; N];
    reader.read_exact(&mut buffer)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Cursor;

    const MD5: [u8; 16] = [0x11; 16];
    const SHA1: [u8; 20] = [0x22; 20];

    fn chd_header(version: u32) -> Vec<u8> {
        let mut header = vec![0u8; CHD_HEADER_LEN];
        header[..8].copy_from_slice(CHD_MAGIC);
        header[12..16].copy_from_slice(&version.to_be_bytes());
        match version {
            3 => {
                header[44..60].copy_from_slice(&MD5);
                header[80..100].copy_from_slice(&SHA1);
            },
            4 => header[48..68].copy_from_slice(&SHA1),
            5 => header[84..104].copy_from_slice(&SHA1),
            _ => header[44..60].copy_from_slice(&MD5),
        }
        header
    }

    fn aaru_image(checksums: &[(u8, &[u8])]) -> Vec<u8> {
        let mut image = vec![0u8; 104];
        image[..8].copy_from_slice(AARU_MAGIC);
        image[AARU_INDEX_POINTER as usize..88].copy_from_slice(&400u64.to_le_bytes());
        image.resize(150, 0xEE);

        // Checksum block at 150, index at 400.
        image.extend_from_slice(AARU_CHECKSUMS);
        image.extend_from_slice(&0u32.to_le_bytes());
        image.push(checksums.len() as u8);
        for (algorithm, value) in checksums {
            image.push(*algorithm);
            image.extend_from_slice(&(value.len() as u32).to_le_bytes());
            image.extend_from_slice(value);
        }
        image.resize(400, 0);
        image.extend_from_slice(AARU_INDEX);
        image.extend_from_slice(&2u16.to_le_bytes());
        image.extend_from_slice(&[0u8; 8]);
        for (block, offset) in [(b"DBLK", 120u64), (AARU_CHECKSUMS, 150u64)] {
            image.extend_from_slice(block);
            image.extend_from_slice(&[0u8; 2]);
            image.extend_from_slice(&offset.to_le_bytes());
        }
        image
    }

    #[rstest]
    #[case(1, Some(hex::encode(MD5)), None)]
    #[case(3, Some(hex::encode(MD5)), Some(hex::encode(SHA1)))]
    #[case(4, None, Some(hex::encode(SHA1)))]
    #[case(5, None, Some(hex::encode(SHA1)))]
    fn test_chd_versions(#[case] version: u32, #[case] md5: Option<String>, #[case] sha1: Option<String>) {
        let hashes = chd_hashes(&chd_header(version)).unwrap();
        assert_eq!(hashes.get(HashKind::Md5), md5.as_deref());
        assert_eq!(hashes.get(HashKind::Sha1), sha1.as_deref());
    }

    #[test]
    fn test_chd_unknown_or_unfinished() {
        let mut future = chd_header(5);
        future[12..16].copy_from_slice(&6u32.to_be_bytes());
        assert_eq!(chd_hashes(&future), None);

        let mut blank = chd_header(5);
        blank[84..104].fill(0);
        assert_eq!(chd_hashes(&blank), None);
        assert_eq!(chd_hashes(b"MComprHD"), None);
    }

    #[test]
    fn test_aaru_checksum_block() {
        let sha256 = [0x33u8; 32];
        let image = aaru_image(&[(2, &SHA1), (4, b"3:abc:def"), (1, &MD5), (3, &sha256)]);
        let hashes = aaru_hashes(&mut Cursor::new(image)).unwrap().unwrap();
        assert_eq!(hashes.get(HashKind::Md5), Some(hex::encode(MD5).as_str()));
        assert_eq!(hashes.get(HashKind::Sha1), Some(hex::encode(SHA1).as_str()));
        assert_eq!(hashes.get(HashKind::Sha256), Some(hex::encode(sha256).as_str()));
    }

    #[test]
    fn test_aaru_without_checksums() {
        let mut image = aaru_image(&[]);
        assert_eq!(aaru_hashes(&mut Cursor::new(image.clone())).unwrap(), None);
        image.truncate(410);
        let err = aaru_hashes(&mut Cursor::new(image)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_declared_hashes_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disc.chd");
        let mut image = chd_header(5);
        image.extend_from_slice(b"compressed hunks");
        std::fs::write(&path, &image).unwrap();

        let hashes = declared_hashes(&path, ItemKind::Disk).unwrap().unwrap();
        assert_eq!(hashes.get(HashKind::Sha1), Some(hex::encode(SHA1).as_str()));
        assert_eq!(declared_hashes(&path, ItemKind::Rom).unwrap(), None);

        std::fs::write(&path, &image[..40]).unwrap();
        assert_eq!(declared_hashes(&path, ItemKind::Disk).unwrap(), None);
    }
}
