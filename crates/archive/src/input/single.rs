//! Single-entry compressed files (gzip and XZ).

use super::{Archive, ContainerKind};
use crate::entry::EntryInfo;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use rekit_catalog::{Fingerprint, HashKind, HashLevel, Hashes, fingerprint};
use rekit_compress::Compression;
use rekit_compress::torrent::{self, HEADER_LEN, TorrentGzipHeader};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::instrument;

/// A gzip or XZ file holding exactly one payload.
///
/// The entry is named after the file, minus the compression extension. When
/// the file is in torrent form, its entry is named after the payload SHA1.
#[derive(Clone, Debug)]
pub struct SingleFileArchive {
    path: PathBuf,
    compression: Compression,
}

impl SingleFileArchive {
    pub fn new(path: impl AsRef<Path>, compression: Compression) -> Self {
        Self { path: path.as_ref().to_path_buf(), compression }
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    fn file_name(&self) -> &str {
        self.path.file_name().and_then(|name| name.to_str()).unwrap_or_default()
    }

    fn entry_name(&self) -> &str {
        self.compression.strip_extension(self.file_name())
    }

    fn open_file(&self) -> Result<File> {
        Ok(File::open(&self.path).map_err(|e| ErrorKind::io(e, &self.path))?)
    }

    /// Gzip files describe their payload in the header, so nothing is
    /// inflated. XZ files carry no such header: the payload is hashed and
    /// must reproduce the SHA1 in the file name.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn read_torrent_info(&self) -> Result<Option<EntryInfo>> {
        let Some(sha1) = torrent::sha1_from_file_name(self.file_name(), self.compression) else {
            return Ok(None);
        };
        match self.compression {
            Compression::Gzip => {
                let file = self.open_file()?;
                let len = file.metadata().map_err(|e| ErrorKind::io(e, &self.path))?.len();
                if len < HEADER_LEN as u64 {
                    return Ok(None);
                }
                let Some(header) = TorrentGzipHeader::read_from(file).map_err(ErrorKind::compression)? else {
                    return Ok(None);
                };
                let hashes = Hashes::new()
                    .with(HashKind::Crc, format!("{:08x}", header.crc32))
                    .with(HashKind::Md5, hex::encode(header.md5))
                    .with(HashKind::Sha1, sha1);
                Ok(Some(EntryInfo {
                    name: sha1.to_string(),
                    fingerprint: Fingerprint { size: header.size, hashes },
                }))
            },
            Compression::Xz => {
                if !self.has_magic()? {
                    return Ok(None);
                }
                let fingerprint = self.hash_payload(HashLevel::Standard)?;
                if fingerprint.hashes.get(HashKind::Sha1) != Some(sha1) {
                    tracing::warn!(path = %self.path.display(), "Depot file content does not match its name");
                    return Ok(None);
                }
                Ok(Some(EntryInfo { name: sha1.to_string(), fingerprint }))
            },
            Compression::None => Ok(None),
        }
    }

    fn has_magic(&self) -> Result<bool> {
        let mut head = Vec::new();
        self.open_file()?.take(8).read_to_end(&mut head).map_err(|e| ErrorKind::io(e, &self.path))?;
        Ok(self.compression.check_magic_bytes(&head))
    }

    fn decoder(&self) -> Result<Box<dyn Read>> {
        let file = BufReader::new(self.open_file()?);
        self.compression.wrap_reader(file).map_err(ErrorKind::compression)
    }

    fn hash_payload(&self, level: HashLevel) -> Result<Fingerprint> {
        fingerprint(self.decoder()?, level).or_raise(|| ErrorKind::Corrupt(self.path.clone()))
    }
}

impl Archive for SingleFileArchive {
    fn kind(&self) -> ContainerKind {
        match self.compression {
            Compression::Xz => ContainerKind::Xz,
            _ => ContainerKind::Gzip,
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn entries(&self, level: HashLevel) -> Result<Vec<EntryInfo>> {
        if let Some(info) = self.torrent_info()? {
            return Ok(vec![info]);
        }
        Ok(vec![EntryInfo {
            name: self.entry_name().to_string(),
            fingerprint: self.hash_payload(level)?,
        }])
    }

    fn open_entry(&self, name: &str) -> Result<Option<Box<dyn Read + '_>>> {
        if name != self.entry_name() {
            return Ok(None);
        }
        let reader: Box<dyn Read + '_> = self.decoder()?;
        Ok(Some(reader))
    }

    fn torrent_info(&self) -> Result<Option<EntryInfo>> {
        self.read_torrent_info()
    }

    fn is_torrent(&self) -> bool {
        if !torrent::is_torrent_file_name(self.file_name(), self.compression) {
            return false;
        }
        match self.compression {
            Compression::Gzip => self
                .open_file()
                .ok()
                .and_then(|file| TorrentGzipHeader::read_from(file).ok().flatten())
                .is_some(),
            _ => self.has_magic().unwrap_or(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const PAYLOAD: &[u8] = b"payload of a rom inside a depot";

    fn torrent_gzip(dir: &Path, payload: &[u8]) -> (PathBuf, Fingerprint) {
        let fp = fingerprint(payload, HashLevel::Standard).unwrap();
        let (size, body) = torrent::deflate_stream(payload, Vec::new()).unwrap();
        let md5: [u8; 16] = hex::decode(fp.hashes.get(HashKind::Md5).unwrap()).unwrap().try_into().unwrap();
        let crc32 = u32::from_str_radix(fp.hashes.get(HashKind::Crc).unwrap(), 16).unwrap();
        let header = TorrentGzipHeader { md5, crc32, size };
        let path = dir.join(format!("{}.gz", fp.hashes.get(HashKind::Sha1).unwrap()));
        header.write_member(Cursor::new(body), File::create(&path).unwrap()).unwrap();
        (path, fp)
    }

    #[test]
    fn test_torrent_gzip_info_from_header() {
        let dir = tempfile::tempdir().unwrap();
        let (path, fp) = torrent_gzip(dir.path(), PAYLOAD);
        let archive = SingleFileArchive::new(&path, Compression::Gzip);
        assert!(archive.is_torrent());

        let entries = archive.entries(HashLevel::CrcOnly).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].fingerprint, fp);
        assert_eq!(Some(entries[0].name.as_str()), fp.hashes.get(HashKind::Sha1));

        let mut payload = Vec::new();
        archive.open_entry(&entries[0].name).unwrap().unwrap().read_to_end(&mut payload).unwrap();
        assert_eq!(payload, PAYLOAD);
    }

    #[test]
    fn test_plain_gzip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game.bin.gz");
        std::fs::write(&path, Compression::Gzip.compress(PAYLOAD).unwrap()).unwrap();
        let archive = SingleFileArchive::new(&path, Compression::Gzip);
        assert!(!archive.is_torrent());
        assert!(archive.torrent_info().unwrap().is_none());

        let entries = archive.entries(HashLevel::CrcOnly).unwrap();
        assert_eq!(entries[0].name, "game.bin");
        assert_eq!(entries[0].fingerprint.size, PAYLOAD.len() as u64);
        assert_eq!(entries[0].fingerprint.hashes.get(HashKind::Sha1), None);
        assert!(archive.open_entry("other.bin").unwrap().is_none());
    }

    #[test]
    fn test_gzip_named_like_torrent_without_header() {
        let dir = tempfile::tempdir().unwrap();
        let sha1 = fingerprint(PAYLOAD, HashLevel::Standard).unwrap().hashes.get(HashKind::Sha1).unwrap().to_string();
        let path = dir.path().join(format!("{sha1}.gz"));
        std::fs::write(&path, Compression::Gzip.compress(PAYLOAD).unwrap()).unwrap();
        let archive = SingleFileArchive::new(&path, Compression::Gzip);
        assert!(!archive.is_torrent());
        assert!(archive.torrent_info().unwrap().is_none());
    }

    #[test]
    fn test_torrent_xz_verifies_name() {
        let dir = tempfile::tempdir().unwrap();
        let sha1 = fingerprint(PAYLOAD, HashLevel::Standard).unwrap().hashes.get(HashKind::Sha1).unwrap().to_string();
        let good = dir.path().join(format!("{sha1}.xz"));
        std::fs::write(&good, Compression::Xz.compress(PAYLOAD).unwrap()).unwrap();
        let archive = SingleFileArchive::new(&good, Compression::Xz);
        assert!(archive.is_torrent());
        assert_eq!(archive.torrent_info().unwrap().unwrap().fingerprint.size, PAYLOAD.len() as u64);

        let wrong = dir.path().join("0000000000000000000000000000000000000000.xz");
        std::fs::write(&wrong, Compression::Xz.compress(PAYLOAD).unwrap()).unwrap();
        assert!(SingleFileArchive::new(&wrong, Compression::Xz).torrent_info().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.bin.xz");
        std::fs::write(&path, [0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00, 0x01, 0x02]).unwrap();
        let err = SingleFileArchive::new(&path, Compression::Xz).entries(HashLevel::CrcOnly).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Corrupt(_)));
    }
}
