//! Zip archives.

use super::{Archive, ContainerKind};
use crate::entry::EntryInfo;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use rekit_catalog::{Fingerprint, HashKind, HashLevel, Hashes, fingerprint};
use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::{Path, PathBuf};
use zip::result::ZipError;

/// A zip archive (TorrentZip or otherwise). Directory entries are skipped.
#[derive(Clone, Debug)]
pub struct ZipArchive {
    path: PathBuf,
}

impl ZipArchive {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    fn reader(&self) -> Result<zip::ZipArchive<BufReader<File>>> {
        let file = File::open(&self.path).map_err(|e| ErrorKind::io(e, &self.path))?;
        zip::ZipArchive::new(BufReader::new(file)).or_raise(|| self.corrupt())
    }

    fn corrupt(&self) -> ErrorKind {
        ErrorKind::Corrupt(self.path.clone())
    }
}

impl Archive for ZipArchive {
    fn kind(&self) -> ContainerKind {
        ContainerKind::Zip
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn entries(&self, level: HashLevel) -> Result<Vec<EntryInfo>> {
        let mut archive = self.reader()?;
        let mut entries = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let mut file = archive.by_index(index).or_raise(|| self.corrupt())?;
            if !file.is_file() {
                continue;
            }
            let name = file.name().to_string();
            let fingerprint = match level {
                // Size and CRC are in the central directory; nothing to inflate.
                HashLevel::CrcOnly => Fingerprint {
                    size: file.size(),
                    hashes: Hashes::new().with(HashKind::Crc, format!("{:08x}", file.crc32())),
                },
                HashLevel::Standard | HashLevel::All => fingerprint(&mut file, level).or_raise(|| self.corrupt())?,
            };
            entries.push(EntryInfo { name, fingerprint });
        }
        Ok(entries)
    }

    fn open_entry(&self, name: &str) -> Result<Option<Box<dyn Read + '_>>> {
        let mut archive = self.reader()?;
        let mut file = match archive.by_name(name) {
            Ok(file) if file.is_file() => file,
            Ok(_) | Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e).or_raise(|| self.corrupt()),
        };
        // The entry borrows the archive opened here, so it is read out whole.
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer).or_raise(|| self.corrupt())?;
        Ok(Some(Box::new(Cursor::new(buffer))))
    }

    fn is_torrent(&self) -> bool {
        false
    }
}
