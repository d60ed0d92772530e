//! Tape archives.

use super::{Archive, ContainerKind};
use crate::entry::EntryInfo;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use rekit_catalog::{HashLevel, fingerprint};
use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::{Path, PathBuf};

/// A (possibly multi-entry) tar archive. Only regular files are entries.
#[derive(Clone, Debug)]
pub struct TarArchive {
    path: PathBuf,
}

impl TarArchive {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    fn reader(&self) -> Result<::tar::Archive<BufReader<File>>> {
        let file = File::open(&self.path).map_err(|e| ErrorKind::io(e, &self.path))?;
        Ok(::tar::Archive::new(BufReader::new(file)))
    }

    fn corrupt(&self) -> ErrorKind {
        ErrorKind::Corrupt(self.path.clone())
    }
}

/// Entry names always use `/`, whatever the platform.
fn entry_name<R: Read>(entry: &::tar::Entry<'_, R>) -> std::io::Result<String> {
    Ok(entry.path()?.to_string_lossy().replace('\\', "/"))
}

impl Archive for TarArchive {
    fn kind(&self) -> ContainerKind {
        ContainerKind::Tar
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn entries(&self, level: HashLevel) -> Result<Vec<EntryInfo>> {
        let mut archive = self.reader()?;
        let mut entries = Vec::new();
        for entry in archive.entries().or_raise(|| self.corrupt())? {
            let mut entry = entry.or_raise(|| self.corrupt())?;
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let name = entry_name(&entry).or_raise(|| self.corrupt())?;
            let fingerprint = fingerprint(&mut entry, level).or_raise(|| self.corrupt())?;
            entries.push(EntryInfo { name, fingerprint });
        }
        Ok(entries)
    }

    fn open_entry(&self, name: &str) -> Result<Option<Box<dyn Read + '_>>> {
        let mut archive = self.reader()?;
        for entry in archive.entries().or_raise(|| self.corrupt())? {
            let mut entry = entry.or_raise(|| self.corrupt())?;
            if !entry.header().entry_type().is_file() || entry_name(&entry).or_raise(|| self.corrupt())? != name {
                continue;
            }
            // Tar entries can only be read while walking the archive.
            let mut buffer = Vec::new();
            entry.read_to_end(&mut buffer).or_raise(|| self.corrupt())?;
            return Ok(Some(Box::new(Cursor::new(buffer))));
        }
        Ok(None)
    }

    fn is_torrent(&self) -> bool {
        false
    }
}
