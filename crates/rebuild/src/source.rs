//! Candidates and re-readable access to their bytes.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use rekit_archive::Archive;
use rekit_catalog::{ItemKind, Rom};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Where a candidate's bytes come from.
#[derive(Clone, Copy)]
pub(crate) enum Origin<'a> {
    /// A whole file on disk.
    File(&'a Path),
    /// A named entry inside a container.
    Contained { archive: &'a dyn Archive, entry: &'a str },
    /// The payload of a container already in canonical torrent form.
    Torrent { archive: &'a dyn Archive, entry: &'a str },
}

impl Origin<'_> {
    /// The container, for origins that have one.
    pub(crate) fn archive(&self) -> Option<&dyn Archive> {
        match self {
            Origin::File(_) => None,
            Origin::Contained { archive, .. } | Origin::Torrent { archive, .. } => Some(*archive),
        }
    }
}

/// A unit of input being matched against the catalog.
pub(crate) struct Candidate<'a> {
    /// Identity of the content as found: name, size and hashes.
    pub rom: Rom,
    /// What kind of catalog item the content would be.
    pub kind: ItemKind,
    pub origin: Origin<'a>,
}

/// The bytes of one candidate, readable from the start any number of times.
///
/// Plain files are reopened for every read. Entries inside containers are
/// decompressed once into an anonymous temp file, removed when dropped.
#[derive(Debug)]
pub(crate) enum EntrySource {
    File(PathBuf),
    Spooled(File),
}

impl EntrySource {
    /// Prepare the bytes of `origin`. `None` if the container has no such entry.
    pub(crate) fn open(origin: &Origin<'_>) -> Result<Option<Self>> {
        let (archive, entry) = match origin {
            Origin::File(path) => {
                if !path.is_file() {
                    return Ok(None);
                }
                return Ok(Some(EntrySource::File(path.to_path_buf())));
            },
            Origin::Contained { archive, entry } | Origin::Torrent { archive, entry } => (archive, entry),
        };
        let Some(mut reader) = archive.open_entry(entry).or_raise(|| ErrorKind::Source)? else {
            return Ok(None);
        };
        let mut spool = tempfile::tempfile().or_raise(|| ErrorKind::Source)?;
        let bytes = std::io::copy(&mut reader, &mut spool).or_raise(|| ErrorKind::Source)?;
        tracing::debug!(path = %archive.path().display(), entry, bytes, "Spooled entry");
        Ok(Some(EntrySource::Spooled(spool)))
    }

    /// A fresh reader positioned at the first byte.
    pub(crate) fn reader(&self) -> Result<Box<dyn Read + '_>> {
        match self {
            EntrySource::File(path) => {
                let file = File::open(path).or_raise(|| ErrorKind::Source)?;
                Ok(Box::new(BufReader::new(file)))
            },
            EntrySource::Spooled(spool) => {
                let mut handle = spool;
                handle.seek(SeekFrom::Start(0)).or_raise(|| ErrorKind::Source)?;
                Ok(Box::new(BufReader::new(handle)))
            },
        }
    }
}
