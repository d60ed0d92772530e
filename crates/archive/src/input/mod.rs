//! Reading candidate files and the entries inside them.
//!
//! [`open`] sniffs a file's magic bytes and, for containers with a codec
//! available, returns an [`Archive`] that can list and stream its entries.
//! Everything else (including 7z and rar, which have no codec here) is left
//! for the caller to treat as one opaque entry.

mod single;
mod tape;
mod zipfile;

pub use self::single::SingleFileArchive;
pub use self::tape::TarArchive;
pub use self::zipfile::ZipArchive;

use crate::entry::EntryInfo;
use crate::error::{ErrorKind, Result};
use derive_more::Display;
use rekit_catalog::HashLevel;
use rekit_compress::Compression;
use std::fs::File;
use std::io::Read;
use std::path::Path;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const SEVENZIP_MAGIC: &[u8] = &[0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C];
const RAR_MAGIC: &[u8] = b"Rar!\x1A\x07";
const TAR_MAGIC: &[u8] = b"ustar";
const TAR_MAGIC_OFFSET: usize = 257;
const SNIFF_LEN: usize = TAR_MAGIC_OFFSET + TAR_MAGIC.len();

/// A recognised container format.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum ContainerKind {
    Gzip,
    Xz,
    Tar,
    Zip,
    SevenZip,
    Rar,
}

/// The capabilities the rebuild engine needs from an opened container.
pub trait Archive {
    fn kind(&self) -> ContainerKind;

    fn path(&self) -> &Path;

    /// Every file entry, hashed to at least `level`.
    fn entries(&self, level: HashLevel) -> Result<Vec<EntryInfo>>;

    /// Stream the uncompressed bytes of one entry; `None` if no entry has
    /// that name.
    fn open_entry(&self, name: &str) -> Result<Option<Box<dyn Read + '_>>>;

    /// Whether the file on disk is already in canonical single-entry
    /// ("torrent") form, named after its payload's SHA1.
    fn is_torrent(&self) -> bool;

    /// The payload description of a torrent-form file, read without
    /// extracting where the format allows. `None` if the file isn't in
    /// torrent form, or its content contradicts its name.
    fn torrent_info(&self) -> Result<Option<EntryInfo>> {
        Ok(None)
    }
}

/// Recognise a container from its leading bytes.
#[must_use]
pub fn identify_bytes(head: &[u8]) -> Option<ContainerKind> {
    match Compression::from_magic_bytes(head) {
        Compression::Gzip => return Some(ContainerKind::Gzip),
        Compression::Xz => return Some(ContainerKind::Xz),
        Compression::None => {},
    }
    if head.starts_with(ZIP_MAGIC) {
        Some(ContainerKind::Zip)
    } else if head.starts_with(SEVENZIP_MAGIC) {
        Some(ContainerKind::SevenZip)
    } else if head.starts_with(RAR_MAGIC) {
        Some(ContainerKind::Rar)
    } else if head.get(TAR_MAGIC_OFFSET..SNIFF_LEN) == Some(TAR_MAGIC) {
        Some(ContainerKind::Tar)
    } else {
        None
    }
}

/// Recognise the container format of a file on disk.
pub fn identify(path: &Path) -> Result<Option<ContainerKind>> {
    let file = File::open(path).map_err(|e| ErrorKind::io(e, path))?;
    let mut head = Vec::with_capacity(SNIFF_LEN);
    file.take(SNIFF_LEN as u64).read_to_end(&mut head).map_err(|e| ErrorKind::io(e, path))?;
    Ok(identify_bytes(&head))
}

/// Open a file as an [`Archive`], if it is a container this crate can read.
pub fn open(path: &Path) -> Result<Option<Box<dyn Archive>>> {
    let Some(kind) = identify(path)? else {
        return Ok(None);
    };
    let archive: Box<dyn Archive> = match kind {
        ContainerKind::Gzip => Box::new(SingleFileArchive::new(path, Compression::Gzip)),
        ContainerKind::Xz => Box::new(SingleFileArchive::new(path, Compression::Xz)),
        ContainerKind::Tar => Box::new(TarArchive::new(path)),
        ContainerKind::Zip => Box::new(ZipArchive::new(path)),
        ContainerKind::SevenZip | ContainerKind::Rar => {
            tracing::debug!(path = %path.display(), kind = %kind, "No codec for container; treating as a plain file");
            return Ok(None);
        },
    };
    Ok(Some(archive))
}
