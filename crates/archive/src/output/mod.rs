//! Writing matched content into output containers.
//!
//! [`create`] builds an [`OutputContainer`] for an [`OutputFormat`]. Each
//! `write` places one entry, named after the catalog item it satisfies, under
//! an output root. Writers never overwrite: an entry that is already present
//! counts as written.

mod folder;
mod tape;
mod torrent;
mod torrentzip;

pub use self::folder::FolderWriter;
pub use self::tape::TapeArchiveWriter;
pub use self::torrent::TorrentWriter;
pub use self::torrentzip::TorrentZipWriter;

use crate::error::{Error, ErrorKind, Result};
use crate::path::validate;
use filetime::FileTime;
use rekit_catalog::Rom;
use rekit_compress::Compression;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, PrimitiveDateTime};

const DATETIME_FORMATS: [&[BorrowedFormatItem<'static>]; 2] = [
    format_description!("[year]/[month]/[day] [hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
];
const DATE_FORMATS: [&[BorrowedFormatItem<'static>]; 2] =
    [format_description!("[year]/[month]/[day]"), format_description!("[year]-[month]-[day]")];

/// Target container kind for rebuilt content.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    /// `out/<machine>/<name>`
    #[default]
    Folder,
    /// `out/<name>`, machines flattened away
    ParentFolder,
    /// `out/<machine>.tar`
    TapeArchive,
    /// `out/<machine>.zip`, entries sorted and stamped the TorrentZip way
    TorrentZip,
    Torrent7Zip,
    /// `out/<sha1>.gz`
    TorrentGzip,
    /// `out/<depot path>/<sha1>.gz`
    TorrentGzipDepot,
    /// `out/<sha1>.xz`
    TorrentXz,
    /// `out/<depot path>/<sha1>.xz`
    TorrentXzDepot,
}

impl OutputFormat {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Folder => "folder",
            OutputFormat::ParentFolder => "parent-folder",
            OutputFormat::TapeArchive => "tar",
            OutputFormat::TorrentZip => "tzip",
            OutputFormat::Torrent7Zip => "t7z",
            OutputFormat::TorrentGzip => "tgz",
            OutputFormat::TorrentGzipDepot => "tgz-depot",
            OutputFormat::TorrentXz => "txz",
            OutputFormat::TorrentXzDepot => "txz-depot",
        }
    }

    /// The single-entry compression of the torrent gzip/xz family.
    #[must_use]
    pub fn torrent_compression(&self) -> Option<Compression> {
        match self {
            OutputFormat::TorrentGzip | OutputFormat::TorrentGzipDepot => Some(Compression::Gzip),
            OutputFormat::TorrentXz | OutputFormat::TorrentXzDepot => Some(Compression::Xz),
            _ => None,
        }
    }

    /// Whether output is nested by hash prefix.
    #[must_use]
    pub fn is_depot(&self) -> bool {
        matches!(self, OutputFormat::TorrentGzipDepot | OutputFormat::TorrentXzDepot)
    }
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = Error;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "folder" | "dir" | "directory" => Ok(OutputFormat::Folder),
            "parent-folder" | "parentfolder" | "flat" => Ok(OutputFormat::ParentFolder),
            "tar" | "tape" => Ok(OutputFormat::TapeArchive),
            "tzip" | "torrentzip" => Ok(OutputFormat::TorrentZip),
            "t7z" | "torrent7zip" => Ok(OutputFormat::Torrent7Zip),
            "tgz" | "torrentgzip" => Ok(OutputFormat::TorrentGzip),
            "tgz-depot" | "depot" | "romba" => Ok(OutputFormat::TorrentGzipDepot),
            "txz" | "torrentxz" => Ok(OutputFormat::TorrentXz),
            "txz-depot" => Ok(OutputFormat::TorrentXzDepot),
            _ => exn::bail!(ErrorKind::InvalidValue(s.to_string())),
        }
    }
}

/// Settings shared by every writer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WriterOptions {
    /// Stamp written files with the catalog item's date, when it has one.
    pub preserve_dates: bool,
    /// Nesting depth for depot formats.
    pub depot_depth: usize,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            preserve_dates: false,
            depot_depth: rekit_catalog::depot::DEFAULT_DEPTH,
        }
    }
}

/// A destination for rebuilt entries.
pub trait OutputContainer {
    fn format(&self) -> OutputFormat;

    /// Write the bytes of `source` as `item` under `out_dir`, returning the
    /// path of the file that now holds it.
    fn write(&self, source: &mut dyn Read, out_dir: &Path, item: &Rom) -> Result<PathBuf>;
}

/// Construct the writer for a format.
///
/// # Errors
/// [`ErrorKind::UnsupportedFormat`] for Torrent7Zip, which has no codec here.
pub fn create(format: OutputFormat, options: WriterOptions) -> Result<Box<dyn OutputContainer>> {
    let depth = options.depot_depth;
    let writer: Box<dyn OutputContainer> = match format {
        OutputFormat::Folder => Box::new(FolderWriter::new(false, options)),
        OutputFormat::ParentFolder => Box::new(FolderWriter::new(true, options)),
        OutputFormat::TapeArchive => Box::new(TapeArchiveWriter::new(options)),
        OutputFormat::TorrentGzip => Box::new(TorrentWriter::new(Compression::Gzip, None)),
        OutputFormat::TorrentGzipDepot => Box::new(TorrentWriter::new(Compression::Gzip, Some(depth))),
        OutputFormat::TorrentXz => Box::new(TorrentWriter::new(Compression::Xz, None)),
        OutputFormat::TorrentXzDepot => Box::new(TorrentWriter::new(Compression::Xz, Some(depth))),
        OutputFormat::TorrentZip => Box::new(TorrentZipWriter::new(options)),
        OutputFormat::Torrent7Zip => exn::bail!(ErrorKind::UnsupportedFormat(format.to_string())),
    };
    Ok(writer)
}

/// Parse a catalog date into a Unix timestamp (UTC).
pub(crate) fn parse_date(value: &str) -> Option<i64> {
    let value = value.trim();
    for format in DATETIME_FORMATS {
        if let Ok(datetime) = PrimitiveDateTime::parse(value, format) {
            return Some(datetime.assume_utc().unix_timestamp());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = Date::parse(value, format) {
            return Some(date.midnight().assume_utc().unix_timestamp());
        }
    }
    None
}

/// Set the modification time of a written file from the item's date.
/// Unparseable dates and failures are logged and otherwise ignored.
pub(crate) fn apply_date(path: &Path, item: &Rom) {
    let Some(date) = item.date.as_deref() else {
        return;
    };
    let Some(timestamp) = parse_date(date) else {
        tracing::debug!(date, item = %item.name, "Unrecognised date; leaving file time alone");
        return;
    };
    if let Err(e) = filetime::set_file_mtime(path, FileTime::from_unix_time(timestamp, 0)) {
        tracing::warn!(path = %path.display(), error = %e, "Could not set file time");
    }
}

/// `out/<machine><extension>` for the per-machine container formats. Items
/// without a machine get a container named after their own file stem.
pub(crate) fn container_path(out_dir: &Path, item: &Rom, extension: &str) -> Result<PathBuf> {
    let base = match item.machine.trim().is_empty() {
        true => validate(item.name.rsplit_once('.').map_or(item.name.as_str(), |(stem, _)| stem))?,
        false => validate(&item.machine)?,
    };
    let mut file_name = base.into_os_string();
    file_name.push(extension);
    Ok(out_dir.join(file_name))
}

/// Create the parent directory of a destination path.
pub(crate) fn ensure_parent(path: &Path) -> Result<&Path> {
    let parent = path.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(parent).map_err(|e| ErrorKind::io(e, parent))?;
    Ok(parent)
}
