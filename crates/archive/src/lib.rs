//! # Rekit Archive
//!
//! Containers on both sides of a rebuild.
//!
//! - [`input`] opens candidate files (gzip, XZ, tar, zip) and lists and streams
//!   the entries inside them, recognising files already in canonical
//!   single-entry "torrent" form.
//! - [`output`] writes matched entries into folders, tar or TorrentZip
//!   archives, or torrent gzip/XZ files and depots.
//! - [`entry`] classifies whole files (CHD, AaruFormat) by their magic bytes,
//!   and [`image`] reads the hashes those images declare for themselves.

pub mod entry;
pub mod error;
pub mod image;
pub mod input;
pub mod output;
mod path;

pub use crate::entry::{CLASSIFY_LEN, EntryInfo, TreatAsFile, classify};
pub use crate::error::{Error, ErrorKind, Result};
pub use crate::image::declared_hashes;
pub use crate::input::{Archive, ContainerKind, SingleFileArchive, TarArchive, ZipArchive};
pub use crate::output::{OutputContainer, OutputFormat, WriterOptions};
pub use crate::path::validate as validate_path;
