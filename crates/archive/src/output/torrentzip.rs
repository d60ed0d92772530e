use super::{OutputContainer, OutputFormat, WriterOptions, container_path, ensure_parent, parse_date};
use crate::error::{ErrorKind, Result};
use crate::path::validate;
use exn::ResultExt;
use rekit_catalog::Rom;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use time::OffsetDateTime;
use tracing::instrument;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

/// Archive comment marking a TorrentZip file; eight hex digits follow.
const COMMENT_PREFIX: &str = "TORRENTZIPPED-";
const COMMENT_LEN: u64 = COMMENT_PREFIX.len() as u64 + 8;
const EOCD_SIGNATURE: &[u8] = b"PK\x05\x06";
const EOCD_LEN: u64 = 22;

/// One zip archive per machine, `out/<machine>.zip`, in TorrentZip shape:
/// deflated entries sorted by lowercase name, every entry stamped
/// 1996-12-24 23:32:00, and a comment carrying the CRC32 of the central
/// directory.
///
/// Adding an entry rewrites the archive. Existing entries are copied across
/// without recompressing them.
#[derive(Clone, Copy, Debug)]
pub struct TorrentZipWriter {
    options: WriterOptions,
}

impl TorrentZipWriter {
    pub fn new(options: WriterOptions) -> Self {
        Self { options }
    }

    /// Catalog dates replace the TorrentZip stamp only when asked for and
    /// representable as a DOS date.
    fn entry_time(&self, item: &Rom) -> DateTime {
        let stamped = match self.options.preserve_dates {
            true => item.date.as_deref().and_then(parse_date).and_then(|t| OffsetDateTime::from_unix_timestamp(t).ok()),
            false => None,
        };
        stamped
            .and_then(|t| {
                let year = u16::try_from(t.year()).ok()?;
                DateTime::from_date_and_time(year, u8::from(t.month()), t.day(), t.hour(), t.minute(), t.second()).ok()
            })
            .unwrap_or_else(|| DateTime::from_date_and_time(1996, 12, 24, 23, 32, 0).unwrap_or_default())
    }
}

impl OutputContainer for TorrentZipWriter {
    fn format(&self) -> OutputFormat {
        OutputFormat::TorrentZip
    }

    #[instrument(skip(self, source, item), fields(item = %item.name, machine = %item.machine))]
    fn write(&self, source: &mut dyn Read, out_dir: &Path, item: &Rom) -> Result<PathBuf> {
        let archive_path = container_path(out_dir, item, ".zip")?;
        let entry_name = validate(&item.name)?.to_string_lossy().replace('\\', "/");
        let parent = ensure_parent(&archive_path)?;
        let corrupt = || ErrorKind::Corrupt(archive_path.clone());

        let mut existing = match archive_path.exists() {
            true => {
                let file = File::open(&archive_path).map_err(|e| ErrorKind::io(e, &archive_path))?;
                Some(ZipArchive::new(BufReader::new(file)).or_raise(corrupt)?)
            },
            false => None,
        };

        // Sort key and, for entries already in the archive, their index.
        let mut order: Vec<(String, Option<usize>)> = vec![(entry_name.to_lowercase(), None)];
        if let Some(existing) = existing.as_mut() {
            for index in 0..existing.len() {
                let name = existing.by_index(index).or_raise(corrupt)?.name().to_string();
                if name == entry_name {
                    tracing::debug!(path = %archive_path.display(), entry = %entry_name, "Already present");
                    return Ok(archive_path);
                }
                order.push((name.to_lowercase(), Some(index)));
            }
        }
        order.sort();

        let mut spool = tempfile::tempfile().map_err(|e| ErrorKind::io(e, parent))?;
        let size = io::copy(source, &mut spool).map_err(|e| ErrorKind::io(e, &archive_path))?;
        spool.seek(SeekFrom::Start(0)).map_err(|e| ErrorKind::io(e, &archive_path))?;
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(9))
            .last_modified_time(self.entry_time(item))
            .large_file(size >= u64::from(u32::MAX));

        let staged = NamedTempFile::new_in(parent).map_err(|e| ErrorKind::io(e, parent))?;
        let mut writer = ZipWriter::new(staged);
        for (_, index) in &order {
            match (index, existing.as_mut()) {
                (Some(index), Some(existing)) => {
                    let file = existing.by_index(*index).or_raise(corrupt)?;
                    writer.raw_copy_file(file).or_raise(corrupt)?;
                },
                _ => {
                    writer.start_file(entry_name.as_str(), options).or_raise(corrupt)?;
                    io::copy(&mut spool, &mut writer).map_err(|e| ErrorKind::io(e, &archive_path))?;
                },
            }
        }
        writer.set_comment(format!("{COMMENT_PREFIX}00000000"));
        drop(existing);
        let mut staged = writer.finish().or_raise(corrupt)?;
        if let Err(e) = stamp_comment(&mut staged) {
            tracing::warn!(path = %archive_path.display(), error = %e, "Could not stamp TorrentZip comment");
        }
        staged.persist(&archive_path).map_err(|e| ErrorKind::io(e.error, &archive_path))?;
        tracing::debug!(path = %archive_path.display(), entry = %entry_name, bytes = size, "Added zip entry");
        Ok(archive_path)
    }
}

/// Overwrite the placeholder digits of the archive comment with the CRC32 of
/// the central directory.
fn stamp_comment<F: Read + Write + Seek>(file: &mut F) -> io::Result<()> {
    let end = file.seek(SeekFrom::End(0))?;
    let record = end
        .checked_sub(EOCD_LEN + COMMENT_LEN)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "archive shorter than its end record"))?;
    file.seek(SeekFrom::Start(record))?;
    let mut eocd = [0u8; EOCD_LEN as usize];
    file.read_exact(&mut eocd)?;
    let directory_size = u32::from_le_bytes([eocd[12], eocd[13], eocd[14], eocd[15]]);
    let directory_offset = u32::from_le_bytes([eocd[16], eocd[17], eocd[18], eocd[19]]);
    // Zip64 archives park 0xFFFFFFFF here and keep the real values elsewhere.
    if &eocd[..4] != EOCD_SIGNATURE || directory_offset == u32::MAX {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "no plain end of central directory record"));
    }

    file.seek(SeekFrom::Start(u64::from(directory_offset)))?;
    let mut directory = Vec::new();
    std::io::Read::by_ref(file).take(u64::from(directory_size)).read_to_end(&mut directory)?;
    let digest = crc32fast::hash(&directory);

    file.seek(SeekFrom::Start(end - 8))?;
    file.write_all(format!("{digest:08X}").as_bytes())?;
    file.flush()
}
