use super::{OutputContainer, OutputFormat, WriterOptions, container_path, ensure_parent, parse_date};
use crate::error::{ErrorKind, Result};
use crate::path::validate;
use exn::ResultExt;
use rekit_catalog::Rom;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tar::{Builder, EntryType, Header, HeaderMode};
use tempfile::NamedTempFile;
use tracing::instrument;

/// One tar archive per machine, `out/<machine>.tar`.
///
/// Adding an entry rewrites the archive: existing entries are copied into a
/// fresh archive beside it, the new entry is appended, and the result
/// replaces the original.
#[derive(Clone, Copy, Debug)]
pub struct TapeArchiveWriter {
    options: WriterOptions,
}

impl TapeArchiveWriter {
    pub fn new(options: WriterOptions) -> Self {
        Self { options }
    }
}

impl OutputContainer for TapeArchiveWriter {
    fn format(&self) -> OutputFormat {
        OutputFormat::TapeArchive
    }

    #[instrument(skip(self, source, item), fields(item = %item.name, machine = %item.machine))]
    fn write(&self, source: &mut dyn Read, out_dir: &Path, item: &Rom) -> Result<PathBuf> {
        let archive_path = container_path(out_dir, item, ".tar")?;
        let entry_name = validate(&item.name)?.to_string_lossy().replace('\\', "/");
        let parent = ensure_parent(&archive_path)?;
        let corrupt = || ErrorKind::Corrupt(archive_path.clone());

        let staged = NamedTempFile::new_in(parent).map_err(|e| ErrorKind::io(e, parent))?;
        let mut builder = Builder::new(staged);
        builder.mode(HeaderMode::Deterministic);

        if archive_path.exists() {
            let file = File::open(&archive_path).map_err(|e| ErrorKind::io(e, &archive_path))?;
            let mut existing = tar::Archive::new(BufReader::new(file));
            for entry in existing.entries().or_raise(corrupt)? {
                let mut entry = entry.or_raise(corrupt)?;
                let path = entry.path().or_raise(corrupt)?.into_owned();
                if path.to_string_lossy().replace('\\', "/") == entry_name {
                    tracing::debug!(path = %archive_path.display(), entry = %entry_name, "Already present");
                    return Ok(archive_path);
                }
                let mut header = entry.header().clone();
                builder.append_data(&mut header, &path, &mut entry).or_raise(corrupt)?;
            }
        }

        // Tar headers carry the size up front, so the source is spooled first.
        let mut spool = tempfile::tempfile().map_err(|e| ErrorKind::io(e, parent))?;
        let size = std::io::copy(source, &mut spool).map_err(|e| ErrorKind::io(e, &archive_path))?;
        spool.seek(SeekFrom::Start(0)).map_err(|e| ErrorKind::io(e, &archive_path))?;

        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Regular);
        header.set_size(size);
        header.set_mode(0o644);
        let mtime = match self.options.preserve_dates {
            true => item.date.as_deref().and_then(parse_date).and_then(|t| u64::try_from(t).ok()),
            false => None,
        };
        header.set_mtime(mtime.unwrap_or(0));
        builder.append_data(&mut header, &entry_name, spool).map_err(|e| ErrorKind::io(e, &archive_path))?;

        let staged = builder.into_inner().map_err(|e| ErrorKind::io(e, &archive_path))?;
        staged.persist(&archive_path).map_err(|e| ErrorKind::io(e.error, &archive_path))?;
        tracing::debug!(path = %archive_path.display(), entry = %entry_name, bytes = size, "Added tar entry");
        Ok(archive_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{Archive, TarArchive};
    use rekit_catalog::HashLevel;

    fn names(path: &Path) -> Vec<String> {
        TarArchive::new(path).entries(HashLevel::CrcOnly).unwrap().into_iter().map(|e| e.name).collect()
    }

    #[test]
    fn test_appends_per_machine() {
        let dir = tempfile::tempdir().unwrap();
        let writer = TapeArchiveWriter::new(WriterOptions::default());
        let a = writer.write(&mut &b"aaa"[..], dir.path(), &Rom::new("a.bin", "setA")).unwrap();
        let b = writer.write(&mut &b"bbb"[..], dir.path(), &Rom::new("sub\\b.bin", "setA")).unwrap();
        let c = writer.write(&mut &b"ccc"[..], dir.path(), &Rom::new("c.bin", "setB")).unwrap();
        assert_eq!(a, dir.path().join("setA.tar"));
        assert_eq!(a, b);
        assert_eq!(c, dir.path().join("setB.tar"));
        assert_eq!(names(&a), vec!["a.bin", "sub/b.bin"]);
        assert_eq!(names(&c), vec!["c.bin"]);

        let mut data = Vec::new();
        TarArchive::new(&a).open_entry("sub/b.bin").unwrap().unwrap().read_to_end(&mut data).unwrap();
        assert_eq!(data, b"bbb");
    }

    #[test]
    fn test_duplicate_entry_not_added() {
        let dir = tempfile::tempdir().unwrap();
        let writer = TapeArchiveWriter::new(WriterOptions::default());
        let item = Rom::new("a.bin", "setA");
        writer.write(&mut &b"first"[..], dir.path(), &item).unwrap();
        let path = writer.write(&mut &b"second"[..], dir.path(), &item).unwrap();
        assert_eq!(names(&path), vec!["a.bin"]);
    }

    #[test]
    fn test_machineless_item_named_after_file() {
        let dir = tempfile::tempdir().unwrap();
        let writer = TapeArchiveWriter::new(WriterOptions::default());
        let path = writer.write(&mut &b"x"[..], dir.path(), &Rom::new("game.v1.bin", "")).unwrap();
        assert_eq!(path, dir.path().join("game.v1.tar"));
    }
}
