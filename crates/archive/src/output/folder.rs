use super::{OutputContainer, OutputFormat, WriterOptions, apply_date, ensure_parent};
use crate::error::{ErrorKind, Result};
use crate::path::validate;
use rekit_catalog::Rom;
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::instrument;

/// Plain files on disk, grouped into one directory per machine unless
/// flattened.
#[derive(Clone, Copy, Debug)]
pub struct FolderWriter {
    flatten: bool,
    options: WriterOptions,
}

impl FolderWriter {
    pub fn new(flatten: bool, options: WriterOptions) -> Self {
        Self { flatten, options }
    }

    fn relative_path(&self, item: &Rom) -> Result<PathBuf> {
        let name = validate(&item.name)?;
        if self.flatten || item.machine.trim().is_empty() {
            return Ok(name);
        }
        Ok(validate(&item.machine)?.join(name))
    }
}

impl OutputContainer for FolderWriter {
    fn format(&self) -> OutputFormat {
        match self.flatten {
            true => OutputFormat::ParentFolder,
            false => OutputFormat::Folder,
        }
    }

    #[instrument(skip(self, source, item), fields(item = %item.name, machine = %item.machine))]
    fn write(&self, source: &mut dyn Read, out_dir: &Path, item: &Rom) -> Result<PathBuf> {
        let dest = out_dir.join(self.relative_path(item)?);
        if dest.exists() {
            tracing::debug!(path = %dest.display(), "Already present");
            return Ok(dest);
        }
        let parent = ensure_parent(&dest)?;

        // Written beside the destination and renamed, so an interrupted write
        // never leaves a truncated file under the final name.
        let mut staged = NamedTempFile::new_in(parent).map_err(|e| ErrorKind::io(e, parent))?;
        let written = std::io::copy(source, &mut staged).map_err(|e| ErrorKind::io(e, &dest))?;
        staged.persist_noclobber(&dest).map_err(|e| ErrorKind::io(e.error, &dest))?;

        if self.options.preserve_dates {
            apply_date(&dest, item);
        }
        tracing::debug!(path = %dest.display(), bytes = written, "Wrote file");
        Ok(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(false, "setA", "sub\\a.bin", "setA/sub/a.bin")]
    #[case(true, "setA", "a.bin", "a.bin")]
    #[case(false, "", "a.bin", "a.bin")]
    fn test_layout(#[case] flatten: bool, #[case] machine: &str, #[case] name: &str, #[case] expected: &str) {
        let dir = tempfile::tempdir().unwrap();
        let writer = FolderWriter::new(flatten, WriterOptions::default());
        let path = writer.write(&mut &b"abc"[..], dir.path(), &Rom::new(name, machine)).unwrap();
        assert_eq!(path, dir.path().join(expected));
        assert_eq!(std::fs::read(&path).unwrap(), b"abc");
    }

    #[test]
    fn test_existing_file_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let writer = FolderWriter::new(false, WriterOptions::default());
        let item = Rom::new("a.bin", "setA");
        writer.write(&mut &b"first"[..], dir.path(), &item).unwrap();
        let path = writer.write(&mut &b"second"[..], dir.path(), &item).unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"first");
    }

    #[test]
    fn test_escaping_name_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let writer = FolderWriter::new(false, WriterOptions::default());
        let err = writer.write(&mut &b"x"[..], dir.path(), &Rom::new("../../escape.bin", "setA")).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(_)));
    }

    #[test]
    fn test_preserve_dates() {
        let dir = tempfile::tempdir().unwrap();
        let options = WriterOptions { preserve_dates: true, ..Default::default() };
        let writer = FolderWriter::new(true, options);
        let item = Rom::new("dated.bin", "setA").with_date("1996/12/24 23:32:00");
        let path = writer.write(&mut &b"x"[..], dir.path(), &item).unwrap();
        let mtime = filetime::FileTime::from_last_modification_time(&std::fs::metadata(path).unwrap());
        assert_eq!(mtime.unix_seconds(), 851470320);
    }
}
