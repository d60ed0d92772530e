use super::{OutputContainer, OutputFormat, ensure_parent};
use crate::error::{ErrorKind, Result};
use exn::OptionExt;
use rekit_catalog::depot::depot_path;
use rekit_catalog::{Fingerprint, HashKind, HashLevel, HashingReader, Rom};
use rekit_compress::Compression;
use rekit_compress::torrent::{self, TorrentGzipHeader};
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::instrument;

/// Canonical single-entry files named `<sha1>.gz` / `<sha1>.xz`, either flat
/// in the output root or nested as a depot.
///
/// The name comes from the content actually written, not from the catalog
/// item, so the file is always findable by the hash of its payload.
#[derive(Clone, Copy, Debug)]
pub struct TorrentWriter {
    compression: Compression,
    depth: Option<usize>,
}

impl TorrentWriter {
    pub fn new(compression: Compression, depth: Option<usize>) -> Self {
        Self { compression, depth }
    }

    fn destination(&self, out_dir: &Path, sha1: &str) -> PathBuf {
        let extension = self.compression.extension();
        match self.depth {
            Some(depth) => out_dir.join(depot_path(sha1, depth, extension)),
            None => out_dir.join(format!("{sha1}{extension}")),
        }
    }

    /// Compress `source` into a temp file in `out_dir`, returning it with the
    /// fingerprint of the uncompressed bytes.
    fn stage(&self, source: &mut dyn Read, out_dir: &Path) -> Result<(NamedTempFile, Fingerprint)> {
        let staged = NamedTempFile::new_in(out_dir).map_err(|e| ErrorKind::io(e, out_dir))?;
        let mut hashing = HashingReader::new(source, HashLevel::Standard);
        match self.compression {
            Compression::Gzip => {
                let body = tempfile::tempfile().map_err(|e| ErrorKind::io(e, out_dir))?;
                let (_, mut body) = torrent::deflate_stream(&mut hashing, body).map_err(ErrorKind::compression)?;
                let fingerprint = hashing.finish();
                let header = gzip_header(&fingerprint)?;
                body.seek(SeekFrom::Start(0)).map_err(|e| ErrorKind::io(e, out_dir))?;
                let mut staged = staged;
                header.write_member(BufReader::new(body), &mut staged).map_err(ErrorKind::compression)?;
                Ok((staged, fingerprint))
            },
            _ => {
                let (_, staged) =
                    self.compression.compress_stream(&mut hashing, staged).map_err(ErrorKind::compression)?;
                Ok((staged, hashing.finish()))
            },
        }
    }
}

fn gzip_header(fingerprint: &Fingerprint) -> Result<TorrentGzipHeader> {
    let invalid = || ErrorKind::InvalidValue("fingerprint".to_string());
    let md5 = fingerprint.hashes.get(HashKind::Md5).ok_or_raise(invalid)?;
    let crc = fingerprint.hashes.get(HashKind::Crc).ok_or_raise(invalid)?;
    let md5: [u8; 16] = hex::decode(md5).ok().and_then(|bytes| bytes.try_into().ok()).ok_or_raise(invalid)?;
    let crc32 = u32::from_str_radix(crc, 16).ok().ok_or_raise(invalid)?;
    Ok(TorrentGzipHeader { md5, crc32, size: fingerprint.size })
}

impl OutputContainer for TorrentWriter {
    fn format(&self) -> OutputFormat {
        match (self.compression, self.depth.is_some()) {
            (Compression::Xz, true) => OutputFormat::TorrentXzDepot,
            (Compression::Xz, false) => OutputFormat::TorrentXz,
            (_, true) => OutputFormat::TorrentGzipDepot,
            (_, false) => OutputFormat::TorrentGzip,
        }
    }

    #[instrument(skip(self, source, item), fields(item = %item.name, format = %self.format(), sha1))]
    fn write(&self, source: &mut dyn Read, out_dir: &Path, item: &Rom) -> Result<PathBuf> {
        std::fs::create_dir_all(out_dir).map_err(|e| ErrorKind::io(e, out_dir))?;
        let (staged, fingerprint) = self.stage(source, out_dir)?;
        let sha1 = fingerprint
            .hashes
            .get(HashKind::Sha1)
            .ok_or_raise(|| ErrorKind::InvalidValue("fingerprint".to_string()))?;
        tracing::Span::current().record("sha1", sha1);

        let dest = self.destination(out_dir, sha1);
        if dest.exists() {
            tracing::debug!(path = %dest.display(), "Already present");
            return Ok(dest);
        }
        ensure_parent(&dest)?;
        staged.persist_noclobber(&dest).map_err(|e| ErrorKind::io(e.error, &dest))?;
        tracing::debug!(path = %dest.display(), bytes = fingerprint.size, "Wrote torrent file");
        Ok(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{Archive, SingleFileArchive};
    use rekit_catalog::fingerprint;

    const PAYLOAD: &[u8] = b"rebuilt rom payload";

    fn sha1_of(data: &[u8]) -> String {
        fingerprint(data, HashLevel::Standard).unwrap().hashes.get(HashKind::Sha1).unwrap().to_string()
    }

    #[test]
    fn test_gzip_flat_is_torrent() {
        let dir = tempfile::tempdir().unwrap();
        let writer = TorrentWriter::new(Compression::Gzip, None);
        let path = writer.write(&mut &PAYLOAD[..], dir.path(), &Rom::new("a.bin", "setA")).unwrap();
        assert_eq!(path, dir.path().join(format!("{}.gz", sha1_of(PAYLOAD))));

        let archive = SingleFileArchive::new(&path, Compression::Gzip);
        assert!(archive.is_torrent());
        let info = archive.torrent_info().unwrap().unwrap();
        assert_eq!(info.fingerprint, fingerprint(PAYLOAD, HashLevel::Standard).unwrap());
        assert_eq!(Compression::Gzip.decompress(&std::fs::read(&path).unwrap()).unwrap(), PAYLOAD);
    }

    #[test]
    fn test_gzip_depot_layout() {
        let dir = tempfile::tempdir().unwrap();
        let sha1 = sha1_of(PAYLOAD);
        let writer = TorrentWriter::new(Compression::Gzip, Some(2));
        let path = writer.write(&mut &PAYLOAD[..], dir.path(), &Rom::new("a.bin", "setA")).unwrap();
        assert_eq!(path, dir.path().join(&sha1[0..2]).join(&sha1[2..4]).join(format!("{sha1}.gz")));
        assert!(path.exists());
        assert_eq!(writer.format(), OutputFormat::TorrentGzipDepot);
    }

    #[test]
    fn test_xz_verifies_on_read() {
        let dir = tempfile::tempdir().unwrap();
        let writer = TorrentWriter::new(Compression::Xz, None);
        let path = writer.write(&mut &PAYLOAD[..], dir.path(), &Rom::new("a.bin", "setA")).unwrap();
        assert_eq!(path, dir.path().join(format!("{}.xz", sha1_of(PAYLOAD))));
        assert!(SingleFileArchive::new(&path, Compression::Xz).torrent_info().unwrap().is_some());
    }

    #[test]
    fn test_existing_is_kept_and_no_temp_left() {
        let dir = tempfile::tempdir().unwrap();
        let writer = TorrentWriter::new(Compression::Gzip, None);
        let first = writer.write(&mut &PAYLOAD[..], dir.path(), &Rom::new("a.bin", "setA")).unwrap();
        let second = writer.write(&mut &PAYLOAD[..], dir.path(), &Rom::new("b.bin", "setB")).unwrap();
        assert_eq!(first, second);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
