//! Rebuilding a single candidate entry.
//!
//! Every entry, whether a loose file, a member of a container or the payload
//! of a depot file, goes through [`rebuild_entry`]:
//!
//! 1. Disks and media are reduced to the hashes they track.
//! 2. The bytes are made re-readable ([`EntrySource`]).
//! 3. The catalog decides the targets: every matching item, or in inverse
//!    mode a synthesized item for content the catalog lacks.
//! 4. Fast paths copy torrent files verbatim where possible.
//! 5. Otherwise each target is written in its placed format.
//! 6. With a header skipper configured, the content is retried without its
//!    copier header.

use crate::context::RebuildContext;
use crate::error::{ErrorKind, Result};
use crate::fastpath::try_fast_paths;
use crate::source::{Candidate, EntrySource};
use exn::{OptionExt, ResultExt};
use rekit_archive::{OutputFormat, output};
use rekit_catalog::{CatalogItem, DuplicateSet, HashKind, HashLevel, ItemKind, Rom, fingerprint};
use rekit_compress::PeekableReader;
use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::Path;
use tracing::instrument;

/// Rebuild one candidate. `true` if any output was written from it.
#[instrument(skip_all, fields(entry = %candidate.rom.name, kind = ?candidate.kind))]
pub(crate) fn rebuild_entry(ctx: &RebuildContext<'_>, candidate: Candidate<'_>) -> bool {
    let candidate = normalize(candidate);
    let source = match EntrySource::open(&candidate.origin) {
        Ok(Some(source)) => source,
        Ok(None) => {
            tracing::debug!("No content for entry; skipping");
            return false;
        },
        Err(e) => {
            tracing::warn!(error = ?e, "Could not read entry; skipping");
            return false;
        },
    };

    let raw_written = rebuild_matches(ctx, &candidate, &source);
    let header_written =
        ctx.skipper_hint().is_some_and(|hint| rebuild_headerless(ctx, &candidate, &source, hint));
    raw_written || header_written
}

/// Disks and media match on the hashes they carry, nothing more.
fn normalize(mut candidate: Candidate<'_>) -> Candidate<'_> {
    if matches!(candidate.kind, ItemKind::Disk | ItemKind::Media)
        && let Some(rom) = CatalogItem::from_rom(candidate.kind, candidate.rom.clone()).to_rom()
    {
        candidate.rom = rom;
    }
    candidate
}

fn rebuild_matches(ctx: &RebuildContext<'_>, candidate: &Candidate<'_>, source: &EntrySource) -> bool {
    let Some(targets) = targets(ctx, &candidate.rom, source) else {
        return false;
    };
    if try_fast_paths(ctx, candidate) {
        return true;
    }
    tracing::info!(targets = targets.len(), inverse = ctx.options.inverse, "Rebuilding");
    let mut written = false;
    for item in &targets {
        written |= write_item(ctx, ctx.placement(candidate.kind, item), source, item);
    }
    written
}

/// Items to write a candidate as, or `None` to leave it alone.
fn targets(ctx: &RebuildContext<'_>, rom: &Rom, source: &EntrySource) -> Option<DuplicateSet> {
    let duplicates = ctx.catalog.duplicates_of(rom);
    match (duplicates.is_empty(), ctx.options.inverse) {
        (false, false) => Some(duplicates),
        (true, true) => match synthesize(rom, source) {
            Ok(item) => Some(vec![item]),
            Err(e) => {
                tracing::warn!(error = ?e, "Could not hash entry for inverse rebuild");
                None
            },
        },
        (false, true) => {
            tracing::debug!("In catalog; inverse rebuild skips it");
            None
        },
        (true, false) => {
            tracing::debug!("No match in catalog");
            None
        },
    }
}

/// An item standing in for content the catalog doesn't have: named as found,
/// in a machine named after it, with hashes taken from the content itself.
fn synthesize(rom: &Rom, source: &EntrySource) -> Result<Rom> {
    let found = fingerprint(source.reader()?, HashLevel::Standard).or_raise(|| ErrorKind::Hash)?;
    let machine = Path::new(&rom.name).file_stem().map(|stem| stem.to_string_lossy().into_owned()).unwrap_or_default();
    Ok(Rom::new(rom.name.clone(), machine)
        .with_size(i64::try_from(found.size).unwrap_or(i64::MAX))
        .with_hashes(found.hashes))
}

fn write_item(ctx: &RebuildContext<'_>, format: OutputFormat, source: &EntrySource, item: &Rom) -> bool {
    let result = output::create(format, ctx.writer_options()).or_raise(|| ErrorKind::Write).and_then(|writer| {
        let mut reader = source.reader()?;
        writer.write(&mut reader, ctx.out_dir, item).or_raise(|| ErrorKind::Write)
    });
    match result {
        Ok(path) => {
            tracing::debug!(item = %item.name, machine = %item.machine, %format, path = %path.display(), "Wrote item");
            true
        },
        Err(e) => {
            tracing::warn!(item = %item.name, machine = %item.machine, %format, error = ?e, "Could not write item");
            false
        },
    }
}

/// Retry a candidate with its copier header stripped.
///
/// Each catalog item matching the headerless content is written twice: the
/// stripped bytes under the item's own name, and the original bytes under
/// `<name>_<crc>`. Either write succeeding counts.
fn rebuild_headerless(ctx: &RebuildContext<'_>, candidate: &Candidate<'_>, source: &EntrySource, hint: &str) -> bool {
    let (stripped, headerless) = match strip_header(ctx, candidate, source, hint) {
        Ok(Some(found)) => found,
        Ok(None) => return false,
        Err(e) => {
            tracing::warn!(error = ?e, "Could not strip header");
            return false;
        },
    };
    let duplicates = ctx.catalog.duplicates_of(&headerless);
    if duplicates.is_empty() {
        return false;
    }
    tracing::info!(targets = duplicates.len(), "Rebuilding headerless matches");

    let stripped = EntrySource::Spooled(stripped);
    let crc = match original_crc(candidate, source) {
        Ok(crc) => Some(crc),
        Err(e) => {
            tracing::warn!(error = ?e, "Could not hash headered bytes; writing the headerless copy only");
            None
        },
    };
    let mut written = false;
    for item in &duplicates {
        let format = ctx.placement(candidate.kind, item);
        let stripped_written = write_item(ctx, format, &stripped, item);
        let headered_written = crc.as_ref().is_some_and(|crc| {
            let headered = Rom {
                name: format!("{}_{crc}", item.name),
                machine: item.machine.clone(),
                ..candidate.rom.clone()
            };
            write_item(ctx, format, source, &headered)
        });
        written |= stripped_written || headered_written;
    }
    written
}

/// CRC of the candidate's bytes as found. Disks and media drop theirs when
/// normalised, so it may have to be computed again.
fn original_crc(candidate: &Candidate<'_>, source: &EntrySource) -> Result<String> {
    if let Some(crc) = candidate.rom.crc() {
        return Ok(crc.to_string());
    }
    let found = fingerprint(source.reader()?, HashLevel::CrcOnly).or_raise(|| ErrorKind::Hash)?;
    found.hashes.get(HashKind::Crc).map(str::to_string).ok_or_raise(|| ErrorKind::Hash)
}

/// The headerless bytes of a candidate in a temp file, with the Rom they hash
/// to. `None` if no rule matches.
fn strip_header(
    ctx: &RebuildContext<'_>,
    candidate: &Candidate<'_>,
    source: &EntrySource,
    hint: &str,
) -> Result<Option<(File, Rom)>> {
    let mut peekable = PeekableReader::new(source.reader()?);
    let head = peekable.peek(ctx.skippers.head_len()).or_raise(|| ErrorKind::Header)?;
    let total_size = u64::try_from(candidate.rom.size).unwrap_or(head.len() as u64);
    let Some(rule) = ctx.skippers.match_rule(head, total_size, hint) else {
        return Ok(None);
    };
    tracing::debug!(rule = %rule.name, "Header recognised");

    let mut spool = tempfile::tempfile().or_raise(|| ErrorKind::Source)?;
    rule.transform(peekable.into_reader(), &mut spool).or_raise(|| ErrorKind::Header)?;
    spool.seek(SeekFrom::Start(0)).or_raise(|| ErrorKind::Source)?;
    let found = fingerprint(&spool, HashLevel::Standard).or_raise(|| ErrorKind::Hash)?;
    let rom = Rom::new(candidate.rom.name.clone(), "")
        .with_size(i64::try_from(found.size).unwrap_or(i64::MAX))
        .with_hashes(found.hashes);
    Ok(Some((spool, rom)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::RebuildOptions;
    use crate::source::Origin;
    use rekit_catalog::{Catalog, CatalogHeader, Disk, Hashes};

    fn headered_dump() -> (Vec<u8>, &'static [u8]) {
        let prg: &[u8] = b"PRG-ROM bank zero and CHR-ROM bank zero";
        let mut headered = b"NES\x1a\x02\x01".to_vec();
        headered.resize(16, 0);
        headered.extend_from_slice(prg);
        (headered, prg)
    }

    #[test]
    fn test_normalize_disk_keeps_tracked_hashes() {
        let path = Path::new("x.chd");
        let candidate = Candidate {
            rom: Rom::new("x.chd", "")
                .with_size(10)
                .with_hash(HashKind::Crc, "01020304")
                .with_hash(HashKind::Sha1, "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"),
            kind: ItemKind::Disk,
            origin: Origin::File(path),
        };
        let normalized = normalize(candidate);
        assert_eq!(normalized.rom.crc(), None);
        assert_eq!(normalized.rom.sha1(), Some("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"));
    }

    #[test]
    fn test_inverse_synthesizes_from_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extra.bin");
        std::fs::write(&path, b"not in the catalog").unwrap();
        let expected = fingerprint(&b"not in the catalog"[..], HashLevel::Standard).unwrap();

        let catalog = Catalog::with_items(
            CatalogHeader::default(),
            [CatalogItem::Disk(Disk { name: "d".into(), machine: "m".into(), size: 1, ..Default::default() })],
        );
        let options = RebuildOptions { inverse: true, ..Default::default() };
        let ctx = RebuildContext::new(&catalog, &options, dir.path());
        let source = EntrySource::File(path);
        let rom = Rom::new("extra.bin", "").with_hashes(Hashes::new().with(HashKind::Crc, "ffffffff"));

        let targets = targets(&ctx, &rom, &source).unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].name, "extra.bin");
        assert_eq!(targets[0].machine, "extra");
        assert_eq!(targets[0].hashes, expected.hashes);
    }

    #[test]
    fn test_headered_copy_named_after_recomputed_crc() {
        let dir = tempfile::tempdir().unwrap();
        let (headered, prg) = headered_dump();
        let path = dir.path().join("dump.nes");
        std::fs::write(&path, &headered).unwrap();

        let stripped = fingerprint(prg, HashLevel::Standard).unwrap();
        let header = CatalogHeader { header_skipper: Some("nes.xml".to_string()), ..Default::default() };
        let catalog = Catalog::with_items(
            header,
            [CatalogItem::Rom(Rom::new("game.nes", "setN").with_hashes(stripped.hashes))],
        );
        let options = RebuildOptions::default();
        let out = dir.path().join("out");
        let ctx = RebuildContext::new(&catalog, &options, &out);

        // Known only by SHA1, as a normalised disk would be.
        let found = fingerprint(&headered[..], HashLevel::Standard).unwrap();
        let candidate = Candidate {
            rom: Rom::new("dump.nes", "").with_hashes(found.hashes.restrict(&[HashKind::Sha1])),
            kind: ItemKind::Rom,
            origin: Origin::File(&path),
        };
        assert!(rebuild_entry(&ctx, candidate));

        let crc = found.hashes.get(HashKind::Crc).unwrap();
        assert_eq!(std::fs::read(out.join("setN/game.nes")).unwrap(), prg);
        assert_eq!(std::fs::read(out.join(format!("setN/game.nes_{crc}"))).unwrap(), headered);
        assert!(!out.join("setN/game.nes_").exists());
    }
}
