use crate::context::RebuildContext;
use crate::entry::rebuild_entry;
use crate::error::{ErrorKind, Result};
use crate::options::RebuildOptions;
use crate::source::{Candidate, Origin};
use exn::ResultExt;
use rekit_archive::{Archive, CLASSIFY_LEN, EntryInfo, classify, declared_hashes, input};
use rekit_catalog::{Catalog, HashLevel, ItemKind, Rom, fingerprint};
use rekit_compress::PeekableReader;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::instrument;
use walkdir::WalkDir;

/// Rebuild catalog content out of arbitrary files and directory trees.
///
/// Every file (directories are walked recursively, in name order) is opened
/// as a container when possible and each of its entries is matched on its
/// own; anything else is hashed whole. With `delete`, files that produced
/// output are removed, along with directories they leave empty.
///
/// Returns `Ok(false)` when there is nothing to do (empty catalog outside of
/// inverse mode), otherwise `Ok(true)`. Failures for individual files are
/// logged and skipped.
///
/// # Errors
/// [`ErrorKind::OutputRoot`] if `out_dir` cannot be created.
#[instrument(skip(catalog, inputs, options), fields(out_dir = %out_dir.display(), inputs = inputs.len(), format))]
pub fn rebuild_generic(
    catalog: &Catalog,
    inputs: &[PathBuf],
    out_dir: &Path,
    options: &RebuildOptions,
) -> Result<bool> {
    if catalog.is_empty() && !options.inverse {
        tracing::info!("No catalog entries to rebuild");
        return Ok(false);
    }
    std::fs::create_dir_all(out_dir).or_raise(|| ErrorKind::OutputRoot(out_dir.to_path_buf()))?;
    let ctx = RebuildContext::new(catalog, options, out_dir);
    tracing::Span::current().record("format", tracing::field::display(ctx.format));

    for input in inputs {
        if input.is_file() {
            tracing::info!(path = %input.display(), "Checking file");
            if rebuild_file(&ctx, input) && options.delete {
                remove_file(input);
            }
        } else if input.is_dir() {
            tracing::debug!(path = %input.display(), "Checking directory");
            for file in walk(input) {
                tracing::info!(path = %file.display(), "Checking file");
                if rebuild_file(&ctx, &file) && options.delete {
                    remove_file(&file);
                    // Sets are often unpacked into a directory of their own.
                    if let Some(parent) = file.parent() {
                        remove_empty_dir(parent);
                    }
                }
            }
            if options.delete {
                remove_empty_dir(input);
            }
        } else {
            tracing::warn!(path = %input.display(), "Input does not exist; skipping");
        }
    }
    Ok(true)
}

/// Every file under `root`, sorted by name within each directory. Collected
/// up front so deleting as we go can't disturb the walk.
fn walk(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) if entry.file_type().is_file() => Some(entry.into_path()),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read directory entry");
                None
            },
        })
        .collect()
}

/// Rebuild everything inside one file. `true` if anything was written.
fn rebuild_file(ctx: &RebuildContext<'_>, path: &Path) -> bool {
    if !ctx.options.treat_as_file.archives {
        match input::open(path) {
            Ok(Some(archive)) => match archive.entries(HashLevel::for_scan(ctx.options.quick_scan)) {
                Ok(entries) => return rebuild_entries(ctx, archive.as_ref(), &entries),
                Err(e) => tracing::warn!(path = %path.display(), error = ?e, "Could not list container; hashing it whole"),
            },
            Ok(None) => {},
            Err(e) => tracing::warn!(path = %path.display(), error = ?e, "Could not identify file; hashing it whole"),
        }
    }
    rebuild_whole_file(ctx, path)
}

fn rebuild_entries(ctx: &RebuildContext<'_>, archive: &dyn Archive, entries: &[EntryInfo]) -> bool {
    let torrent = archive.is_torrent();
    let mut used = false;
    for entry in entries {
        let origin = match torrent {
            true => Origin::Torrent { archive, entry: &entry.name },
            false => Origin::Contained { archive, entry: &entry.name },
        };
        used |= rebuild_entry(ctx, Candidate { rom: entry.to_rom(), kind: ItemKind::Rom, origin });
    }
    used
}

/// Treat a file as one opaque entry, classified by its magic bytes.
fn rebuild_whole_file(ctx: &RebuildContext<'_>, path: &Path) -> bool {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Could not open file; skipping");
            return false;
        },
    };
    let mut reader = PeekableReader::new(BufReader::new(file));
    let kind = match reader.peek(CLASSIFY_LEN) {
        Ok(head) => classify(head, ctx.options.treat_as_file),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = ?e, "Could not read file; skipping");
            return false;
        },
    };
    let name = path.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default();

    // Images are known by the hashes they declare; their own size and CRC
    // mean nothing to a catalog.
    match declared_hashes(path, kind) {
        Ok(Some(hashes)) => {
            let rom = Rom::new(name, "").with_hashes(hashes);
            return rebuild_entry(ctx, Candidate { rom, kind, origin: Origin::File(path) });
        },
        Ok(None) if kind != ItemKind::Rom => {
            tracing::debug!(path = %path.display(), ?kind, "Image declares no hashes; hashing the file");
        },
        Ok(None) => {},
        Err(e) => tracing::warn!(path = %path.display(), error = ?e, "Could not read image header; hashing the file"),
    }

    let found = match fingerprint(reader.into_reader(), HashLevel::Standard) {
        Ok(found) => found,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = ?e, "Could not hash file; skipping");
            return false;
        },
    };
    let rom = Rom::new(name, "")
        .with_size(i64::try_from(found.size).unwrap_or(i64::MAX))
        .with_hashes(found.hashes);
    rebuild_entry(ctx, Candidate { rom, kind, origin: Origin::File(path) })
}

fn remove_file(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "Deleted input"),
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "Could not delete input"),
    }
}

/// Remove a directory if it is empty.
fn remove_empty_dir(path: &Path) {
    if let Err(e) = std::fs::remove_dir(path) {
        tracing::debug!(path = %path.display(), error = %e, "Directory left in place");
    }
}
