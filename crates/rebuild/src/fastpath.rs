//! Byte-exact passthrough for content already in the requested torrent form.
//!
//! When a candidate is the payload of a torrent gzip (or XZ) file and the run
//! writes that same format, the file itself is the output: it is copied
//! verbatim instead of being decompressed and written again.

use crate::context::RebuildContext;
use crate::error::{ErrorKind, Result};
use crate::source::{Candidate, Origin};
use exn::{OptionExt, ResultExt};
use rekit_archive::ContainerKind;
use rekit_catalog::depot::depot_path;
use rekit_compress::Compression;
use std::path::PathBuf;

/// One passthrough rule. Rules are tried in order and the first that
/// succeeds ends the entry; a failing rule falls through to normal writing.
pub(crate) struct FastPath {
    pub name: &'static str,
    pub applies: fn(&RebuildContext<'_>, &Candidate<'_>) -> bool,
    pub run: fn(&RebuildContext<'_>, &Candidate<'_>) -> Result<PathBuf>,
}

pub(crate) const FAST_PATHS: &[FastPath] = &[
    FastPath {
        name: "torrent-gzip",
        applies: gzip_passthrough,
        run: copy_torrent,
    },
    FastPath {
        name: "torrent-xz",
        applies: xz_passthrough,
        run: copy_torrent,
    },
];

fn gzip_passthrough(ctx: &RebuildContext<'_>, candidate: &Candidate<'_>) -> bool {
    is_passthrough(ctx, candidate, ContainerKind::Gzip, Compression::Gzip)
}

fn xz_passthrough(ctx: &RebuildContext<'_>, candidate: &Candidate<'_>) -> bool {
    is_passthrough(ctx, candidate, ContainerKind::Xz, Compression::Xz)
}

fn is_passthrough(ctx: &RebuildContext<'_>, candidate: &Candidate<'_>, kind: ContainerKind, to: Compression) -> bool {
    matches!(candidate.origin, Origin::Torrent { archive, .. } if archive.kind() == kind)
        && ctx.format.torrent_compression() == Some(to)
}

fn copy_torrent(ctx: &RebuildContext<'_>, candidate: &Candidate<'_>) -> Result<PathBuf> {
    let archive = candidate.origin.archive().ok_or_raise(|| ErrorKind::Source)?;
    let sha1 = candidate.rom.sha1().ok_or_raise(|| ErrorKind::Hash)?;
    let extension = ctx.format.torrent_compression().unwrap_or_default().extension();
    let dest = match ctx.format.is_depot() {
        true => ctx.out_dir.join(depot_path(sha1, ctx.options.output_depot.depth, extension)),
        false => ctx.out_dir.join(format!("{sha1}{extension}")),
    };
    // Content addressed: whatever already sits at this path is this payload.
    if dest.exists() {
        return Ok(dest);
    }
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).or_raise(|| ErrorKind::Write)?;
    }
    std::fs::copy(archive.path(), &dest).or_raise(|| ErrorKind::Write)?;
    Ok(dest)
}

/// Run the first applicable fast path. `true` if the entry was handled.
pub(crate) fn try_fast_paths(ctx: &RebuildContext<'_>, candidate: &Candidate<'_>) -> bool {
    for fast_path in FAST_PATHS.iter().filter(|fast_path| (fast_path.applies)(ctx, candidate)) {
        match (fast_path.run)(ctx, candidate) {
            Ok(path) => {
                tracing::debug!(rule = fast_path.name, path = %path.display(), "Copied verbatim");
                return true;
            },
            Err(e) => tracing::debug!(rule = fast_path.name, error = ?e, "Fast path failed; writing normally"),
        }
    }
    false
}
