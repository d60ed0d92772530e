use crate::context::RebuildContext;
use crate::entry::rebuild_entry;
use crate::error::{ErrorKind, Result};
use crate::options::RebuildOptions;
use crate::source::{Candidate, Origin};
use exn::ResultExt;
use rayon::prelude::*;
use rekit_archive::{Archive, SingleFileArchive};
use rekit_catalog::{BucketKey, Case, Catalog, Dedupe, HashKind};
use std::path::{Path, PathBuf};
use tracing::instrument;

const SHA1_HEX_LEN: usize = 40;

/// Rebuild catalog content out of one or more depots.
///
/// Instead of scanning the inputs, every SHA1 the catalog knows is looked up
/// at its depot path under each input directory; the first root holding it
/// wins. Found payloads are written to `out_dir` as every catalog item they
/// satisfy.
///
/// Returns `Ok(false)` when there is nothing to do (empty catalog outside of
/// inverse mode), otherwise `Ok(true)`. Failures for individual hashes are
/// logged and skipped.
///
/// # Errors
/// [`ErrorKind::OutputRoot`] if `out_dir` cannot be created.
#[instrument(skip(catalog, inputs, options), fields(out_dir = %out_dir.display(), roots, format))]
pub fn rebuild_depot(catalog: &Catalog, inputs: &[PathBuf], out_dir: &Path, options: &RebuildOptions) -> Result<bool> {
    if catalog.is_empty() && !options.inverse {
        tracing::info!("No catalog entries to rebuild");
        return Ok(false);
    }
    std::fs::create_dir_all(out_dir).or_raise(|| ErrorKind::OutputRoot(out_dir.to_path_buf()))?;
    let ctx = RebuildContext::new(catalog, options, out_dir);
    tracing::Span::current().record("format", tracing::field::display(ctx.format));

    let roots = discover_roots(inputs, options.discovery_threads);
    tracing::Span::current().record("roots", roots.len());
    if roots.is_empty() {
        tracing::info!("No depot directories among the inputs");
        return Ok(true);
    }

    let extension = options.input_compression.extension();
    let buckets = catalog.bucket_by(BucketKey::Hash(HashKind::Sha1), Dedupe::None, Case::Insensitive);
    tracing::info!(hashes = buckets.len(), "Rebuilding from depots");
    for hash in buckets.sorted_keys().filter(|hash| hash.len() == SHA1_HEX_LEN) {
        tracing::info!(hash, "Checking hash");
        let subpath = options.input_depot.path_for(hash, extension);
        let Some(found) = roots.iter().map(|root| root.join(&subpath)).find(|path| path.is_file()) else {
            continue;
        };

        let archive = SingleFileArchive::new(&found, options.input_compression);
        let info = match archive.torrent_info() {
            Ok(Some(info)) => info,
            Ok(None) => {
                tracing::warn!(path = %found.display(), "Not a depot file; skipping");
                continue;
            },
            Err(e) => {
                tracing::warn!(path = %found.display(), error = ?e, "Could not read depot file; skipping");
                continue;
            },
        };
        let Some(first) = buckets.items_for_key(hash).first() else {
            continue;
        };

        let candidate = Candidate {
            rom: info.to_rom(),
            kind: first.kind(),
            origin: Origin::Torrent { archive: &archive, entry: &info.name },
        };
        if rebuild_entry(&ctx, candidate) && options.delete {
            match std::fs::remove_file(&found) {
                Ok(()) => tracing::debug!(path = %found.display(), "Deleted depot file"),
                Err(e) => tracing::warn!(path = %found.display(), error = %e, "Could not delete depot file"),
            }
        }
    }
    Ok(true)
}

/// The inputs that are directories, in input order.
fn discover_roots(inputs: &[PathBuf], threads: usize) -> Vec<PathBuf> {
    let filter = || -> Vec<PathBuf> {
        inputs
            .par_iter()
            .filter(|input| input.is_dir())
            .inspect(|root| tracing::debug!(path = %root.display(), "Adding depot"))
            .cloned()
            .collect()
    };
    match rayon::ThreadPoolBuilder::new().num_threads(threads.max(1)).build() {
        Ok(pool) => pool.install(filter),
        Err(e) => {
            tracing::warn!(error = %e, "Could not start discovery pool; checking inputs in turn");
            inputs.iter().filter(|input| input.is_dir()).cloned().collect()
        },
    }
}
