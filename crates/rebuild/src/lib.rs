//! # Rekit Rebuild
//!
//! Rebuilds collections to match a [`Catalog`](rekit_catalog::Catalog).
//!
//! Given the catalog of expected content and a set of inputs, the engine
//! finds which inputs satisfy which catalog items and writes them, named and
//! grouped as the catalog says, in the requested
//! [`OutputFormat`](rekit_archive::OutputFormat). Matching is by content
//! hashes, never by name.
//!
//! - [`rebuild_generic`] scans loose files, directory trees and containers.
//! - [`rebuild_depot`] looks catalog hashes up directly in content-addressed
//!   depots, without scanning.
//!
//! Runs are sequential and blocking; only depot root discovery uses a
//! (bounded) thread pool. Per-file problems are logged through `tracing` and
//! never abort a run.

mod context;
mod depot;
mod entry;
pub mod error;
mod fastpath;
mod generic;
mod options;
mod source;

pub use crate::depot::rebuild_depot;
pub use crate::error::{Error, ErrorKind, Result};
pub use crate::generic::rebuild_generic;
pub use crate::options::{DEFAULT_DISCOVERY_THREADS, RebuildOptions, format_for_packing};
