//! Catalog model for rebuilding ROM collections.
//!
//! A [`Catalog`] lists expected content as [`CatalogItem`]s, each naming a
//! file, the machine (set) it belongs to, and whichever hashes the catalog
//! author recorded. This crate also computes the same hashes for candidate
//! content ([`hasher`]) and knows the depot layout ([`depot`]), so everything
//! describing "what content is" lives in one place.

pub mod depot;
pub mod error;
mod hasher;
mod hashes;
mod item;
mod packing;
mod store;

pub use crate::hasher::{Fingerprint, HashLevel, HashingReader, fingerprint};
pub use crate::hashes::{HashKind, Hashes};
pub use crate::item::{Blank, CatalogItem, Disk, ItemKind, ItemStatus, Media, Rom, UNKNOWN_SIZE};
pub use crate::packing::Packing;
pub use crate::store::{BucketKey, Buckets, Case, Catalog, CatalogHeader, Dedupe, DuplicateSet};
