//! Catalog storage, bucketing and duplicate lookup.
//!
//! A [`Catalog`] is immutable while a rebuild runs. Grouping the items by a
//! hash or by machine is done by [`Catalog::bucket_by`], which returns a
//! fresh [`Buckets`] index borrowing the catalog. Different stages may hold
//! differently-keyed indexes at the same time without invalidating each other.
//!
//! Duplicate lookup goes through a hash index the catalog builds on first use
//! and drops whenever an item is added.

use crate::hashes::{HashKind, Hashes};
use crate::item::{CatalogItem, Rom};
use crate::packing::Packing;
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;
use tracing::instrument;

/// Ordered list of Rom-equivalents matching one candidate.
pub type DuplicateSet = Vec<Rom>;

/// What to group catalog items by.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BucketKey {
    Hash(HashKind),
    Machine,
}

/// Whether to collapse identical content within a bucket.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Dedupe {
    #[default]
    None,
    /// Keep only the first item for each distinct (size, hashes) pair.
    Full,
}

/// Whether bucket keys are compared case-sensitively.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Case {
    #[default]
    Sensitive,
    Insensitive,
}

/// Catalog-wide properties.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CatalogHeader {
    pub name: String,
    /// Packing directive declared by the catalog, if any.
    pub packing: Option<Packing>,
    /// Name of the header skipper the catalog was made with (e.g. `nes`).
    pub header_skipper: Option<String>,
}

/// The reference list of expected content.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    header: CatalogHeader,
    items: Vec<CatalogItem>,
    index: OnceLock<HashIndex>,
}

impl Catalog {
    pub fn new(header: CatalogHeader) -> Self {
        Self::with_items(header, Vec::new())
    }

    pub fn with_items(header: CatalogHeader, items: impl IntoIterator<Item = CatalogItem>) -> Self {
        Self { header, items: items.into_iter().collect(), index: OnceLock::new() }
    }

    pub fn push(&mut self, item: impl Into<CatalogItem>) {
        self.items.push(item.into());
        self.index.take();
    }

    pub fn header(&self) -> &CatalogHeader {
        &self.header
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    /// Total number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Group every item under the requested key.
    ///
    /// Items lacking the key's hash are grouped under the empty string.
    #[instrument(level = "debug", skip(self), fields(items = self.items.len(), buckets))]
    pub fn bucket_by(&self, key: BucketKey, dedupe: Dedupe, case: Case) -> Buckets<'_> {
        let mut map: BTreeMap<String, Vec<&CatalogItem>> = BTreeMap::new();
        for item in &self.items {
            let raw = match key {
                BucketKey::Hash(kind) => item.to_rom().and_then(|rom| rom.hashes.get(kind).map(str::to_string)),
                BucketKey::Machine => Some(item.machine().to_string()),
            };
            let mut value = raw.unwrap_or_default();
            if case == Case::Insensitive {
                value = value.to_lowercase();
            }
            let bucket = map.entry(value).or_default();
            if dedupe == Dedupe::Full && is_duplicate_of_any(bucket, item) {
                continue;
            }
            bucket.push(item);
        }
        tracing::Span::current().record("buckets", map.len());
        Buckets { key, map }
    }

    /// Every item whose content matches `candidate`, in catalog order.
    ///
    /// See [`Rom::matches`] for the (weak) equality used. A match always
    /// shares at least one hash value, so only items filed under one of the
    /// candidate's hashes are compared.
    pub fn duplicates_of(&self, candidate: &Rom) -> DuplicateSet {
        let index = self.index.get_or_init(|| HashIndex::build(&self.items));
        index
            .positions(&candidate.hashes)
            .into_iter()
            .filter_map(|position| self.items.get(position).and_then(CatalogItem::to_rom))
            .filter(|rom| candidate.matches(rom))
            .collect()
    }
}

/// Item positions by hash value, one map per hash kind.
#[derive(Clone, Debug, Default)]
struct HashIndex {
    by_kind: HashMap<HashKind, HashMap<String, Vec<usize>>>,
}

impl HashIndex {
    #[instrument(level = "debug", skip_all, fields(items = items.len()))]
    fn build(items: &[CatalogItem]) -> Self {
        let mut by_kind: HashMap<HashKind, HashMap<String, Vec<usize>>> = HashMap::new();
        for (position, rom) in items.iter().enumerate().filter_map(|(position, item)| Some((position, item.to_rom()?))) {
            for (kind, value) in rom.hashes.iter() {
                by_kind.entry(kind).or_default().entry(value.to_string()).or_default().push(position);
            }
        }
        Self { by_kind }
    }

    /// Positions of items sharing any hash value with `hashes`, ascending
    /// and without repeats.
    fn positions(&self, hashes: &Hashes) -> Vec<usize> {
        let mut positions: Vec<usize> = hashes
            .iter()
            .filter_map(|(kind, value)| self.by_kind.get(&kind)?.get(value))
            .flatten()
            .copied()
            .collect();
        positions.sort_unstable();
        positions.dedup();
        positions
    }
}

fn is_duplicate_of_any(bucket: &[&CatalogItem], item: &CatalogItem) -> bool {
    let Some(rom) = item.to_rom() else {
        return false;
    };
    bucket
        .iter()
        .filter_map(|existing| existing.to_rom())
        .any(|existing| existing.size == rom.size && existing.hashes == rom.hashes)
}

/// An index of catalog items grouped under one key, with sorted keys.
#[derive(Debug)]
pub struct Buckets<'a> {
    key: BucketKey,
    map: BTreeMap<String, Vec<&'a CatalogItem>>,
}

impl<'a> Buckets<'a> {
    pub fn key(&self) -> BucketKey {
        self.key
    }

    /// Items filed under `key`; empty if there are none.
    pub fn items_for_key(&self, key: &str) -> &[&'a CatalogItem] {
        self.map.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Keys in ascending order.
    pub fn sorted_keys(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Number of items across all buckets.
    pub fn total_count(&self) -> usize {
        self.map.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{Blank, ItemStatus};

    const SHA1_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const SHA1_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    fn catalog() -> Catalog {
        Catalog::with_items(
            CatalogHeader::default(),
            [
                Rom::new("b.bin", "setB").with_size(4).with_hash(HashKind::Crc, "11111111").with_hash(HashKind::Sha1, SHA1_B).into(),
                Rom::new("a1.bin", "setA").with_size(4).with_hash(HashKind::Crc, "22222222").with_hash(HashKind::Sha1, SHA1_A).into(),
                Rom::new("a2.bin", "SetA").with_size(4).with_hash(HashKind::Crc, "22222222").with_hash(HashKind::Sha1, SHA1_A).into(),
                Rom::new("crc-only.bin", "setC").with_hash(HashKind::Crc, "33333333").into(),
                CatalogItem::Blank(Blank { machine: "empty".to_string() }),
            ],
        )
    }

    #[test]
    fn test_bucket_by_sha1() {
        let catalog = catalog();
        let buckets = catalog.bucket_by(BucketKey::Hash(HashKind::Sha1), Dedupe::None, Case::Sensitive);
        assert_eq!(buckets.sorted_keys().collect::<Vec<_>>(), vec!["", SHA1_A, SHA1_B]);
        assert_eq!(buckets.items_for_key(SHA1_A).len(), 2);
        assert_eq!(buckets.items_for_key("").len(), 2);
        assert!(buckets.items_for_key("missing").is_empty());
        assert_eq!(buckets.total_count(), catalog.len());
    }

    #[test]
    fn test_bucket_by_sha1_dedupe() {
        let catalog = catalog();
        let buckets = catalog.bucket_by(BucketKey::Hash(HashKind::Sha1), Dedupe::Full, Case::Sensitive);
        assert_eq!(buckets.items_for_key(SHA1_A).len(), 1);
        assert_eq!(buckets.items_for_key(SHA1_A)[0].name(), "a1.bin");
    }

    #[test]
    fn test_bucket_by_machine_case() {
        let catalog = catalog();
        let sensitive = catalog.bucket_by(BucketKey::Machine, Dedupe::None, Case::Sensitive);
        assert_eq!(sensitive.items_for_key("setA").len(), 1);
        let insensitive = catalog.bucket_by(BucketKey::Machine, Dedupe::None, Case::Insensitive);
        assert_eq!(insensitive.items_for_key("seta").len(), 2);
        assert_eq!(insensitive.key(), BucketKey::Machine);
    }

    #[test]
    fn test_indexes_are_independent() {
        let catalog = catalog();
        let by_hash = catalog.bucket_by(BucketKey::Hash(HashKind::Sha1), Dedupe::None, Case::Sensitive);
        let by_machine = catalog.bucket_by(BucketKey::Machine, Dedupe::None, Case::Sensitive);
        assert_eq!(by_hash.items_for_key(SHA1_B)[0].machine(), "setB");
        assert_eq!(by_machine.items_for_key("setB")[0].name(), "b.bin");
    }

    #[test]
    fn test_duplicates_of_weak_match() {
        let catalog = catalog();
        // A quick-scanned candidate (CRC only) matches every entry sharing the CRC.
        let candidate = Rom::new("whatever.rom", "").with_size(4).with_hash(HashKind::Crc, "22222222");
        let dupes = catalog.duplicates_of(&candidate);
        assert_eq!(dupes.iter().map(|rom| rom.name.as_str()).collect::<Vec<_>>(), vec!["a1.bin", "a2.bin"]);
    }

    #[test]
    fn test_duplicates_of_conflicting_sha1() {
        let catalog = catalog();
        let candidate = Rom::new("x", "").with_hash(HashKind::Crc, "22222222").with_hash(HashKind::Sha1, SHA1_B);
        assert!(catalog.duplicates_of(&candidate).is_empty());
    }

    #[test]
    fn test_duplicates_of_any_shared_kind() {
        let catalog = Catalog::with_items(
            CatalogHeader::default(),
            [
                Rom::new("by-crc.bin", "m").with_hash(HashKind::Crc, "55555555").into(),
                Rom::new("other.bin", "m").with_hash(HashKind::Crc, "66666666").into(),
                Rom::new("by-sha1.bin", "m").with_hash(HashKind::Sha1, SHA1_A).into(),
                Rom::new("both.bin", "m").with_hash(HashKind::Crc, "55555555").with_hash(HashKind::Sha1, SHA1_A).into(),
            ],
        );
        let candidate = Rom::new("x", "").with_hash(HashKind::Crc, "55555555").with_hash(HashKind::Sha1, SHA1_A);
        let dupes = catalog.duplicates_of(&candidate);
        assert_eq!(
            dupes.iter().map(|rom| rom.name.as_str()).collect::<Vec<_>>(),
            vec!["by-crc.bin", "by-sha1.bin", "both.bin"]
        );
        assert!(catalog.duplicates_of(&Rom::new("no hashes", "")).is_empty());
    }

    #[test]
    fn test_duplicates_of_sees_pushed_items() {
        let mut catalog = catalog();
        let candidate = Rom::new("x", "").with_hash(HashKind::Crc, "77777777");
        assert!(catalog.duplicates_of(&candidate).is_empty());
        catalog.push(Rom::new("late.bin", "setL").with_hash(HashKind::Crc, "77777777"));
        assert_eq!(catalog.duplicates_of(&candidate).len(), 1);
    }

    #[test]
    fn test_duplicates_skip_nodump() {
        let mut catalog = Catalog::new(CatalogHeader::default());
        catalog.push(Rom::new("n.bin", "n").with_hash(HashKind::Crc, "44444444").with_status(ItemStatus::NoDump));
        let candidate = Rom::new("x", "").with_hash(HashKind::Crc, "44444444");
        assert!(catalog.duplicates_of(&candidate).is_empty());
    }
}
