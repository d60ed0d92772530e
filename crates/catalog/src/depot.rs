//! Depot layout: content-addressed trees of single-entry compressed files.
//!
//! A file whose SHA1 is `aabbccdd…` lives, at depth 2, at
//! `aa/bb/aabbccdd….gz`. Lookup and writing share [`depot_path`], so a file
//! written by one run is found by any later run using the same depth.

use std::path::PathBuf;

/// Nesting depth used when none is configured.
pub const DEFAULT_DEPTH: usize = 4;

/// Settings for one depot (input and output depots are configured separately).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DepotInfo {
    pub depth: usize,
}

impl Default for DepotInfo {
    fn default() -> Self {
        Self { depth: DEFAULT_DEPTH }
    }
}

impl DepotInfo {
    pub fn path_for(&self, hash: &str, extension: &str) -> PathBuf {
        depot_path(hash, self.depth, extension)
    }
}

/// Relative path of `hash` within a depot of the given depth.
///
/// `depth` leading two-character chunks become directories, and the final
/// segment is the full hash followed by `extension` (e.g. `.gz`). Depth is
/// capped so the chunks never run past the end of the hash.
///
/// ```
/// use rekit_catalog::depot::depot_path;
/// use std::path::Path;
///
/// let hash = "abcdef0123456789abcdef0123456789abcdef01";
/// assert_eq!(depot_path(hash, 1, ".gz"), Path::new("ab").join(format!("{hash}.gz")));
/// assert_eq!(depot_path(hash, 0, ".xz"), Path::new(&format!("{hash}.xz")));
/// ```
#[must_use]
pub fn depot_path(hash: &str, depth: usize, extension: &str) -> PathBuf {
    let mut path: PathBuf =
        (0..depth.min(hash.len() / 2)).map_while(|i| hash.get(i * 2..i * 2 + 2)).collect();
    path.push(format!("{hash}{extension}"));
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::path::Path;

    const HASH: &str = "aabbccddeeff00112233445566778899aabbccdd";

    #[rstest]
    #[case(0, ".gz", "aabbccddeeff00112233445566778899aabbccdd.gz")]
    #[case(1, ".gz", "aa/aabbccddeeff00112233445566778899aabbccdd.gz")]
    #[case(2, ".gz", "aa/bb/aabbccddeeff00112233445566778899aabbccdd.gz")]
    #[case(4, ".xz", "aa/bb/cc/dd/aabbccddeeff00112233445566778899aabbccdd.xz")]
    fn test_depot_path(#[case] depth: usize, #[case] ext: &str, #[case] expected: &str) {
        assert_eq!(depot_path(HASH, depth, ext), Path::new(expected));
    }

    #[test]
    fn test_depth_is_capped() {
        assert_eq!(depot_path("abcd", 10, ".gz"), Path::new("ab/cd/abcd.gz"));
    }

    #[test]
    fn test_default_depth() {
        assert_eq!(DepotInfo::default().path_for(HASH, ".gz"), depot_path(HASH, DEFAULT_DEPTH, ".gz"));
    }
}
