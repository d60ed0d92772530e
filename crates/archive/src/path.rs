//! Entry name validation.
//!
//! Catalog item names and machine names end up as paths under an output
//! root, so they must never escape it.

use crate::error::{ErrorKind, Result};
use exn::OptionExt;
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

/// Validates a catalog-supplied relative path and normalises it.
///
/// Backslashes are treated as separators (catalogs are frequently authored
/// on Windows). `..` may not climb above the root; null bytes, absolute
/// prefixes and empty results are rejected.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use rekit_archive::validate_path;
///
/// assert_eq!(validate_path("disc\\track01.bin").unwrap(), Path::new("disc/track01.bin"));
/// assert_eq!(validate_path("a/../b.bin").unwrap(), Path::new("b.bin"));
/// assert!(validate_path("../etc/passwd").is_err());
/// assert!(validate_path("a\0b").is_err());
/// ```
pub fn validate(name: &str) -> Result<PathBuf> {
    let invalid = || ErrorKind::InvalidPath(PathBuf::from(name));
    let slashed = name.replace('\\', "/");
    let mut kept: Vec<&OsStr> = Vec::new();
    for part in Path::new(&slashed).components() {
        match part {
            // Interior NULs would truncate the path at the syscall boundary.
            Component::Normal(segment) if segment.as_encoded_bytes().contains(&0) => exn::bail!(invalid()),
            Component::Normal(segment) => kept.push(segment),
            Component::ParentDir => {
                kept.pop().ok_or_raise(invalid)?;
            },
            Component::Prefix(_) => exn::bail!(invalid()),
            Component::CurDir | Component::RootDir => {},
        }
    }
    if kept.is_empty() {
        exn::bail!(invalid());
    }
    Ok(kept.iter().collect())
}
