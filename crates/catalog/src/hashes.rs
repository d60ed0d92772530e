//! Hash fields and weak equality.

use crate::error::{Error, ErrorKind};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// One of the hash fields a catalog item may carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HashKind {
    Crc,
    Md5,
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl HashKind {
    pub const ALL: [HashKind; 6] =
        [HashKind::Crc, HashKind::Md5, HashKind::Sha1, HashKind::Sha256, HashKind::Sha384, HashKind::Sha512];

    /// Length of the lowercase hex representation.
    #[must_use]
    pub const fn hex_len(&self) -> usize {
        match self {
            HashKind::Crc => 8,
            HashKind::Md5 => 32,
            HashKind::Sha1 => 40,
            HashKind::Sha256 => 64,
            HashKind::Sha384 => 96,
            HashKind::Sha512 => 128,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            HashKind::Crc => "crc",
            HashKind::Md5 => "md5",
            HashKind::Sha1 => "sha1",
            HashKind::Sha256 => "sha256",
            HashKind::Sha384 => "sha384",
            HashKind::Sha512 => "sha512",
        }
    }
}

impl Display for HashKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for HashKind {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "crc" | "crc32" => Ok(HashKind::Crc),
            "md5" => Ok(HashKind::Md5),
            "sha1" | "sha-1" => Ok(HashKind::Sha1),
            "sha256" | "sha-256" => Ok(HashKind::Sha256),
            "sha384" | "sha-384" => Ok(HashKind::Sha384),
            "sha512" | "sha-512" => Ok(HashKind::Sha512),
            _ => exn::bail!(ErrorKind::InvalidValue(s.to_string())),
        }
    }
}

/// The set of hash fields known for a piece of content.
///
/// Values are stored as lowercase hex of the exact width for their kind.
/// [`with`](Self::with) normalises input: surrounding whitespace and a `0x`
/// prefix are removed, short values are zero-padded on the left, and anything
/// that is not hex (or is too long) is discarded as absent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Hashes {
    crc: Option<String>,
    md5: Option<String>,
    sha1: Option<String>,
    sha256: Option<String>,
    sha384: Option<String>,
    sha512: Option<String>,
}

impl Hashes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter. Invalid values clear the field.
    #[must_use]
    pub fn with(mut self, kind: HashKind, value: impl AsRef<str>) -> Self {
        self.set(kind, value);
        self
    }

    pub fn set(&mut self, kind: HashKind, value: impl AsRef<str>) {
        *self.slot_mut(kind) = normalize(kind, value.as_ref());
    }

    #[must_use]
    pub fn get(&self, kind: HashKind) -> Option<&str> {
        match kind {
            HashKind::Crc => self.crc.as_deref(),
            HashKind::Md5 => self.md5.as_deref(),
            HashKind::Sha1 => self.sha1.as_deref(),
            HashKind::Sha256 => self.sha256.as_deref(),
            HashKind::Sha384 => self.sha384.as_deref(),
            HashKind::Sha512 => self.sha512.as_deref(),
        }
    }

    /// Keep only the listed kinds.
    #[must_use]
    pub fn restrict(&self, kinds: &[HashKind]) -> Self {
        kinds.iter().fold(Hashes::new(), |acc, kind| match self.get(*kind) {
            Some(value) => acc.with(*kind, value),
            None => acc,
        })
    }

    /// Present fields, in [`HashKind::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (HashKind, &str)> {
        HashKind::ALL.into_iter().filter_map(|kind| self.get(kind).map(|value| (kind, value)))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Whether at least one kind is present on both sides.
    #[must_use]
    pub fn has_common(&self, other: &Hashes) -> bool {
        self.iter().any(|(kind, _)| other.get(kind).is_some())
    }

    /// Weak equality: both sides carry hashes, share at least one kind, and
    /// no kind present on both sides disagrees.
    ///
    /// A CRC-only candidate therefore matches every catalog entry with the
    /// same CRC, whatever SHA1 those entries declare. Catalogs vary in which
    /// hashes they record, so this false-positive risk is accepted.
    #[must_use]
    pub fn weakly_equals(&self, other: &Hashes) -> bool {
        if !self.has_common(other) {
            return false;
        }
        self.iter().all(|(kind, value)| other.get(kind).is_none_or(|theirs| theirs == value))
    }

    fn slot_mut(&mut self, kind: HashKind) -> &mut Option<String> {
        match kind {
            HashKind::Crc => &mut self.crc,
            HashKind::Md5 => &mut self.md5,
            HashKind::Sha1 => &mut self.sha1,
            HashKind::Sha256 => &mut self.sha256,
            HashKind::Sha384 => &mut self.sha384,
            HashKind::Sha512 => &mut self.sha512,
        }
    }
}

fn normalize(kind: HashKind, value: &str) -> Option<String> {
    let value = value.trim();
    let value = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")).unwrap_or(value);
    if value.is_empty() || value.len() > kind.hex_len() || !value.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    Some(format!("{:0>width$}", value.to_ascii_lowercase(), width = kind.hex_len()))
}
