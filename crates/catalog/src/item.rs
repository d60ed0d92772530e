//! Catalog item kinds.

use crate::error::{Error, ErrorKind};
use crate::hashes::{HashKind, Hashes};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Size marker for content whose length is not known.
pub const UNKNOWN_SIZE: i64 = -1;

/// Dump status recorded by a catalog.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ItemStatus {
    #[default]
    None,
    Good,
    BadDump,
    /// The content was never dumped; hashes (if any) are placeholders.
    NoDump,
    Verified,
}

impl ItemStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::None => "none",
            ItemStatus::Good => "good",
            ItemStatus::BadDump => "baddump",
            ItemStatus::NoDump => "nodump",
            ItemStatus::Verified => "verified",
        }
    }
}

impl FromStr for ItemStatus {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "" | "none" => Ok(ItemStatus::None),
            "good" => Ok(ItemStatus::Good),
            "baddump" => Ok(ItemStatus::BadDump),
            "nodump" | "yes" => Ok(ItemStatus::NoDump),
            "verified" => Ok(ItemStatus::Verified),
            _ => exn::bail!(ErrorKind::InvalidValue(s.to_string())),
        }
    }
}

impl Display for ItemStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// Discriminant of a [`CatalogItem`], carried alongside the Rom-equivalent
/// once the item itself has been normalised.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ItemKind {
    #[default]
    Rom,
    Disk,
    Media,
    Blank,
}

/// A plain file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Rom {
    pub name: String,
    pub machine: String,
    pub size: i64,
    pub hashes: Hashes,
    pub status: ItemStatus,
    pub date: Option<String>,
}

impl Rom {
    pub fn new(name: impl Into<String>, machine: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            machine: machine.into(),
            size: UNKNOWN_SIZE,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_size(mut self, size: i64) -> Self {
        self.size = size;
        self
    }

    #[must_use]
    pub fn with_hash(mut self, kind: HashKind, value: impl AsRef<str>) -> Self {
        self.hashes.set(kind, value);
        self
    }

    #[must_use]
    pub fn with_hashes(mut self, hashes: Hashes) -> Self {
        self.hashes = hashes;
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: ItemStatus) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    #[must_use]
    pub fn sha1(&self) -> Option<&str> {
        self.hashes.get(HashKind::Sha1)
    }

    #[must_use]
    pub fn crc(&self) -> Option<&str> {
        self.hashes.get(HashKind::Crc)
    }

    /// Whether `other` describes the same content as this item.
    ///
    /// Neither side may be a no-dump. Hashes must be weakly equal (see
    /// [`Hashes::weakly_equals`]) and sizes, when both are known, must agree.
    #[must_use]
    pub fn matches(&self, other: &Rom) -> bool {
        if self.status == ItemStatus::NoDump || other.status == ItemStatus::NoDump {
            return false;
        }
        if self.size >= 0 && other.size >= 0 && self.size != other.size {
            return false;
        }
        self.hashes.weakly_equals(&other.hashes)
    }
}

/// A compressed hard-disk image (CHD). Only MD5 and SHA1 are tracked.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Disk {
    pub name: String,
    pub machine: String,
    pub size: i64,
    pub md5: Option<String>,
    pub sha1: Option<String>,
    pub status: ItemStatus,
}

/// An optical or media image (AaruFormat). MD5, SHA1 and SHA256 are tracked.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Media {
    pub name: String,
    pub machine: String,
    pub size: i64,
    pub md5: Option<String>,
    pub sha1: Option<String>,
    pub sha256: Option<String>,
}

/// A machine with no content of its own.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Blank {
    pub machine: String,
}

/// One expected piece of content in a catalog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CatalogItem {
    Rom(Rom),
    Disk(Disk),
    Media(Media),
    Blank(Blank),
}

impl CatalogItem {
    #[must_use]
    pub fn kind(&self) -> ItemKind {
        match self {
            CatalogItem::Rom(_) => ItemKind::Rom,
            CatalogItem::Disk(_) => ItemKind::Disk,
            CatalogItem::Media(_) => ItemKind::Media,
            CatalogItem::Blank(_) => ItemKind::Blank,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            CatalogItem::Rom(rom) => &rom.name,
            CatalogItem::Disk(disk) => &disk.name,
            CatalogItem::Media(media) => &media.name,
            CatalogItem::Blank(_) => "",
        }
    }

    #[must_use]
    pub fn machine(&self) -> &str {
        match self {
            CatalogItem::Rom(rom) => &rom.machine,
            CatalogItem::Disk(disk) => &disk.machine,
            CatalogItem::Media(media) => &media.machine,
            CatalogItem::Blank(blank) => &blank.machine,
        }
    }

    /// The Rom-equivalent used for all matching and writing. Blanks have none.
    #[must_use]
    pub fn to_rom(&self) -> Option<Rom> {
        match self {
            CatalogItem::Rom(rom) => Some(rom.clone()),
            CatalogItem::Disk(disk) => Some(Rom {
                name: disk.name.clone(),
                machine: disk.machine.clone(),
                size: disk.size,
                hashes: optional_hashes(&[(HashKind::Md5, &disk.md5), (HashKind::Sha1, &disk.sha1)]),
                status: disk.status,
                date: None,
            }),
            CatalogItem::Media(media) => Some(Rom {
                name: media.name.clone(),
                machine: media.machine.clone(),
                size: media.size,
                hashes: optional_hashes(&[
                    (HashKind::Md5, &media.md5),
                    (HashKind::Sha1, &media.sha1),
                    (HashKind::Sha256, &media.sha256),
                ]),
                status: ItemStatus::None,
                date: None,
            }),
            CatalogItem::Blank(_) => None,
        }
    }

    /// Build an item of the given kind from a Rom-equivalent. Disk and Media
    /// keep only the hash kinds they track.
    #[must_use]
    pub fn from_rom(kind: ItemKind, rom: Rom) -> Self {
        let own = |kind| rom.hashes.get(kind).map(str::to_string);
        match kind {
            ItemKind::Rom => CatalogItem::Rom(rom),
            ItemKind::Disk => CatalogItem::Disk(Disk {
                md5: own(HashKind::Md5),
                sha1: own(HashKind::Sha1),
                status: rom.status,
                size: rom.size,
                name: rom.name,
                machine: rom.machine,
            }),
            ItemKind::Media => CatalogItem::Media(Media {
                md5: own(HashKind::Md5),
                sha1: own(HashKind::Sha1),
                sha256: own(HashKind::Sha256),
                size: rom.size,
                name: rom.name,
                machine: rom.machine,
            }),
            ItemKind::Blank => CatalogItem::Blank(Blank { machine: rom.machine }),
        }
    }
}

impl From<Rom> for CatalogItem {
    fn from(rom: Rom) -> Self {
        CatalogItem::Rom(rom)
    }
}

fn optional_hashes(fields: &[(HashKind, &Option<String>)]) -> Hashes {
    fields.iter().fold(Hashes::new(), |acc, (kind, value)| match value {
        Some(value) => acc.with(*kind, value),
        None => acc,
    })
}
