use crate::Compression;
use crate::error::{Error, ErrorKind};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

const GZIP_MAGIC: &[u8] = &[0x1F, 0x8B];
const XZ_MAGIC: &[u8] = &[0xFD, b'7', b'z', b'X', b'Z', 0x00];

impl Compression {
    /// Name used in configuration and logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Gzip => "gzip",
            Compression::Xz => "xz",
        }
    }

    /// File extension, dot included; empty when uncompressed.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Compression::None => "",
            Compression::Gzip => ".gz",
            Compression::Xz => ".xz",
        }
    }

    /// Identify a stream from its first bytes. Anything unrecognised, or too
    /// short to tell, is [`Compression::None`].
    #[must_use]
    pub fn from_magic_bytes(head: &[u8]) -> Self {
        if head.starts_with(GZIP_MAGIC) {
            Compression::Gzip
        } else if head.starts_with(XZ_MAGIC) {
            Compression::Xz
        } else {
            Compression::None
        }
    }

    /// Whether `head` opens a stream of this format.
    #[must_use]
    pub fn check_magic_bytes(&self, head: &[u8]) -> bool {
        Self::from_magic_bytes(head) == *self
    }

    /// The name of the entry inside a single-entry file: the file name
    /// without this format's extension (compared case-insensitively).
    #[must_use]
    pub fn strip_extension<'a>(&self, file_name: &'a str) -> &'a str {
        let ext = self.extension();
        if ext.is_empty() {
            return file_name;
        }
        // `cut` may land inside a multi-byte character; `get` refuses those.
        file_name
            .len()
            .checked_sub(ext.len())
            .filter(|cut| *cut > 0)
            .filter(|cut| file_name.get(*cut..).is_some_and(|tail| tail.eq_ignore_ascii_case(ext)))
            .and_then(|cut| file_name.get(..cut))
            .unwrap_or(file_name)
    }
}

impl FromStr for Compression {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "store" => Ok(Compression::None),
            "gz" | "gzip" => Ok(Compression::Gzip),
            "xz" | "lzma" => Ok(Compression::Xz),
            _ => exn::bail!(ErrorKind::Unsupported(s.to_string())),
        }
    }
}

impl Display for Compression {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}
