use crate::error::{Error, ErrorKind};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// How a catalog asks for its sets to be packed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Packing {
    /// Every machine in its own TorrentZip archive.
    Zip,
    /// Every machine in its own folder.
    Unzip,
    /// Folders for multi-member machines; single members loose in the root.
    Partial,
    /// Everything loose in the root.
    Flat,
}

impl Packing {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Packing::Zip => "zip",
            Packing::Unzip => "unzip",
            Packing::Partial => "partial",
            Packing::Flat => "flat",
        }
    }
}

impl FromStr for Packing {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "zip" | "yes" => Ok(Packing::Zip),
            "unzip" | "no" => Ok(Packing::Unzip),
            "partial" => Ok(Packing::Partial),
            "flat" => Ok(Packing::Flat),
            _ => exn::bail!(ErrorKind::InvalidValue(s.to_string())),
        }
    }
}

impl Display for Packing {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("zip", Packing::Zip)]
    #[case("yes", Packing::Zip)]
    #[case("no", Packing::Unzip)]
    #[case("Partial", Packing::Partial)]
    #[case("flat", Packing::Flat)]
    fn test_from_str(#[case] input: &str, #[case] expected: Packing) {
        assert_eq!(input.parse::<Packing>().unwrap(), expected);
    }

    #[test]
    fn test_from_str_invalid() {
        assert!("fileonly".parse::<Packing>().is_err());
    }
}
