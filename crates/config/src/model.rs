use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use rekit_archive::{OutputFormat, TreatAsFile};
use rekit_catalog::depot::{DEFAULT_DEPTH, DepotInfo};
use rekit_compress::Compression;
use rekit_rebuild::{DEFAULT_DISCOVERY_THREADS, RebuildOptions};
use serde::{Deserialize, Serialize};

/// Deepest depot nesting accepted: 20 levels use the whole 40 character SHA1.
pub const MAX_DEPOT_DEPTH: usize = 20;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub rebuild: RebuildSection,
}

/// The `[rebuild]` section.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RebuildSection {
    /// Output format name (`folder`, `tgz-depot`, ...). Unset lets the
    /// catalog's packing decide.
    pub output_format: Option<String>,
    pub date: bool,
    pub delete: bool,
    pub inverse: bool,
    pub quick_scan: bool,
    pub treat_as_file: TreatAsFileSection,
    pub input_depot: InputDepotSection,
    pub output_depot: OutputDepotSection,
    pub header_skipper: Option<String>,
    pub discovery_threads: usize,
}

impl Default for RebuildSection {
    fn default() -> Self {
        Self {
            output_format: None,
            date: false,
            delete: false,
            inverse: false,
            quick_scan: false,
            treat_as_file: TreatAsFileSection::default(),
            input_depot: InputDepotSection::default(),
            output_depot: OutputDepotSection::default(),
            header_skipper: None,
            discovery_threads: DEFAULT_DISCOVERY_THREADS,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreatAsFileSection {
    pub chd: bool,
    pub aaru: bool,
    pub archives: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputDepotSection {
    pub depth: usize,
    /// `gzip` or `xz`.
    pub compression: String,
}

impl Default for InputDepotSection {
    fn default() -> Self {
        Self {
            depth: DEFAULT_DEPTH,
            compression: Compression::Gzip.as_str().to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputDepotSection {
    pub depth: usize,
}

impl Default for OutputDepotSection {
    fn default() -> Self {
        Self { depth: DEFAULT_DEPTH }
    }
}

impl Config {
    /// Validate the `[rebuild]` section into engine options.
    ///
    /// # Errors
    /// [`ErrorKind::Invalid`] for an unknown format or compression, a depot
    /// depth above [`MAX_DEPOT_DEPTH`], or zero discovery threads.
    pub fn rebuild_options(&self) -> Result<RebuildOptions> {
        let section = &self.rebuild;
        let output_format = section
            .output_format
            .as_deref()
            .map(|name| {
                name.parse::<OutputFormat>()
                    .or_raise(|| ErrorKind::invalid("rebuild.output_format", format!("unknown format {name:?}")))
            })
            .transpose()?;

        let name = section.input_depot.compression.as_str();
        let input_compression = name
            .parse::<Compression>()
            .or_raise(|| ErrorKind::invalid("rebuild.input_depot.compression", format!("unknown compression {name:?}")))?;
        if input_compression == Compression::None {
            exn::bail!(ErrorKind::invalid("rebuild.input_depot.compression", "depots are always compressed"));
        }

        let input_depot = depot("rebuild.input_depot.depth", section.input_depot.depth)?;
        let output_depot = depot("rebuild.output_depot.depth", section.output_depot.depth)?;
        if section.discovery_threads == 0 {
            exn::bail!(ErrorKind::invalid("rebuild.discovery_threads", "must be at least 1"));
        }

        let treat = section.treat_as_file;
        Ok(RebuildOptions {
            output_format,
            date: section.date,
            delete: section.delete,
            inverse: section.inverse,
            quick_scan: section.quick_scan,
            treat_as_file: TreatAsFile { chd: treat.chd, aaru: treat.aaru, archives: treat.archives },
            input_depot,
            input_compression,
            output_depot,
            header_skipper: section.header_skipper.clone().filter(|name| !name.is_empty()),
            discovery_threads: section.discovery_threads,
        })
    }
}

fn depot(field: &'static str, depth: usize) -> Result<DepotInfo> {
    if depth > MAX_DEPOT_DEPTH {
        exn::bail!(ErrorKind::invalid(field, format!("{depth} exceeds {MAX_DEPOT_DEPTH}")));
    }
    Ok(DepotInfo { depth })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults_match_engine_defaults() {
        assert_eq!(Config::default().rebuild_options().unwrap(), RebuildOptions::default());
    }

    #[test]
    fn test_full_section() {
        let mut config = Config::default();
        config.rebuild.output_format = Some("depot".to_string());
        config.rebuild.delete = true;
        config.rebuild.treat_as_file.chd = true;
        config.rebuild.input_depot = InputDepotSection { depth: 2, compression: "xz".to_string() };
        config.rebuild.output_depot.depth = 0;
        config.rebuild.header_skipper = Some("nes".to_string());

        let options = config.rebuild_options().unwrap();
        assert_eq!(options.output_format, Some(OutputFormat::TorrentGzipDepot));
        assert!(options.delete);
        assert!(options.treat_as_file.chd);
        assert_eq!(options.input_depot.depth, 2);
        assert_eq!(options.input_compression, Compression::Xz);
        assert_eq!(options.output_depot.depth, 0);
        assert_eq!(options.header_skipper.as_deref(), Some("nes"));
    }

    #[rstest]
    #[case::format(|c: &mut Config| c.rebuild.output_format = Some("zip64".into()), "rebuild.output_format")]
    #[case::compression(|c: &mut Config| c.rebuild.input_depot.compression = "brotli".into(), "rebuild.input_depot.compression")]
    #[case::uncompressed(|c: &mut Config| c.rebuild.input_depot.compression = "none".into(), "rebuild.input_depot.compression")]
    #[case::input_depth(|c: &mut Config| c.rebuild.input_depot.depth = 21, "rebuild.input_depot.depth")]
    #[case::output_depth(|c: &mut Config| c.rebuild.output_depot.depth = 40, "rebuild.output_depot.depth")]
    #[case::threads(|c: &mut Config| c.rebuild.discovery_threads = 0, "rebuild.discovery_threads")]
    fn test_rejected(#[case] change: fn(&mut Config), #[case] expected: &str) {
        let mut config = Config::default();
        change(&mut config);
        let err = config.rebuild_options().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid { field, .. } if *field == expected));
    }

    #[test]
    fn test_deepest_depot_accepted() {
        let mut config = Config::default();
        config.rebuild.output_depot.depth = MAX_DEPOT_DEPTH;
        assert_eq!(config.rebuild_options().unwrap().output_depot.depth, MAX_DEPOT_DEPTH);
    }
}
