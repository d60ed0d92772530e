use rekit_archive::{OutputFormat, TreatAsFile, WriterOptions};
use rekit_catalog::Packing;
use rekit_catalog::depot::DepotInfo;
use rekit_compress::Compression;

/// Pool size for depot root discovery when none is configured.
pub const DEFAULT_DISCOVERY_THREADS: usize = 4;

/// Everything a rebuild run can be told, besides the catalog and inputs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RebuildOptions {
    /// Explicit output format. When unset, the catalog's packing decides.
    pub output_format: Option<OutputFormat>,
    /// Stamp outputs with catalog dates.
    pub date: bool,
    /// Delete inputs that were used.
    pub delete: bool,
    /// Rebuild only what the catalog does *not* contain.
    pub inverse: bool,
    /// Hash archive entries with CRC only.
    pub quick_scan: bool,
    pub treat_as_file: TreatAsFile,
    pub input_depot: DepotInfo,
    /// Compression of the files in input depots.
    pub input_compression: Compression,
    pub output_depot: DepotInfo,
    /// Header skipper to retry headered files with; overrides the catalog's.
    pub header_skipper: Option<String>,
    pub discovery_threads: usize,
}

impl Default for RebuildOptions {
    fn default() -> Self {
        Self {
            output_format: None,
            date: false,
            delete: false,
            inverse: false,
            quick_scan: false,
            treat_as_file: TreatAsFile::default(),
            input_depot: DepotInfo::default(),
            input_compression: Compression::Gzip,
            output_depot: DepotInfo::default(),
            header_skipper: None,
            discovery_threads: DEFAULT_DISCOVERY_THREADS,
        }
    }
}

impl RebuildOptions {
    /// The run-wide output format: the explicit one, else the catalog
    /// packing's default.
    #[must_use]
    pub fn resolve_format(&self, packing: Option<Packing>) -> OutputFormat {
        self.output_format.unwrap_or_else(|| format_for_packing(packing))
    }

    pub(crate) fn writer_options(&self) -> WriterOptions {
        WriterOptions {
            preserve_dates: self.date,
            depot_depth: self.output_depot.depth,
        }
    }
}

/// Default output format for a catalog packing directive.
#[must_use]
pub fn format_for_packing(packing: Option<Packing>) -> OutputFormat {
    match packing {
        Some(Packing::Zip) => OutputFormat::TorrentZip,
        Some(Packing::Flat) => OutputFormat::ParentFolder,
        Some(Packing::Unzip | Packing::Partial) | None => OutputFormat::Folder,
    }
}
