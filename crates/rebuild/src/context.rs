use crate::options::RebuildOptions;
use rekit_archive::{OutputFormat, WriterOptions, output};
use rekit_catalog::{BucketKey, Buckets, Case, Catalog, Dedupe, ItemKind, Packing, Rom};
use rekit_header::SkipperSet;
use std::path::Path;

/// State shared by every entry of one rebuild run.
pub(crate) struct RebuildContext<'a> {
    pub catalog: &'a Catalog,
    pub options: &'a RebuildOptions,
    pub out_dir: &'a Path,
    /// Run-wide output format, before per-item placement.
    pub format: OutputFormat,
    pub skippers: SkipperSet,
    /// Members per machine, indexed once when the catalog asks for partial
    /// packing.
    machines: Option<Buckets<'a>>,
}

impl<'a> RebuildContext<'a> {
    pub fn new(catalog: &'a Catalog, options: &'a RebuildOptions, out_dir: &'a Path) -> Self {
        let packing = catalog.header().packing;
        let machines = (packing == Some(Packing::Partial))
            .then(|| catalog.bucket_by(BucketKey::Machine, Dedupe::None, Case::Sensitive));
        let format = options.resolve_format(packing);
        if let Err(e) = output::create(format, options.writer_options()) {
            tracing::warn!(%format, error = ?e, "No writer for the output format; only disks and media can be written");
        }
        Self {
            catalog,
            options,
            out_dir,
            format,
            skippers: SkipperSet::builtin(),
            machines,
        }
    }

    /// The skipper to retry headered content with, if any is configured.
    /// An empty hint means "try every skipper".
    pub fn skipper_hint(&self) -> Option<&str> {
        self.options.header_skipper.as_deref().or(self.catalog.header().header_skipper.as_deref())
    }

    pub fn writer_options(&self) -> WriterOptions {
        self.options.writer_options()
    }

    /// The format one matched item is written in.
    ///
    /// Disks and media go to plain folders unless the run writes torrent
    /// gzip/XZ. Under partial packing, a machine with a single member is
    /// written loose in the output root.
    pub fn placement(&self, kind: ItemKind, item: &Rom) -> OutputFormat {
        let mut format = self.format;
        if matches!(kind, ItemKind::Disk | ItemKind::Media) && format.torrent_compression().is_none() {
            format = OutputFormat::Folder;
        }
        if format == OutputFormat::Folder
            && let Some(machines) = &self.machines
        {
            format = match machines.items_for_key(&item.machine).len() {
                1 => OutputFormat::ParentFolder,
                _ => OutputFormat::Folder,
            };
        }
        format
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rekit_catalog::{CatalogHeader, CatalogItem};
    use rstest::rstest;

    fn catalog(packing: Option<Packing>) -> Catalog {
        let header = CatalogHeader { packing, ..Default::default() };
        Catalog::with_items(
            header,
            [
                CatalogItem::Rom(Rom::new("a1.bin", "setA")),
                CatalogItem::Rom(Rom::new("a2.bin", "setA")),
                CatalogItem::Rom(Rom::new("b.bin", "setB")),
            ],
        )
    }

    #[rstest]
    #[case(Some(Packing::Partial), None, ItemKind::Rom, "setA", OutputFormat::Folder)]
    #[case(Some(Packing::Partial), None, ItemKind::Rom, "setB", OutputFormat::ParentFolder)]
    #[case(None, None, ItemKind::Rom, "setB", OutputFormat::Folder)]
    #[case(Some(Packing::Flat), None, ItemKind::Rom, "setB", OutputFormat::ParentFolder)]
    #[case(None, Some(OutputFormat::TapeArchive), ItemKind::Disk, "setB", OutputFormat::Folder)]
    #[case(Some(Packing::Partial), Some(OutputFormat::TapeArchive), ItemKind::Media, "setB", OutputFormat::ParentFolder)]
    #[case(None, Some(OutputFormat::TorrentXzDepot), ItemKind::Disk, "setB", OutputFormat::TorrentXzDepot)]
    #[case(None, Some(OutputFormat::TorrentGzip), ItemKind::Rom, "setB", OutputFormat::TorrentGzip)]
    fn test_placement(
        #[case] packing: Option<Packing>,
        #[case] output_format: Option<OutputFormat>,
        #[case] kind: ItemKind,
        #[case] machine: &str,
        #[case] expected: OutputFormat,
    ) {
        let catalog = catalog(packing);
        let options = RebuildOptions { output_format, ..Default::default() };
        let ctx = RebuildContext::new(&catalog, &options, Path::new("out"));
        assert_eq!(ctx.placement(kind, &Rom::new("x.bin", machine)), expected);
    }

    #[test]
    fn test_skipper_hint_override() {
        let mut catalog = catalog(None);
        let options = RebuildOptions::default();
        assert_eq!(RebuildContext::new(&catalog, &options, Path::new("out")).skipper_hint(), None);

        catalog = Catalog::new(CatalogHeader { header_skipper: Some("nes.xml".to_string()), ..Default::default() });
        assert_eq!(RebuildContext::new(&catalog, &options, Path::new("out")).skipper_hint(), Some("nes.xml"));

        let options = RebuildOptions { header_skipper: Some("lynx".to_string()), ..Default::default() };
        assert_eq!(RebuildContext::new(&catalog, &options, Path::new("out")).skipper_hint(), Some("lynx"));
    }
}
