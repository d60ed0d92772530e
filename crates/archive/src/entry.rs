use rekit_catalog::{Fingerprint, ItemKind, Rom};

pub(crate) const CHD_MAGIC: &[u8] = b"MComprHD";
pub(crate) const AARU_MAGIC: &[u8] = b"AARUFRMT";
pub(crate) const DIC_MAGIC: &[u8] = b"DICMFRMT";

/// Bytes needed to classify a file by [`classify`].
pub const CLASSIFY_LEN: usize = 8;

/// One entry reported by an [`Archive`](crate::input::Archive).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryInfo {
    pub name: String,
    pub fingerprint: Fingerprint,
}

impl EntryInfo {
    /// The candidate Rom for this entry. Entries carry no machine.
    pub fn to_rom(&self) -> Rom {
        Rom::new(self.name.clone(), "")
            .with_size(i64::try_from(self.fingerprint.size).unwrap_or(i64::MAX))
            .with_hashes(self.fingerprint.hashes.clone())
    }
}

/// Formats that would normally be interpreted, but should instead be hashed
/// as opaque files. Interpreted images are identified by the hashes their
/// headers declare (see [`declared_hashes`](crate::image::declared_hashes)).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TreatAsFile {
    /// CHD images become Roms instead of Disks.
    pub chd: bool,
    /// AaruFormat images become Roms instead of Media.
    pub aaru: bool,
    /// Containers are never opened; every file is one opaque entry.
    pub archives: bool,
}

/// Decide which catalog kind a whole file represents from its leading bytes.
#[must_use]
pub fn classify(head: &[u8], treat: TreatAsFile) -> ItemKind {
    if !treat.chd && head.starts_with(CHD_MAGIC) {
        return ItemKind::Disk;
    }
    if !treat.aaru && (head.starts_with(AARU_MAGIC) || head.starts_with(DIC_MAGIC)) {
        return ItemKind::Media;
    }
    ItemKind::Rom
}

#[cfg(test)]
mod tests {
    use super::*;
    use rekit_catalog::{HashKind, Hashes};
    use rstest::rstest;

    #[rstest]
    #[case(b"MComprHD\0\0\0\x7c", TreatAsFile::default(), ItemKind::Disk)]
    #[case(b"MComprHD\0\0\0\x7c", TreatAsFile { chd: true, ..Default::default() }, ItemKind::Rom)]
    #[case(b"AARUFRMT", TreatAsFile::default(), ItemKind::Media)]
    #[case(b"DICMFRMT", TreatAsFile { chd: true, ..Default::default() }, ItemKind::Media)]
    #[case(b"AARUFRMT", TreatAsFile { aaru: true, ..Default::default() }, ItemKind::Rom)]
    #[case(b"NES\x1a", TreatAsFile::default(), ItemKind::Rom)]
    #[case(b"", TreatAsFile::default(), ItemKind::Rom)]
    fn test_classify(#[case] head: &[u8], #[case] treat: TreatAsFile, #[case] expected: ItemKind) {
        assert_eq!(classify(head, treat), expected);
    }

    #[test]
    fn test_entry_to_rom() {
        let entry = EntryInfo {
            name: "track01.bin".to_string(),
            fingerprint: Fingerprint {
                size: 2352,
                hashes: Hashes::new().with(HashKind::Crc, "0a0b0c0d"),
            },
        };
        let rom = entry.to_rom();
        assert_eq!(rom.name, "track01.bin");
        assert_eq!(rom.machine, "");
        assert_eq!(rom.size, 2352);
        assert_eq!(rom.crc(), Some("0a0b0c0d"));
    }
}
