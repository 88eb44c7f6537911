//! Region triples, their on-disk `FLREG` encoding, and the name tables
//! used by the dumper, injector and layout engine.

use crate::error::{Error, Result};
use crate::version::Version;

/// Number of region slots FLREG writing is implemented for, regardless
/// of dialect. Preserved from the source tool's behavior: indices 5-8
/// exist under V2 but have no writer (spec section 9, Design Notes).
pub const WRITABLE_REGIONS: usize = 5;

/// Maximum number of regions across both dialects.
pub const MAX_REGIONS: usize = 9;

pub const SHORT_NAMES: [&str; MAX_REGIONS] =
    ["fd", "bios", "me", "gbe", "pd", "res1", "res2", "res3", "ec"];

pub const LONG_NAMES: [&str; MAX_REGIONS] = [
    "Flash Descriptor",
    "BIOS",
    "ME",
    "GbE",
    "Platform Data",
    "Reserved 1",
    "Reserved 2",
    "Reserved 3",
    "EC",
];

/// Filename tags used for `--extract`, in the form
/// `flashregion_<i>_<tag>.bin`.
pub const FILE_TAGS: [&str; MAX_REGIONS] = [
    "flashdescriptor",
    "bios",
    "intel_me",
    "gbe",
    "platform_data",
    "reserved",
    "reserved",
    "reserved",
    "ec",
];

/// Lowercased short/long name to region index, built once at compile
/// time. `index_by_name` lowercases its input to match.
static NAME_TO_INDEX: phf::Map<&'static str, usize> = phf::phf_map! {
    "fd" => 0, "flash descriptor" => 0,
    "bios" => 1,
    "me" => 2,
    "gbe" => 3,
    "pd" => 4, "platform data" => 4,
    "res1" => 5, "reserved 1" => 5,
    "res2" => 6, "reserved 2" => 6,
    "res3" => 7, "reserved 3" => 7,
    "ec" => 8,
};

/// Look up a region index by either its long or short name,
/// case-insensitively.
pub fn index_by_name(name: &str) -> Option<usize> {
    NAME_TO_INDEX.get(name.to_ascii_lowercase().as_str()).copied()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Region {
    pub base: u32,
    pub limit: u32,
}

impl Region {
    pub fn new(base: u32, limit: u32) -> Self {
        Region { base, limit }
    }

    /// Size in bytes; zero (and the region is treated as absent) when
    /// `limit < base`.
    pub fn size(self) -> u32 {
        if self.limit < self.base {
            0
        } else {
            self.limit - self.base + 1
        }
    }

    pub fn is_enabled(self) -> bool {
        self.size() > 0
    }

    /// Inclusive-range overlap test. Symmetric; false for a disabled
    /// region on either side.
    pub fn overlaps(self, other: Region) -> bool {
        if !self.is_enabled() || !other.is_enabled() {
            return false;
        }
        self.base <= other.limit && other.base <= self.limit
    }

    /// Unpack `FLREG[index]` using version-appropriate page masks.
    pub fn decode(word: u32, version: Version) -> Region {
        let mask = version.region_base_mask();
        let low = word & 0xffff;
        let high = (word >> 16) & 0xffff;
        let base = (low & mask) << 12;
        let limit = ((high & mask) << 12) | 0xfff;
        Region { base, limit }
    }

    /// Pack this region back into an `FLREG` word; inverse of `decode`.
    pub fn encode(self, version: Version) -> u32 {
        let mask = version.region_base_mask();
        let base_page = (self.base >> 12) & mask;
        let limit_page = (self.limit >> 12) & mask;
        base_page | (limit_page << 16)
    }
}

/// Read `FLREG[index]` from the region table at `frba` within `image`.
pub fn get(image: &[u8], frba: usize, index: usize, version: Version) -> Result<Region> {
    let offset = frba + index * 4;
    let word = read_u32(image, offset)?;
    Ok(Region::decode(word, version))
}

/// Write `FLREG[index]`. Valid for indices 0..WRITABLE_REGIONS only,
/// matching the source tool's conservative stance on the higher V2 slots
/// (spec section 4.2).
pub fn set(
    image: &mut [u8],
    frba: usize,
    index: usize,
    region: Region,
    version: Version,
) -> Result<()> {
    if index >= WRITABLE_REGIONS {
        return Err(Error::InvalidRegion(index));
    }
    let offset = frba + index * 4;
    let word = region.encode(version);
    write_u32(image, offset, word)
}

pub fn read_u32(image: &[u8], offset: usize) -> Result<u32> {
    let bytes: [u8; 4] = image
        .get(offset..offset + 4)
        .and_then(|s| s.try_into().ok())
        .ok_or(Error::OffsetOutOfRange { offset, len: image.len() })?;
    Ok(u32::from_le_bytes(bytes))
}

pub fn write_u32(image: &mut [u8], offset: usize, value: u32) -> Result<()> {
    let len = image.len();
    let slice = image
        .get_mut(offset..offset + 4)
        .ok_or(Error::OffsetOutOfRange { offset, len })?;
    slice.copy_from_slice(&value.to_le_bytes());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_encode_round_trip_v1() {
        let word = 0x007f_0010u32;
        let r = Region::decode(word, Version::V1);
        assert_eq!(r.encode(Version::V1), word);
    }

    #[test]
    fn decode_encode_round_trip_v2() {
        let word = 0x7fff_0003u32;
        let r = Region::decode(word, Version::V2);
        assert_eq!(r.encode(Version::V2), word);
    }

    #[test]
    fn size_zero_when_limit_below_base() {
        let r = Region::new(0x2000, 0x1000);
        assert_eq!(r.size(), 0);
        assert!(!r.is_enabled());
    }

    #[test]
    fn overlap_is_symmetric() {
        let a = Region::new(0x1000, 0x2000);
        let b = Region::new(0x1800, 0x3000);
        assert!(a.overlaps(b));
        assert!(b.overlaps(a));
    }

    #[test]
    fn overlap_false_for_disjoint_regions() {
        let a = Region::new(0x1000, 0x1fff);
        let b = Region::new(0x2000, 0x2fff);
        assert!(!a.overlaps(b));
    }

    #[test]
    fn overlap_false_when_either_disabled() {
        let a = Region::new(0x1000, 0x1fff);
        let disabled = Region::new(0x3000, 0x1000);
        assert!(!a.overlaps(disabled));
    }

    #[test]
    fn name_lookup_is_case_insensitive() {
        assert_eq!(index_by_name("BIOS"), Some(1));
        assert_eq!(index_by_name("bios"), Some(1));
        assert_eq!(index_by_name("Flash Descriptor"), Some(0));
        assert_eq!(index_by_name("gibberish"), None);
    }

    #[test]
    fn get_set_identity() {
        let mut image = vec![0u8; 64];
        let region = Region::new(0x1000, 0x1fff);
        set(&mut image, 0, 0, region, Version::V1).unwrap();
        let decoded = get(&image, 0, 0, Version::V1).unwrap();
        assert_eq!(decoded, region);
    }

    #[test]
    fn set_rejects_unwritable_index() {
        let mut image = vec![0u8; 64];
        let err = set(&mut image, 0, WRITABLE_REGIONS, Region::default(), Version::V1);
        assert!(matches!(err, Err(Error::InvalidRegion(_))));
    }
}
