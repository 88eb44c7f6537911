//! Top-level facade: locates every sub-section once and hands out a
//! `Descriptor` that the dumper, mutators, injector and relayout engine
//! all build on.

use crate::error::Result;
use crate::locator::{self, Section};
use crate::region::{self, Region};
use crate::version::Version;

#[derive(Clone, Copy, Debug)]
pub struct Descriptor {
    pub offset: usize,
    pub version: Version,
    pub frba: usize,
    pub fcba: usize,
    pub fpsba: usize,
    pub fmba: usize,
    pub fmsba: usize,
    pub vtba: usize,
    pub vtl: usize,
}

impl Descriptor {
    /// Locate the descriptor signature, determine its dialect, and
    /// derive every sub-section base address. This is the one place
    /// that walks the whole discovery chain described in spec section 4.1.
    pub fn locate(image: &[u8]) -> Result<Self> {
        let offset = locator::find_descriptor(image)?;
        let version = locator::detect_version(image, offset)?;
        Ok(Descriptor {
            offset,
            version,
            frba: locator::section_base(image, offset, Section::Frba)?,
            fcba: locator::section_base(image, offset, Section::Fcba)?,
            fpsba: locator::section_base(image, offset, Section::Fpsba)?,
            fmba: locator::section_base(image, offset, Section::Fmba)?,
            fmsba: locator::section_base(image, offset, Section::Fmsba)?,
            vtba: locator::section_base(image, offset, Section::Vtba)?,
            vtl: locator::vtl_raw(image)?,
        })
    }

    pub fn max_regions(&self) -> usize {
        self.version.max_regions()
    }

    pub fn region(&self, image: &[u8], index: usize) -> Result<Region> {
        region::get(image, self.frba, index, self.version)
    }

    pub fn set_region(&self, image: &mut [u8], index: usize, value: Region) -> Result<()> {
        region::set(image, self.frba, index, value, self.version)
    }

    pub fn regions(&self, image: &[u8]) -> Result<Vec<Region>> {
        (0..self.max_regions()).map(|i| self.region(image, i)).collect()
    }

    pub fn master_word(&self, image: &[u8], master: usize) -> Result<u32> {
        region::read_u32(image, self.fmba + master * 4)
    }

    pub fn set_master_word(&self, image: &mut [u8], master: usize, value: u32) -> Result<()> {
        region::write_u32(image, self.fmba + master * 4, value)
    }

    pub fn flcomp(&self, image: &[u8]) -> Result<crate::descriptor::FlComp> {
        Ok(crate::descriptor::FlComp(region::read_u32(image, self.fcba)?))
    }

    pub fn set_flcomp(&self, image: &mut [u8], value: crate::descriptor::FlComp) -> Result<()> {
        region::write_u32(image, self.fcba, value.0)
    }
}

#[cfg(test)]
pub mod test_images {
    use crate::descriptor::MAGIC;

    /// Build a minimal synthetic image with a descriptor at the
    /// conventional offset `0x10` and `count` enabled regions laid out
    /// contiguously starting right after the descriptor region itself.
    /// `version_code` selects the FLCOMP read-clock field (0 => V1, 4 => V2).
    pub fn make_test_image(version_code: u32, regions: &[(u32, u32)]) -> Vec<u8> {
        let max_limit = regions.iter().map(|(_, limit)| *limit).max().unwrap_or(0);
        let size = (max_limit as usize + 1).max(0x1000);
        let mut data = vec![0xffu8; size];
        data[0x10..0x14].copy_from_slice(&MAGIC.to_le_bytes());

        // FCBA at 0x40 (value 0x04 << 4), FRBA at 0x80 (value 0x08 << 4).
        let flmap0: u32 = (0x04) | (0x08 << 16) | ((regions.len() as u32 - 1) << 24);
        data[0x14..0x18].copy_from_slice(&flmap0.to_le_bytes());
        // FMBA at 0xc0.
        let flmap1: u32 = 0x0c;
        data[0x18..0x1c].copy_from_slice(&flmap1.to_le_bytes());
        // FMSBA at 0x100.
        let flmap2: u32 = 0x10;
        data[0x1c..0x20].copy_from_slice(&flmap2.to_le_bytes());

        let flcomp: u32 = version_code << 17;
        data[0x40..0x44].copy_from_slice(&flcomp.to_le_bytes());

        // Mark every region slot disabled (base page 1, limit page 0, so
        // base > limit) before filling in the ones the caller asked for;
        // otherwise leftover 0xFF fill decodes as a bogus enabled region.
        for i in 0..crate::region::MAX_REGIONS {
            let offset = 0x80 + i * 4;
            data[offset..offset + 4].copy_from_slice(&1u32.to_le_bytes());
        }

        for (i, (base, limit)) in regions.iter().enumerate() {
            let r = crate::region::Region::new(*base, *limit);
            let version = if version_code == 4 {
                crate::version::Version::V2
            } else {
                crate::version::Version::V1
            };
            let word = r.encode(version);
            let offset = 0x80 + i * 4;
            data[offset..offset + 4].copy_from_slice(&word.to_le_bytes());
        }

        // FLUMAP1 at the fixed offset, VTBA pointing right after it, VTL=0.
        let flumap1: u32 = 0xe0;
        data[crate::locator::FLUMAP1_OFFSET..crate::locator::FLUMAP1_OFFSET + 4]
            .copy_from_slice(&flumap1.to_le_bytes());

        data
    }
}

#[cfg(test)]
mod tests {
    use super::test_images::make_test_image;
    use super::*;

    #[test]
    fn locate_v1_image() {
        let data = make_test_image(0, &[(0, 0xfff), (0x1000, 0x1fff)]);
        let d = Descriptor::locate(&data).unwrap();
        assert_eq!(d.version, Version::V1);
        assert_eq!(d.max_regions(), 5);
        let r0 = d.region(&data, 0).unwrap();
        assert_eq!(r0, Region::new(0, 0xfff));
    }

    #[test]
    fn locate_v2_image() {
        let data = make_test_image(4, &[(0, 0xfff), (0x1000, 0x1fff)]);
        let d = Descriptor::locate(&data).unwrap();
        assert_eq!(d.version, Version::V2);
        assert_eq!(d.max_regions(), 9);
    }

    #[test]
    fn set_region_round_trips_through_frba() {
        let mut data = make_test_image(0, &[(0, 0xfff), (0x1000, 0x1fff)]);
        let d = Descriptor::locate(&data).unwrap();
        let new_region = Region::new(0x2000, 0x2fff);
        d.set_region(&mut data, 1, new_region).unwrap();
        assert_eq!(d.region(&data, 1).unwrap(), new_region);
    }
}
