//! IFD dialect: the descriptor format changed between generations.
//!
//! V1 and V2 differ in region-page bit width, master read/write shift
//! positions, chip density field width, and maximum region count. Every
//! other module parameterizes over this enum rather than re-deriving the
//! bit widths itself.

use core::fmt::{self, Display};

/// Read Clock Frequency field of FLCOMP, which doubles as the dialect tag.
const READ_CLOCK_V1: u8 = 0b000;
const READ_CLOCK_V2: u8 = 0b100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Version {
    V1,
    V2,
}

impl Version {
    /// `FLCOMP` bits 17-19 (the read clock frequency field) select the
    /// dialect. Any other value is not a known descriptor generation.
    pub fn detect(read_clock: u8) -> Option<Self> {
        match read_clock {
            READ_CLOCK_V1 => Some(Version::V1),
            READ_CLOCK_V2 => Some(Version::V2),
            _ => None,
        }
    }

    /// Number of FLREG slots implemented by the descriptor.
    pub fn max_regions(self) -> usize {
        match self {
            Version::V1 => 5,
            Version::V2 => 9,
        }
    }

    /// Width, in bits, of the base/limit page fields of an FLREG word.
    pub fn region_page_bits(self) -> u32 {
        match self {
            Version::V1 => 12,
            Version::V2 => 15,
        }
    }

    pub fn region_base_mask(self) -> u32 {
        (1u32 << self.region_page_bits()) - 1
    }

    /// Bit position of the read-access field within an FLMSTR word.
    pub fn master_read_shift(self) -> u32 {
        8
    }

    /// Bit position of the write-access field within an FLMSTR word.
    pub fn master_write_shift(self) -> u32 {
        match self {
            Version::V1 => 16,
            Version::V2 => 20,
        }
    }

    /// Width, in bits, of each chip-density field of FLCOMP.
    pub fn density_bits(self) -> u32 {
        match self {
            Version::V1 => 3,
            Version::V2 => 4,
        }
    }

    /// Whether this dialect has a dedicated EC bus master row.
    pub fn has_ec_master(self) -> bool {
        matches!(self, Version::V2)
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Version::V1 => write!(f, "V1"),
            Version::V2 => write!(f, "V2"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_known_values() {
        assert_eq!(Version::detect(0), Some(Version::V1));
        assert_eq!(Version::detect(4), Some(Version::V2));
    }

    #[test]
    fn detect_unknown_value_fails() {
        assert_eq!(Version::detect(1), None);
        assert_eq!(Version::detect(7), None);
    }

    #[test]
    fn v1_has_five_regions_no_ec() {
        assert_eq!(Version::V1.max_regions(), 5);
        assert!(!Version::V1.has_ec_master());
    }

    #[test]
    fn v2_has_nine_regions_and_ec() {
        assert_eq!(Version::V2.max_regions(), 9);
        assert!(Version::V2.has_ec_master());
    }
}
