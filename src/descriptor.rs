//! Typed overlays for the fixed-offset words of the flash descriptor.
//!
//! Every bit position silicon cares about is concentrated here: the
//! `FLMAP*`/`FLUMAP1` section pointers, `FLCOMP`'s clock/density fields,
//! and the per-master `FLMSTR` access bits. Everything downstream
//! (locator, mutators, dumper) goes through these typed accessors rather
//! than raw shifts, matching the newtype-per-word approach the reference
//! descriptor code uses for `FLMAP0`/`FLMAP1`/`FLMAP2`.

use core::fmt::{self, Display};

use bitfield_struct::bitfield;
use zerocopy::FromBytes;
use zerocopy_derive::{FromBytes, Immutable, IntoBytes};

use crate::version::Version;

pub const MAGIC: u32 = 0x0ff0_a55a;

#[bitfield(u32)]
#[derive(Immutable, IntoBytes, FromBytes)]
pub struct FLMAP0 {
    fcba_raw: u8,
    #[bits(2)]
    nc_raw: u8,
    #[bits(6)]
    _reserved0: u8,
    frba_raw: u8,
    #[bits(3)]
    nr_raw: u8,
    #[bits(5)]
    _reserved1: u8,
}

impl FLMAP0 {
    pub fn fcba(self) -> usize {
        (self.fcba_raw() as usize) << 4
    }
    pub fn nc(self) -> usize {
        self.nc_raw() as usize + 1
    }
    pub fn frba(self) -> usize {
        (self.frba_raw() as usize) << 4
    }
    pub fn nr(self) -> usize {
        self.nr_raw() as usize + 1
    }
}

#[bitfield(u32)]
#[derive(Immutable, IntoBytes, FromBytes)]
pub struct FLMAP1 {
    fmba_raw: u8,
    #[bits(3)]
    nm_raw: u8,
    #[bits(5)]
    _reserved0: u8,
    fpsba_raw: u8,
    isl_raw: u8,
}

impl FLMAP1 {
    pub fn fmba(self) -> usize {
        (self.fmba_raw() as usize) << 4
    }
    pub fn nm(self) -> usize {
        self.nm_raw() as usize + 1
    }
    pub fn fpsba(self) -> usize {
        (self.fpsba_raw() as usize) << 4
    }
    pub fn isl(self) -> usize {
        self.isl_raw() as usize
    }
}

#[bitfield(u32)]
#[derive(Immutable, IntoBytes, FromBytes)]
pub struct FLMAP2 {
    fmsba_raw: u8,
    msl_raw: u8,
    _reserved0: u16,
}

impl FLMAP2 {
    pub fn fmsba(self) -> usize {
        (self.fmsba_raw() as usize) << 4
    }
    pub fn msl(self) -> usize {
        self.msl_raw() as usize
    }
}

/// Descriptor Upper Map. Not adjacent to FLMAP0-2; lives just before the
/// OEM section at a fixed image offset (see `locator::FLUMAP1_OFFSET`).
#[bitfield(u32)]
#[derive(Immutable, IntoBytes, FromBytes)]
pub struct FLUMAP1 {
    vtba_raw: u8,
    vtl_raw: u8,
    _reserved0: u16,
}

impl FLUMAP1 {
    pub fn vtba(self) -> usize {
        (self.vtba_raw() as usize) << 4
    }
    /// Number of VSCC half-entries at VTBA.
    pub fn vtl(self) -> usize {
        self.vtl_raw() as usize
    }
}

#[derive(Immutable, IntoBytes, FromBytes, Clone, Copy, Debug)]
#[repr(C)]
pub struct Header {
    pub magic: u32,
    pub flmap0: FLMAP0,
    pub flmap1: FLMAP1,
    pub flmap2: FLMAP2,
}

impl Header {
    pub const SIZE: usize = core::mem::size_of::<Self>();

    pub fn read(data: &[u8]) -> Option<Self> {
        Header::read_from_prefix(data).map(|(h, _)| h).ok()
    }
}

/// The SPI clock frequency code points shared by the read-id-status,
/// write/erase and fast-read fields of FLCOMP (3 bits, values 0-7; not
/// all are assigned).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpiFreqCode(pub u8);

pub const SPI_FREQUENCY_20MHZ: u8 = 0;
pub const SPI_FREQUENCY_33MHZ: u8 = 1;
pub const SPI_FREQUENCY_48MHZ: u8 = 2;
pub const SPI_FREQUENCY_50MHZ_30MHZ: u8 = 4;
pub const SPI_FREQUENCY_17MHZ: u8 = 6;

impl SpiFreqCode {
    /// Text representation of this frequency code; `SPI_FREQUENCY_50MHZ_30MHZ`
    /// reads differently depending on dialect (V1 chips run it at 50MHz,
    /// V2 chips at 30MHz).
    pub fn describe(self, version: Version) -> &'static str {
        match self.0 {
            SPI_FREQUENCY_20MHZ => "20MHz",
            SPI_FREQUENCY_33MHZ => "33MHz",
            SPI_FREQUENCY_48MHZ => "48MHz",
            SPI_FREQUENCY_50MHZ_30MHZ => match version {
                Version::V1 => "50MHz",
                Version::V2 => "30MHz",
            },
            SPI_FREQUENCY_17MHZ => "17MHz",
            _ => "unknown",
        }
    }

    /// Parse the CLI's `-f` argument (a MHz value) into the matching code
    /// point. `50` is only valid under V1 and `30` only under V2, since
    /// they share the same 3-bit encoding.
    pub fn from_cli_mhz(mhz: u32, version: Version) -> Option<Self> {
        let code = match (mhz, version) {
            (20, _) => SPI_FREQUENCY_20MHZ,
            (33, _) => SPI_FREQUENCY_33MHZ,
            (48, _) => SPI_FREQUENCY_48MHZ,
            (50, Version::V1) => SPI_FREQUENCY_50MHZ_30MHZ,
            (30, Version::V2) => SPI_FREQUENCY_50MHZ_30MHZ,
            (17, _) => SPI_FREQUENCY_17MHZ,
            _ => return None,
        };
        Some(SpiFreqCode(code))
    }
}

impl Display for SpiFreqCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Chip density, shared representation across both dialects. The
/// encodable subset differs: see `Density::encode`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Density {
    Kb512,
    Mb1,
    Mb2,
    Mb4,
    Mb8,
    Mb16,
    Mb32,
    Mb64,
    Unused,
}

impl Density {
    const V1_TABLE: &'static [(u8, Density)] = &[
        (0, Density::Kb512),
        (1, Density::Mb1),
        (2, Density::Mb2),
        (3, Density::Mb4),
        (4, Density::Mb8),
        (5, Density::Mb16),
    ];

    pub fn decode_v1(code: u8) -> Option<Density> {
        Self::V1_TABLE
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, d)| *d)
    }

    /// Encode this density for IFD V1's 3-bit field. `None` for anything
    /// the field cannot represent (32MB, 64MB, Unused): see spec section
    /// 4.4's `set_chipdensity` edge case.
    pub fn encode_v1(self) -> Option<u8> {
        Self::V1_TABLE
            .iter()
            .find(|(_, d)| *d == self)
            .map(|(c, _)| *c)
    }

    const V2_TABLE: &'static [Density] = &[
        Density::Kb512,
        Density::Mb1,
        Density::Mb2,
        Density::Mb4,
        Density::Mb8,
        Density::Mb16,
        Density::Mb32,
        Density::Mb64,
        Density::Unused,
    ];

    /// Decode a raw density field for the dumper, honoring the dialect's
    /// field width (3 bits for V1, 4 for V2).
    pub fn decode(version: Version, code: u8) -> Option<Density> {
        match version {
            Version::V1 => Self::decode_v1(code),
            Version::V2 => Self::V2_TABLE.get(code as usize).copied(),
        }
    }

    /// Parse the CLI's `-D` density argument: `512` means 512KB, every
    /// other accepted value is a plain MB count.
    pub fn from_cli_code(code: u32) -> Option<Density> {
        match code {
            512 => Some(Density::Kb512),
            1 => Some(Density::Mb1),
            2 => Some(Density::Mb2),
            4 => Some(Density::Mb4),
            8 => Some(Density::Mb8),
            16 => Some(Density::Mb16),
            32 => Some(Density::Mb32),
            64 => Some(Density::Mb64),
            _ => None,
        }
    }
}

impl Display for Density {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Density::Kb512 => "512KB",
            Density::Mb1 => "1MB",
            Density::Mb2 => "2MB",
            Density::Mb4 => "4MB",
            Density::Mb8 => "8MB",
            Density::Mb16 => "16MB",
            Density::Mb32 => "32MB",
            Density::Mb64 => "64MB",
            Density::Unused => "UNUSED",
        };
        write!(f, "{s}")
    }
}

/// FLCOMP: SPI clock frequencies and chip densities. Field widths for
/// density depend on dialect, so this wraps the raw word rather than
/// using a fixed-width bitfield struct.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlComp(pub u32);

const READ_CLOCK_SHIFT: u32 = 17;
const FAST_READ_CLOCK_SHIFT: u32 = 21;
const WRITE_ERASE_CLOCK_SHIFT: u32 = 24;
const READ_ID_CLOCK_SHIFT: u32 = 27;
const FREQ_FIELD_BITS: u32 = 3;
const FREQ_FIELD_MASK: u32 = (1 << FREQ_FIELD_BITS) - 1;
const DUAL_OUTPUT_FAST_READ_BIT: u32 = 30;

impl FlComp {
    fn field(self, shift: u32) -> u8 {
        ((self.0 >> shift) & FREQ_FIELD_MASK) as u8
    }

    fn set_field(&mut self, shift: u32, value: u8) {
        let mask = FREQ_FIELD_MASK << shift;
        self.0 = (self.0 & !mask) | (((value as u32) & FREQ_FIELD_MASK) << shift);
    }

    pub fn read_clock(self) -> u8 {
        self.field(READ_CLOCK_SHIFT)
    }

    pub fn fast_read_clock(self) -> SpiFreqCode {
        SpiFreqCode(self.field(FAST_READ_CLOCK_SHIFT))
    }

    pub fn write_erase_clock(self) -> SpiFreqCode {
        SpiFreqCode(self.field(WRITE_ERASE_CLOCK_SHIFT))
    }

    pub fn read_id_clock(self) -> SpiFreqCode {
        SpiFreqCode(self.field(READ_ID_CLOCK_SHIFT))
    }

    pub fn dual_output_fast_read(self) -> bool {
        (self.0 >> DUAL_OUTPUT_FAST_READ_BIT) & 1 != 0
    }

    pub fn set_dual_output_fast_read(&mut self, enabled: bool) {
        if enabled {
            self.0 |= 1 << DUAL_OUTPUT_FAST_READ_BIT;
        } else {
            self.0 &= !(1 << DUAL_OUTPUT_FAST_READ_BIT);
        }
    }

    /// Clear the three mutable frequency fields (fast-read, write/erase,
    /// read-id-status) and set all three to `freq`, leaving the
    /// read-clock (dialect-detection) field untouched.
    pub fn set_spi_frequency(&mut self, freq: u8) {
        self.set_field(FAST_READ_CLOCK_SHIFT, freq);
        self.set_field(WRITE_ERASE_CLOCK_SHIFT, freq);
        self.set_field(READ_ID_CLOCK_SHIFT, freq);
    }

    fn density_shift(version: Version, chip: u8) -> u32 {
        (chip as u32) * version.density_bits()
    }

    pub fn density_raw(self, version: Version, chip: u8) -> u8 {
        let shift = Self::density_shift(version, chip);
        let mask = (1u32 << version.density_bits()) - 1;
        ((self.0 >> shift) & mask) as u8
    }

    pub fn set_density_raw(&mut self, version: Version, chip: u8, value: u8) {
        let shift = Self::density_shift(version, chip);
        let mask = (1u32 << version.density_bits()) - 1;
        self.0 = (self.0 & !(mask << shift)) | (((value as u32) & mask) << shift);
    }
}

/// FLMSTR word: per-master region read/write access bits. Shift
/// positions depend on dialect (see `Version::master_{read,write}_shift`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlMstr(pub u32);

impl FlMstr {
    pub fn can_read(self, version: Version, region: u32) -> bool {
        (self.0 >> (version.master_read_shift() + region)) & 1 != 0
    }

    pub fn can_write(self, version: Version, region: u32) -> bool {
        (self.0 >> (version.master_write_shift() + region)) & 1 != 0
    }

    pub fn set_read(&mut self, version: Version, region: u32, allow: bool) {
        let bit = 1u32 << (version.master_read_shift() + region);
        if allow {
            self.0 |= bit;
        } else {
            self.0 &= !bit;
        }
    }

    pub fn set_write(&mut self, version: Version, region: u32, allow: bool) {
        let bit = 1u32 << (version.master_write_shift() + region);
        if allow {
            self.0 |= bit;
        } else {
            self.0 &= !bit;
        }
    }

    /// Low 16 bits: V1 requester ID, V2 reserved (must be preserved).
    pub fn low16(self) -> u16 {
        (self.0 & 0xffff) as u16
    }

    pub fn set_low16(&mut self, value: u16) {
        self.0 = (self.0 & 0xffff_0000) | value as u32;
    }

    /// Low 8 bits only, as used by the V2 "preserve reserved bits" rule.
    pub fn low8(self) -> u8 {
        (self.0 & 0xff) as u8
    }

    pub fn set_low8(&mut self, value: u8) {
        self.0 = (self.0 & 0xffff_ff00) | value as u32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flcomp_set_spi_frequency_leaves_read_clock() {
        let mut c = FlComp(0);
        c.set_field(READ_CLOCK_SHIFT, SPI_FREQUENCY_20MHZ);
        c.set_spi_frequency(SPI_FREQUENCY_48MHZ);
        assert_eq!(c.read_clock(), SPI_FREQUENCY_20MHZ);
        assert_eq!(c.fast_read_clock(), SpiFreqCode(SPI_FREQUENCY_48MHZ));
        assert_eq!(c.write_erase_clock(), SpiFreqCode(SPI_FREQUENCY_48MHZ));
        assert_eq!(c.read_id_clock(), SpiFreqCode(SPI_FREQUENCY_48MHZ));
    }

    #[test]
    fn flcomp_dual_output_toggle() {
        let mut c = FlComp(0);
        assert!(!c.dual_output_fast_read());
        c.set_dual_output_fast_read(true);
        assert!(c.dual_output_fast_read());
        c.set_dual_output_fast_read(false);
        assert!(!c.dual_output_fast_read());
    }

    #[test]
    fn density_round_trip_v1() {
        let mut c = FlComp(0);
        c.set_density_raw(Version::V1, 0, 4);
        assert_eq!(c.density_raw(Version::V1, 0), 4);
        assert_eq!(Density::decode_v1(4), Some(Density::Mb8));
    }

    #[test]
    fn density_v1_unencodable_values() {
        assert_eq!(Density::Mb32.encode_v1(), None);
        assert_eq!(Density::Mb64.encode_v1(), None);
        assert_eq!(Density::Unused.encode_v1(), None);
        assert_eq!(Density::Mb8.encode_v1(), Some(4));
    }

    #[test]
    fn flmstr_read_write_bits_v1() {
        let mut m = FlMstr(0);
        m.set_read(Version::V1, 0, true);
        m.set_write(Version::V1, 1, true);
        assert!(m.can_read(Version::V1, 0));
        assert!(!m.can_read(Version::V1, 1));
        assert!(m.can_write(Version::V1, 1));
        assert!(!m.can_write(Version::V1, 0));
    }

    #[test]
    fn flmstr_low16_preserved() {
        let mut m = FlMstr(0xffff_0000);
        m.set_low16(0x0118);
        assert_eq!(m.0, 0xffff_0118);
        assert_eq!(m.low16(), 0x0118);
    }

    #[test]
    fn density_decode_dispatches_on_version() {
        assert_eq!(Density::decode(Version::V1, 4), Some(Density::Mb8));
        assert_eq!(Density::decode(Version::V2, 6), Some(Density::Mb32));
        assert_eq!(Density::decode(Version::V2, 8), Some(Density::Unused));
    }

    #[test]
    fn density_from_cli_code() {
        assert_eq!(Density::from_cli_code(512), Some(Density::Kb512));
        assert_eq!(Density::from_cli_code(64), Some(Density::Mb64));
        assert_eq!(Density::from_cli_code(3), None);
    }

    #[test]
    fn spi_freq_from_cli_mhz_disambiguates_shared_code() {
        assert_eq!(SpiFreqCode::from_cli_mhz(50, Version::V1), Some(SpiFreqCode(SPI_FREQUENCY_50MHZ_30MHZ)));
        assert_eq!(SpiFreqCode::from_cli_mhz(50, Version::V2), None);
        assert_eq!(SpiFreqCode::from_cli_mhz(30, Version::V2), Some(SpiFreqCode(SPI_FREQUENCY_50MHZ_30MHZ)));
        assert_eq!(SpiFreqCode::from_cli_mhz(17, Version::V1), Some(SpiFreqCode(SPI_FREQUENCY_17MHZ)));
    }

    #[test]
    fn header_parses_known_bytes() {
        let mut bytes = [0u8; Header::SIZE];
        bytes[0..4].copy_from_slice(&MAGIC.to_le_bytes());
        let flmap0: u32 = (2 << 24) | (0x40 << 16);
        bytes[4..8].copy_from_slice(&flmap0.to_le_bytes());
        let header = Header::read(&bytes).unwrap();
        assert_eq!(header.magic, MAGIC);
        assert_eq!(header.flmap0.frba(), 0x400);
        assert_eq!(header.flmap0.nr(), 3);
    }
}
