//! Finds the descriptor in an image and derives the base addresses of
//! its sub-sections.

use zerocopy::FromBytes;

use crate::descriptor::{FLUMAP1, Header, MAGIC};
use crate::error::{Error, Result};
use crate::region::read_u32;
use crate::version::Version;

fn read_flumap1(image: &[u8]) -> Result<FLUMAP1> {
    let bytes = image
        .get(FLUMAP1_OFFSET..FLUMAP1_OFFSET + 4)
        .ok_or(Error::OffsetOutOfRange { offset: FLUMAP1_OFFSET, len: image.len() })?;
    FLUMAP1::read_from_prefix(bytes)
        .map(|(v, _)| v)
        .map_err(|_| Error::OffsetOutOfRange { offset: FLUMAP1_OFFSET, len: image.len() })
}

/// `FLUMAP1` is not contiguous with `FLMAP0-2`; it sits just before the
/// OEM section, at a fixed image offset.
pub const FLUMAP1_OFFSET: usize = 0xefc;

/// Fixed 64-byte OEM blob, dumped verbatim and otherwise untouched.
pub const OEM_OFFSET: usize = 0xf00;
pub const OEM_SIZE: usize = 64;

/// Scan the image at 4-byte stride for the little-endian descriptor
/// signature and return the offset of the first hit.
pub fn find_descriptor(image: &[u8]) -> Result<usize> {
    if image.len() < 4 {
        return Err(Error::SignatureMissing);
    }
    let bound = image.len() - 4;
    let mut offset = 0;
    while offset <= bound {
        if read_u32(image, offset)? == MAGIC {
            return Ok(offset);
        }
        offset += 4;
    }
    Err(Error::SignatureMissing)
}

/// Read the descriptor header at `descriptor_offset` and determine the
/// dialect from FLCOMP's read-clock field.
pub fn detect_version(image: &[u8], descriptor_offset: usize) -> Result<Version> {
    let header = Header::read(
        image
            .get(descriptor_offset..)
            .ok_or(Error::OffsetOutOfRange { offset: descriptor_offset, len: image.len() })?,
    )
    .ok_or(Error::OffsetOutOfRange { offset: descriptor_offset, len: image.len() })?;
    let fcba = header.flmap0.fcba();
    let flcomp = read_u32(image, fcba)?;
    let read_clock = ((flcomp >> 17) & 0x7) as u8;
    Version::detect(read_clock).ok_or(Error::UnknownVersion(read_clock))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Section {
    Frba,
    Fcba,
    Fpsba,
    Fmba,
    Fmsba,
    Vtba,
}

/// Absolute image offset of the given sub-section, derived from the
/// descriptor header's FLMAP words. These are already absolute byte
/// offsets from image origin, not offsets relative to the descriptor's
/// own location (spec section 6).
pub fn section_base(image: &[u8], descriptor_offset: usize, section: Section) -> Result<usize> {
    let header = Header::read(
        image
            .get(descriptor_offset..)
            .ok_or(Error::OffsetOutOfRange { offset: descriptor_offset, len: image.len() })?,
    )
    .ok_or(Error::OffsetOutOfRange { offset: descriptor_offset, len: image.len() })?;
    let base = match section {
        Section::Frba => header.flmap0.frba(),
        Section::Fcba => header.flmap0.fcba(),
        Section::Fpsba => header.flmap1.fpsba(),
        Section::Fmba => header.flmap1.fmba(),
        Section::Fmsba => header.flmap2.fmsba(),
        Section::Vtba => read_flumap1(image)?.vtba(),
    };
    if base >= image.len() {
        return Err(Error::OffsetOutOfRange { offset: base, len: image.len() });
    }
    Ok(base)
}

/// Raw `VTL` field from `FLUMAP1`: the VSCC table length in DWords.
/// Each JID/VSCC entry occupies 2 DWords, so entry count is `vtl / 2`.
pub fn vtl_raw(image: &[u8]) -> Result<usize> {
    Ok(read_flumap1(image)?.vtl())
}
