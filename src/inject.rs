//! Copies a region's replacement payload into the image in place.
//!
//! This never touches `FLREG`: the region's base and limit are fixed
//! beforehand. The only decision here is alignment within the region
//! when the payload is smaller than it.

use log::info;

use crate::error::{Error, Result};
use crate::ifd::Descriptor;
use crate::region::FILE_TAGS;

/// BIOS images conventionally live at the top of their region (the
/// reset vector sits at the very end of the address space), so a
/// short BIOS payload is padded with `0xFF` at the front instead of
/// the back. Every other region is bottom-aligned.
const TOP_ALIGNED_REGION: usize = 1;

pub fn inject_region(desc: &Descriptor, image: &mut [u8], index: usize, payload: &[u8]) -> Result<()> {
    let region = desc.region(image, index)?;
    if !region.is_enabled() {
        return Err(Error::RegionDisabled(index));
    }
    let region_size = region.size();
    let payload_size = payload.len() as u64;
    if payload_size > region_size as u64 {
        return Err(Error::PayloadTooLarge { region: index, region_size, payload_size });
    }

    let base = region.base as usize;
    let limit = region.limit as usize;
    let slot = image
        .get_mut(base..=limit)
        .ok_or(Error::OffsetOutOfRange { offset: base, len: image.len() })?;

    slot.fill(0xff);
    if index == TOP_ALIGNED_REGION {
        let start = slot.len() - payload.len();
        slot[start..].copy_from_slice(payload);
    } else {
        slot[..payload.len()].copy_from_slice(payload);
    }

    let tag = FILE_TAGS.get(index).copied().unwrap_or("region");
    info!("injected {} bytes into region {index} ({tag})", payload.len());
    Ok(())
}
