//! Relayout engine: parse a flashrom-style layout file, validate the
//! requested region boundaries, and rebuild the image around them.

use log::warn;

use crate::error::{Error, Result};
use crate::ifd::Descriptor;
use crate::region::{self, Region, WRITABLE_REGIONS};

/// Smallest power of two strictly greater than `x`; `next_pow2(0) == 0`.
pub fn next_pow2(x: u32) -> u32 {
    if x == 0 {
        return 0;
    }
    let shift = 32 - x.leading_zeros();
    (1u64 << shift) as u32
}

/// `BASE:LIMIT NAME`, whitespace-separated. Returns `Ok(None)` for a line
/// that isn't the two-token shape (silently skipped), and errors only on
/// a malformed `BASE:LIMIT` pair within an otherwise well-shaped line.
fn parse_line(line: &str) -> Result<Option<(u32, u32, String)>> {
    let mut tokens = line.split_whitespace();
    let (Some(range), Some(name)) = (tokens.next(), tokens.next()) else {
        return Ok(None);
    };
    if tokens.next().is_some() {
        return Ok(None);
    }
    let Some((base_str, limit_str)) = range.split_once(':') else {
        return Err(Error::LayoutParse(line.to_string()));
    };
    let base = u32::from_str_radix(base_str, 16).map_err(|_| Error::LayoutParse(line.to_string()))?;
    let limit = u32::from_str_radix(limit_str, 16).map_err(|_| Error::LayoutParse(line.to_string()))?;
    Ok(Some((base, limit, name.to_string())))
}

/// Copy one region's payload from `old_image` into `new_image`, applying
/// the grow/shrink alignment policy (spec section 4.6, step 7).
fn copy_region(old_image: &[u8], new_image: &mut [u8], old: Region, new: Region) -> Result<()> {
    let old_size = old.size() as usize;
    let new_size = new.size() as usize;
    if old_size == 0 {
        return Ok(());
    }
    let (src_start, copy_len, dst_start) = if new_size >= old_size {
        (old.base as usize, old_size, new.base as usize + (new_size - old_size))
    } else {
        (old.base as usize + (old_size - new_size), new_size, new.base as usize)
    };
    let src = old_image
        .get(src_start..src_start + copy_len)
        .ok_or(Error::OffsetOutOfRange { offset: src_start, len: old_image.len() })?;
    let dst = new_image
        .get_mut(dst_start..dst_start + copy_len)
        .ok_or(Error::OffsetOutOfRange { offset: dst_start, len: new_image.len() })?;
    dst.copy_from_slice(src);
    Ok(())
}

/// Parse a layout file against the current descriptor, validate it, and
/// return the rebuilt image. `desc`/`old_image` describe the source.
pub fn relayout(desc: &Descriptor, old_image: &[u8], layout_text: &str) -> Result<Vec<u8>> {
    let max_regions = desc.max_regions();
    let old_regions = desc.regions(old_image)?;
    let mut new_regions = old_regions.clone();

    for line in layout_text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((base, limit, name)) = parse_line(line)? else {
            continue;
        };
        if let Some(index) = region::index_by_name(&name) {
            if index < new_regions.len() {
                new_regions[index] = Region::new(base, limit);
            }
        }
    }

    for i in 0..max_regions {
        for j in (i + 1)..max_regions {
            if new_regions[i].overlaps(new_regions[j]) {
                return Err(Error::Overlap {
                    a: region::LONG_NAMES[i].to_string(),
                    b: region::LONG_NAMES[j].to_string(),
                });
            }
        }
    }

    for i in 0..max_regions {
        if new_regions[i].is_enabled()
            && old_regions[i].is_enabled()
            && new_regions[i].size() < old_regions[i].size()
        {
            warn!(
                "region {} ({}) shrank from {} to {} bytes",
                i,
                region::LONG_NAMES[i],
                old_regions[i].size(),
                new_regions[i].size()
            );
        }
    }

    let max_limit = new_regions
        .iter()
        .filter(|r| r.is_enabled())
        .map(|r| r.limit)
        .max()
        .unwrap_or(0);
    let new_extent = next_pow2(max_limit.saturating_sub(1));
    let mut new_image = vec![0xffu8; new_extent as usize];

    for i in 0..max_regions {
        let old = old_regions[i];
        let new = new_regions[i];
        if !old.is_enabled() || !new.is_enabled() {
            continue;
        }
        copy_region(old_image, &mut new_image, old, new)?;
    }

    // The descriptor itself was copied as part of region 0; relocate it
    // in the new image rather than assume it stayed at the same offset.
    let new_desc = Descriptor::locate(&new_image)?;
    for i in 1..max_regions.min(WRITABLE_REGIONS) {
        new_desc.set_region(&mut new_image, i, new_regions[i])?;
    }

    Ok(new_image)
}
