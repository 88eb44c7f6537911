//! Human-readable reports: the full field-by-field dump and the
//! flashrom-compatible layout dump.

use std::fmt::Write as _;

use crate::error::Result;
use crate::ifd::Descriptor;
use crate::locator::{OEM_OFFSET, OEM_SIZE};
use crate::mutate::{MASTER_CPU_BIOS, MASTER_GBE, MASTER_ME};
use crate::region::{self, LONG_NAMES, SHORT_NAMES};
use crate::version::Version;

/// FLILL (invalid instruction opcodes) and FLPB (flash partition
/// boundary) sit right after FLCOMP in the component section.
const FLILL_OFFSET: usize = 4;
const FLPB_OFFSET: usize = 8;

fn hex_dump(out: &mut String, data: &[u8], base: usize) {
    for (row, chunk) in data.chunks(16).enumerate() {
        let _ = write!(out, "  {:08x}:", base + row * 16);
        for b in chunk {
            let _ = write!(out, " {b:02x}");
        }
        out.push('\n');
    }
}

/// Full field-by-field report (spec section 4.3, "Full dump").
pub fn full_dump(image: &[u8], desc: &Descriptor) -> Result<String> {
    let mut out = String::new();
    let v = desc.version;

    let _ = writeln!(out, "FLMAP/Descriptor version: {v}");
    let _ = writeln!(out, "Descriptor signature found at offset {:#010x}", desc.offset);

    let _ = writeln!(out, "\nFound Region Section");
    for i in 0..desc.max_regions() {
        let r = desc.region(image, i)?;
        let name = LONG_NAMES[i];
        if r.is_enabled() {
            let _ = writeln!(out, "  {name:<18} {:#010x} - {:#010x} ({} bytes)", r.base, r.limit, r.size());
        } else {
            let _ = writeln!(out, "  {name:<18} disabled");
        }
    }

    let comp = desc.flcomp(image)?;
    let _ = writeln!(out, "\nFound Component Section");
    let _ = writeln!(out, "  Read Clock Frequency:      {}", comp.fast_read_clock_text_for_read_clock(v));
    let _ = writeln!(out, "  Fast Read Clock Frequency: {}", comp.fast_read_clock().describe(v));
    let _ = writeln!(out, "  Write/Erase Clock Frequency: {}", comp.write_erase_clock().describe(v));
    let _ = writeln!(out, "  Read ID/Status Clock Frequency: {}", comp.read_id_clock().describe(v));
    let _ = writeln!(out, "  Dual Output Fast Read Support: {}", comp.dual_output_fast_read());
    for chip in 0..2u8 {
        let code = comp.density_raw(v, chip);
        let density = crate::descriptor::Density::decode(v, code)
            .map(|d| d.to_string())
            .unwrap_or_else(|| format!("unknown ({code:#x})"));
        let _ = writeln!(out, "  Component {} density: {density}", chip + 1);
    }

    let flill = region::read_u32(image, desc.fcba + FLILL_OFFSET)?;
    let _ = writeln!(out, "  Invalid Instructions:");
    for i in 0..4u32 {
        let opcode = (flill >> (i * 8)) & 0xff;
        let _ = writeln!(out, "    {i}: {opcode:#04x}");
    }

    let flpb = region::read_u32(image, desc.fcba + FLPB_OFFSET)?;
    let _ = writeln!(out, "  Flash Partition Boundary: {:#010x}", (flpb & 0xfff) << 12);

    let isl = pch_strap_word_count(image, desc)?;
    let _ = writeln!(out, "\nFound PCH Straps Section ({isl} words)");
    for i in 0..isl {
        let word = region::read_u32(image, desc.fpsba + i * 4)?;
        let _ = writeln!(out, "  PCHSTRP{i}: {word:#010x}");
    }

    let _ = writeln!(out, "\nFound Processor Strap Section (opaque)");
    let msl = processor_strap_word_count(image, desc)?;
    if msl > 0 {
        let bytes = image
            .get(desc.fmsba..desc.fmsba + msl * 4)
            .ok_or(crate::error::Error::OffsetOutOfRange { offset: desc.fmsba, len: image.len() })?;
        hex_dump(&mut out, bytes, desc.fmsba);
    }

    let _ = writeln!(out, "\nFound Master Section");
    let masters: &[(usize, &str)] = if v.has_ec_master() {
        &[(MASTER_CPU_BIOS, "CPU/BIOS"), (MASTER_ME, "ME"), (MASTER_GBE, "GbE"), (3, "EC")]
    } else {
        &[(MASTER_CPU_BIOS, "CPU/BIOS"), (MASTER_ME, "ME"), (MASTER_GBE, "GbE")]
    };
    for (master, label) in masters {
        let word = desc.master_word(image, *master)?;
        let m = crate::descriptor::FlMstr(word);
        let _ = write!(out, "  {label:<10}");
        for region_idx in 0..desc.max_regions() {
            let r = region_idx as u32;
            let read = if m.can_read(v, r) { "R" } else { "-" };
            let write = if m.can_write(v, r) { "W" } else { "-" };
            let _ = write!(out, " {}{}", read, write);
        }
        out.push('\n');
    }

    let _ = writeln!(out, "\nFound VSCC Table ({} entries)", desc.vtl / 2);
    let entry_count = (desc.vtl / 2).min(8);
    for i in 0..entry_count {
        let offset = desc.vtba + i * 8;
        let jid = region::read_u32(image, offset)?;
        let vscc = region::read_u32(image, offset + 4)?;
        let _ = writeln!(out, "  JID {jid:#010x} VSCC {vscc:#010x}");
    }

    let _ = writeln!(out, "\nOEM Section (64 bytes @ {OEM_OFFSET:#06x})");
    let oem = image
        .get(OEM_OFFSET..OEM_OFFSET + OEM_SIZE)
        .ok_or(crate::error::Error::OffsetOutOfRange { offset: OEM_OFFSET, len: image.len() })?;
    hex_dump(&mut out, oem, OEM_OFFSET);

    Ok(out)
}

fn pch_strap_word_count(image: &[u8], desc: &Descriptor) -> Result<usize> {
    let header = crate::descriptor::Header::read(
        image
            .get(desc.offset..)
            .ok_or(crate::error::Error::OffsetOutOfRange { offset: desc.offset, len: image.len() })?,
    )
    .ok_or(crate::error::Error::OffsetOutOfRange { offset: desc.offset, len: image.len() })?;
    Ok(header.flmap1.isl())
}

fn processor_strap_word_count(image: &[u8], desc: &Descriptor) -> Result<usize> {
    let header = crate::descriptor::Header::read(
        image
            .get(desc.offset..)
            .ok_or(crate::error::Error::OffsetOutOfRange { offset: desc.offset, len: image.len() })?,
    )
    .ok_or(crate::error::Error::OffsetOutOfRange { offset: desc.offset, len: image.len() })?;
    Ok(header.flmap2.msl())
}

/// Layout-file-compatible dump: one `BASE:LIMIT SHORT_NAME` line per
/// enabled region (spec section 4.3, "Layout dump").
pub fn layout_dump(image: &[u8], desc: &Descriptor) -> Result<String> {
    let mut out = String::new();
    for i in 0..desc.max_regions() {
        let r = desc.region(image, i)?;
        if !r.is_enabled() {
            continue;
        }
        let _ = writeln!(out, "{:08x}:{:08x} {}", r.base, r.limit, SHORT_NAMES[i]);
    }
    Ok(out)
}

impl crate::descriptor::FlComp {
    /// The read-clock field is never mutated; it only doubles as the
    /// dialect tag. Text form is identical to the other frequency
    /// fields' table, purely for the dump.
    fn fast_read_clock_text_for_read_clock(self, version: Version) -> &'static str {
        crate::descriptor::SpiFreqCode(self.read_clock()).describe(version)
    }
}
