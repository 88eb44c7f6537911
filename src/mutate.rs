//! Bit-level descriptor edits: SPI frequency, EM100 mode, chip density,
//! and master lock/unlock.

use log::info;

use crate::descriptor::{
    Density, FlMstr, SPI_FREQUENCY_17MHZ, SPI_FREQUENCY_20MHZ,
};
use crate::error::{Error, Result};
use crate::ifd::Descriptor;
use crate::version::Version;

/// Bus masters in FLMSTR word order: CPU/BIOS, ME, GbE, (EC on V2 only).
pub const MASTER_CPU_BIOS: usize = 0;
pub const MASTER_ME: usize = 1;
pub const MASTER_GBE: usize = 2;

const REGION_FD: u32 = 0;
const REGION_BIOS: u32 = 1;
const REGION_ME: u32 = 2;
const REGION_GBE: u32 = 3;

pub fn set_spi_frequency(desc: &Descriptor, image: &mut [u8], freq: u8) -> Result<()> {
    let mut comp = desc.flcomp(image)?;
    comp.set_spi_frequency(freq);
    desc.set_flcomp(image, comp)?;
    info!("SPI frequency set to code {freq:#x}");
    Ok(())
}

pub fn set_em100_mode(desc: &Descriptor, image: &mut [u8]) -> Result<()> {
    let mut comp = desc.flcomp(image)?;
    comp.set_dual_output_fast_read(false);
    desc.set_flcomp(image, comp)?;
    let slow = match desc.version {
        Version::V1 => SPI_FREQUENCY_20MHZ,
        Version::V2 => SPI_FREQUENCY_17MHZ,
    };
    set_spi_frequency(desc, image, slow)?;
    info!("EM100 mode enabled (dual-output fast read disabled, frequency lowered)");
    Ok(())
}

/// `chip`: 0 writes both density fields, 1 the low field, 2 the high
/// field. Under V1, fails for densities the 3-bit field cannot
/// represent. Under V2, the encoding is not implemented (spec section
/// 4.4's documented limitation).
pub fn set_chip_density(desc: &Descriptor, image: &mut [u8], density: Density, chip: u8) -> Result<()> {
    let code = match desc.version {
        Version::V1 => density.encode_v1().ok_or(Error::UnsupportedDensity)?,
        Version::V2 => return Err(Error::UnsupportedDensity),
    };
    let mut comp = desc.flcomp(image)?;
    match chip {
        0 => {
            comp.set_density_raw(desc.version, 0, code);
            comp.set_density_raw(desc.version, 1, code);
        }
        1 => comp.set_density_raw(desc.version, 0, code),
        2 => comp.set_density_raw(desc.version, 1, code),
        _ => comp.set_density_raw(desc.version, 0, code),
    }
    desc.set_flcomp(image, comp)?;
    info!("chip density set to {density} (chip selector {chip})");
    Ok(())
}

/// V1's GbE requester ID occupies only the low 8 bits of FLMSTR3; bits
/// 8-12 of the same word are the read-access bitmap (`master_read_shift`
/// is 8), so this must never be OR'd in via `set_low16` or it clobbers
/// region 0's read bit and wipes out GbE's own read bit.
const V1_GBE_REQUESTER_ID: u8 = 0x18;

/// Reset FLMSTR1-3 to the canonical lock matrix (spec section 4.4).
pub fn lock_descriptor(desc: &Descriptor, image: &mut [u8]) -> Result<()> {
    let v = desc.version;

    let mut cpu_bios = FlMstr(0);
    for r in [REGION_FD, REGION_BIOS, REGION_GBE] {
        cpu_bios.set_read(v, r, true);
    }
    for r in [REGION_BIOS, REGION_GBE] {
        cpu_bios.set_write(v, r, true);
    }

    let mut me = FlMstr(0);
    for r in [REGION_FD, REGION_ME, REGION_GBE] {
        me.set_read(v, r, true);
    }
    for r in [REGION_ME, REGION_GBE] {
        me.set_write(v, r, true);
    }

    let mut gbe = FlMstr(0);
    gbe.set_read(v, REGION_GBE, true);
    gbe.set_write(v, REGION_GBE, true);

    match v {
        Version::V1 => {
            cpu_bios.set_low8(0);
            me.set_low8(0);
            gbe.set_low8(V1_GBE_REQUESTER_ID);
        }
        Version::V2 => {
            // The low 8 bits are master-reserved under V2; preserve them.
            let old_cpu_bios = FlMstr(desc.master_word(image, MASTER_CPU_BIOS)?);
            let old_me = FlMstr(desc.master_word(image, MASTER_ME)?);
            let old_gbe = FlMstr(desc.master_word(image, MASTER_GBE)?);
            cpu_bios.set_low8(old_cpu_bios.low8());
            me.set_low8(old_me.low8());
            gbe.set_low8(old_gbe.low8());
        }
    }

    desc.set_master_word(image, MASTER_CPU_BIOS, cpu_bios.0)?;
    desc.set_master_word(image, MASTER_ME, me.0)?;
    desc.set_master_word(image, MASTER_GBE, gbe.0)?;
    info!("descriptor locked");
    Ok(())
}

/// Grant every master access to every region it can address
/// (spec section 4.4).
pub fn unlock_descriptor(desc: &Descriptor, image: &mut [u8]) -> Result<()> {
    match desc.version {
        Version::V1 => {
            desc.set_master_word(image, MASTER_CPU_BIOS, 0xffff_0000)?;
            desc.set_master_word(image, MASTER_ME, 0xffff_0000)?;
            desc.set_master_word(image, MASTER_GBE, 0x0808_0118)?;
        }
        Version::V2 => {
            for master in [MASTER_CPU_BIOS, MASTER_ME, MASTER_GBE] {
                let old = FlMstr(desc.master_word(image, master)?);
                let mut word = FlMstr(0xffff_ff00);
                word.set_low8(old.low8());
                desc.set_master_word(image, master, word.0)?;
            }
        }
    }
    info!("descriptor unlocked");
    Ok(())
}
