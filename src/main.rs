//! Command-line front end for inspecting and editing an Intel Firmware
//! Descriptor embedded in a SPI flash image.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use ifdtool::cli::{Cli, Mode};
use ifdtool::descriptor::{Density, SpiFreqCode};
use ifdtool::error::{Error, Result};
use ifdtool::region::FILE_TAGS;
use ifdtool::{dump, inject, layout, mutate, Descriptor};

fn output_path(input: &Path) -> PathBuf {
    let mut name = input.as_os_str().to_owned();
    name.push(".new");
    PathBuf::from(name)
}

fn resolve_region(spec: &str) -> Result<usize> {
    if let Ok(index) = spec.parse::<usize>() {
        return Ok(index);
    }
    ifdtool::region::index_by_name(spec).ok_or_else(|| Error::LayoutParse(spec.to_string()))
}

fn write_output(input: &Path, image: &[u8]) -> Result<()> {
    let out = output_path(input);
    fs::write(&out, image)?;
    info!("wrote {}", out.display());
    Ok(())
}

fn run(cli: &Cli) -> Result<()> {
    let mode = cli.mode()?;
    let mut image = fs::read(&cli.file)?;
    info!("loaded {} ({} bytes)", cli.file.display(), image.len());

    let desc = Descriptor::locate(&image)?;
    info!("descriptor version {} at offset {:#x}", desc.version, desc.offset);
    info!("dispatching mode {mode:?}");

    match mode {
        Mode::Dump => {
            print!("{}", dump::full_dump(&image, &desc)?);
        }
        Mode::LayoutDump => {
            let report = dump::layout_dump(&image, &desc)?;
            match &cli.output {
                Some(path) => {
                    fs::write(path, report)?;
                    info!("layout written to {}", path.display());
                }
                None => print!("{report}"),
            }
        }
        Mode::Extract => {
            let dir = cli.output.clone().unwrap_or_else(|| PathBuf::from("."));
            for i in 0..desc.max_regions() {
                let region = desc.region(&image, i)?;
                if !region.is_enabled() {
                    continue;
                }
                let tag = FILE_TAGS.get(i).copied().unwrap_or("region");
                let path = dir.join(format!("flashregion_{i}_{tag}.bin"));
                let bytes = image
                    .get(region.base as usize..=region.limit as usize)
                    .ok_or(Error::OffsetOutOfRange { offset: region.base as usize, len: image.len() })?;
                fs::write(&path, bytes)?;
                info!("extracted region {i} ({tag}) to {}", path.display());
            }
        }
        Mode::Inject { region, file } => {
            let index = resolve_region(&region)?;
            let payload = fs::read(&file)?;
            inject::inject_region(&desc, &mut image, index, &payload)?;
            write_output(&cli.file, &image)?;
        }
        Mode::NewLayout(layout_path) => {
            let layout_text = fs::read_to_string(&layout_path)?;
            let new_image = layout::relayout(&desc, &image, &layout_text)?;
            write_output(&cli.file, &new_image)?;
        }
        Mode::SpiFreq(mhz) => {
            let code = SpiFreqCode::from_cli_mhz(mhz, desc.version)
                .ok_or_else(|| Error::LayoutParse(format!("unsupported SPI frequency {mhz}MHz")))?;
            mutate::set_spi_frequency(&desc, &mut image, code.0)?;
            write_output(&cli.file, &image)?;
        }
        Mode::Density { code, chip } => {
            let density = Density::from_cli_code(code)
                .ok_or_else(|| Error::LayoutParse(format!("unsupported density code {code}")))?;
            mutate::set_chip_density(&desc, &mut image, density, chip)?;
            write_output(&cli.file, &image)?;
        }
        Mode::Em100 => {
            mutate::set_em100_mode(&desc, &mut image)?;
            write_output(&cli.file, &image)?;
        }
        Mode::Lock => {
            mutate::lock_descriptor(&desc, &mut image)?;
            write_output(&cli.file, &image)?;
        }
        Mode::Unlock => {
            mutate::unlock_descriptor(&desc, &mut image)?;
            write_output(&cli.file, &image)?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let env = env_logger::Env::default().default_filter_or("info");
    env_logger::Builder::from_env(env).init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
