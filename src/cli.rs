//! Command-line argument parsing. Mode flags are mutually exclusive:
//! exactly one selects the operation `main` dispatches to.

use std::path::PathBuf;

use clap::Parser;


/// Inspect and edit the Intel Firmware Descriptor of a SPI flash image.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Print the full field-by-field descriptor report
    #[arg(short = 'd', long, conflicts_with_all = ["layout_dump", "extract", "inject", "new_layout", "spi_freq", "density", "em100", "lock", "unlock"])]
    pub dump: bool,

    /// Print a flashrom-compatible layout (one `BASE:LIMIT NAME` line per region)
    #[arg(long = "layout", conflicts_with_all = ["dump", "extract", "inject", "new_layout", "spi_freq", "density", "em100", "lock", "unlock"])]
    pub layout_dump: bool,

    /// Extract every enabled region to `flashregion_<i>_<tag>.bin`
    #[arg(short = 'x', long, conflicts_with_all = ["dump", "layout_dump", "inject", "new_layout", "spi_freq", "density", "em100", "lock", "unlock"])]
    pub extract: bool,

    /// Inject a file into one region, given as `<region>:<file>`
    #[arg(short = 'i', long, value_name = "REGION:FILE", conflicts_with_all = ["dump", "layout_dump", "extract", "new_layout", "spi_freq", "density", "em100", "lock", "unlock"])]
    pub inject: Option<String>,

    /// Relayout regions from a flashrom-style layout file
    #[arg(short = 'n', long = "new-layout", value_name = "FILE", conflicts_with_all = ["dump", "layout_dump", "extract", "inject", "spi_freq", "density", "em100", "lock", "unlock"])]
    pub new_layout: Option<PathBuf>,

    /// Set the SPI frequency in MHz (17, 20, 30, 33, 48, 50)
    #[arg(short = 'f', long, conflicts_with_all = ["dump", "layout_dump", "extract", "inject", "new_layout", "density", "em100", "lock", "unlock"])]
    pub spi_freq: Option<u32>,

    /// Set the chip density in MB (512 means 512KB): 512, 1, 2, 4, 8, 16, 32, 64
    #[arg(short = 'D', long, conflicts_with_all = ["dump", "layout_dump", "extract", "inject", "new_layout", "spi_freq", "em100", "lock", "unlock"])]
    pub density: Option<u32>,

    /// Which chip select the density applies to (0 = both, 1, 2)
    #[arg(short = 'c', long, default_value_t = 0)]
    pub chip: u8,

    /// Switch the descriptor to EM100 emulator-friendly settings
    #[arg(short = 'e', long, conflicts_with_all = ["dump", "layout_dump", "extract", "inject", "new_layout", "spi_freq", "density", "lock", "unlock"])]
    pub em100: bool,

    /// Lock the access-control masters to the canonical matrix
    #[arg(short = 'l', long, conflicts_with_all = ["dump", "layout_dump", "extract", "inject", "new_layout", "spi_freq", "density", "em100", "unlock"])]
    pub lock: bool,

    /// Grant every master full access
    #[arg(short = 'u', long, conflicts_with_all = ["dump", "layout_dump", "extract", "inject", "new_layout", "spi_freq", "density", "em100", "lock"])]
    pub unlock: bool,

    /// Directory to write extracted regions to (used with --extract)
    #[arg(short = 'O', long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Image file to read
    pub file: PathBuf,
}

#[derive(Debug)]
pub enum Mode {
    Dump,
    LayoutDump,
    Extract,
    Inject { region: String, file: PathBuf },
    NewLayout(PathBuf),
    SpiFreq(u32),
    Density { code: u32, chip: u8 },
    Em100,
    Lock,
    Unlock,
}

impl Cli {
    /// Resolve the mutually-exclusive mode flags into a single `Mode`.
    /// `conflicts_with_all` on each flag already rejects combinations of
    /// two or more at parse time, so only the "none selected" case needs
    /// handling here.
    pub fn mode(&self) -> crate::error::Result<Mode> {
        if self.dump {
            return Ok(Mode::Dump);
        }
        if self.layout_dump {
            return Ok(Mode::LayoutDump);
        }
        if self.extract {
            return Ok(Mode::Extract);
        }
        if let Some(spec) = &self.inject {
            let (region, file) = spec
                .split_once(':')
                .ok_or_else(|| crate::error::Error::LayoutParse(spec.clone()))?;
            return Ok(Mode::Inject { region: region.to_string(), file: PathBuf::from(file) });
        }
        if let Some(path) = &self.new_layout {
            return Ok(Mode::NewLayout(path.clone()));
        }
        if let Some(freq) = self.spi_freq {
            return Ok(Mode::SpiFreq(freq));
        }
        if let Some(code) = self.density {
            return Ok(Mode::Density { code, chip: self.chip });
        }
        if self.em100 {
            return Ok(Mode::Em100);
        }
        if self.lock {
            return Ok(Mode::Lock);
        }
        if self.unlock {
            return Ok(Mode::Unlock);
        }
        Err(crate::error::Error::ConflictingModes)
    }
}
