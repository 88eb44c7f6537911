//! Crate-wide error type.
//!
//! One variant per row of the error taxonomy: every failure here is
//! fatal to the invocation, so there is no retry logic anywhere in the
//! crate — `main` logs the `Display` text and exits non-zero.

use core::fmt::{self, Display};
use std::io;

#[derive(Debug)]
pub enum Error {
    SignatureMissing,
    UnknownVersion(u8),
    InvalidRegion(usize),
    RegionDisabled(usize),
    PayloadTooLarge { region: usize, region_size: u32, payload_size: u64 },
    UnsupportedDensity,
    Overlap { a: String, b: String },
    Io(io::Error),
    LayoutParse(String),
    ConflictingModes,
    OffsetOutOfRange { offset: usize, len: usize },
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SignatureMissing => {
                write!(f, "no flash descriptor signature (0x0FF0A55A) found in image")
            }
            Error::UnknownVersion(v) => {
                write!(f, "unknown descriptor version, read clock field = {v:#x}")
            }
            Error::InvalidRegion(i) => write!(f, "region index {i} out of range"),
            Error::RegionDisabled(i) => write!(f, "region {i} is disabled, cannot inject into it"),
            Error::PayloadTooLarge { region, region_size, payload_size } => write!(
                f,
                "payload ({payload_size} bytes) is larger than region {region} ({region_size} bytes)"
            ),
            Error::UnsupportedDensity => {
                write!(f, "requested chip density is not representable in this descriptor version")
            }
            Error::Overlap { a, b } => write!(f, "regions would overlap: {a} and {b}"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::LayoutParse(line) => write!(f, "malformed layout line: {line:?}"),
            Error::ConflictingModes => {
                write!(f, "more than one mode flag was supplied; exactly one is required")
            }
            Error::OffsetOutOfRange { offset, len } => {
                write!(f, "offset {offset:#x} is out of range for a {len}-byte image")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
