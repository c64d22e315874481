//! Sector-addressed region container codec
//!
//! A region file holds up to 1024 variable-length records behind two fixed
//! 4096-byte header tables:
//!
//! - *location table*: 1024 big-endian u32 entries, each packing a 24-bit
//!   sector offset and an 8-bit sector count (0 = slot empty)
//! - *timestamp table*: 1024 big-endian u32 last-modified values
//!
//! Slot `i` corresponds to local coordinates `(i % 32, i / 32)`. Records are
//! aligned to 4096-byte sectors; the 8-bit sector count caps a record at 255
//! sectors, which is a structural limit of the format.

pub mod access;
pub mod entry;
pub mod reader;
pub mod writer;

pub use entry::RegionEntry;
pub use reader::RegionReader;
pub use writer::{FileRegionWriter, MemoryRegionWriter, RegionWrite};

use crate::error::RegionError;
use crate::fs::FileSystem;
use std::path::Path;

/// Fixed allocation unit for record offsets and lengths
pub const SECTOR_SIZE: usize = 4096;

/// Combined size of the two header tables
pub const HEADER_SIZE: usize = 2 * SECTOR_SIZE;

/// Slots per container
pub const SLOT_COUNT: usize = 1024;

/// Containers are 32 slots wide in each axis
pub const REGION_WIDTH: usize = 32;

/// Parse grid coordinates out of a `r.<x>.<z>.mca` file name
///
/// Both integers may be negative. Anything that is not exactly this shape is
/// rejected.
pub fn parse_region_filename(name: &str) -> Result<(i32, i32), RegionError> {
    let invalid = || RegionError::InvalidFilename(name.to_string());
    let rest = name
        .strip_prefix("r.")
        .and_then(|s| s.strip_suffix(".mca"))
        .ok_or_else(invalid)?;
    let (x_str, z_str) = rest.split_once('.').ok_or_else(invalid)?;
    let parse = |s: &str| -> Result<i32, RegionError> {
        let digits = s.strip_prefix('-').unwrap_or(s);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        s.parse().map_err(|_| invalid())
    };
    Ok((parse(x_str)?, parse(z_str)?))
}

/// Whether `path` names a region file (`*.mca`)
pub fn is_region_file_name(path: &Path) -> bool {
    path.to_string_lossy().ends_with(".mca")
}

/// Pre-open validity check: a container must hold at least the two header
/// tables to be worth opening
pub fn is_valid_region_file(fs: &dyn FileSystem, path: &Path) -> bool {
    fs.len(path).is_some_and(|len| len >= HEADER_SIZE as u64)
}
