//! Region container writers
//!
//! A writer accumulates kept records verbatim: each record's serialized bytes
//! are appended at the current cursor and zero-padded to the next sector
//! boundary, and the slot's offset/size/timestamp are tracked in in-memory
//! tables keyed by the record's original index. `finalize` converts the
//! tables back to sector units and produces the header, then durably flushes.
//! A writer finalized with zero entries still yields a well-formed all-empty
//! container.

use crate::error::RegionError;
use crate::fs::FileSystem;
use crate::region::entry::RegionEntry;
use crate::region::{HEADER_SIZE, SECTOR_SIZE, SLOT_COUNT};
use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Write seam for region containers
pub trait RegionWrite: Send {
    /// Append one record's raw serialized bytes and account its slot
    fn write_entry(&mut self, entry: &RegionEntry) -> Result<(), RegionError>;

    /// Write the header tables and durably flush the container
    fn finalize(&mut self) -> Result<(), RegionError>;
}

/// Per-slot accounting shared by both writer implementations
#[derive(Debug)]
struct SlotTables {
    offsets: Vec<u64>,
    sizes: Vec<u64>,
    timestamps: Vec<u32>,
}

impl SlotTables {
    fn new() -> Self {
        Self {
            offsets: vec![0; SLOT_COUNT],
            sizes: vec![0; SLOT_COUNT],
            timestamps: vec![0; SLOT_COUNT],
        }
    }

    fn record(&mut self, index: usize, offset: u64, size: u64, timestamp: u32) {
        self.offsets[index] = offset;
        self.sizes[index] = size;
        self.timestamps[index] = timestamp;
    }

    /// Encode both header tables in wire order (location, then timestamps)
    fn encode_header(&self) -> Vec<u8> {
        let mut header = Vec::with_capacity(HEADER_SIZE);
        for i in 0..SLOT_COUNT {
            let off_sectors = (self.offsets[i] / SECTOR_SIZE as u64) as u32;
            let size_sectors = (self.sizes[i] / SECTOR_SIZE as u64) as u32;
            let v = (off_sectors << 8) | (size_sectors & 0xFF);
            header.extend_from_slice(&v.to_be_bytes());
        }
        for i in 0..SLOT_COUNT {
            header.extend_from_slice(&self.timestamps[i].to_be_bytes());
        }
        header
    }
}

fn sector_padding(written: usize) -> usize {
    (SECTOR_SIZE - written % SECTOR_SIZE) % SECTOR_SIZE
}

/// Writer over a real file: records are written through as they arrive, the
/// header lands at offset 0 on finalize, followed by `sync_all`
pub struct FileRegionWriter {
    file: std::fs::File,
    cursor: u64,
    tables: SlotTables,
}

impl FileRegionWriter {
    /// Create (or truncate) the container at `path`
    pub fn create(path: &Path) -> Result<Self, RegionError> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.write_all(&[0u8; HEADER_SIZE])?;
        Ok(Self {
            file,
            cursor: HEADER_SIZE as u64,
            tables: SlotTables::new(),
        })
    }
}

impl RegionWrite for FileRegionWriter {
    fn write_entry(&mut self, entry: &RegionEntry) -> Result<(), RegionError> {
        let serialized = entry.serialized_bytes()?;
        let start = self.cursor;
        self.file.seek(SeekFrom::Start(start))?;
        self.file.write_all(&serialized)?;
        let pad = sector_padding(serialized.len());
        if pad > 0 {
            self.file.write_all(&vec![0u8; pad])?;
        }
        let size = (serialized.len() + pad) as u64;
        self.cursor = start + size;
        self.tables
            .record(entry.region_index(), start, size, entry.modified_time());
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), RegionError> {
        let header = self.tables.encode_header();
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&header)?;
        self.file.sync_all()?;
        Ok(())
    }
}

/// Writer that assembles the whole container in memory and hands it to the
/// backend as one blob on finalize (header first, then the record stream)
pub struct MemoryRegionWriter {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
    body: Vec<u8>,
    cursor: u64,
    tables: SlotTables,
}

impl MemoryRegionWriter {
    /// Create a buffered writer targeting `path` on `fs`
    pub fn new(fs: Arc<dyn FileSystem>, path: PathBuf) -> Self {
        Self {
            fs,
            path,
            body: Vec::new(),
            cursor: HEADER_SIZE as u64,
            tables: SlotTables::new(),
        }
    }
}

impl RegionWrite for MemoryRegionWriter {
    fn write_entry(&mut self, entry: &RegionEntry) -> Result<(), RegionError> {
        let serialized = entry.serialized_bytes()?;
        let start = self.cursor;
        self.body.extend_from_slice(&serialized);
        let pad = sector_padding(serialized.len());
        self.body.extend(std::iter::repeat(0u8).take(pad));
        let size = (serialized.len() + pad) as u64;
        self.cursor = start + size;
        self.tables
            .record(entry.region_index(), start, size, entry.modified_time());
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), RegionError> {
        let mut out = self.tables.encode_header();
        out.extend_from_slice(&self.body);
        self.fs.write(&self.path, &out)?;
        Ok(())
    }
}
