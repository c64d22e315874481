//! Region container reader

use crate::error::RegionError;
use crate::region::access::{FileAccess, MemoryAccess, RandomAccess};
use crate::region::entry::RegionEntry;
use crate::region::{parse_region_filename, HEADER_SIZE, SECTOR_SIZE, SLOT_COUNT};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

/// Per-slot tables decoded from the container header
struct HeaderTables {
    /// Absolute byte offsets, 0 = empty
    offsets: Vec<u64>,
    /// Slot byte lengths (sector aligned), 0 = empty
    lengths: Vec<u64>,
    timestamps: Vec<u32>,
}

/// Read-only view over one region container
///
/// The two header tables are parsed lazily on first access and cached, so
/// the container order returned by [`RegionReader::entries`] is stable within
/// one reader instance.
pub struct RegionReader {
    access: Arc<dyn RandomAccess>,
    x: i32,
    z: i32,
    tables: Mutex<Option<Arc<HeaderTables>>>,
}

impl RegionReader {
    /// Open a real region file; grid coordinates come from the file name
    pub fn open(path: &Path) -> Result<Self, RegionError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (x, z) = parse_region_filename(&name)?;
        let access = FileAccess::open(path)?;
        Ok(Self::with_access(Arc::new(access), x, z))
    }

    /// Open a container already buffered in memory, named like a region file
    pub fn from_bytes(name: &str, bytes: Vec<u8>) -> Result<Self, RegionError> {
        let (x, z) = parse_region_filename(name)?;
        Ok(Self::with_access(Arc::new(MemoryAccess::new(bytes)), x, z))
    }

    fn with_access(access: Arc<dyn RandomAccess>, x: i32, z: i32) -> Self {
        Self {
            access,
            x,
            z,
            tables: Mutex::new(None),
        }
    }

    /// Grid x coordinate of this container
    pub fn x(&self) -> i32 {
        self.x
    }

    /// Grid z coordinate of this container
    pub fn z(&self) -> i32 {
        self.z
    }

    fn tables(&self) -> Result<Arc<HeaderTables>, RegionError> {
        let mut cached = self.tables.lock();
        if let Some(t) = cached.as_ref() {
            return Ok(Arc::clone(t));
        }
        if self.access.len() < HEADER_SIZE as u64 {
            return Err(RegionError::TruncatedHeader {
                len: self.access.len(),
            });
        }
        let mut loc = vec![0u8; SECTOR_SIZE];
        self.access.read_at(0, &mut loc)?;
        let mut time = vec![0u8; SECTOR_SIZE];
        self.access.read_at(SECTOR_SIZE as u64, &mut time)?;

        let mut offsets = vec![0u64; SLOT_COUNT];
        let mut lengths = vec![0u64; SLOT_COUNT];
        let mut timestamps = vec![0u32; SLOT_COUNT];
        for i in 0..SLOT_COUNT {
            let base = i * 4;
            let v = u32::from_be_bytes([loc[base], loc[base + 1], loc[base + 2], loc[base + 3]]);
            offsets[i] = (v >> 8) as u64 * SECTOR_SIZE as u64;
            lengths[i] = (v & 0xFF) as u64 * SECTOR_SIZE as u64;
            timestamps[i] =
                u32::from_be_bytes([time[base], time[base + 1], time[base + 2], time[base + 3]]);
        }
        let tables = Arc::new(HeaderTables {
            offsets,
            lengths,
            timestamps,
        });
        *cached = Some(Arc::clone(&tables));
        Ok(tables)
    }

    fn entry_at(&self, tables: &HeaderTables, index: usize) -> Result<Option<RegionEntry>, RegionError> {
        let offset = tables.offsets[index];
        let length = tables.lengths[index];
        if offset == 0 || length == 0 {
            return Ok(None);
        }
        let file_len = self.access.len();
        if offset + length > file_len {
            return Err(RegionError::OutOfBounds {
                index,
                offset,
                length,
                file_len,
            });
        }
        Ok(Some(RegionEntry::new(
            Arc::clone(&self.access),
            offset,
            length,
            index,
            tables.timestamps[index],
            self.x,
            self.z,
        )))
    }

    /// All non-empty slots, in slot-index order
    pub fn entries(&self) -> Result<Vec<RegionEntry>, RegionError> {
        let tables = self.tables()?;
        let mut out = Vec::new();
        for i in 0..SLOT_COUNT {
            if let Some(e) = self.entry_at(&tables, i)? {
                out.push(e);
            }
        }
        Ok(out)
    }

    /// The entry at a slot index, `None` when the slot is empty
    pub fn get(&self, index: usize) -> Result<Option<RegionEntry>, RegionError> {
        let tables = self.tables()?;
        self.entry_at(&tables, index)
    }
}
