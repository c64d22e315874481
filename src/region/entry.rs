//! One decoded record of a region container
//!
//! # Record layout
//!
//! ```text
//! Offset | Size | Field
//! -------|------|---------------------------------------------------
//!   0    |  4   | length L (BE): covers everything that follows
//!   4    |  1   | compression method byte
//!   5    |  2   | custom codec name length (method 127 only, BE)
//!   7    |  n   | custom codec name bytes (method 127 only)
//!   -    |  -   | L - 1 - (name bytes consumed) compressed bytes
//! ```
//!
//! On the keep path records are copied verbatim via [`RegionEntry::serialized_bytes`];
//! decompression only happens when a retention pattern asks for the payload.

use crate::compression::{self, CompressionMethod};
use crate::error::{Error, RegionError};
use crate::region::access::RandomAccess;
use crate::region::REGION_WIDTH;
use std::sync::Arc;

struct RecordHeader {
    /// The 4-byte length prefix value
    length: u32,
    method: CompressionMethod,
    /// Custom codec name and its encoded byte length (method 127 only)
    custom: Option<(String, usize)>,
}

/// A read-only view of one non-empty slot
#[derive(Clone)]
pub struct RegionEntry {
    access: Arc<dyn RandomAccess>,
    start: u64,
    length: u64,
    index: usize,
    timestamp: u32,
    region_x: i32,
    region_z: i32,
}

impl RegionEntry {
    pub(crate) fn new(
        access: Arc<dyn RandomAccess>,
        start: u64,
        length: u64,
        index: usize,
        timestamp: u32,
        region_x: i32,
        region_z: i32,
    ) -> Self {
        Self {
            access,
            start,
            length,
            index,
            timestamp,
            region_x,
            region_z,
        }
    }

    /// Slot index within the container (0..1024)
    pub fn region_index(&self) -> usize {
        self.index
    }

    /// Region-local x coordinate
    pub fn local_x(&self) -> i32 {
        (self.index % REGION_WIDTH) as i32
    }

    /// Region-local z coordinate
    pub fn local_z(&self) -> i32 {
        (self.index / REGION_WIDTH) as i32
    }

    /// World-global x coordinate
    pub fn global_x(&self) -> i32 {
        self.region_x * REGION_WIDTH as i32 + self.local_x()
    }

    /// World-global z coordinate
    pub fn global_z(&self) -> i32 {
        self.region_z * REGION_WIDTH as i32 + self.local_z()
    }

    /// Last-modified value from the timestamp table
    pub fn modified_time(&self) -> u32 {
        self.timestamp
    }

    /// Byte length of the slot as allocated in the container (sector aligned)
    pub fn slot_length(&self) -> u64 {
        self.length
    }

    fn read(&self, pos: u64, buf: &mut [u8]) -> Result<(), RegionError> {
        self.access.read_at(pos, buf).map_err(|_| self.out_of_bounds())
    }

    fn out_of_bounds(&self) -> RegionError {
        RegionError::OutOfBounds {
            index: self.index,
            offset: self.start,
            length: self.length,
            file_len: self.access.len(),
        }
    }

    fn record_header(&self) -> Result<RecordHeader, RegionError> {
        let mut header = [0u8; 5];
        self.read(self.start, &mut header)?;
        let length = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
        let method_byte = header[4] as i8;
        let method = CompressionMethod::from_byte(method_byte)
            .ok_or(RegionError::UnknownCompression(method_byte))?;
        let custom = if method == CompressionMethod::Custom {
            let mut len_buf = [0u8; 2];
            self.read(self.start + 5, &mut len_buf)?;
            let n = u16::from_be_bytes(len_buf) as usize;
            let mut name = vec![0u8; n];
            self.read(self.start + 7, &mut name)?;
            Some((String::from_utf8_lossy(&name).into_owned(), n))
        } else {
            None
        };
        Ok(RecordHeader {
            length,
            method,
            custom,
        })
    }

    /// The full record bytes exactly as stored: length prefix, method byte,
    /// optional custom name, compressed payload
    pub fn serialized_bytes(&self) -> Result<Vec<u8>, RegionError> {
        let header = self.record_header()?;
        let total = 4usize + header.length as usize;
        let mut out = vec![0u8; total];
        self.read(self.start, &mut out)?;
        Ok(out)
    }

    /// The compressed payload with its method and optional custom codec name
    pub fn data_bytes(&self) -> Result<(CompressionMethod, Vec<u8>, Option<String>), RegionError> {
        let header = self.record_header()?;
        let name_overhead = header.custom.as_ref().map_or(0, |(_, n)| 2 + n);
        let data_len = (header.length as usize)
            .checked_sub(1 + name_overhead)
            .ok_or_else(|| self.out_of_bounds())?;
        let data_start = self.start + 5 + name_overhead as u64;
        let mut data = vec![0u8; data_len];
        self.read(data_start, &mut data)?;
        Ok((header.method, data, header.custom.map(|(name, _)| name)))
    }

    /// The decompressed payload
    ///
    /// Named-custom and external methods yield an empty buffer; the retention
    /// fallback treats that as "unknown".
    pub fn decompressed_data(&self) -> Result<Vec<u8>, Error> {
        let (method, data, _) = self.data_bytes()?;
        Ok(compression::decode(method, &data)?)
    }

    /// Whether this slot only references a payload stored outside the container
    pub fn is_external(&self) -> Result<bool, RegionError> {
        Ok(self.record_header()?.method.is_external())
    }
}

impl std::fmt::Debug for RegionEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionEntry")
            .field("index", &self.index)
            .field("global", &(self.global_x(), self.global_z()))
            .field("start", &self.start)
            .field("length", &self.length)
            .field("timestamp", &self.timestamp)
            .finish()
    }
}
