//! Retention patterns
//!
//! Stateless predicates over a decoded record. Multiple patterns combine
//! with logical OR: a chunk is kept if *any* configured pattern says keep.

use crate::error::Error;
use crate::region::RegionEntry;
use std::collections::HashSet;

/// A retention predicate
///
/// Returning `Err` means the pattern itself failed (I/O, structural damage);
/// the pipeline records that and treats this pattern as "did not match"
/// without affecting the other patterns.
pub trait ChunkPattern: Send + Sync {
    /// Whether this pattern wants the record kept
    fn matches(&self, entry: &RegionEntry) -> Result<bool, Error>;
}

/// Keep a chunk iff its global coordinates are in a fixed set
///
/// Used for the administratively pinned (force-loaded) coordinates, which
/// must never be discarded regardless of activity.
pub struct ListPattern {
    coords: HashSet<(i32, i32)>,
}

impl ListPattern {
    /// Build from coordinate pairs; duplicates collapse harmlessly
    pub fn new(coords: impl IntoIterator<Item = (i32, i32)>) -> Self {
        Self {
            coords: coords.into_iter().collect(),
        }
    }
}

impl ChunkPattern for ListPattern {
    fn matches(&self, entry: &RegionEntry) -> Result<bool, Error> {
        Ok(self.coords.contains(&(entry.global_x(), entry.global_z())))
    }
}

/// Tag signature scanned for in the decompressed payload:
/// TAG_Long (0x04), name length 13 (BE), "InhabitedTime"
const INHABITED_SIG: [u8; 16] = [
    0x04, 0x00, 0x0D, b'I', b'n', b'h', b'a', b'b', b'i', b't', b'e', b'd', b'T', b'i', b'm', b'e',
];

/// Keep a chunk iff its accumulated inhabited duration reaches a threshold
///
/// When the duration cannot be determined (external record, empty or
/// undecodable payload, signature absent) the decision falls back to keeping
/// the chunk, unless `remove_unknown` flips the fallback to discard.
pub struct InhabitedTimePattern {
    threshold_ticks: i64,
    remove_unknown: bool,
}

impl InhabitedTimePattern {
    /// Build with a threshold in ticks
    pub fn new(threshold_ticks: i64, remove_unknown: bool) -> Self {
        Self {
            threshold_ticks,
            remove_unknown,
        }
    }

    fn unknown(&self) -> bool {
        !self.remove_unknown
    }
}

impl ChunkPattern for InhabitedTimePattern {
    fn matches(&self, entry: &RegionEntry) -> Result<bool, Error> {
        if entry.is_external()? {
            return Ok(self.unknown());
        }
        let data = match entry.decompressed_data() {
            Ok(data) => data,
            // payloads that fail to decode count as unknown, not as errors
            Err(Error::Compression(_)) => return Ok(self.unknown()),
            Err(e) => return Err(e),
        };
        if data.is_empty() {
            return Ok(self.unknown());
        }
        match find_inhabited_time(&data) {
            Some(ticks) => Ok(ticks >= self.threshold_ticks),
            None => Ok(self.unknown()),
        }
    }
}

/// Scan for the inhabited-time tag signature anywhere in the payload
///
/// Deliberately unanchored: the original heuristic searches the raw bytes
/// rather than walking the tag tree, and retention decisions must reproduce
/// it bit for bit. First hit wins.
pub fn find_inhabited_time(data: &[u8]) -> Option<i64> {
    let sig_len = INHABITED_SIG.len();
    if data.len() < sig_len + 8 {
        return None;
    }
    for i in 0..=(data.len() - sig_len - 8) {
        if data[i..i + sig_len] == INHABITED_SIG {
            let start = i + sig_len;
            let mut buf = [0u8; 8];
            buf.copy_from_slice(&data[start..start + 8]);
            return Some(i64::from_be_bytes(buf));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload_with_inhabited(ticks: i64) -> Vec<u8> {
        let mut data = vec![0xAA; 37]; // arbitrary leading bytes
        data.extend_from_slice(&INHABITED_SIG);
        data.extend_from_slice(&ticks.to_be_bytes());
        data.extend_from_slice(&[0xBB; 11]);
        data
    }

    #[test]
    fn finds_signature_anywhere_in_payload() {
        assert_eq!(find_inhabited_time(&payload_with_inhabited(1234)), Some(1234));
        assert_eq!(find_inhabited_time(&payload_with_inhabited(0)), Some(0));
        assert_eq!(find_inhabited_time(&payload_with_inhabited(-1)), Some(-1));
    }

    #[test]
    fn missing_signature_is_none() {
        assert_eq!(find_inhabited_time(b"no tag here"), None);
        assert_eq!(find_inhabited_time(&[]), None);
    }

    #[test]
    fn truncated_value_after_signature_is_none() {
        let mut data = Vec::new();
        data.extend_from_slice(&INHABITED_SIG);
        data.extend_from_slice(&[0u8; 7]); // one byte short of a long
        assert_eq!(find_inhabited_time(&data), None);
    }

    #[test]
    fn first_signature_wins() {
        let mut data = Vec::new();
        data.extend_from_slice(&INHABITED_SIG);
        data.extend_from_slice(&500i64.to_be_bytes());
        data.extend_from_slice(&INHABITED_SIG);
        data.extend_from_slice(&9000i64.to_be_bytes());
        assert_eq!(find_inhabited_time(&data), Some(500));
    }
}
