//! Shared fixture builders: hand-assembled region containers and pin lists

#![allow(dead_code)]

use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;

pub const SECTOR: usize = 4096;
pub const HEADER: usize = 2 * SECTOR;

/// Raw-method record byte
pub const METHOD_RAW: u8 = 3;

/// Assembles a well-formed region container blob slot by slot
pub struct RegionBuilder {
    slots: Vec<(usize, u8, Vec<u8>, u32)>,
}

impl RegionBuilder {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Add a record at local coordinates with a method byte, the stored
    /// payload bytes and a timestamp
    pub fn slot(mut self, x: usize, z: usize, method: u8, payload: &[u8], timestamp: u32) -> Self {
        assert!(x < 32 && z < 32);
        self.slots
            .push((z * 32 + x, method, payload.to_vec(), timestamp));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut body = Vec::new();
        let mut locations = vec![0u32; 1024];
        let mut timestamps = vec![0u32; 1024];
        for (index, method, payload, ts) in self.slots {
            let start = HEADER + body.len();
            let mut record = Vec::with_capacity(5 + payload.len());
            record.extend_from_slice(&((payload.len() + 1) as u32).to_be_bytes());
            record.push(method);
            record.extend_from_slice(&payload);
            let pad = (SECTOR - record.len() % SECTOR) % SECTOR;
            let size = record.len() + pad;
            body.extend_from_slice(&record);
            body.extend(std::iter::repeat(0u8).take(pad));
            locations[index] = (((start / SECTOR) as u32) << 8) | ((size / SECTOR) as u32 & 0xFF);
            timestamps[index] = ts;
        }
        let mut out = Vec::with_capacity(HEADER + body.len());
        for v in locations {
            out.extend_from_slice(&v.to_be_bytes());
        }
        for v in timestamps {
            out.extend_from_slice(&v.to_be_bytes());
        }
        out.extend_from_slice(&body);
        out
    }
}

/// Raw chunk payload carrying an inhabited-time long tag
pub fn inhabited_payload(ticks: i64) -> Vec<u8> {
    let mut data = vec![0x0A, 0x00, 0x00]; // unnamed root compound
    data.push(0x04);
    data.extend_from_slice(&13u16.to_be_bytes());
    data.extend_from_slice(b"InhabitedTime");
    data.extend_from_slice(&ticks.to_be_bytes());
    data.push(0x00);
    data
}

/// Raw chunk payload with no inhabited-time tag at all
pub fn anonymous_payload() -> Vec<u8> {
    let mut data = vec![0x0A, 0x00, 0x00];
    data.push(0x02);
    data.extend_from_slice(&4u16.to_be_bytes());
    data.extend_from_slice(b"misc");
    data.extend_from_slice(&7i16.to_be_bytes());
    data.push(0x00);
    data
}

fn put_utf(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&(s.len() as u16).to_be_bytes());
    out.extend_from_slice(s.as_bytes());
}

/// gzip pin list holding a `data.Forced` long array read pairwise as (x, z)
pub fn pin_list(pairs: &[(i32, i32)]) -> Vec<u8> {
    let mut raw = Vec::new();
    raw.push(0x0A);
    put_utf(&mut raw, "");
    raw.push(0x0A);
    put_utf(&mut raw, "data");
    raw.push(0x0C);
    put_utf(&mut raw, "Forced");
    raw.extend_from_slice(&((pairs.len() * 2) as i32).to_be_bytes());
    for (x, z) in pairs {
        raw.extend_from_slice(&(*x as i64).to_be_bytes());
        raw.extend_from_slice(&(*z as i64).to_be_bytes());
    }
    raw.push(0x00); // end data
    raw.push(0x00); // end root
    gzip(&raw)
}

pub fn gzip(raw: &[u8]) -> Vec<u8> {
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(raw).unwrap();
    enc.finish().unwrap()
}
