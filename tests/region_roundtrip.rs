//! Container-level round trips and pattern behavior over decoded entries

mod common;

use common::*;
use mcaprune::region::{MemoryRegionWriter, RegionReader, RegionWrite};
use mcaprune::{ChunkPattern, FileSystem, InhabitedTimePattern, MemoryFs};
use std::path::PathBuf;
use std::sync::Arc;

#[test]
fn rewritten_container_preserves_entries_verbatim() {
    let blob = RegionBuilder::new()
        .slot(0, 0, METHOD_RAW, b"alpha", 100)
        .slot(31, 0, METHOD_RAW, b"beta", 200)
        .slot(5, 17, METHOD_RAW, &vec![0xCD; 5000], 300)
        .build();
    let source = RegionReader::from_bytes("r.2.-3.mca", blob).unwrap();
    let originals = source.entries().unwrap();
    assert_eq!(originals.len(), 3);

    let fs: Arc<dyn FileSystem> = Arc::new(MemoryFs::new());
    let out = PathBuf::from("/r.2.-3.mca");
    let mut writer = MemoryRegionWriter::new(Arc::clone(&fs), out.clone());
    for entry in &originals {
        writer.write_entry(entry).unwrap();
    }
    writer.finalize().unwrap();

    let reread = RegionReader::from_bytes("r.2.-3.mca", fs.read(&out).unwrap()).unwrap();
    let copies = reread.entries().unwrap();
    assert_eq!(copies.len(), originals.len());
    for (orig, copy) in originals.iter().zip(&copies) {
        assert_eq!(copy.region_index(), orig.region_index());
        assert_eq!(copy.modified_time(), orig.modified_time());
        assert_eq!(copy.global_x(), orig.global_x());
        assert_eq!(copy.global_z(), orig.global_z());
        assert_eq!(
            copy.serialized_bytes().unwrap(),
            orig.serialized_bytes().unwrap()
        );
    }

    // untouched slots stay empty
    assert!(reread.get(1).unwrap().is_none());
    assert!(reread.get(1023).unwrap().is_none());
}

#[test]
fn negative_region_coordinates_map_to_global_space() {
    let blob = RegionBuilder::new()
        .slot(3, 4, METHOD_RAW, b"x", 1)
        .build();
    let reader = RegionReader::from_bytes("r.-1.-2.mca", blob).unwrap();
    let entries = reader.entries().unwrap();
    assert_eq!(entries[0].global_x(), -32 + 3);
    assert_eq!(entries[0].global_z(), -64 + 4);
}

#[test]
fn inhabited_threshold_is_monotonic() {
    let blob = RegionBuilder::new()
        .slot(0, 0, METHOD_RAW, &inhabited_payload(1000), 1)
        .build();
    let reader = RegionReader::from_bytes("r.0.0.mca", blob).unwrap();
    let entry = reader.get(0).unwrap().unwrap();

    assert!(InhabitedTimePattern::new(0, false).matches(&entry).unwrap());
    assert!(InhabitedTimePattern::new(1000, false).matches(&entry).unwrap());
    assert!(!InhabitedTimePattern::new(1001, false).matches(&entry).unwrap());
    assert!(!InhabitedTimePattern::new(i64::MAX, false).matches(&entry).unwrap());
}

#[test]
fn truncated_container_fails_to_enumerate() {
    let reader = RegionReader::from_bytes("r.0.0.mca", vec![0u8; 100]).unwrap();
    assert!(reader.entries().is_err());
}

#[test]
fn slot_pointing_past_the_end_is_an_error() {
    let mut blob = RegionBuilder::new()
        .slot(0, 0, METHOD_RAW, b"data", 1)
        .build();
    blob.truncate(HEADER + 1); // header claims a record the body no longer has
    let reader = RegionReader::from_bytes("r.0.0.mca", blob).unwrap();
    assert!(reader.entries().is_err());
}
