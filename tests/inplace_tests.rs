//! In-place runs against a real temporary world directory

mod common;

use common::*;
use mcaprune::region::RegionReader;
use mcaprune::{run, ErrorKind, OptimizeConfig};
use std::fs;
use tempfile::TempDir;

fn make_world() -> (TempDir, Vec<u8>) {
    let world = tempfile::tempdir().unwrap();
    fs::create_dir_all(world.path().join("region")).unwrap();
    let blob = RegionBuilder::new()
        .slot(0, 0, METHOD_RAW, &inhabited_payload(100), 11)
        .slot(1, 0, METHOD_RAW, &inhabited_payload(5000), 77)
        .build();
    fs::write(world.path().join("region/r.0.0.mca"), &blob).unwrap();
    fs::write(world.path().join("level.dat"), b"level").unwrap();
    (world, blob)
}

#[test]
fn rewrites_the_world_in_place() {
    let (world, _) = make_world();

    let report = run(OptimizeConfig::new(world.path())
        .with_in_place(true)
        .with_threshold_seconds(100))
    .unwrap();
    assert!(report.errors.is_empty(), "{:?}", report.errors);
    assert_eq!(report.processed_chunks, 2);
    assert_eq!(report.removed_chunks, 1);

    let region_file = world.path().join("region/r.0.0.mca");
    let reader = RegionReader::open(&region_file).unwrap();
    let entries = reader.entries().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].region_index(), 1);
    assert_eq!(entries[0].modified_time(), 77);
    assert_eq!(entries[0].decompressed_data().unwrap(), inhabited_payload(5000));

    // unrelated world files are untouched
    assert_eq!(fs::read(world.path().join("level.dat")).unwrap(), b"level");
}

#[test]
fn deletes_containers_that_were_skipped_as_damaged() {
    let (world, _) = make_world();
    let stale = world.path().join("region/r.5.5.mca");
    fs::write(&stale, [0u8; 100]).unwrap();

    let report = run(OptimizeConfig::new(world.path())
        .with_in_place(true)
        .with_threshold_seconds(100))
    .unwrap();
    assert!(report.errors.iter().any(|e| e.kind == ErrorKind::Mca));
    assert!(!stale.exists());
    assert!(world.path().join("region/r.0.0.mca").exists());
}

#[test]
fn strict_run_records_errors_and_still_replaces() {
    let (world, _) = make_world();
    let damaged = world.path().join("region/r.5.5.mca");
    fs::write(&damaged, [0u8; 100]).unwrap();

    let report = run(OptimizeConfig::new(world.path())
        .with_in_place(true)
        .with_strict(true)
        .with_threshold_seconds(100))
    .unwrap();
    // strict surfaces the damage but the caller judges the run afterwards;
    // the rewrite itself goes through
    assert!(report.errors.iter().any(|e| e.kind == ErrorKind::Mca));
    assert!(report.errors.iter().any(|e| e.kind == ErrorKind::Entries));
    assert_eq!(report.removed_chunks, 1);

    // the damaged container was rewritten as an empty one, not skipped
    let rewritten = RegionReader::open(&damaged).unwrap();
    assert!(rewritten.entries().unwrap().is_empty());

    let reader = RegionReader::open(&world.path().join("region/r.0.0.mca")).unwrap();
    let entries = reader.entries().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].region_index(), 1);
}

#[test]
fn input_must_be_a_directory() {
    let report = run(OptimizeConfig::new("/definitely/not/here").with_in_place(true)).unwrap();
    assert_eq!(report.processed_chunks, 0);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].kind, ErrorKind::Input);
}

#[test]
fn stray_files_in_region_dirs_are_ignored() {
    let (world, _) = make_world();
    fs::write(world.path().join("region/notes.txt"), b"ignore me").unwrap();

    let report = run(OptimizeConfig::new(world.path())
        .with_in_place(true)
        .with_threshold_seconds(0))
    .unwrap();
    assert!(report.errors.is_empty(), "{:?}", report.errors);
    assert!(world.path().join("region/notes.txt").exists());
}
