//! Run orchestrator
//!
//! Drives one complete pass: validates the endpoints, discovers dimension
//! directories, fans them out to workers, and handles the output endgame
//! (in-place replacement or the optional archive step). Endpoint problems
//! are recorded and end the run with an otherwise empty report; only a
//! broken in-place replacement propagates as `Err`.

use crate::config::OptimizeConfig;
use crate::error::Error;
use crate::fs::FileSystem;
use crate::io_factory::RegionIoFactory;
use crate::nbt;
use crate::patterns::{ChunkPattern, InhabitedTimePattern, ListPattern};
use crate::pipeline::{process_dimension, DimensionContext};
use crate::progress::{ProgressEvent, ProgressStage};
use crate::region;
use crate::report::{DimensionResult, ErrorCollector, ErrorKind, OptimizeReport};
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const DELETE_ATTEMPTS: u32 = 5;
const DELETE_DELAY: Duration = Duration::from_millis(500);

/// Execute one optimizer run
///
/// Returns the aggregated report on completion. The only `Err` outcomes are
/// an in-place replacement that failed partway (the staging tree is removed
/// best-effort, but the world may hold a mix of old and new files) and
/// panics escaping a worker, which rayon re-raises.
pub fn run(config: OptimizeConfig) -> crate::error::Result<OptimizeReport> {
    let fs = &config.fs;
    let collector = ErrorCollector::new(config.error_sink.clone());
    let emit = |event: ProgressEvent| {
        if let Some(sink) = &config.progress {
            sink.emit(&event);
        }
    };

    emit(ProgressEvent::at(ProgressStage::Init, &config.input));

    if !fs.is_directory(&config.input) {
        collector.record(
            &config.input,
            ErrorKind::Input,
            "input is not an existing directory",
        );
        return Ok(finish(0, 0, collector));
    }

    let target_root = match prepare_target(&config, &collector) {
        Some(root) => root,
        None => return Ok(finish(0, 0, collector)),
    };

    let dimensions = discover_dimensions(fs, &config.input);
    info!(
        input = %config.input.display(),
        dimensions = dimensions.len(),
        in_place = config.in_place,
        "starting optimizer run"
    );

    let mut total_chunks = 0u64;
    for dim in &dimensions {
        emit(ProgressEvent::at(ProgressStage::Discover, dim));
        total_chunks += count_chunks(fs, config.io_factory.as_ref(), dim);
    }

    let tasks: Vec<(PathBuf, PathBuf)> = dimensions
        .iter()
        .map(|dim| (dim.clone(), map_target(&config.input, &target_root, dim)))
        .collect();

    let processed = AtomicU64::new(0);
    let run_task = |(input_dim, target_dim): &(PathBuf, PathBuf)| -> DimensionResult {
        let patterns = build_patterns(&config, &collector, input_dim);
        let ctx = DimensionContext {
            fs,
            io_factory: config.io_factory.as_ref(),
            input_dim,
            target_dim,
            patterns: &patterns,
            errors: &collector,
            progress: config.progress.as_deref(),
            total_chunks,
            progress_interval: config.progress_interval,
            progress_interval_ms: config.progress_interval_ms,
            processed: &processed,
            strict: config.strict,
        };
        process_dimension(&ctx)
    };

    let results: Vec<DimensionResult> = if config.parallelism > 1 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallelism)
            .build()
            .map_err(|e| Error::Configuration(format!("worker pool: {e}")))?;
        pool.install(|| tasks.par_iter().map(run_task).collect())
    } else {
        tasks.iter().map(run_task).collect()
    };
    let removed: u64 = results.iter().map(|r| r.removed).sum();

    if config.in_place {
        emit(ProgressEvent::at(ProgressStage::Finalize, &config.input));
        if let Err(e) = replace_in_place(fs, &target_root, &config.input, &dimensions) {
            fs.delete_tree_with_retry(&target_root, DELETE_ATTEMPTS, DELETE_DELAY);
            return Err(e);
        }
        emit(ProgressEvent::at(ProgressStage::Cleanup, &target_root));
        if !fs.delete_tree_with_retry(&target_root, DELETE_ATTEMPTS, DELETE_DELAY) {
            return Err(Error::InPlaceReplacement(format!(
                "failed to remove staging directory {}",
                target_root.display()
            )));
        }
    } else if let Some(archiver) = &config.archiver {
        emit(ProgressEvent::at(ProgressStage::Compress, &target_root));
        match archiver.archive(fs.as_ref(), &target_root) {
            Ok(artifact) => {
                info!(artifact = %artifact.display(), "output archived");
                emit(ProgressEvent::at(ProgressStage::Cleanup, &target_root));
                if !fs.delete_tree_with_retry(&target_root, DELETE_ATTEMPTS, DELETE_DELAY) {
                    collector.record(
                        &target_root,
                        ErrorKind::Cleanup,
                        "failed to remove uncompressed output tree",
                    );
                }
            }
            Err(e) => {
                collector.record(&target_root, ErrorKind::Compress, format!("archive: {e}"));
            }
        }
    }

    emit(ProgressEvent::at(ProgressStage::Done, &config.input));
    let processed = processed.load(Ordering::Relaxed);
    info!(processed, removed, "optimizer run complete");
    Ok(finish(processed, removed, collector))
}

fn finish(processed: u64, removed: u64, collector: ErrorCollector) -> OptimizeReport {
    OptimizeReport {
        processed_chunks: processed,
        removed_chunks: removed,
        errors: collector.into_errors(),
    }
}

/// Resolve where output goes: a private staging directory for in-place runs,
/// otherwise the configured output directory (emptied first when forced)
fn prepare_target(config: &OptimizeConfig, collector: &ErrorCollector) -> Option<PathBuf> {
    let fs = &config.fs;
    if config.in_place {
        return match fs.create_temp_directory("mcaprune-") {
            Ok(dir) => Some(dir),
            Err(e) => {
                collector.record(
                    &config.input,
                    ErrorKind::Output,
                    format!("failed to create staging directory: {e}"),
                );
                None
            }
        };
    }

    let Some(output) = &config.output else {
        collector.record(
            &config.input,
            ErrorKind::Output,
            "output directory is required unless running in place",
        );
        return None;
    };
    if fs.exists(output) {
        if !fs.is_directory(output) {
            collector.record(output, ErrorKind::Output, "output exists and is not a directory");
            return None;
        }
        if !fs.list(output).is_empty() {
            if !config.force {
                collector.record(
                    output,
                    ErrorKind::Output,
                    "output directory is not empty (enable force to overwrite)",
                );
                return None;
            }
            if !fs.delete_tree_with_retry(output, DELETE_ATTEMPTS, DELETE_DELAY) {
                collector.record(output, ErrorKind::Output, "failed to clear output directory");
                return None;
            }
        }
    }
    if let Err(e) = fs.create_directories(output) {
        collector.record(
            output,
            ErrorKind::Output,
            format!("failed to create output directory: {e}"),
        );
        return None;
    }
    Some(output.clone())
}

/// Every directory under the input root that has a `region/` child is a
/// dimension, the root itself included
fn discover_dimensions(fs: &Arc<dyn FileSystem>, input: &Path) -> Vec<PathBuf> {
    let mut dims = BTreeSet::new();
    for p in fs.walk(input) {
        if fs.is_directory(&p) && fs.is_directory(&p.join("region")) {
            dims.insert(p);
        }
    }
    dims.into_iter().collect()
}

fn map_target(input: &Path, target_root: &Path, dim: &Path) -> PathBuf {
    match dim.strip_prefix(input) {
        Ok(rel) if !rel.as_os_str().is_empty() => target_root.join(rel),
        _ => target_root.to_path_buf(),
    }
}

/// Non-empty slot count across a dimension's region files, for progress
/// totals; unreadable containers count zero
fn count_chunks(fs: &Arc<dyn FileSystem>, io_factory: &dyn RegionIoFactory, dim: &Path) -> u64 {
    let mut total = 0u64;
    for file in fs.list(&dim.join("region")) {
        if !region::is_region_file_name(&file) || !region::is_valid_region_file(fs.as_ref(), &file)
        {
            continue;
        }
        if let Ok(reader) = io_factory.open_reader(fs, &file) {
            if let Ok(entries) = reader.entries() {
                total += entries.len() as u64;
            }
        }
    }
    total
}

/// Retention patterns for one dimension: its pinned coordinates OR the
/// inhabited-duration threshold
fn build_patterns(
    config: &OptimizeConfig,
    collector: &ErrorCollector,
    dim: &Path,
) -> Vec<Box<dyn ChunkPattern>> {
    let mut patterns: Vec<Box<dyn ChunkPattern>> = Vec::with_capacity(2);
    match nbt::read_forced_chunks(config.fs.as_ref(), dim) {
        Ok(pins) => {
            if !pins.is_empty() {
                patterns.push(Box::new(ListPattern::new(pins)));
            }
        }
        Err(e) => {
            // lenient runs treat a broken pin list as empty
            if config.strict {
                collector.record(
                    dim,
                    ErrorKind::ForceLoaded,
                    format!("failed to read pinned chunks: {e}"),
                );
            } else {
                warn!(dimension = %dim.display(), error = %e, "ignoring malformed pin list");
            }
        }
    }
    patterns.push(Box::new(InhabitedTimePattern::new(
        config.threshold_ticks(),
        config.remove_unknown,
    )));
    patterns
}

/// Copy the staged tree over the original world
///
/// Stale region files (present in the input, absent from staging) are
/// deleted first so a shrunk world does not keep dead containers. Any
/// failure in here aborts immediately.
fn replace_in_place(
    fs: &Arc<dyn FileSystem>,
    staging: &Path,
    input: &Path,
    dimensions: &[PathBuf],
) -> Result<(), Error> {
    let broken = |path: &Path, e: std::io::Error| {
        Error::InPlaceReplacement(format!("{}: {e}", path.display()))
    };

    for dim in dimensions {
        let staged_dim = map_target(input, staging, dim);
        for sub in ["region", "entities", "poi"] {
            let dir = dim.join(sub);
            let staged_sub = staged_dim.join(sub);
            // a subfolder the run never staged says nothing about staleness
            if !fs.is_directory(&dir) || !fs.is_directory(&staged_sub) {
                continue;
            }
            for file in fs.list(&dir) {
                if !region::is_region_file_name(&file) {
                    continue;
                }
                let Some(name) = file.file_name() else {
                    continue;
                };
                if !fs.exists(&staged_sub.join(name)) {
                    fs.delete_if_exists(&file).map_err(|e| broken(&file, e))?;
                }
            }
        }
    }

    for path in fs.walk(staging) {
        let rel = match path.strip_prefix(staging) {
            Ok(rel) if !rel.as_os_str().is_empty() => rel,
            _ => continue,
        };
        let dest = input.join(rel);
        if fs.is_directory(&path) {
            fs.create_directories(&dest).map_err(|e| broken(&dest, e))?;
        } else {
            fs.copy(&path, &dest, true).map_err(|e| broken(&dest, e))?;
        }
    }
    Ok(())
}
