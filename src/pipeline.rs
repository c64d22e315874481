//! Per-dimension pipeline
//!
//! Walks one dimension's `region/` files, applies the retention patterns to
//! every record, and forwards kept records (plus their entities/poi siblings,
//! matched by slot index) to writers on the target side. Every per-record and
//! per-file failure is recorded and the loop continues; nothing in here
//! aborts the dimension.

use crate::fs::FileSystem;
use crate::io_factory::RegionIoFactory;
use crate::patterns::ChunkPattern;
use crate::progress::{ProgressEvent, ProgressSink, ProgressStage};
use crate::region::{self, RegionReader, RegionWrite};
use crate::report::{DimensionResult, ErrorCollector, ErrorKind};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Everything a dimension task needs; owned by the orchestrator
pub(crate) struct DimensionContext<'a> {
    pub fs: &'a Arc<dyn FileSystem>,
    pub io_factory: &'a dyn RegionIoFactory,
    pub input_dim: &'a Path,
    pub target_dim: &'a Path,
    pub patterns: &'a [Box<dyn ChunkPattern>],
    pub errors: &'a ErrorCollector,
    pub progress: Option<&'a dyn ProgressSink>,
    pub total_chunks: u64,
    pub progress_interval: u64,
    pub progress_interval_ms: u64,
    pub processed: &'a AtomicU64,
    pub strict: bool,
}

impl DimensionContext<'_> {
    fn emit(&self, event: ProgressEvent) {
        if let Some(sink) = self.progress {
            sink.emit(&event);
        }
    }
}

/// A sibling dataset (entities or poi) attached to one region file
struct Sibling {
    reader: RegionReader,
    writer: Box<dyn RegionWrite>,
    path: std::path::PathBuf,
    read_kind: ErrorKind,
    write_kind: ErrorKind,
    finalize_kind: ErrorKind,
}

/// Process one dimension directory, returning its record counts
pub(crate) fn process_dimension(ctx: &DimensionContext<'_>) -> DimensionResult {
    let fs = ctx.fs;
    let region_dir = ctx.input_dim.join("region");
    let entities_dir = ctx.input_dim.join("entities");
    let poi_dir = ctx.input_dim.join("poi");

    if let Err(e) = prepare_target_dirs(ctx, &entities_dir, &poi_dir) {
        ctx.errors.record(
            ctx.target_dim,
            ErrorKind::Write,
            format!("failed to create target directories: {e}"),
        );
        return DimensionResult::default();
    }

    ctx.emit(ProgressEvent::at(ProgressStage::DimensionStart, ctx.input_dim));

    let mut result = DimensionResult::default();
    let use_time = ctx.progress_interval_ms > 0;
    let mut last_emit = Instant::now();

    for region_file in fs.list(&region_dir) {
        if !region::is_region_file_name(&region_file) {
            continue;
        }
        ctx.emit(ProgressEvent::at(ProgressStage::RegionStart, &region_file));

        if !region::is_valid_region_file(fs.as_ref(), &region_file) {
            ctx.errors.record(
                &region_file,
                ErrorKind::Mca,
                "region file is damaged or incomplete",
            );
            if !ctx.strict {
                warn!(path = %region_file.display(), "skipping invalid region file");
                continue;
            }
        }

        let name = match region_file.file_name() {
            Some(n) => n.to_string_lossy().into_owned(),
            None => continue,
        };

        let reader = match ctx.io_factory.open_reader(fs, &region_file) {
            Ok(r) => r,
            Err(e) => {
                ctx.errors.record(
                    &region_file,
                    ErrorKind::Mca,
                    format!("failed to open region file: {e}"),
                );
                continue;
            }
        };

        let target_file = ctx.target_dim.join("region").join(&name);
        let mut writer = match ctx.io_factory.create_writer(fs, &target_file) {
            Ok(w) => w,
            Err(e) => {
                ctx.errors.record(
                    &region_file,
                    ErrorKind::Write,
                    format!("failed to create output region file: {e}"),
                );
                continue;
            }
        };

        let mut entities = open_sibling(
            ctx,
            &entities_dir.join(&name),
            &ctx.target_dim.join("entities").join(&name),
            ErrorKind::Entities,
            ErrorKind::WriteEntities,
            ErrorKind::FinalizeEntities,
        );
        let mut poi = open_sibling(
            ctx,
            &poi_dir.join(&name),
            &ctx.target_dim.join("poi").join(&name),
            ErrorKind::Poi,
            ErrorKind::WritePoi,
            ErrorKind::FinalizePoi,
        );

        let entries = match reader.entries() {
            Ok(entries) => entries,
            Err(e) => {
                ctx.errors.record(
                    &region_file,
                    ErrorKind::Entries,
                    format!("failed to read entries: {e}"),
                );
                Vec::new()
            }
        };
        debug!(
            path = %region_file.display(),
            entries = entries.len(),
            "processing region file"
        );

        for entry in &entries {
            let mut keep = false;
            for pattern in ctx.patterns {
                match pattern.matches(entry) {
                    Ok(true) => {
                        keep = true;
                        break;
                    }
                    Ok(false) => {}
                    Err(e) => {
                        ctx.errors.record(
                            &region_file,
                            ErrorKind::Pattern,
                            format!("pattern evaluation failed: {e}"),
                        );
                    }
                }
            }

            if keep {
                if let Err(e) = writer.write_entry(entry) {
                    ctx.errors.record(
                        &region_file,
                        ErrorKind::Write,
                        format!("failed to write entry: {e}"),
                    );
                }
                for sibling in [entities.as_mut(), poi.as_mut()].into_iter().flatten() {
                    forward_sibling_entry(ctx, sibling, entry.region_index());
                }
            } else {
                result.removed += 1;
            }

            result.processed += 1;
            let processed = ctx.processed.fetch_add(1, Ordering::Relaxed) + 1;
            if use_time {
                if last_emit.elapsed().as_millis() as u64 >= ctx.progress_interval_ms {
                    ctx.emit(ProgressEvent::counted(
                        ProgressStage::ChunkProgress,
                        processed,
                        ctx.total_chunks,
                        &region_file,
                    ));
                    last_emit = Instant::now();
                }
            } else if ctx.progress_interval > 0 && processed % ctx.progress_interval == 0 {
                ctx.emit(ProgressEvent::counted(
                    ProgressStage::ChunkProgress,
                    processed,
                    ctx.total_chunks,
                    &region_file,
                ));
            }
        }

        if let Err(e) = writer.finalize() {
            ctx.errors.record(
                &region_file,
                ErrorKind::Finalize,
                format!("failed to finalize region file: {e}"),
            );
        }
        for sibling in [entities, poi].into_iter().flatten() {
            finalize_sibling(ctx, sibling);
        }
    }

    ctx.emit(ProgressEvent::at(ProgressStage::DimensionEnd, ctx.input_dim));
    result
}

fn prepare_target_dirs(
    ctx: &DimensionContext<'_>,
    entities_dir: &Path,
    poi_dir: &Path,
) -> std::io::Result<()> {
    let fs = ctx.fs;
    fs.create_directories(ctx.target_dim)?;
    fs.create_directories(&ctx.target_dim.join("region"))?;
    if fs.is_directory(entities_dir) {
        fs.create_directories(&ctx.target_dim.join("entities"))?;
    }
    if fs.is_directory(poi_dir) {
        fs.create_directories(&ctx.target_dim.join("poi"))?;
    }
    Ok(())
}

/// Open a sibling dataset's reader/writer pair when the sibling file exists
/// and is valid; open failures are recorded and the sibling is skipped
fn open_sibling(
    ctx: &DimensionContext<'_>,
    source: &Path,
    target: &Path,
    read_kind: ErrorKind,
    write_kind: ErrorKind,
    finalize_kind: ErrorKind,
) -> Option<Sibling> {
    let fs = ctx.fs;
    if fs.len(source).is_none() || !region::is_valid_region_file(fs.as_ref(), source) {
        return None;
    }
    let reader = match ctx.io_factory.open_reader(fs, source) {
        Ok(r) => r,
        Err(e) => {
            ctx.errors
                .record(source, read_kind, format!("failed to open container: {e}"));
            return None;
        }
    };
    let writer = match ctx.io_factory.create_writer(fs, target) {
        Ok(w) => w,
        Err(e) => {
            ctx.errors.record(
                source,
                write_kind,
                format!("failed to create output container: {e}"),
            );
            return None;
        }
    };
    Some(Sibling {
        reader,
        writer,
        path: source.to_path_buf(),
        read_kind,
        write_kind,
        finalize_kind,
    })
}

/// Forward the sibling record at `index` to the sibling writer, if present
fn forward_sibling_entry(ctx: &DimensionContext<'_>, sibling: &mut Sibling, index: usize) {
    match sibling.reader.get(index) {
        Ok(Some(entry)) => {
            if let Err(e) = sibling.writer.write_entry(&entry) {
                ctx.errors.record(
                    &sibling.path,
                    sibling.write_kind,
                    format!("failed to write entry: {e}"),
                );
            }
        }
        Ok(None) => {}
        Err(e) => {
            ctx.errors.record(
                &sibling.path,
                sibling.read_kind,
                format!("failed to read entry: {e}"),
            );
        }
    }
}

fn finalize_sibling(ctx: &DimensionContext<'_>, mut sibling: Sibling) {
    if let Err(e) = sibling.writer.finalize() {
        ctx.errors.record(
            &sibling.path,
            sibling.finalize_kind,
            format!("failed to finalize container: {e}"),
        );
    }
}
