//! Run configuration
//!
//! All options are orthogonal and may be combined freely. The backend and
//! codec factory default to the real filesystem; tests swap in
//! [`MemoryFs`](crate::fs::MemoryFs) and
//! [`MemoryIoFactory`](crate::io_factory::MemoryIoFactory) to run the
//! identical pipeline without touching disk.

use crate::fs::{FileSystem, RealFileSystem};
use crate::io_factory::{DefaultIoFactory, RegionIoFactory};
use crate::progress::ProgressSink;
use crate::report::ErrorSink;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Post-processing collaborator that archives the output tree
///
/// Invoked after an out-of-place run when configured; the orchestrator then
/// deletes the uncompressed tree. Archive format and naming are entirely the
/// implementation's business.
pub trait Archiver: Send + Sync {
    /// Archive the tree rooted at `root`, returning the artifact path
    fn archive(&self, fs: &dyn FileSystem, root: &Path) -> io::Result<PathBuf>;
}

/// Configuration for one optimizer run
pub struct OptimizeConfig {
    /// World root to read
    pub input: PathBuf,

    /// Output directory; required unless `in_place`
    pub output: Option<PathBuf>,

    /// Inhabited-duration threshold in seconds (converted ×20 to ticks)
    pub inhabited_threshold_seconds: i64,

    /// Discard chunks whose inhabited duration cannot be determined
    pub remove_unknown: bool,

    /// Rewrite the world in place via a private staging directory
    pub in_place: bool,

    /// Wipe a non-empty output directory instead of refusing it
    pub force: bool,

    /// Escalate structural damage into recorded errors instead of silent
    /// best-effort skips
    pub strict: bool,

    /// Emit a progress event every N processed records (0 = off)
    pub progress_interval: u64,

    /// Emit a progress event every M milliseconds; takes precedence over the
    /// record-count interval when > 0
    pub progress_interval_ms: u64,

    /// Dimension worker count; 1 means fully sequential
    pub parallelism: usize,

    /// Storage backend
    pub fs: Arc<dyn FileSystem>,

    /// Region codec factory
    pub io_factory: Arc<dyn RegionIoFactory>,

    /// Progress event consumer
    pub progress: Option<Arc<dyn ProgressSink>>,

    /// Per-error observer (errors are always also collected in the report)
    pub error_sink: Option<Arc<dyn ErrorSink>>,

    /// Archive collaborator for out-of-place runs
    pub archiver: Option<Arc<dyn Archiver>>,
}

impl OptimizeConfig {
    /// Defaults: real filesystem, direct-file codec, threshold 0, keep
    /// unknowns, sequential, progress every 1000 records
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: None,
            inhabited_threshold_seconds: 0,
            remove_unknown: false,
            in_place: false,
            force: false,
            strict: false,
            progress_interval: 1000,
            progress_interval_ms: 0,
            parallelism: 1,
            fs: Arc::new(RealFileSystem),
            io_factory: Arc::new(DefaultIoFactory),
            progress: None,
            error_sink: None,
            archiver: None,
        }
    }

    /// Set the output directory
    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    /// Set the inhabited-duration threshold in seconds
    pub fn with_threshold_seconds(mut self, seconds: i64) -> Self {
        self.inhabited_threshold_seconds = seconds;
        self
    }

    /// Treat undeterminable inhabited durations as removable
    pub fn with_remove_unknown(mut self, remove_unknown: bool) -> Self {
        self.remove_unknown = remove_unknown;
        self
    }

    /// Rewrite the world in place
    pub fn with_in_place(mut self, in_place: bool) -> Self {
        self.in_place = in_place;
        self
    }

    /// Allow wiping a non-empty output directory
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Escalate structural damage
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Progress cadence by processed-record count
    pub fn with_progress_interval(mut self, every_records: u64) -> Self {
        self.progress_interval = every_records;
        self
    }

    /// Progress cadence by elapsed milliseconds
    pub fn with_progress_interval_ms(mut self, every_ms: u64) -> Self {
        self.progress_interval_ms = every_ms;
        self
    }

    /// Dimension worker count
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    /// Swap the storage backend
    pub fn with_file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    /// Swap the region codec factory
    pub fn with_io_factory(mut self, io_factory: Arc<dyn RegionIoFactory>) -> Self {
        self.io_factory = io_factory;
        self
    }

    /// Attach a progress consumer
    pub fn with_progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }

    /// Attach a per-error observer
    pub fn with_error_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.error_sink = Some(sink);
        self
    }

    /// Attach the archive collaborator
    pub fn with_archiver(mut self, archiver: Arc<dyn Archiver>) -> Self {
        self.archiver = Some(archiver);
        self
    }

    /// Threshold converted to ticks (20 per second)
    pub fn threshold_ticks(&self) -> i64 {
        self.inhabited_threshold_seconds * 20
    }
}

impl std::fmt::Debug for OptimizeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptimizeConfig")
            .field("input", &self.input)
            .field("output", &self.output)
            .field(
                "inhabited_threshold_seconds",
                &self.inhabited_threshold_seconds,
            )
            .field("remove_unknown", &self.remove_unknown)
            .field("in_place", &self.in_place)
            .field("force", &self.force)
            .field("strict", &self.strict)
            .field("progress_interval", &self.progress_interval)
            .field("progress_interval_ms", &self.progress_interval_ms)
            .field("parallelism", &self.parallelism)
            .finish_non_exhaustive()
    }
}
