//! Run report types and the error sink seam
//!
//! A run produces exactly one [`OptimizeReport`]: total processed records,
//! total removed records, and the ordered list of non-fatal errors that were
//! recorded along the way. Rendering (text/JSON/CSV) is the caller's job; the
//! types only carry `serde` derives so a renderer can consume them directly.

use serde::Serialize;

/// Category tag attached to every recorded error
///
/// The tags mirror where in the pass the failure happened. `Input` and
/// `Output` end the run early with an otherwise empty report; everything else
/// is recorded and the surrounding loop continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    /// Input root missing or not a directory
    Input,
    /// Output target preparation failed or was refused
    Output,
    /// Region file structurally invalid (too small, unreadable)
    Mca,
    /// Reading the slot table of a region file failed
    Entries,
    /// A retention pattern failed while evaluating a record
    Pattern,
    /// Writing a kept record to the region output failed
    Write,
    /// Reading the sibling entities container failed
    Entities,
    /// Writing a kept record to the entities output failed
    WriteEntities,
    /// Reading the sibling poi container failed
    Poi,
    /// Writing a kept record to the poi output failed
    WritePoi,
    /// Finalizing the region output failed
    Finalize,
    /// Finalizing the entities output failed
    FinalizeEntities,
    /// Finalizing the poi output failed
    FinalizePoi,
    /// Parsing the forced-chunk pin list failed
    ForceLoaded,
    /// Post-processing archive step failed
    Compress,
    /// Deleting the uncompressed output tree failed
    Cleanup,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::Input => "Input",
            ErrorKind::Output => "Output",
            ErrorKind::Mca => "MCA",
            ErrorKind::Entries => "Entries",
            ErrorKind::Pattern => "Pattern",
            ErrorKind::Write => "Write",
            ErrorKind::Entities => "Entities",
            ErrorKind::WriteEntities => "WriteEntities",
            ErrorKind::Poi => "Poi",
            ErrorKind::WritePoi => "WritePoi",
            ErrorKind::Finalize => "Finalize",
            ErrorKind::FinalizeEntities => "FinalizeEntities",
            ErrorKind::FinalizePoi => "FinalizePoi",
            ErrorKind::ForceLoaded => "ForceLoaded",
            ErrorKind::Compress => "Compress",
            ErrorKind::Cleanup => "Cleanup",
        };
        f.write_str(s)
    }
}

/// One recorded non-fatal error
#[derive(Debug, Clone, Serialize)]
pub struct OptimizeError {
    /// Source path the failure relates to
    pub path: String,

    /// Category tag
    pub kind: ErrorKind,

    /// Human-readable message
    pub message: String,
}

impl OptimizeError {
    /// Create a new error record
    pub fn new(path: impl Into<String>, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            message: message.into(),
        }
    }
}

/// Per-dimension processing counts
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DimensionResult {
    /// Records examined in this dimension
    pub processed: u64,

    /// Records discarded in this dimension
    pub removed: u64,
}

/// Aggregated result of one optimizer run
///
/// Immutable once produced. Under strict policy a caller should treat a run
/// with a non-empty error list as failed even though processing completed.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizeReport {
    /// Total records examined across all dimensions
    pub processed_chunks: u64,

    /// Total records discarded across all dimensions
    pub removed_chunks: u64,

    /// Ordered list of recorded errors
    pub errors: Vec<OptimizeError>,
}

/// Caller-supplied observer for errors as they are recorded
///
/// Every non-fatal error is both forwarded here and accumulated into the
/// final report. Implementations must be safe to call from worker threads.
pub trait ErrorSink: Send + Sync {
    /// Observe one recorded error
    fn record(&self, error: &OptimizeError);
}

impl<F> ErrorSink for F
where
    F: Fn(&OptimizeError) + Send + Sync,
{
    fn record(&self, error: &OptimizeError) {
        self(error)
    }
}

/// Thread-safe accumulator behind the run's error list
///
/// Dimension workers append concurrently; the coordinator drains it once at
/// the end of the run. Every record is also forwarded to the optional sink.
pub(crate) struct ErrorCollector {
    sink: Option<std::sync::Arc<dyn ErrorSink>>,
    errors: parking_lot::Mutex<Vec<OptimizeError>>,
}

impl ErrorCollector {
    pub(crate) fn new(sink: Option<std::sync::Arc<dyn ErrorSink>>) -> Self {
        Self {
            sink,
            errors: parking_lot::Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn record(
        &self,
        path: &std::path::Path,
        kind: ErrorKind,
        message: impl Into<String>,
    ) {
        let error = OptimizeError::new(path.display().to_string(), kind, message);
        if let Some(sink) = &self.sink {
            sink.record(&error);
        }
        self.errors.lock().push(error);
    }

    pub(crate) fn into_errors(self) -> Vec<OptimizeError> {
        self.errors.into_inner()
    }
}
