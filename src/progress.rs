//! Progress event stream
//!
//! Events are purely observational: the core never reads them back to make
//! control decisions. Console rendering, percentages and the like belong to
//! the consumer.

use serde::Serialize;
use std::path::Path;

/// Lifecycle stage of a progress event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProgressStage {
    /// Run accepted, work about to start
    Init,
    /// Dimension discovery / total-chunk counting
    Discover,
    /// A dimension task started
    DimensionStart,
    /// A region file is about to be processed
    RegionStart,
    /// Periodic per-record progress
    ChunkProgress,
    /// A dimension task finished
    DimensionEnd,
    /// Output finalization
    Finalize,
    /// Post-processing archive step started
    Compress,
    /// Uncompressed output tree is being removed
    Cleanup,
    /// Run complete
    Done,
}

/// One progress event
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    /// Lifecycle stage
    pub stage: ProgressStage,

    /// Current counter value, when the stage has one
    pub current: Option<u64>,

    /// Total counter value, when known
    pub total: Option<u64>,

    /// Path the event relates to
    pub path: Option<String>,

    /// Free-form message
    pub message: Option<String>,
}

impl ProgressEvent {
    /// Create an event with just a stage and path
    pub fn at(stage: ProgressStage, path: &Path) -> Self {
        Self {
            stage,
            current: None,
            total: None,
            path: Some(path.display().to_string()),
            message: None,
        }
    }

    /// Create an event carrying counters
    pub fn counted(stage: ProgressStage, current: u64, total: u64, path: &Path) -> Self {
        Self {
            stage,
            current: Some(current),
            total: Some(total),
            path: Some(path.display().to_string()),
            message: None,
        }
    }

    /// Attach a message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Caller-supplied consumer of progress events
///
/// Emission order across dimensions is unspecified when parallelism > 1, so
/// implementations must be safe to call from worker threads.
pub trait ProgressSink: Send + Sync {
    /// Observe one event
    fn emit(&self, event: &ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn emit(&self, event: &ProgressEvent) {
        self(event)
    }
}
