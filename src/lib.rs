//! # mcaprune
//!
//! A storage optimizer for sector-addressed region worlds. A run walks every
//! dimension under a world root, decodes each region container's slot table,
//! and rewrites the container keeping only the records worth keeping: chunks
//! whose accumulated inhabited duration reaches a threshold, plus every
//! administratively pinned chunk. Kept records are carried over byte for
//! byte, so nothing that survives the pass is ever re-encoded.
//!
//! ## Quick start
//!
//! ```no_run
//! use mcaprune::OptimizeConfig;
//!
//! # fn main() -> mcaprune::Result<()> {
//! let report = mcaprune::run(
//!     OptimizeConfig::new("/srv/world")
//!         .with_output("/srv/world-pruned")
//!         .with_threshold_seconds(60),
//! )?;
//! println!(
//!     "kept {} of {} chunks",
//!     report.processed_chunks - report.removed_chunks,
//!     report.processed_chunks
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Design
//!
//! - **Containers are copied, not re-encoded.** The codec in [`region`]
//!   reads raw record bytes and the writer re-packs them into fresh sector
//!   layout; payload bytes and per-slot timestamps are untouched.
//! - **Damage is isolated.** Every per-file and per-record failure is
//!   recorded into the final [`OptimizeReport`] and the pass continues; the
//!   only fatal failure is an in-place replacement that broke partway.
//! - **Everything behind seams.** The [`FileSystem`] backend, the
//!   [`RegionIoFactory`] codec factory, progress and error sinks are all
//!   traits, so the full pipeline runs in memory under test.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod compression;
pub mod config;
pub mod error;
pub mod fs;
pub mod io_factory;
pub mod nbt;
pub mod patterns;
pub mod progress;
pub mod region;
pub mod report;

mod optimizer;
mod pipeline;

pub use config::{Archiver, OptimizeConfig};
pub use error::{CompressionError, Error, NbtError, RegionError, Result};
pub use fs::{FileSystem, MemoryFs, RealFileSystem};
pub use io_factory::{DefaultIoFactory, MemoryIoFactory, RegionIoFactory};
pub use optimizer::run;
pub use patterns::{ChunkPattern, InhabitedTimePattern, ListPattern};
pub use progress::{ProgressEvent, ProgressSink, ProgressStage};
pub use report::{DimensionResult, ErrorKind, ErrorSink, OptimizeError, OptimizeReport};
