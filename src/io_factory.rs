//! Region codec factory seam
//!
//! How a reader/writer pair is obtained for a given backend. The default
//! factory opens containers directly on the real filesystem (resolving
//! virtual paths through [`FileSystem::to_real_path`] first); the memory
//! factory buffers whole containers and writes them back through the backend
//! on finalize, so in-memory tests never touch the disk for containers.

use crate::error::RegionError;
use crate::fs::FileSystem;
use crate::region::{FileRegionWriter, MemoryRegionWriter, RegionReader, RegionWrite};
use std::path::Path;
use std::sync::Arc;

/// Produces region readers and writers for a backend
pub trait RegionIoFactory: Send + Sync {
    /// Open a reader over an existing container
    fn open_reader(
        &self,
        fs: &Arc<dyn FileSystem>,
        path: &Path,
    ) -> Result<RegionReader, RegionError>;

    /// Create a writer for a new container
    fn create_writer(
        &self,
        fs: &Arc<dyn FileSystem>,
        path: &Path,
    ) -> Result<Box<dyn RegionWrite>, RegionError>;
}

/// Direct-file codec: random access against real paths
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultIoFactory;

impl RegionIoFactory for DefaultIoFactory {
    fn open_reader(
        &self,
        fs: &Arc<dyn FileSystem>,
        path: &Path,
    ) -> Result<RegionReader, RegionError> {
        let real = fs.to_real_path(path)?;
        RegionReader::open(&real)
    }

    fn create_writer(
        &self,
        fs: &Arc<dyn FileSystem>,
        path: &Path,
    ) -> Result<Box<dyn RegionWrite>, RegionError> {
        let real = fs.to_real_path(path)?;
        Ok(Box::new(FileRegionWriter::create(&real)?))
    }
}

/// Memory-native codec: whole containers live in backend blobs
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryIoFactory;

impl RegionIoFactory for MemoryIoFactory {
    fn open_reader(
        &self,
        fs: &Arc<dyn FileSystem>,
        path: &Path,
    ) -> Result<RegionReader, RegionError> {
        let bytes = fs.read(path).unwrap_or_default();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        RegionReader::from_bytes(&name, bytes)
    }

    fn create_writer(
        &self,
        fs: &Arc<dyn FileSystem>,
        path: &Path,
    ) -> Result<Box<dyn RegionWrite>, RegionError> {
        Ok(Box::new(MemoryRegionWriter::new(
            Arc::clone(fs),
            path.to_path_buf(),
        )))
    }
}
