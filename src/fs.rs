//! Storage backend abstraction
//!
//! The entire pass runs against the [`FileSystem`] capability trait so the
//! same pipeline logic serves two backends without duplication:
//!
//! - [`RealFileSystem`]: a pass-through to `std::fs`
//! - [`MemoryFs`]: a map-backed filesystem for deterministic, disk-free tests
//!
//! `MemoryFs` can materialize a virtual path onto a private real temp
//! directory via [`FileSystem::to_real_path`], which is how a random-access
//! region codec operates on virtual containers when needed.

use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Directory and file operations needed by the pipeline
///
/// Implementations must tolerate concurrent calls from dimension workers; no
/// two workers ever touch the same dimension directory, but discovery and
/// staging paths are shared.
pub trait FileSystem: Send + Sync {
    /// Whether `path` is an existing directory
    fn is_directory(&self, path: &Path) -> bool;

    /// Whether `path` exists at all
    fn exists(&self, path: &Path) -> bool;

    /// Byte length of the file at `path`, if it exists
    fn len(&self, path: &Path) -> Option<u64>;

    /// Immediate children of a directory
    fn list(&self, path: &Path) -> Vec<PathBuf>;

    /// All paths under `path`, including `path` itself
    fn walk(&self, path: &Path) -> Vec<PathBuf>;

    /// Create a directory and all missing parents
    fn create_directories(&self, path: &Path) -> io::Result<()>;

    /// Delete a file or empty directory if present
    fn delete_if_exists(&self, path: &Path) -> io::Result<()>;

    /// Copy a file
    fn copy(&self, src: &Path, dst: &Path, replace: bool) -> io::Result<()>;

    /// Write a whole file
    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;

    /// Read a whole file, `None` if missing or unreadable
    fn read(&self, path: &Path) -> Option<Vec<u8>>;

    /// Allocate a fresh private directory for staging
    fn create_temp_directory(&self, prefix: &str) -> io::Result<PathBuf>;

    /// Recursively delete a tree, retrying on transient failures
    ///
    /// Returns `true` once the tree is gone, `false` after exhausting
    /// `attempts`.
    fn delete_tree_with_retry(&self, root: &Path, attempts: u32, delay: Duration) -> bool;

    /// Resolve to a path on the real filesystem
    ///
    /// Backends that stage virtual paths materialize the content onto a real
    /// temp directory here so random-access codecs can open it.
    fn to_real_path(&self, path: &Path) -> io::Result<PathBuf>;
}

/// Pass-through backend over the real filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn is_directory(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn len(&self, path: &Path) -> Option<u64> {
        std::fs::metadata(path).ok().map(|m| m.len())
    }

    fn list(&self, path: &Path) -> Vec<PathBuf> {
        let mut out: Vec<PathBuf> = match std::fs::read_dir(path) {
            Ok(rd) => rd.filter_map(|e| e.ok().map(|e| e.path())).collect(),
            Err(_) => Vec::new(),
        };
        out.sort();
        out
    }

    fn walk(&self, path: &Path) -> Vec<PathBuf> {
        walkdir::WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok().map(|e| e.into_path()))
            .collect()
    }

    fn create_directories(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn delete_if_exists(&self, path: &Path) -> io::Result<()> {
        let res = if path.is_dir() {
            std::fs::remove_dir(path)
        } else {
            std::fs::remove_file(path)
        };
        match res {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn copy(&self, src: &Path, dst: &Path, replace: bool) -> io::Result<()> {
        if !replace && dst.exists() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("destination exists: {}", dst.display()),
            ));
        }
        std::fs::copy(src, dst).map(|_| ())
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        std::fs::write(path, bytes)
    }

    fn read(&self, path: &Path) -> Option<Vec<u8>> {
        std::fs::read(path).ok()
    }

    fn create_temp_directory(&self, prefix: &str) -> io::Result<PathBuf> {
        let dir = tempfile::Builder::new().prefix(prefix).tempdir()?;
        Ok(dir.into_path())
    }

    fn delete_tree_with_retry(&self, root: &Path, attempts: u32, delay: Duration) -> bool {
        for attempt in 0..attempts {
            if !root.exists() {
                return true;
            }
            match std::fs::remove_dir_all(root) {
                Ok(()) => return true,
                Err(e) => {
                    warn!(
                        path = %root.display(),
                        attempt,
                        error = %e,
                        "tree delete failed, retrying"
                    );
                    std::thread::sleep(delay);
                }
            }
        }
        !root.exists()
    }

    fn to_real_path(&self, path: &Path) -> io::Result<PathBuf> {
        Ok(path.to_path_buf())
    }
}

/// Map-backed backend for deterministic tests
///
/// Paths are purely virtual; parent/child relationships come from string
/// prefixes of the path form, so tests should use absolute-style paths
/// (`/world/region/r.0.0.mca`).
#[derive(Debug, Default)]
pub struct MemoryFs {
    dirs: RwLock<BTreeSet<PathBuf>>,
    files: RwLock<BTreeMap<PathBuf, Vec<u8>>>,
    staging: Mutex<Option<PathBuf>>,
}

impl MemoryFs {
    /// Create an empty in-memory filesystem
    pub fn new() -> Self {
        Self::default()
    }

    fn direct_child(base: &str, candidate: &Path) -> bool {
        let rel = candidate.to_string_lossy();
        if rel.as_ref() == base || !rel.starts_with(base) {
            return false;
        }
        match rel[base.len()..].strip_prefix('/') {
            Some(child) => !child.is_empty() && !child.contains('/'),
            None => false,
        }
    }

    fn base_string(path: &Path) -> String {
        path.to_string_lossy().trim_end_matches('/').to_string()
    }

    /// Whether `candidate` is `base` itself or lives somewhere beneath it;
    /// a sibling sharing the string prefix (`/out` vs `/out2`) does not count
    fn in_tree(base: &str, candidate: &Path) -> bool {
        match candidate.to_string_lossy().strip_prefix(base) {
            Some("") => true,
            Some(rest) => rest.starts_with('/'),
            None => false,
        }
    }
}

impl FileSystem for MemoryFs {
    fn is_directory(&self, path: &Path) -> bool {
        self.dirs.read().contains(path)
    }

    fn exists(&self, path: &Path) -> bool {
        self.dirs.read().contains(path) || self.files.read().contains_key(path)
    }

    fn len(&self, path: &Path) -> Option<u64> {
        self.files.read().get(path).map(|b| b.len() as u64)
    }

    fn list(&self, path: &Path) -> Vec<PathBuf> {
        let base = Self::base_string(path);
        let mut out = Vec::new();
        for d in self.dirs.read().iter() {
            if Self::direct_child(&base, d) {
                out.push(d.clone());
            }
        }
        for f in self.files.read().keys() {
            if Self::direct_child(&base, f) {
                out.push(f.clone());
            }
        }
        out.sort();
        out
    }

    fn walk(&self, path: &Path) -> Vec<PathBuf> {
        let base = Self::base_string(path);
        let mut out = Vec::new();
        for d in self.dirs.read().iter() {
            if Self::in_tree(&base, d) {
                out.push(d.clone());
            }
        }
        for f in self.files.read().keys() {
            if Self::in_tree(&base, f) {
                out.push(f.clone());
            }
        }
        out.sort();
        out
    }

    fn create_directories(&self, path: &Path) -> io::Result<()> {
        let mut dirs = self.dirs.write();
        let mut cur = PathBuf::new();
        for comp in path.components() {
            cur.push(comp);
            dirs.insert(cur.clone());
        }
        Ok(())
    }

    fn delete_if_exists(&self, path: &Path) -> io::Result<()> {
        self.files.write().remove(path);
        self.dirs.write().remove(path);
        Ok(())
    }

    fn copy(&self, src: &Path, dst: &Path, replace: bool) -> io::Result<()> {
        let data = self.files.read().get(src).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("source not found: {}", src.display()),
            )
        })?;
        if !replace && self.files.read().contains_key(dst) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("destination exists: {}", dst.display()),
            ));
        }
        self.files.write().insert(dst.to_path_buf(), data);
        Ok(())
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        self.files.write().insert(path.to_path_buf(), bytes.to_vec());
        Ok(())
    }

    fn read(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.read().get(path).cloned()
    }

    fn create_temp_directory(&self, prefix: &str) -> io::Result<PathBuf> {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let p = PathBuf::from(format!("/mem-{prefix}{nanos}"));
        self.dirs.write().insert(p.clone());
        Ok(p)
    }

    fn delete_tree_with_retry(&self, root: &Path, attempts: u32, delay: Duration) -> bool {
        let mut targets = self.walk(root);
        targets.sort_by_key(|p| std::cmp::Reverse(p.to_string_lossy().len()));
        for t in targets {
            let _ = self.delete_if_exists(&t);
        }
        if let Some(staged) = self.staging.lock().as_ref() {
            RealFileSystem.delete_tree_with_retry(staged, attempts, delay);
        }
        true
    }

    fn to_real_path(&self, path: &Path) -> io::Result<PathBuf> {
        let base = {
            let mut staging = self.staging.lock();
            match staging.as_ref() {
                Some(dir) => dir.clone(),
                None => {
                    let dir = RealFileSystem.create_temp_directory("memfs-")?;
                    *staging = Some(dir.clone());
                    dir
                }
            }
        };
        let rel = path.to_string_lossy();
        let real = base.join(rel.trim_start_matches('/'));
        if let Some(parent) = real.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        if let Some(data) = self.files.read().get(path) {
            std::fs::write(&real, data)?;
        } else if !real.exists() && self.dirs.read().contains(path) {
            std::fs::create_dir_all(&real)?;
        }
        Ok(real)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_fs_lists_direct_children_only() {
        let fs = MemoryFs::new();
        fs.create_directories(Path::new("/world/region")).unwrap();
        fs.write(Path::new("/world/region/r.0.0.mca"), b"x").unwrap();
        fs.write(Path::new("/world/level.dat"), b"y").unwrap();

        let children = fs.list(Path::new("/world"));
        assert_eq!(
            children,
            vec![
                PathBuf::from("/world/level.dat"),
                PathBuf::from("/world/region"),
            ]
        );
        let region = fs.list(Path::new("/world/region"));
        assert_eq!(region, vec![PathBuf::from("/world/region/r.0.0.mca")]);
    }

    #[test]
    fn memory_fs_walk_and_delete_tree() {
        let fs = MemoryFs::new();
        fs.create_directories(Path::new("/a/b")).unwrap();
        fs.write(Path::new("/a/b/f1"), b"1").unwrap();
        fs.write(Path::new("/a/f2"), b"2").unwrap();

        assert!(fs.walk(Path::new("/a")).len() >= 4);
        assert!(fs.delete_tree_with_retry(Path::new("/a"), 1, Duration::from_millis(1)));
        assert!(!fs.exists(Path::new("/a/b/f1")));
        assert!(!fs.exists(Path::new("/a")));
    }

    #[test]
    fn memory_fs_walk_stops_at_path_boundaries() {
        let fs = MemoryFs::new();
        fs.create_directories(Path::new("/world/region")).unwrap();
        fs.write(Path::new("/world/region/r.0.0.mca"), b"a").unwrap();
        fs.create_directories(Path::new("/world2/region")).unwrap();
        fs.write(Path::new("/world2/region/r.0.0.mca"), b"b").unwrap();

        let walked = fs.walk(Path::new("/world"));
        assert!(walked.contains(&PathBuf::from("/world/region/r.0.0.mca")));
        assert!(!walked.iter().any(|p| p.starts_with("/world2")));
    }

    #[test]
    fn memory_fs_delete_tree_spares_prefix_siblings() {
        let fs = MemoryFs::new();
        fs.create_directories(Path::new("/out")).unwrap();
        fs.write(Path::new("/out/gone.bin"), b"x").unwrap();
        fs.create_directories(Path::new("/out2")).unwrap();
        fs.write(Path::new("/out2/keep.bin"), b"y").unwrap();

        assert!(fs.delete_tree_with_retry(Path::new("/out"), 1, Duration::from_millis(1)));
        assert!(!fs.exists(Path::new("/out/gone.bin")));
        assert!(fs.exists(Path::new("/out2/keep.bin")));
        assert!(fs.is_directory(Path::new("/out2")));
    }

    #[test]
    fn memory_fs_materializes_real_path() {
        let fs = MemoryFs::new();
        fs.write(Path::new("/data/blob.bin"), b"hello").unwrap();
        let real = fs.to_real_path(Path::new("/data/blob.bin")).unwrap();
        assert_eq!(std::fs::read(&real).unwrap(), b"hello");
        fs.delete_tree_with_retry(Path::new("/data"), 3, Duration::from_millis(1));
    }

    #[test]
    fn memory_fs_create_directories_adds_parents() {
        let fs = MemoryFs::new();
        fs.create_directories(Path::new("/x/y/z")).unwrap();
        assert!(fs.is_directory(Path::new("/x")));
        assert!(fs.is_directory(Path::new("/x/y")));
        assert!(fs.is_directory(Path::new("/x/y/z")));
    }
}
