//! Positioned random access over a container
//!
//! Region entries keep a shared handle to their container and read lazily, so
//! the access seam must support concurrent positioned reads. The file-backed
//! implementation serializes seek+read pairs behind a mutex; the memory
//! implementation reads straight out of the buffer.

use parking_lot::Mutex;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// Bounds-checked positioned reads over container bytes
pub trait RandomAccess: Send + Sync {
    /// Total byte length of the container
    fn len(&self) -> u64;

    /// Whether the container is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fill `buf` from the bytes starting at `pos`
    ///
    /// Fails with `UnexpectedEof` when the requested range extends past the
    /// end of the container.
    fn read_at(&self, pos: u64, buf: &mut [u8]) -> io::Result<()>;
}

/// Real-file access behind a mutex-guarded handle
pub struct FileAccess {
    file: Mutex<File>,
    len: u64,
}

impl FileAccess {
    /// Open a file read-only
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            file: Mutex::new(file),
            len,
        })
    }
}

impl RandomAccess for FileAccess {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_at(&self, pos: u64, buf: &mut [u8]) -> io::Result<()> {
        if pos.checked_add(buf.len() as u64).map_or(true, |end| end > self.len) {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "read past end of container",
            ));
        }
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(pos))?;
        file.read_exact(buf)
    }
}

/// In-memory access over a whole-container buffer
pub struct MemoryAccess {
    data: Vec<u8>,
}

impl MemoryAccess {
    /// Wrap a container buffer
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }
}

impl RandomAccess for MemoryAccess {
    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn read_at(&self, pos: u64, buf: &mut [u8]) -> io::Result<()> {
        let start = usize::try_from(pos)
            .map_err(|_| io::Error::new(io::ErrorKind::UnexpectedEof, "offset overflow"))?;
        let end = start.checked_add(buf.len()).filter(|&e| e <= self.data.len());
        match end {
            Some(end) => {
                buf.copy_from_slice(&self.data[start..end]);
                Ok(())
            }
            None => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "read past end of container",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_access_reads_and_bounds_checks() {
        let acc = MemoryAccess::new(vec![1, 2, 3, 4]);
        let mut buf = [0u8; 2];
        acc.read_at(1, &mut buf).unwrap();
        assert_eq!(buf, [2, 3]);
        assert!(acc.read_at(3, &mut buf).is_err());
        assert!(acc.read_at(u64::MAX, &mut buf).is_err());
    }
}
