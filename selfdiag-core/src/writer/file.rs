//! The memory-mapped backing file and its write cursor.

use crate::error::{DiagError, Result};
use memmap2::{MmapMut, MmapOptions};
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Process-wide generation source. Zero is reserved for "no file".
static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// A reserved byte range in the circular buffer.
///
/// Produced by [`CircularFileWriter::claim`](super::CircularFileWriter::claim)
/// and consumed by [`CircularFileWriter::write_at`](super::CircularFileWriter::write_at).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Claim {
    /// Start offset inside the file.
    pub offset: usize,
    /// Number of bytes reserved.
    pub len: usize,
    /// Bytes between `offset` and the physical end of the file.
    pub available_before_wrap: usize,
    /// Generation of the file the range was claimed from.
    pub generation: u64,
}

impl Claim {
    /// Whether the range continues at offset zero.
    pub fn wraps(&self) -> bool {
        self.len > self.available_before_wrap
    }
}

/// A fixed-size file mapped into memory.
///
/// Writers copy into disjoint claimed ranges through a raw base pointer, so
/// many threads can write at once through a shared reference.
pub(crate) struct LogFile {
    mmap: MmapMut,
    base: *mut u8,
    /// Keeps the descriptor open for the lifetime of the mapping.
    _file: File,
    path: PathBuf,
    capacity: usize,
    generation: u64,
    cursor: AtomicUsize,
}

// SAFETY: `base` points into `mmap`, which lives exactly as long as `self`.
// All writes go to ranges handed out by the atomic cursor in `claim`.
unsafe impl Send for LogFile {}
unsafe impl Sync for LogFile {}

impl LogFile {
    /// Create (replacing any previous file) and map `<directory>/<exe>.<pid>.log`.
    pub(crate) fn create(directory: &Path, capacity: usize) -> Result<Self> {
        std::fs::create_dir_all(directory).map_err(|e| DiagError::FileCreate {
            path: directory.to_path_buf(),
            cause: e.to_string(),
        })?;

        let path = directory.join(log_file_name());

        // Unlink rather than truncate in place: a mapping of the previous file
        // may still be held by an in-flight writer and must keep its pages.
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(DiagError::FileCreate {
                    path,
                    cause: format!("Failed to replace previous file: {}", e),
                });
            }
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| DiagError::FileCreate {
                path: path.clone(),
                cause: e.to_string(),
            })?;

        file.set_len(capacity as u64)
            .map_err(|e| DiagError::FileCreate {
                path: path.clone(),
                cause: e.to_string(),
            })?;

        let mut mmap = unsafe {
            MmapOptions::new()
                .len(capacity)
                .map_mut(&file)
                .map_err(|e| DiagError::FileMmap {
                    path: path.clone(),
                    cause: e.to_string(),
                })?
        };
        let base = mmap.as_mut_ptr();

        Ok(Self {
            mmap,
            base,
            _file: file,
            path,
            capacity,
            generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
            cursor: AtomicUsize::new(0),
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Atomically reserve `len` bytes (clamped to the capacity).
    pub(crate) fn claim(&self, len: usize) -> Claim {
        let len = len.min(self.capacity);
        let mut current = self.cursor.load(Ordering::Relaxed);

        loop {
            let mut next = current + len;
            if next >= self.capacity {
                next -= self.capacity;
            }

            match self.cursor.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    return Claim {
                        offset: current,
                        len,
                        available_before_wrap: self.capacity - current,
                        generation: self.generation,
                    };
                }
                Err(actual) => {
                    current = actual;
                    std::hint::spin_loop();
                }
            }
        }
    }

    /// Copy `bytes` into the claimed range, continuing at offset zero when
    /// the range crosses the physical end.
    pub(crate) fn write(&self, claim: &Claim, bytes: &[u8]) {
        if claim.generation != self.generation || claim.offset >= self.capacity {
            return;
        }

        let len = bytes.len().min(claim.len);
        let head = len
            .min(claim.available_before_wrap)
            .min(self.capacity - claim.offset);
        let tail = (len - head).min(claim.offset);

        // SAFETY: `claim.offset + head <= capacity` and `tail <= claim.offset`,
        // so both copies stay inside the mapping.
        unsafe {
            ptr::copy_nonoverlapping(bytes.as_ptr(), self.base.add(claim.offset), head);
            if tail > 0 {
                ptr::copy_nonoverlapping(bytes[head..].as_ptr(), self.base, tail);
            }
        }
    }

    pub(crate) fn flush(&self) -> io::Result<()> {
        self.mmap.flush_async()
    }
}

impl Drop for LogFile {
    fn drop(&mut self) {
        let _ = self.mmap.flush_async();
    }
}

/// `<executable name>.<process id>.log`
pub(crate) fn log_file_name() -> String {
    let executable = std::env::current_exe()
        .ok()
        .and_then(|path| {
            path.file_name()
                .map(|name| name.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "process".to_string());

    format!("{}.{}.log", executable, std::process::id())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn create_sizes_file() {
        let dir = tempdir().unwrap();
        let file = LogFile::create(dir.path(), 4096).unwrap();

        assert!(file.path().starts_with(dir.path()));
        assert_eq!(std::fs::metadata(file.path()).unwrap().len(), 4096);
        assert_eq!(file.capacity(), 4096);
    }

    #[test]
    fn file_name_carries_process_id() {
        let name = log_file_name();
        assert!(name.ends_with(&format!(".{}.log", std::process::id())));
    }

    #[test]
    fn generations_increase() {
        let dir = tempdir().unwrap();
        let first = LogFile::create(dir.path(), 64).unwrap();
        let second = LogFile::create(&dir.path().join("nested"), 64).unwrap();
        assert!(second.generation() > first.generation());
        assert_ne!(first.generation(), 0);
    }

    #[test]
    fn claim_advances_and_wraps() {
        let dir = tempdir().unwrap();
        let file = LogFile::create(dir.path(), 100).unwrap();

        let a = file.claim(60);
        assert_eq!((a.offset, a.available_before_wrap), (0, 100));
        assert!(!a.wraps());

        let b = file.claim(50);
        assert_eq!((b.offset, b.available_before_wrap), (60, 40));
        assert!(b.wraps());

        let c = file.claim(10);
        assert_eq!(c.offset, 10);

        // Ending exactly on the boundary wraps the cursor to zero.
        let d = file.claim(80);
        assert_eq!(d.offset, 20);
        assert_eq!(file.claim(1).offset, 0);
    }

    #[test]
    fn oversized_claim_is_clamped() {
        let dir = tempdir().unwrap();
        let file = LogFile::create(dir.path(), 32).unwrap();

        file.claim(5);
        let claim = file.claim(1000);
        assert_eq!(claim.len, 32);
        assert_eq!(file.claim(1).offset, 5);
    }

    #[test]
    fn write_splits_across_physical_end() {
        let dir = tempdir().unwrap();
        let file = LogFile::create(dir.path(), 16).unwrap();

        file.claim(12);
        let claim = file.claim(8);
        file.write(&claim, b"ABCDEFGH");
        file.flush().unwrap();

        let contents = std::fs::read(file.path()).unwrap();
        assert_eq!(&contents[12..16], b"ABCD");
        assert_eq!(&contents[0..4], b"EFGH");
    }

    #[test]
    fn write_with_foreign_claim_is_dropped() {
        let dir = tempdir().unwrap();
        let file = LogFile::create(dir.path(), 16).unwrap();

        let mut claim = file.claim(4);
        claim.generation += 1;
        file.write(&claim, b"XXXX");

        let contents = std::fs::read(file.path()).unwrap();
        assert!(contents.iter().all(|b| *b == 0));
    }
}
