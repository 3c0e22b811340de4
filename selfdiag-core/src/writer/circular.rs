//! Shared circular writer with per-thread views.

use super::file::{Claim, LogFile};
use crate::error::{DiagError, Result};
use arc_swap::ArcSwapOption;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

/// First bytes of every freshly (re)created log file.
pub const SENTINEL: &[u8] = b"Successfully opened file.\n";

/// Largest accepted capacity: 128 MiB.
pub const MAX_CAPACITY: u64 = 128 * 1024 * 1024;

/// Generation value meaning "no file is open".
const CLOSED: u64 = 0;

thread_local! {
    static VIEW: RefCell<Option<ThreadView>> = const { RefCell::new(None) };
}

/// A thread's cached handle onto one generation of the log file.
///
/// The handle is weak: once the writer drops the file, an idle thread's view
/// does not keep the mapping alive, and upgrading it simply fails.
struct ThreadView {
    file: Weak<LogFile>,
    generation: u64,
}

impl ThreadView {
    fn open(file: &Arc<LogFile>) -> Self {
        Self {
            file: Arc::downgrade(file),
            generation: file.generation(),
        }
    }
}

/// Fixed-size circular log file shared by every thread in the process.
///
/// Space is reserved with a lock-free compare-and-swap on the write cursor,
/// then filled through the calling thread's view of the mapping. Replacing
/// or closing the file is one atomic swap of the handle that also carries
/// the generation, so a writer racing with it either finishes against the
/// old mapping or finds nothing and returns.
pub struct CircularFileWriter {
    current: ArcSwapOption<LogFile>,
}

impl CircularFileWriter {
    /// Create a writer with no backing file. Writes are no-ops until
    /// [`create`](Self::create) succeeds.
    pub fn new() -> Self {
        Self {
            current: ArcSwapOption::from(None),
        }
    }

    /// Create the backing file in `directory` and make it current.
    ///
    /// Any previously open file is replaced. On failure the error is logged,
    /// the writer is left disabled, and the error is returned to the caller
    /// for bookkeeping only.
    pub fn create(&self, directory: impl AsRef<Path>, capacity: u64) -> Result<PathBuf> {
        let directory = directory.as_ref();

        match Self::open_file(directory, capacity) {
            Ok(file) => {
                // Written before publishing so no racing claim can precede it.
                file.write(&file.claim(SENTINEL.len()), SENTINEL);

                let file = Arc::new(file);
                let path = file.path().to_path_buf();
                let generation = file.generation();

                self.current.store(Some(file));

                tracing::info!(
                    path = %path.display(),
                    capacity,
                    generation,
                    "Self-diagnostics log file opened"
                );

                Ok(path)
            }
            Err(e) => {
                self.close();
                tracing::error!(
                    code = e.code(),
                    directory = %directory.display(),
                    error = %e,
                    "Self-diagnostics disabled: could not open log file"
                );
                Err(e)
            }
        }
    }

    fn open_file(directory: &Path, capacity: u64) -> Result<LogFile> {
        if capacity == 0 || capacity > MAX_CAPACITY {
            return Err(DiagError::InvalidCapacity {
                requested: capacity,
                min: 1,
                max: MAX_CAPACITY,
            });
        }
        LogFile::create(directory, capacity as usize)
    }

    /// Reserve `len` bytes. Returns `None` when no file is open.
    pub fn claim(&self, len: usize) -> Option<Claim> {
        self.current.load().as_ref().map(|file| file.claim(len))
    }

    /// Write `bytes` into a range obtained from [`claim`](Self::claim).
    ///
    /// Never fails from the caller's point of view: a stale claim, a closed
    /// file, or a busy thread-local slot all drop the write silently.
    pub fn write_at(&self, claim: Claim, bytes: &[u8]) {
        let guard = self.current.load();
        let Some(current) = guard.as_ref() else {
            return;
        };
        let generation = current.generation();

        let _ = VIEW.try_with(|slot| {
            let Ok(mut view) = slot.try_borrow_mut() else {
                return;
            };

            if view.as_ref().is_none_or(|v| v.generation != generation) {
                *view = Some(ThreadView::open(current));
            }

            if let Some(file) = view.as_ref().and_then(|v| v.file.upgrade()) {
                file.write(&claim, bytes);
            }
        });
    }

    /// Claim space for `bytes` and write them.
    pub fn write(&self, bytes: &[u8]) {
        if let Some(claim) = self.claim(bytes.len()) {
            self.write_at(claim, bytes);
        }
    }

    /// Detach and release the current file.
    ///
    /// Safe to call while other threads are writing: the mapping is unmapped
    /// only after the last in-flight writer lets go of it.
    pub fn close(&self) {
        let previous = self.current.swap(None);

        if let Some(file) = previous {
            tracing::debug!(
                path = %file.path().display(),
                generation = file.generation(),
                "Self-diagnostics log file closed"
            );
        }
    }

    /// Ask the OS to write dirty pages of the current file back to disk.
    pub fn flush(&self) {
        if let Some(file) = self.current.load_full() {
            let _ = file.flush();
        }
    }

    /// Whether a backing file is currently open.
    pub fn is_open(&self) -> bool {
        self.current.load().is_some()
    }

    /// Path of the current backing file.
    pub fn path(&self) -> Option<PathBuf> {
        self.current
            .load()
            .as_ref()
            .map(|file| file.path().to_path_buf())
    }

    /// Capacity of the current backing file in bytes.
    pub fn capacity(&self) -> Option<u64> {
        self.current
            .load()
            .as_ref()
            .map(|file| file.capacity() as u64)
    }

    /// Generation of the current backing file, or 0 when closed.
    pub fn generation(&self) -> u64 {
        self.current
            .load()
            .as_ref()
            .map_or(CLOSED, |file| file.generation())
    }
}

impl Default for CircularFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CircularFileWriter {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn read(writer: &CircularFileWriter) -> Vec<u8> {
        writer.flush();
        std::fs::read(writer.path().unwrap()).unwrap()
    }

    #[test]
    fn create_writes_sentinel() {
        let dir = tempdir().unwrap();
        let writer = CircularFileWriter::new();
        let path = writer.create(dir.path(), 1024).unwrap();

        assert!(writer.is_open());
        assert_eq!(writer.path(), Some(path));
        assert_eq!(writer.capacity(), Some(1024));

        let contents = read(&writer);
        assert_eq!(contents.len(), 1024);
        assert_eq!(&contents[..SENTINEL.len()], SENTINEL);
    }

    #[test]
    fn writes_follow_sentinel() {
        let dir = tempdir().unwrap();
        let writer = CircularFileWriter::new();
        writer.create(dir.path(), 1024).unwrap();

        writer.write(b"first\n");
        writer.write(b"second\n");

        let contents = read(&writer);
        let end = SENTINEL.len();
        assert_eq!(&contents[end..end + 13], b"first\nsecond\n");
    }

    #[test]
    fn write_at_round_trip() {
        let dir = tempdir().unwrap();
        let writer = CircularFileWriter::new();
        writer.create(dir.path(), 256).unwrap();

        let record = b"round trip record\n";
        let claim = writer.claim(record.len()).unwrap();
        writer.write_at(claim, record);

        let contents = read(&writer);
        assert_eq!(&contents[claim.offset..claim.offset + record.len()], record);
    }

    #[test]
    fn straddling_write_continues_at_start() {
        let dir = tempdir().unwrap();
        let writer = CircularFileWriter::new();
        writer.create(dir.path(), 64).unwrap();

        // Advance the cursor to 60 (sentinel + filler).
        let filler = vec![b'.'; 60 - SENTINEL.len()];
        writer.write(&filler);

        let claim = writer.claim(8).unwrap();
        assert_eq!(claim.offset, 60);
        assert!(claim.wraps());
        writer.write_at(claim, b"12345678");

        let contents = read(&writer);
        assert_eq!(&contents[60..64], b"1234");
        assert_eq!(&contents[0..4], b"5678");
        assert_eq!(&contents[4..SENTINEL.len()], &SENTINEL[4..]);
    }

    #[test]
    fn disabled_writer_is_noop() {
        let writer = CircularFileWriter::new();
        assert!(!writer.is_open());
        assert!(writer.claim(10).is_none());
        assert_eq!(writer.generation(), 0);
        writer.write(b"ignored");
        writer.flush();
    }

    #[test]
    fn failed_create_disables_writer() {
        let dir = tempdir().unwrap();
        let writer = CircularFileWriter::new();
        writer.create(dir.path(), 128).unwrap();

        // A regular file where a directory is expected.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        let err = writer.create(&blocker, 128).unwrap_err();

        assert!(err.is_resource_error());
        assert!(!writer.is_open());
        writer.write(b"ignored");
    }

    #[test]
    fn invalid_capacity_is_rejected() {
        let dir = tempdir().unwrap();
        let writer = CircularFileWriter::new();

        let err = writer.create(dir.path(), 0).unwrap_err();
        assert_eq!(err.code(), "D003");
        let err = writer.create(dir.path(), MAX_CAPACITY + 1).unwrap_err();
        assert_eq!(err.code(), "D003");
        assert!(!writer.is_open());
    }

    #[test]
    fn reopen_yields_fresh_file_and_newer_generation() {
        let dir = tempdir().unwrap();
        let writer = CircularFileWriter::new();
        writer.create(dir.path(), 128).unwrap();
        writer.write(b"old content that must disappear\n");
        let first = writer.generation();

        writer.close();
        assert!(!writer.is_open());
        assert_eq!(writer.generation(), 0);

        writer.create(dir.path(), 128).unwrap();
        assert!(writer.generation() > first);

        let contents = read(&writer);
        assert_eq!(&contents[..SENTINEL.len()], SENTINEL);
        assert!(contents[SENTINEL.len()..].iter().all(|b| *b == 0));
    }

    #[test]
    fn open_writer_accepts_writes_after_racing_create_and_close() {
        let dir = tempdir().unwrap();
        let writer = CircularFileWriter::new();

        for _ in 0..20 {
            std::thread::scope(|scope| {
                for t in 0..4 {
                    // One directory per thread so creates never unlink each other.
                    let (writer, dir) = (&writer, dir.path().join(format!("t{t}")));
                    scope.spawn(move || {
                        for i in 0..25 {
                            if (i + t) % 2 == 0 {
                                let _ = writer.create(&dir, 256);
                            } else {
                                writer.close();
                            }
                        }
                    });
                }
            });

            if !writer.is_open() {
                assert_eq!(writer.generation(), 0);
                writer.create(dir.path(), 256).unwrap();
            }
            let claim = writer.claim(6).unwrap();
            assert_eq!(claim.generation, writer.generation());
            writer.write_at(claim, b"alive\n");

            let contents = read(&writer);
            assert_eq!(&contents[claim.offset..claim.offset + 6], b"alive\n");
        }
    }

    #[test]
    fn stale_claim_is_dropped_after_replacement() {
        let dir = tempdir().unwrap();
        let writer = CircularFileWriter::new();
        writer.create(dir.path(), 128).unwrap();

        let stale = writer.claim(5).unwrap();
        writer.create(dir.path(), 128).unwrap();
        writer.write_at(stale, b"STALE");

        let contents = read(&writer);
        assert!(!contents.windows(5).any(|w| w == b"STALE"));
    }
}
