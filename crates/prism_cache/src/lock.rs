//! Exclusive lock over a segment directory.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use fs2::FileExt;
use parking_lot::{Mutex, MutexGuard};

use crate::error::CacheError;

/// Name of the lock file inside a segment directory.
pub(crate) const LOCK_FILE: &str = ".lock";

/// Exclusive access to one segment directory, shared by every process that
/// opens it. Released on drop.
pub(crate) struct SegmentLock {
    file: File,
    // fs2 locks only exclude other processes on Unix; threads of this process
    // serialize on this guard.
    _guard: MutexGuard<'static, ()>,
}

impl SegmentLock {
    /// Blocks until the lock on `seg_dir` is held, creating the directory
    /// and lock file if needed.
    pub(crate) fn acquire(seg_dir: &Path) -> Result<Self, CacheError> {
        let path = seg_dir.join(LOCK_FILE);
        let guard = process_lock_for(&path).lock();

        std::fs::create_dir_all(seg_dir).map_err(|e| CacheError::Io {
            path: seg_dir.to_path_buf(),
            source: e,
        })?;
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| CacheError::Io {
                path: path.clone(),
                source: e,
            })?;
        FileExt::lock_exclusive(&file).map_err(|e| CacheError::Io {
            path: path.clone(),
            source: e,
        })?;
        tracing::trace!(path = %path.display(), "segment lock acquired");

        Ok(Self {
            file,
            _guard: guard,
        })
    }
}

impl Drop for SegmentLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

fn process_lock_for(path: &Path) -> &'static Mutex<()> {
    static PROCESS_LOCKS: OnceLock<Mutex<HashMap<PathBuf, &'static Mutex<()>>>> = OnceLock::new();
    let mut locks = PROCESS_LOCKS
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock();
    *locks
        .entry(path.to_path_buf())
        .or_insert_with(|| &*Box::leak(Box::new(Mutex::new(()))))
}
