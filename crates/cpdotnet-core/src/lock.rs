// ── Advisory file locks ──
//
// Each CLI invocation is its own process, so in-process mutexes only order
// tasks inside one of them. These exclusive locks on files under the state
// directory order whole processes. A lock is released when its guard is
// dropped and the file closed.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs4::fs_std::FileExt;
use tracing::trace;

use crate::error::CoreError;

/// An exclusive lock on one file, held until dropped.
#[derive(Debug)]
pub(crate) struct FileLock {
    _file: File,
}

impl FileLock {
    /// Block until the lock on `path` is held. The file and its parent
    /// directory are created when missing; the file stays empty.
    pub(crate) fn acquire(path: &Path) -> Result<Self, CoreError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(CoreError::storage(dir))?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(CoreError::storage(path))?;
        FileExt::lock_exclusive(&file).map_err(CoreError::storage(path))?;
        trace!(path = %path.display(), "acquired file lock");

        Ok(Self { _file: file })
    }

    /// [`acquire`](Self::acquire) on the blocking pool, for callers that
    /// may wait on another process for a long time.
    pub(crate) async fn acquire_blocking(path: PathBuf) -> Result<Self, CoreError> {
        tokio::task::spawn_blocking(move || Self::acquire(&path))
            .await
            .map_err(|e| CoreError::Internal(format!("file lock task failed: {e}")))?
    }
}
