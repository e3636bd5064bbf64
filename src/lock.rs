//! Run-level mutual exclusion via an advisory file lock.
//!
//! Exactly one reconcile or repair run may be active for a given parity root.
//! The lock is acquired non-blocking: a held lock means another run is already
//! in flight, which is the expected, benign case for overlapping cron triggers.

use std::fs::{File, OpenOptions};
use std::path::Path;

use fs2::FileExt;

use crate::error::{Error, Result};

/// Holds the advisory lock for as long as it's alive; dropping it releases the
/// lock (and, on Unix, closing the fd does this implicitly regardless).
pub struct RunLock {
    file: File,
}

impl RunLock {
    /// Try to acquire the run lock at `path`, creating the lock file if needed.
    ///
    /// Returns `Err(Error::LockHeld)` if another process already holds it —
    /// callers should treat that as a clean, successful exit, not a failure.
    pub fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(Error::Io)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(path)
            .map_err(|e| Error::Run(format!("failed to open lock file {}: {e}", path.display())))?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self { file }),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Err(Error::LockHeld),
            Err(e) => Err(Error::Run(format!("failed to lock {}: {e}", path.display()))),
        }
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_is_lock_held() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.lock");

        let first = RunLock::acquire(&path).unwrap();
        let second = RunLock::acquire(&path);
        assert!(matches!(second, Err(Error::LockHeld)));
        drop(first);
    }

    #[test]
    fn lock_is_released_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.lock");

        {
            let _lock = RunLock::acquire(&path).unwrap();
        }
        let reacquired = RunLock::acquire(&path);
        assert!(reacquired.is_ok());
    }
}
