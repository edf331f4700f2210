//! Cross-process advisory lock over `<canvas_dir>/lock` (§4.H, §9
//! "file locking"). Best-effort: platforms/errors where advisory locks are
//! unavailable degrade to "unlocked" rather than failing the caller.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use fs4::fs_std::FileExt;
use tracing::warn;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// RAII guard for a held (or degraded-unlocked) artifact lock. The
/// underlying file lock, if any, is released on drop.
pub struct ArtifactLock {
    file: Option<File>,
    locked: bool,
}

impl ArtifactLock {
    pub fn is_locked(&self) -> bool {
        self.locked
    }
}

impl Drop for ArtifactLock {
    fn drop(&mut self) {
        if let Some(file) = &self.file {
            let _ = FileExt::unlock(file);
        }
    }
}

fn lock_path(canvas_dir: &Path) -> PathBuf {
    canvas_dir.join("lock")
}

/// Acquire an exclusive lock on `<canvas_dir>/lock`, polling up to
/// `timeout`. Degrades to an unlocked guard (`is_locked() == false`) if the
/// directory can't be created, the file can't be opened, or advisory locks
/// are unsupported on this platform — callers proceed best-effort per §7.
pub fn canvas_artifact_lock(canvas_dir: &Path, timeout: Duration) -> ArtifactLock {
    if let Err(err) = std::fs::create_dir_all(canvas_dir) {
        warn!(error = %err, dir = %canvas_dir.display(), "could not create canvas dir for lock; proceeding unlocked");
        return ArtifactLock { file: None, locked: false };
    }

    let file = match OpenOptions::new().create(true).write(true).open(lock_path(canvas_dir)) {
        Ok(f) => f,
        Err(err) => {
            warn!(error = %err, "could not open artifact lock file; proceeding unlocked");
            return ArtifactLock { file: None, locked: false };
        }
    };

    let deadline = Instant::now() + timeout;
    loop {
        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => return ArtifactLock { file: Some(file), locked: true },
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {}
            Err(err) => {
                warn!(error = %err, "advisory file locks unavailable; proceeding unlocked");
                return ArtifactLock { file: Some(file), locked: false };
            }
        }
        if Instant::now() >= deadline {
            warn!("timed out acquiring artifact lock; proceeding unlocked");
            return ArtifactLock { file: Some(file), locked: false };
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn acquires_lock_on_fresh_directory() {
        let dir = TempDir::new().unwrap();
        let guard = canvas_artifact_lock(dir.path(), Duration::from_millis(200));
        assert!(guard.is_locked());
    }

    #[test]
    fn second_acquire_times_out_while_first_is_held() {
        let dir = TempDir::new().unwrap();
        let first = canvas_artifact_lock(dir.path(), Duration::from_millis(200));
        assert!(first.is_locked());

        let second = canvas_artifact_lock(dir.path(), Duration::from_millis(100));
        assert!(!second.is_locked());
    }

    #[test]
    fn lock_is_released_on_drop() {
        let dir = TempDir::new().unwrap();
        {
            let guard = canvas_artifact_lock(dir.path(), Duration::from_millis(200));
            assert!(guard.is_locked());
        }
        let second = canvas_artifact_lock(dir.path(), Duration::from_millis(200));
        assert!(second.is_locked());
    }
}
