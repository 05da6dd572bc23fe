// ABOUTME: Per-application run lock preventing concurrent pipeline runs for one name.
// ABOUTME: Holder info is written to a temp file and linked into <state>/locks/<name>.lock without clobbering.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::NamedTempFile;

use super::error::LockError;
use crate::types::AppName;

/// Age after which a lock is considered abandoned.
const STALE_AFTER: Duration = Duration::from_secs(60 * 60);

/// Information about who holds a run lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// Hostname of the machine that holds the lock.
    pub holder: String,
    /// Process ID of the lock holder.
    pub pid: u32,
    /// When the lock was acquired.
    pub started_at: DateTime<Utc>,
    /// Application being deployed.
    pub app: String,
}

impl LockInfo {
    /// Create new lock info for the current process.
    pub fn new(app: &AppName) -> Self {
        Self {
            holder: gethostname::gethostname().to_string_lossy().into_owned(),
            pid: std::process::id(),
            started_at: Utc::now(),
            app: app.to_string(),
        }
    }

    /// Check if this lock is stale (older than 1 hour).
    pub fn is_stale(&self) -> bool {
        (Utc::now() - self.started_at)
            .to_std()
            .is_ok_and(|age| age >= STALE_AFTER)
    }

    /// Path to the lock file for an application.
    pub fn lock_path(locks_dir: &Path, app: &AppName) -> PathBuf {
        locks_dir.join(format!("{}.lock", app))
    }
}

/// A held run lock that releases on drop.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
    app: AppName,
}

impl RunLock {
    /// Acquire the run lock for `app`.
    ///
    /// The lock file appears with its holder info already written, and never
    /// replaces an existing file, so two processes cannot both succeed.
    /// Stale locks (>1 hour) are broken with a warning; a live lock is broken
    /// only when `force` is set. An unreadable lock file counts as live until
    /// its modification time is stale.
    pub fn acquire(locks_dir: &Path, app: &AppName, force: bool) -> Result<Self, LockError> {
        std::fs::create_dir_all(locks_dir).map_err(|source| LockError::Io {
            path: locks_dir.to_path_buf(),
            source,
        })?;

        let path = LockInfo::lock_path(locks_dir, app);
        let info = LockInfo::new(app);

        if Self::try_create(locks_dir, &path, &info)? {
            return Ok(Self {
                path,
                app: app.clone(),
            });
        }

        if !Self::should_break(&path, app, force)? {
            return match Self::read(&path) {
                Some(existing) => Err(LockError::Held {
                    name: app.clone(),
                    holder: existing.holder,
                    pid: existing.pid,
                    started_at: existing.started_at,
                }),
                None => Err(LockError::Contended(app.clone())),
            };
        }

        tracing::debug!(path = %path.display(), "removing stale or forced lock");
        let _ = std::fs::remove_file(&path);

        if !Self::try_create(locks_dir, &path, &info)? {
            return Err(LockError::Contended(app.clone()));
        }

        Ok(Self {
            path,
            app: app.clone(),
        })
    }

    /// Create the lock file if absent. Returns false if it already exists.
    fn try_create(locks_dir: &Path, path: &Path, info: &LockInfo) -> Result<bool, LockError> {
        let io_err = |source: std::io::Error| LockError::Io {
            path: path.to_path_buf(),
            source,
        };

        let json = serde_json::to_vec(info).map_err(|e| io_err(e.into()))?;
        let mut staged = NamedTempFile::new_in(locks_dir).map_err(io_err)?;
        staged.write_all(&json).map_err(io_err)?;
        staged.as_file().sync_all().map_err(io_err)?;

        match staged.persist_noclobber(path) {
            Ok(_) => Ok(true),
            Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(io_err(e.error)),
        }
    }

    /// Whether the file at `path` was last written longer ago than [`STALE_AFTER`].
    fn modified_long_ago(path: &Path) -> bool {
        std::fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok())
            .is_some_and(|age| age >= STALE_AFTER)
    }

    fn read(path: &Path) -> Option<LockInfo> {
        let content = std::fs::read_to_string(path).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Check if an existing lock should be broken (stale, forced, or corrupted).
    fn should_break(path: &Path, app: &AppName, force: bool) -> Result<bool, LockError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            // Released between our create attempt and this read.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(true),
            Err(source) => {
                return Err(LockError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        match serde_json::from_str::<LockInfo>(&content) {
            Ok(existing) if force => {
                tracing::warn!(
                    app = %app,
                    "breaking lock held by {} (pid {}) since {}",
                    existing.holder,
                    existing.pid,
                    existing.started_at
                );
                Ok(true)
            }
            Ok(existing) if existing.is_stale() => {
                tracing::warn!(
                    app = %app,
                    "auto-breaking stale lock held by {} (pid {}) since {}",
                    existing.holder,
                    existing.pid,
                    existing.started_at
                );
                Ok(true)
            }
            Ok(_) => Ok(false),
            Err(_) if force => {
                tracing::warn!(app = %app, "breaking unreadable lock");
                Ok(true)
            }
            Err(_) if Self::modified_long_ago(path) => {
                tracing::warn!(app = %app, "auto-breaking stale unreadable lock");
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }

    pub fn app(&self) -> &AppName {
        &self.app
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(path = %self.path.display(), "failed to release lock: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> AppName {
        AppName::new("blog").unwrap()
    }

    #[test]
    fn lock_info_creates_with_current_host_and_pid() {
        let info = LockInfo::new(&app());
        assert_eq!(info.app, "blog");
        assert_eq!(info.pid, std::process::id());
        assert!(!info.holder.is_empty());
    }

    #[test]
    fn fresh_lock_is_not_stale() {
        assert!(!LockInfo::new(&app()).is_stale());
    }

    #[test]
    fn old_lock_is_stale() {
        let mut info = LockInfo::new(&app());
        info.started_at = Utc::now() - chrono::Duration::hours(2);
        assert!(info.is_stale());
    }

    #[test]
    fn second_acquire_is_refused_until_release() {
        let dir = tempfile::tempdir().unwrap();
        let lock = RunLock::acquire(dir.path(), &app(), false).unwrap();

        let err = RunLock::acquire(dir.path(), &app(), false).unwrap_err();
        assert!(matches!(err, LockError::Held { pid, .. } if pid == std::process::id()));

        drop(lock);
        assert!(!LockInfo::lock_path(dir.path(), &app()).exists());
        RunLock::acquire(dir.path(), &app(), false).unwrap();
    }

    #[test]
    fn force_breaks_live_lock() {
        let dir = tempfile::tempdir().unwrap();
        let held = RunLock::acquire(dir.path(), &app(), false).unwrap();
        let forced = RunLock::acquire(dir.path(), &app(), true).unwrap();
        assert_eq!(forced.app(), &app());
        std::mem::forget(held);
    }

    #[test]
    fn stale_lock_is_broken_automatically() {
        let dir = tempfile::tempdir().unwrap();
        let mut info = LockInfo::new(&app());
        info.started_at = Utc::now() - chrono::Duration::hours(3);
        std::fs::write(
            LockInfo::lock_path(dir.path(), &app()),
            serde_json::to_string(&info).unwrap(),
        )
        .unwrap();

        RunLock::acquire(dir.path(), &app(), false).unwrap();
    }

    #[test]
    fn unreadable_lock_is_held_until_forced() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(LockInfo::lock_path(dir.path(), &app()), "not json").unwrap();

        let err = RunLock::acquire(dir.path(), &app(), false).unwrap_err();
        assert!(matches!(err, LockError::Contended(_)));

        RunLock::acquire(dir.path(), &app(), true).unwrap();
    }

    #[test]
    fn old_unreadable_lock_is_broken() {
        let dir = tempfile::tempdir().unwrap();
        let path = LockInfo::lock_path(dir.path(), &app());
        std::fs::write(&path, "").unwrap();
        std::fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(SystemTime::now() - Duration::from_secs(2 * 60 * 60))
            .unwrap();

        RunLock::acquire(dir.path(), &app(), false).unwrap();
    }

    #[test]
    fn lock_file_holds_its_owner_once_visible() {
        let dir = tempfile::tempdir().unwrap();
        let _lock = RunLock::acquire(dir.path(), &app(), false).unwrap();

        let content = std::fs::read_to_string(LockInfo::lock_path(dir.path(), &app())).unwrap();
        let info: LockInfo = serde_json::from_str(&content).unwrap();
        assert_eq!(info.pid, std::process::id());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn locks_are_per_application() {
        let dir = tempfile::tempdir().unwrap();
        let _blog = RunLock::acquire(dir.path(), &app(), false).unwrap();
        RunLock::acquire(dir.path(), &AppName::new("shop").unwrap(), false).unwrap();
    }
}
