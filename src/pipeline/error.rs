// ABOUTME: Error types for pipeline runs.
// ABOUTME: Step failures are outcomes, not errors; these abort a run before or between steps.

use chrono::{DateTime, Utc};
use std::path::PathBuf;

use crate::store::{Step, StoreError};
use crate::types::AppName;

/// Failure to take or release a run lock.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("'{name}' is being deployed by {holder} (pid {pid}) since {started_at}; rerun with --force to break the lock")]
    Held {
        name: AppName,
        holder: String,
        pid: u32,
        started_at: DateTime<Utc>,
    },

    #[error("lock file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("lock for '{0}' is held by another process; rerun with --force to break it")]
    Contended(AppName),
}

/// Errors that abort a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A checkpoint could not be read or written.
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error("'{name}' failed {attempts} times at step '{step}'")]
    RetryLimit {
        name: AppName,
        step: Step,
        attempts: u32,
    },
}
