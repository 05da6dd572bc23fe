// ABOUTME: Error types for the persistent application store.
// ABOUTME: Distinguishes I/O failures, unparseable files and missing/duplicate names.

use std::path::PathBuf;

use crate::types::AppName;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store file {} is not valid JSON: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize store: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("application not found: {0}")]
    NotFound(AppName),

    #[error("application already exists: {0}")]
    AlreadyExists(AppName),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}
