// ABOUTME: JSON file implementation of the application store.
// ABOUTME: Writes land in a sibling temp file that is synced and renamed over the original.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;

use super::{AppStore, ApplicationRecord, StoreError};
use crate::types::AppName;

/// Store backed by a single JSON object mapping name to record.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AppStore for JsonFileStore {
    fn load(&self) -> Result<BTreeMap<AppName, ApplicationRecord>, StoreError> {
        Ok(read_json(&self.path)?.unwrap_or_default())
    }

    fn save(&self, apps: &BTreeMap<AppName, ApplicationRecord>) -> Result<(), StoreError> {
        write_json_atomic(&self.path, apps)
    }
}

/// Read a JSON document, treating a missing or blank file as absent.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::io(path, e)),
    };

    if content.trim().is_empty() {
        return Ok(None);
    }

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| StoreError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
}

/// Replace `path` with the JSON encoding of `value` without ever exposing a
/// partially written file.
///
/// The temp file lives in the same directory so the final rename stays on one
/// filesystem. Temp files are created with mode 0600.
pub(crate) fn write_json_atomic<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> Result<(), StoreError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;

    let mut json = serde_json::to_vec_pretty(value).map_err(StoreError::Serialize)?;
    json.push(b'\n');

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| StoreError::io(parent, e))?;
    tmp.write_all(&json)
        .map_err(|e| StoreError::io(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| StoreError::io(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| StoreError::io(path, e.error))?;

    tracing::debug!(path = %path.display(), bytes = json.len(), "wrote state file");
    Ok(())
}
