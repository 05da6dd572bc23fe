// ABOUTME: Stored GitHub access token (github.json).
// ABOUTME: Shares the store's atomic JSON write; the file is readable only by its owner.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::error::SourceError;
use crate::store::{StoreError, read_json, write_json_atomic};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Credentials {
    #[serde(default)]
    token: String,
}

/// The credential file holding the GitHub token.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored token, or `None` if no non-empty token is saved.
    pub fn token(&self) -> Result<Option<String>, SourceError> {
        let creds: Option<Credentials> = read_json(&self.path)?;
        Ok(creds
            .map(|c| c.token.trim().to_string())
            .filter(|t| !t.is_empty()))
    }

    pub fn save(&self, token: &str) -> Result<(), SourceError> {
        let creds = Credentials {
            token: token.trim().to_string(),
        };
        write_json_atomic(&self.path, &creds)?;
        restrict_permissions(&self.path)?;
        tracing::debug!(path = %self.path.display(), "credentials saved");
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| StoreError::io(path, e))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}
