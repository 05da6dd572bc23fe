// ABOUTME: Error types for source retrieval and the source-control host.
// ABOUTME: Covers git command failures, GitHub API failures and credential file access.

use std::path::PathBuf;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("git is not installed or not on PATH: {0}")]
    GitMissing(#[source] std::io::Error),

    #[error("git {operation} failed: {message}")]
    Git { operation: String, message: String },

    #[error("failed to prepare checkout directory {}: {source}", path.display())]
    Checkout {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("GitHub rejected the token (HTTP {status})")]
    InvalidToken { status: u16 },

    #[error("GitHub API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("credential file: {0}")]
    Credentials(#[from] StoreError),
}
