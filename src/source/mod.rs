// ABOUTME: Source retrieval and source-control host integration.
// ABOUTME: Capability traits for fetching code and registering webhooks, with git and GitHub backends.

mod credentials;
mod error;
mod git;
mod github;

pub use credentials::CredentialStore;
pub use error::SourceError;
pub use git::GitFetcher;
pub use github::GitHubClient;

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;

use crate::types::{Branch, GitHubRepo, SourceUrl};

/// Account the token belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserIdentity {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Outcome of an idempotent webhook registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookRegistration {
    Created,
    /// A hook with the same callback URL was already present.
    Existing,
}

/// Retrieves application source code.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Make `dest` a checkout of `branch` at `url`, returning the checked-out revision.
    async fn fetch(
        &self,
        url: &SourceUrl,
        branch: &Branch,
        dest: &Path,
    ) -> Result<String, SourceError>;
}

/// A source-control host offering authentication and push webhooks.
#[async_trait]
pub trait SourceHost: Send + Sync {
    /// Validate `token`; fails with `InvalidToken` when the host rejects it.
    async fn authenticate(&self, token: &str) -> Result<UserIdentity, SourceError>;

    async fn register_webhook(
        &self,
        repo: &GitHubRepo,
        callback_url: &str,
        token: &str,
        secret: Option<&str>,
    ) -> Result<HookRegistration, SourceError>;
}
