// ABOUTME: Git-backed source fetcher.
// ABOUTME: Clones a branch into the app code directory, or fetches and hard-resets an existing checkout.

use async_trait::async_trait;
use std::path::Path;

use super::SourceFetcher;
use super::error::SourceError;
use crate::process::{self, CommandOutput};
use crate::types::{Branch, SourceUrl};

/// Never wait on an interactive credential prompt.
const GIT_ENV: [(&str, &str); 1] = [("GIT_TERMINAL_PROMPT", "0")];

/// Fetches sources with the `git` command-line client.
#[derive(Debug, Clone, Default)]
pub struct GitFetcher;

impl GitFetcher {
    pub fn new() -> Self {
        Self
    }

    async fn git(
        &self,
        operation: &str,
        args: &[&str],
        cwd: Option<&Path>,
    ) -> Result<CommandOutput, SourceError> {
        let output = process::run_with_env("git", args, cwd, &GIT_ENV)
            .await
            .map_err(SourceError::GitMissing)?;
        if !output.success() {
            return Err(SourceError::Git {
                operation: operation.to_string(),
                message: output.failure_summary(),
            });
        }
        Ok(output)
    }

    async fn clone(&self, url: &SourceUrl, branch: &Branch, dest: &Path) -> Result<(), SourceError> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| SourceError::Checkout {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let dest_str = dest.to_string_lossy();
        let result = self
            .git(
                "clone",
                &[
                    "clone",
                    "--branch",
                    branch.as_str(),
                    "--single-branch",
                    url.as_str(),
                    dest_str.as_ref(),
                ],
                None,
            )
            .await;

        if result.is_err() {
            // A half-written clone would be mistaken for a checkout next time.
            let _ = tokio::fs::remove_dir_all(dest).await;
        }
        result.map(|_| ())
    }

    async fn update(&self, url: &SourceUrl, branch: &Branch, dest: &Path) -> Result<(), SourceError> {
        let remote_ref = format!("origin/{}", branch);
        let refspec = format!("+{}:refs/remotes/origin/{}", branch.git_ref(), branch);

        self.git(
            "remote set-url",
            &["remote", "set-url", "origin", url.as_str()],
            Some(dest),
        )
        .await?;
        self.git(
            "fetch",
            &["fetch", "--prune", "origin", &refspec],
            Some(dest),
        )
        .await?;
        self.git(
            "checkout",
            &["checkout", "--force", "-B", branch.as_str(), &remote_ref],
            Some(dest),
        )
        .await?;
        self.git("reset", &["reset", "--hard", &remote_ref], Some(dest))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl SourceFetcher for GitFetcher {
    async fn fetch(
        &self,
        url: &SourceUrl,
        branch: &Branch,
        dest: &Path,
    ) -> Result<String, SourceError> {
        if dest.join(".git").is_dir() {
            tracing::debug!(dest = %dest.display(), %branch, "updating existing checkout");
            self.update(url, branch, dest).await?;
        } else {
            if dest.exists() {
                tracing::warn!(dest = %dest.display(), "removing non-git directory before clone");
                tokio::fs::remove_dir_all(dest)
                    .await
                    .map_err(|source| SourceError::Checkout {
                        path: dest.to_path_buf(),
                        source,
                    })?;
            }
            tracing::debug!(dest = %dest.display(), %url, %branch, "cloning");
            self.clone(url, branch, dest).await?;
        }

        let head = self
            .git("rev-parse", &["rev-parse", "HEAD"], Some(dest))
            .await?;
        let revision = head.stdout.trim().to_string();
        tracing::info!(%url, %branch, %revision, "source fetched");
        Ok(revision)
    }
}
