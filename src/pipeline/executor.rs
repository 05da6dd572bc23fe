// ABOUTME: Step executor: performs one pipeline step against an application record.
// ABOUTME: Step failures become StepOutcome::Failed with the record updated, never an Err.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Paths, Settings};
use crate::engine::{ContainerEngine, Workload, manifest};
use crate::error::Result;
use crate::source::{CredentialStore, SourceFetcher, SourceHost};
use crate::store::{ApplicationRecord, ContainerStatus, Step, WebhookStatus};
use crate::types::AppName;

/// Longest description kept after normalization, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 500;

/// Result of executing a single step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Completed,
    Failed(String),
}

/// Settings the executor needs beyond its collaborators.
#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    pub apps_dir: PathBuf,
    pub deploy_timeout: Duration,
    pub poll_interval: Duration,
    pub callback_url: Option<String>,
    pub webhook_secret: Option<String>,
    pub credentials: CredentialStore,
}

impl ExecutorOptions {
    pub fn from_settings(settings: &Settings, paths: &Paths) -> Result<Self> {
        Ok(Self {
            apps_dir: paths.apps_dir(),
            deploy_timeout: settings.deploy_timeout,
            poll_interval: settings.poll_interval,
            callback_url: settings.webhook.callback_url.clone(),
            webhook_secret: settings.webhook_secret()?,
            credentials: CredentialStore::new(paths.credentials_file()),
        })
    }
}

/// Executes pipeline steps using the engine, fetcher and source host.
#[derive(Clone)]
pub struct StepExecutor {
    engine: Arc<dyn ContainerEngine>,
    fetcher: Arc<dyn SourceFetcher>,
    host: Arc<dyn SourceHost>,
    options: ExecutorOptions,
}

impl StepExecutor {
    pub fn new(
        engine: Arc<dyn ContainerEngine>,
        fetcher: Arc<dyn SourceFetcher>,
        host: Arc<dyn SourceHost>,
        options: ExecutorOptions,
    ) -> Self {
        Self {
            engine,
            fetcher,
            host,
            options,
        }
    }

    /// Execute `step` and return the updated record with the outcome.
    ///
    /// On failure the record carries `last_failed_step`, the reason and the
    /// rewound progress; on success `last_completed_step` advances.
    pub async fn execute(
        &self,
        step: Step,
        mut record: ApplicationRecord,
    ) -> (ApplicationRecord, StepOutcome) {
        tracing::info!(app = %record.name, %step, "executing step");

        let result = match step {
            Step::AppName => check_app_name(&record.name),
            Step::AppDesc => normalize_description(&record)
                .map(|description| record.description = description),
            Step::Build => self.build(&mut record).await,
            Step::Deploy => self.deploy(&mut record).await,
            Step::Webhook => self.webhook(&mut record).await,
        };

        match result {
            Ok(()) => {
                record.mark_completed(step);
                tracing::info!(app = %record.name, %step, "step completed");
                (record, StepOutcome::Completed)
            }
            Err(reason) => {
                tracing::warn!(app = %record.name, %step, %reason, "step failed");
                record.mark_failed(step, reason.clone());
                (record, StepOutcome::Failed(reason))
            }
        }
    }

    fn source_dir(&self, name: &AppName) -> PathBuf {
        self.options.apps_dir.join(name.as_str())
    }

    /// Detect the manifest in the checkout and enforce build-type immutability.
    fn workload(&self, record: &ApplicationRecord) -> std::result::Result<Workload, String> {
        let source_dir = self.source_dir(&record.name);
        let manifest = manifest::detect(&source_dir).map_err(|e| e.to_string())?;

        if let Some(existing) = record.build_type
            && existing != manifest.build_type
        {
            return Err(format!(
                "build type changed from {} to {}; delete the application to switch",
                existing, manifest.build_type
            ));
        }

        Ok(Workload {
            app: record.name.clone(),
            source_dir,
            manifest,
        })
    }

    async fn build(&self, record: &mut ApplicationRecord) -> std::result::Result<(), String> {
        let dest = self.source_dir(&record.name);
        self.fetcher
            .fetch(&record.source_url, &record.branch, &dest)
            .await
            .map_err(|e| format!("fetching source: {}", e))?;

        let workload = self.workload(record)?;
        record.build_type = Some(workload.build_type());

        self.engine
            .build_image(&workload)
            .await
            .map_err(|e| e.to_string())
    }

    async fn deploy(&self, record: &mut ApplicationRecord) -> std::result::Result<(), String> {
        if record.build_type.is_none() {
            return Err("no build type recorded; the build step has not run".to_string());
        }
        let workload = self.workload(record)?;
        let build_type = workload.build_type();

        if let Err(e) = self.engine.run_container(&workload).await {
            record.last_container_status = ContainerStatus::Failed;
            return Err(e.to_string());
        }

        let deadline = tokio::time::Instant::now() + self.options.deploy_timeout;
        loop {
            match self.engine.container_status(&record.name, build_type).await {
                Ok(status) => {
                    record.last_container_status = status;
                    if status == ContainerStatus::Running {
                        return Ok(());
                    }
                }
                Err(e) => {
                    tracing::debug!(app = %record.name, "status poll failed: {}", e);
                }
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(format!(
                    "container not running after {:?} (last status: {})",
                    self.options.deploy_timeout, record.last_container_status
                ));
            }
            tokio::time::sleep(self.options.poll_interval).await;
        }
    }

    async fn webhook(&self, record: &mut ApplicationRecord) -> std::result::Result<(), String> {
        let Some(callback_url) = self.options.callback_url.as_deref() else {
            tracing::warn!(app = %record.name, "no webhook callback URL configured; skipping");
            record.webhook_status = WebhookStatus::Unconfigured;
            return Ok(());
        };
        let Some(repo) = record.source_url.github_repo() else {
            tracing::warn!(
                app = %record.name,
                host = record.source_url.host(),
                "source is not hosted on GitHub; skipping webhook"
            );
            record.webhook_status = WebhookStatus::Unconfigured;
            return Ok(());
        };

        let token = match self.options.credentials.token() {
            Ok(Some(token)) => token,
            Ok(None) => {
                record.webhook_status = WebhookStatus::Failed;
                return Err("not logged in to GitHub; run `omk login`".to_string());
            }
            Err(e) => {
                record.webhook_status = WebhookStatus::Failed;
                return Err(e.to_string());
            }
        };

        match self
            .host
            .register_webhook(
                &repo,
                callback_url,
                &token,
                self.options.webhook_secret.as_deref(),
            )
            .await
        {
            Ok(registration) => {
                tracing::debug!(app = %record.name, ?registration, "webhook in place");
                record.webhook_status = WebhookStatus::Success;
                Ok(())
            }
            Err(e) => {
                record.webhook_status = WebhookStatus::Failed;
                Err(format!("registering webhook for {}: {}", repo, e))
            }
        }
    }
}

fn check_app_name(name: &AppName) -> std::result::Result<(), String> {
    AppName::new(name.as_str()).map_err(|e| e.to_string())?;
    if name.is_reserved() {
        return Err(format!("'{}' is a reserved name", name));
    }
    Ok(())
}

/// Trim, collapse internal whitespace and bound the description.
///
/// An empty description becomes `"<url> (<branch>)"`.
pub fn normalize_description(record: &ApplicationRecord) -> std::result::Result<String, String> {
    let collapsed = record
        .description
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    if collapsed.is_empty() {
        return Ok(format!("{} ({})", record.source_url, record.branch));
    }
    if collapsed.chars().any(char::is_control) {
        return Err("description contains control characters".to_string());
    }
    let len = collapsed.chars().count();
    if len > MAX_DESCRIPTION_CHARS {
        return Err(format!(
            "description is {} characters; the limit is {}",
            len, MAX_DESCRIPTION_CHARS
        ));
    }
    Ok(collapsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Branch, SourceUrl};

    fn record(description: &str) -> ApplicationRecord {
        ApplicationRecord::new(
            AppName::new("blog").unwrap(),
            SourceUrl::parse("https://github.com/me/blog.git").unwrap(),
            Branch::new("main").unwrap(),
            description.to_string(),
        )
    }

    #[test]
    fn description_whitespace_is_collapsed() {
        assert_eq!(
            normalize_description(&record("  my \t personal\n blog ")).unwrap(),
            "my personal blog"
        );
    }

    #[test]
    fn empty_description_gets_default() {
        assert_eq!(
            normalize_description(&record("   ")).unwrap(),
            "https://github.com/me/blog.git (main)"
        );
    }

    #[test]
    fn description_limits() {
        assert!(normalize_description(&record(&"x".repeat(MAX_DESCRIPTION_CHARS))).is_ok());
        assert!(normalize_description(&record(&"x".repeat(MAX_DESCRIPTION_CHARS + 1))).is_err());
        assert!(normalize_description(&record("bell\u{7}")).is_err());
    }

    #[test]
    fn reserved_name_is_rejected() {
        assert!(check_app_name(&AppName::new("omk").unwrap()).is_err());
        assert!(check_app_name(&AppName::new("blog").unwrap()).is_ok());
    }
}
