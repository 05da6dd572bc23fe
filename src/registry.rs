// ABOUTME: Application registry API: run, list, status, delete and push-triggered redeploys.
// ABOUTME: Validates user input before any state is touched, then delegates to the controller.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{Paths, Settings};
use crate::diagnostics::{Diagnostics, WarningKind};
use crate::engine::{ContainerEngine, RemoveRequest, manifest};
use crate::error::{Error, Result, ValidationError};
use crate::pipeline::{Controller, ExecutorOptions, RunLock, RunReport, RunRequest, StepExecutor};
use crate::source::{SourceFetcher, SourceHost};
use crate::store::{AppStore, AppSummary, ApplicationRecord, BuildType};
use crate::types::{AppName, Branch, SourceUrl};
use crate::webhook::PushEvent;

/// Options for [`Registry::run`].
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Branch to track; `main` when absent.
    pub branch: Option<String>,
    /// Explicit application name instead of one derived from the URL.
    pub name: Option<String>,
    pub description: Option<String>,
    /// Reset the retry counter and break a held run lock.
    pub force: bool,
}

/// One application's part in a push-triggered redeploy.
#[derive(Debug)]
pub struct PushRedeploy {
    pub name: AppName,
    pub result: Result<RunReport>,
}

/// Result of a status query.
#[derive(Debug)]
pub struct StatusReport {
    pub record: ApplicationRecord,
    pub diagnostics: Diagnostics,
}

/// Entry point for every user-visible operation on applications.
#[derive(Clone)]
pub struct Registry {
    store: Arc<dyn AppStore>,
    engine: Arc<dyn ContainerEngine>,
    controller: Controller,
    apps_dir: PathBuf,
    locks_dir: PathBuf,
}

impl Registry {
    /// Wire a registry from settings and collaborators.
    pub fn new(
        paths: &Paths,
        settings: &Settings,
        store: Arc<dyn AppStore>,
        engine: Arc<dyn ContainerEngine>,
        fetcher: Arc<dyn SourceFetcher>,
        host: Arc<dyn SourceHost>,
    ) -> Result<Self> {
        let options = ExecutorOptions::from_settings(settings, paths)?;
        let executor = StepExecutor::new(engine.clone(), fetcher, host, options);
        let controller = Controller::new(
            store.clone(),
            executor,
            paths.locks_dir(),
            settings.max_attempts,
        );
        Ok(Self {
            store,
            engine,
            controller,
            apps_dir: paths.apps_dir(),
            locks_dir: paths.locks_dir(),
        })
    }

    /// Validate the request and run the pipeline for the application.
    ///
    /// A failed step is reported in the returned [`RunReport`], not as `Err`.
    pub async fn run(&self, url: &str, options: RunOptions) -> Result<RunReport> {
        let request = self.validate_run(url, options)?;
        tracing::debug!(app = %request.name, url = %request.source_url, branch = %request.branch, "run requested");
        Ok(self.controller.run(request).await?)
    }

    fn validate_run(&self, url: &str, options: RunOptions) -> Result<RunRequest> {
        let source_url = SourceUrl::parse(url)?;
        let branch = match options.branch.as_deref() {
            Some(b) => Branch::new(b)?,
            None => Branch::default(),
        };
        let name = match options.name.as_deref() {
            Some(n) => AppName::new(n)?,
            None => source_url
                .repo_name()
                .and_then(|label| AppName::derive(label).ok())
                .ok_or_else(|| ValidationError::NoDerivableName(source_url.to_string()))?,
        };

        if name.is_reserved() {
            return Err(ValidationError::ReservedName(name).into());
        }

        if let Some(existing) = self.store.find(&name)? {
            if !existing.source_url.same_repository(source_url.as_str()) {
                return Err(ValidationError::NameTaken {
                    name,
                    existing: existing.source_url.to_string(),
                }
                .into());
            }
            if existing.branch != branch {
                return Err(ValidationError::BranchChanged {
                    name,
                    existing: existing.branch.to_string(),
                }
                .into());
            }
        }

        Ok(RunRequest {
            name,
            source_url,
            branch,
            description: options.description,
            force: options.force,
        })
    }

    /// Summaries of every application, ordered by name.
    pub fn list(&self) -> Result<impl Iterator<Item = AppSummary>> {
        let apps = self.store.load()?;
        Ok(apps.into_values().map(|record| record.summary()))
    }

    /// The full record with a freshly observed container status.
    pub async fn status(&self, name: &AppName) -> Result<StatusReport> {
        let record = self.store.get(name)?;
        let mut diagnostics = Diagnostics::default();

        let Some(build_type) = record.build_type else {
            return Ok(StatusReport {
                record,
                diagnostics,
            });
        };

        let record = match self.engine.container_status(name, build_type).await {
            Ok(status) if status != record.last_container_status => {
                self.store.update(name, &mut |r: &mut ApplicationRecord| {
                    r.last_container_status = status;
                    r.touch();
                })?
            }
            Ok(_) => record,
            Err(e) => {
                diagnostics.warn(
                    WarningKind::StatusRefresh,
                    format!("could not refresh container status for '{}': {}", name, e),
                );
                record
            }
        };

        Ok(StatusReport {
            record,
            diagnostics,
        })
    }

    /// Tear down the application's containers and image, then forget it.
    ///
    /// If the engine cannot remove the containers the record is kept so the
    /// delete can be retried.
    pub async fn delete(&self, name: &AppName) -> Result<Diagnostics> {
        let record = self.store.get(name)?;
        let _lock = RunLock::acquire(&self.locks_dir, name, false)?;
        let mut diagnostics = Diagnostics::default();

        let app_dir = self.apps_dir.join(name.as_str());
        let manifest = match record.build_type {
            Some(BuildType::SingleContainer) => None,
            _ => manifest::find_compose_file(&app_dir),
        };
        self.engine
            .remove(&RemoveRequest {
                app: name.clone(),
                build_type: record.build_type,
                manifest,
            })
            .await?;

        self.store.delete(name)?;
        tracing::info!(app = %name, "application record deleted");

        match std::fs::remove_dir_all(&app_dir) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                let err = Error::Cleanup {
                    path: app_dir,
                    source: e,
                };
                diagnostics.warn(WarningKind::CodeDirCleanup, err.to_string());
            }
        }

        Ok(diagnostics)
    }

    /// Applications tracking the pushed repository and branch.
    ///
    /// Branch deletions match nothing.
    pub fn apps_for_push(&self, event: &PushEvent) -> Result<Vec<ApplicationRecord>> {
        if event.deleted {
            tracing::debug!(git_ref = %event.git_ref, "ignoring branch deletion");
            return Ok(Vec::new());
        }
        let Some(branch) = event.branch() else {
            tracing::debug!(git_ref = %event.git_ref, "ignoring push of a non-branch ref");
            return Ok(Vec::new());
        };

        Ok(self
            .store
            .load()?
            .into_values()
            .filter(|r| r.branch == branch)
            .filter(|r| {
                event
                    .repository_urls()
                    .any(|url| r.source_url.same_repository(url))
            })
            .collect())
    }

    /// Redeploy every application tracking the pushed repository and branch.
    ///
    /// Each application runs even when an earlier one errors; the outcome of
    /// every run is returned. Returns an empty list when nothing matches.
    pub async fn redeploy_from_push(&self, event: &PushEvent) -> Result<Vec<PushRedeploy>> {
        let matching = self.apps_for_push(event)?;

        let mut redeploys = Vec::with_capacity(matching.len());
        for record in matching {
            tracing::info!(app = %record.name, push = %event.describe(), "redeploying after push");
            let name = record.name.clone();
            let result = self
                .controller
                .run(RunRequest {
                    name: record.name,
                    source_url: record.source_url,
                    branch: record.branch,
                    description: None,
                    force: false,
                })
                .await
                .map_err(Error::from);
            redeploys.push(PushRedeploy { name, result });
        }
        Ok(redeploys)
    }
}
