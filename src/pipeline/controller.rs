// ABOUTME: Pipeline controller: decides where a run starts and drives steps in order.
// ABOUTME: Checkpoints the record after every step and stops at the first failure.

use std::path::PathBuf;
use std::sync::Arc;

use super::error::PipelineError;
use super::executor::{StepExecutor, StepOutcome};
use super::lock::RunLock;
use crate::store::{AppStore, ApplicationRecord, PipelineState, Step};
use crate::types::{AppName, Branch, SourceUrl};

/// Parameters of one pipeline run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub name: AppName,
    pub source_url: SourceUrl,
    pub branch: Branch,
    /// New description; for an existing application this re-runs `app_desc`.
    pub description: Option<String>,
    /// Reset the retry counter and break a held run lock.
    pub force: bool,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Failed { step: Step, reason: String },
}

/// Summary of a pipeline run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Steps executed in this run, in order.
    pub executed: Vec<Step>,
    pub outcome: RunOutcome,
    /// The record as last checkpointed.
    pub record: ApplicationRecord,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.outcome == RunOutcome::Completed
    }
}

/// Drives the step executor over the persisted pipeline state.
#[derive(Clone)]
pub struct Controller {
    store: Arc<dyn AppStore>,
    executor: StepExecutor,
    locks_dir: PathBuf,
    max_attempts: u32,
}

impl Controller {
    pub fn new(
        store: Arc<dyn AppStore>,
        executor: StepExecutor,
        locks_dir: impl Into<PathBuf>,
        max_attempts: u32,
    ) -> Self {
        Self {
            store,
            executor,
            locks_dir: locks_dir.into(),
            max_attempts,
        }
    }

    /// Run the pipeline for `request.name`, creating the record on first use.
    ///
    /// Step failures are reported in the returned [`RunReport`]; only lock,
    /// retry-limit and checkpoint failures are errors.
    pub async fn run(&self, request: RunRequest) -> Result<RunReport, PipelineError> {
        let _lock = RunLock::acquire(&self.locks_dir, &request.name, request.force)?;

        // Re-read under the lock; another run may have moved the record on.
        let (mut record, start) = match self.store.find(&request.name)? {
            None => {
                let record = ApplicationRecord::new(
                    request.name.clone(),
                    request.source_url.clone(),
                    request.branch.clone(),
                    request.description.clone().unwrap_or_default(),
                );
                self.store.insert_new(&record)?;
                tracing::info!(app = %record.name, "created application record");
                (record, Step::first())
            }
            Some(record) => self.resume_point(record, &request)?,
        };

        tracing::info!(app = %record.name, start = %start, "starting pipeline run");

        let mut executed = Vec::new();
        for step in start.through_end() {
            let (updated, outcome) = self.executor.execute(step, record).await;
            record = updated;
            self.store.upsert(&record)?;
            executed.push(step);

            if let StepOutcome::Failed(reason) = outcome {
                return Ok(RunReport {
                    executed,
                    outcome: RunOutcome::Failed { step, reason },
                    record,
                });
            }
        }

        Ok(RunReport {
            executed,
            outcome: RunOutcome::Completed,
            record,
        })
    }

    /// Decide where an existing application's run starts.
    fn resume_point(
        &self,
        mut record: ApplicationRecord,
        request: &RunRequest,
    ) -> Result<(ApplicationRecord, Step), PipelineError> {
        let start = match record.state() {
            PipelineState::Failed(step) => {
                if record.failed_attempts >= self.max_attempts {
                    if !request.force {
                        return Err(PipelineError::RetryLimit {
                            name: record.name.clone(),
                            step,
                            attempts: record.failed_attempts,
                        });
                    }
                    tracing::warn!(
                        app = %record.name,
                        %step,
                        attempts = record.failed_attempts,
                        "retry limit overridden"
                    );
                    record.failed_attempts = 0;
                }
                tracing::info!(app = %record.name, %step, "resuming from failed step");
                step
            }
            PipelineState::Complete => Step::Build,
            PipelineState::Pending(step) => step,
        };

        match request.description.as_ref() {
            Some(description) if *description != record.description && start > Step::AppDesc => {
                record.description = description.clone();
                record.rewind_to(Step::AppDesc);
                Ok((record, Step::AppDesc))
            }
            Some(description) => {
                record.description = description.clone();
                Ok((record, start))
            }
            None => Ok((record, start)),
        }
    }
}
