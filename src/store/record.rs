// ABOUTME: Persisted application record and the pipeline step/status enums it carries.
// ABOUTME: Progress bookkeeping (completed/failed step) lives here so every writer agrees on it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{AppName, Branch, SourceUrl};

/// One stage of the deployment pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    AppName,
    AppDesc,
    Build,
    Deploy,
    Webhook,
}

impl Step {
    const ORDER: [Step; 5] = [
        Step::AppName,
        Step::AppDesc,
        Step::Build,
        Step::Deploy,
        Step::Webhook,
    ];

    pub fn all() -> &'static [Step] {
        &Self::ORDER
    }

    pub fn first() -> Step {
        Step::AppName
    }

    pub fn last() -> Step {
        Step::Webhook
    }

    pub fn next(self) -> Option<Step> {
        match self {
            Step::AppName => Some(Step::AppDesc),
            Step::AppDesc => Some(Step::Build),
            Step::Build => Some(Step::Deploy),
            Step::Deploy => Some(Step::Webhook),
            Step::Webhook => None,
        }
    }

    pub fn previous(self) -> Option<Step> {
        match self {
            Step::AppName => None,
            Step::AppDesc => Some(Step::AppName),
            Step::Build => Some(Step::AppDesc),
            Step::Deploy => Some(Step::Build),
            Step::Webhook => Some(Step::Deploy),
        }
    }

    /// Steps from `self` through the final step, inclusive.
    pub fn through_end(self) -> impl Iterator<Item = Step> {
        Self::ORDER.into_iter().filter(move |s| *s >= self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Step::AppName => "app_name",
            Step::AppDesc => "app_desc",
            Step::Build => "build",
            Step::Deploy => "deploy",
            Step::Webhook => "webhook",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the application's artifact is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildType {
    /// A single image built from a Dockerfile.
    SingleContainer,
    /// A compose manifest describing several services.
    MultiServiceCompose,
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildType::SingleContainer => write!(f, "single-container"),
            BuildType::MultiServiceCompose => write!(f, "multi-service-compose"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookStatus {
    #[default]
    Unconfigured,
    Success,
    Failed,
}

impl fmt::Display for WebhookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebhookStatus::Unconfigured => write!(f, "unconfigured"),
            WebhookStatus::Success => write!(f, "success"),
            WebhookStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerStatus {
    #[default]
    Unknown,
    Running,
    Stopped,
    Failed,
}

impl fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerStatus::Unknown => write!(f, "unknown"),
            ContainerStatus::Running => write!(f, "running"),
            ContainerStatus::Stopped => write!(f, "stopped"),
            ContainerStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Where an application sits in the pipeline, derived from its record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Not finished; the given step is next to run.
    Pending(Step),
    /// The given step failed and has not since succeeded.
    Failed(Step),
    /// Every step succeeded and no failure is recorded.
    Complete,
}

/// Durable state of one deployed application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub name: AppName,
    pub source_url: SourceUrl,
    pub branch: Branch,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub build_type: Option<BuildType>,
    #[serde(default)]
    pub webhook_status: WebhookStatus,
    #[serde(default)]
    pub last_failed_step: Option<Step>,
    #[serde(default)]
    pub last_completed_step: Option<Step>,
    #[serde(default)]
    pub last_container_status: ContainerStatus,
    #[serde(default)]
    pub failure_reason: Option<String>,
    #[serde(default)]
    pub failed_attempts: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApplicationRecord {
    /// A fresh record with no pipeline progress.
    pub fn new(name: AppName, source_url: SourceUrl, branch: Branch, description: String) -> Self {
        let now = Utc::now();
        Self {
            name,
            source_url,
            branch,
            description,
            build_type: None,
            webhook_status: WebhookStatus::default(),
            last_failed_step: None,
            last_completed_step: None,
            last_container_status: ContainerStatus::default(),
            failure_reason: None,
            failed_attempts: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn state(&self) -> PipelineState {
        if let Some(step) = self.last_failed_step {
            return PipelineState::Failed(step);
        }
        match self.last_completed_step {
            None => PipelineState::Pending(Step::first()),
            Some(step) => match step.next() {
                Some(next) => PipelineState::Pending(next),
                None => PipelineState::Complete,
            },
        }
    }

    /// Record that `step` succeeded.
    pub fn mark_completed(&mut self, step: Step) {
        self.last_completed_step = Some(step);
        if self.last_failed_step == Some(step) || step == Step::last() {
            self.last_failed_step = None;
            self.failure_reason = None;
            self.failed_attempts = 0;
        }
        self.touch();
    }

    /// Record that `step` failed.
    ///
    /// Progress is rewound to the step before the failure so the record never
    /// claims a later step succeeded while this one is failing.
    pub fn mark_failed(&mut self, step: Step, reason: impl Into<String>) {
        if self.last_failed_step == Some(step) {
            self.failed_attempts = self.failed_attempts.saturating_add(1);
        } else {
            self.failed_attempts = 1;
        }
        self.last_failed_step = Some(step);
        self.last_completed_step = step.previous();
        self.failure_reason = Some(reason.into());
        self.touch();
    }

    /// Rewind progress so the next run re-enters at `step`.
    pub fn rewind_to(&mut self, step: Step) {
        self.last_completed_step = step.previous();
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn summary(&self) -> AppSummary {
        AppSummary {
            name: self.name.clone(),
            build_type: self.build_type,
            last_container_status: self.last_container_status,
            webhook_status: self.webhook_status,
            last_failed_step: self.last_failed_step,
        }
    }
}

/// Listing view of an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppSummary {
    pub name: AppName,
    pub build_type: Option<BuildType>,
    pub last_container_status: ContainerStatus,
    pub webhook_status: WebhookStatus,
    pub last_failed_step: Option<Step>,
}
