// ABOUTME: Container engine capability trait and its request types.
// ABOUTME: The pipeline and registry depend only on this trait, never on bollard.

use async_trait::async_trait;
use std::path::PathBuf;

use super::error::EngineError;
use super::manifest::Manifest;
use crate::store::{BuildType, ContainerStatus};
use crate::types::AppName;

/// Label carrying the owning application's name.
pub const APP_LABEL: &str = "omk.app";

/// Label marking resources created by omk.
pub const MANAGED_LABEL: &str = "omk.managed";

/// Label compose implementations put on project containers.
pub const COMPOSE_PROJECT_LABEL: &str = "com.docker.compose.project";

/// A checked-out application ready to build or run.
#[derive(Debug, Clone)]
pub struct Workload {
    pub app: AppName,
    /// Root of the source checkout; build context for single-container apps.
    pub source_dir: PathBuf,
    pub manifest: Manifest,
}

impl Workload {
    pub fn build_type(&self) -> BuildType {
        self.manifest.build_type
    }
}

/// What `remove` should tear down.
#[derive(Debug, Clone)]
pub struct RemoveRequest {
    pub app: AppName,
    /// Unknown when the application was never built.
    pub build_type: Option<BuildType>,
    /// Compose manifest, if the checkout still exists.
    pub manifest: Option<PathBuf>,
}

/// Operations the deployment pipeline needs from a container engine.
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Check that the engine daemon answers.
    async fn ping(&self) -> Result<(), EngineError>;

    /// Build the image(s) for a workload.
    async fn build_image(&self, workload: &Workload) -> Result<(), EngineError>;

    /// Start the workload, replacing any existing container of the same name.
    async fn run_container(&self, workload: &Workload) -> Result<(), EngineError>;

    /// Observe the current state of the workload's container(s).
    async fn container_status(
        &self,
        app: &AppName,
        build_type: BuildType,
    ) -> Result<ContainerStatus, EngineError>;

    /// Stop and remove container(s) and image(s). Missing resources are not an error.
    async fn remove(&self, request: &RemoveRequest) -> Result<(), EngineError>;
}
