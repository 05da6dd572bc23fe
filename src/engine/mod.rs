// ABOUTME: Container engine abstraction for Docker and Podman.
// ABOUTME: Capability trait, socket detection, manifest detection and the bollard-backed engine.

mod detection;
mod docker;
mod error;
pub mod manifest;
mod prerequisites;
mod traits;
mod types;

pub use detection::{DetectionError, detect_local};
pub use docker::{BollardEngine, ComposeCommand};
pub use error::{EngineError, PrerequisiteError, PrerequisiteKind};
pub use manifest::Manifest;
pub use prerequisites::check_prerequisites;
pub use traits::{
    APP_LABEL, COMPOSE_PROJECT_LABEL, ContainerEngine, MANAGED_LABEL, RemoveRequest, Workload,
};
pub use types::{RuntimeConfig, RuntimeInfo, RuntimeType};
