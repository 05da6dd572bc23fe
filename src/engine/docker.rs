// ABOUTME: Bollard-based container engine implementation.
// ABOUTME: API calls for container lifecycle; the engine CLI for image builds and compose.

use async_trait::async_trait;
use bollard::Docker;
use futures::future::try_join_all;
use bollard::models::{ContainerCreateBody, HostConfig, RestartPolicy, RestartPolicyNameEnum};
use bollard::query_parameters::{
    CreateContainerOptions, InspectContainerOptions, ListContainersOptions, RemoveContainerOptions,
    RemoveImageOptions,
};
use std::collections::HashMap;
use std::path::Path;

use super::error::EngineError;
use super::traits::{
    APP_LABEL, COMPOSE_PROJECT_LABEL, ContainerEngine, MANAGED_LABEL, RemoveRequest, Workload,
};
use super::types::{RuntimeInfo, RuntimeType};
use crate::process::{self, CommandOutput};
use crate::store::{BuildType, ContainerStatus};
use crate::types::AppName;

/// How compose is invoked for this engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposeCommand {
    /// `<cli> compose ...`
    Plugin(RuntimeType),
    /// The standalone `docker-compose` binary.
    Standalone,
}

impl ComposeCommand {
    fn program(&self) -> &'static str {
        match self {
            ComposeCommand::Plugin(rt) => rt.cli_binary(),
            ComposeCommand::Standalone => "docker-compose",
        }
    }

    fn prefix(&self) -> &'static [&'static str] {
        match self {
            ComposeCommand::Plugin(_) => &["compose"],
            ComposeCommand::Standalone => &[],
        }
    }

    /// Probe which compose flavour answers on this machine.
    pub async fn detect(runtime_type: RuntimeType) -> Option<Self> {
        let plugin = ComposeCommand::Plugin(runtime_type);
        if answers(plugin.program(), &["compose", "version"]).await {
            return Some(plugin);
        }
        if runtime_type == RuntimeType::Docker
            && answers("docker-compose", &["--version"]).await
        {
            return Some(ComposeCommand::Standalone);
        }
        None
    }
}

async fn answers(program: &str, args: &[&str]) -> bool {
    matches!(process::run(program, args, None).await, Ok(out) if out.success())
}

fn is_not_found(e: &bollard::errors::Error) -> bool {
    matches!(
        e,
        bollard::errors::Error::DockerResponseServerError { status_code, .. } if *status_code == 404
    )
}

/// Container engine backed by the Docker-compatible API of Docker or Podman.
pub struct BollardEngine {
    client: Docker,
    runtime_type: RuntimeType,
    socket_path: String,
    compose: Option<ComposeCommand>,
}

impl BollardEngine {
    /// Connect to the engine socket described by `info`.
    pub fn connect(info: &RuntimeInfo) -> Result<Self, EngineError> {
        let client =
            Docker::connect_with_unix(&info.socket_path, 120, bollard::API_DEFAULT_VERSION)?;
        Ok(Self {
            client,
            runtime_type: info.runtime_type,
            socket_path: info.socket_path.clone(),
            compose: None,
        })
    }

    pub fn with_compose(mut self, compose: Option<ComposeCommand>) -> Self {
        self.compose = compose;
        self
    }

    pub fn runtime_type(&self) -> RuntimeType {
        self.runtime_type
    }

    pub fn socket_path(&self) -> &str {
        &self.socket_path
    }

    async fn cli(
        &self,
        operation: &str,
        args: &[String],
        cwd: &Path,
    ) -> Result<CommandOutput, EngineError> {
        let program = self.runtime_type.cli_binary();
        run_checked(program, operation, args, cwd).await
    }

    async fn compose(
        &self,
        operation: &str,
        app: &AppName,
        manifest: &Path,
        args: &[&str],
    ) -> Result<CommandOutput, EngineError> {
        let compose = self.compose.as_ref().ok_or(EngineError::ComposeUnavailable)?;
        let mut full: Vec<String> = compose.prefix().iter().map(|s| s.to_string()).collect();
        full.extend([
            "-p".to_string(),
            app.to_string(),
            "-f".to_string(),
            manifest.to_string_lossy().into_owned(),
        ]);
        full.extend(args.iter().map(|s| s.to_string()));

        let cwd = manifest.parent().unwrap_or(Path::new("."));
        run_checked(compose.program(), operation, &full, cwd).await
    }

    async fn remove_container_if_exists(&self, name: &str) -> Result<(), EngineError> {
        let opts = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };
        match self.client.remove_container(name, Some(opts)).await {
            Ok(()) => Ok(()),
            Err(e) if is_not_found(&e) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove_image_if_exists(&self, tag: &str) -> Result<(), EngineError> {
        let opts = RemoveImageOptions {
            force: true,
            ..Default::default()
        };
        match self.client.remove_image(tag, Some(opts), None).await {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(&e) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Names of all containers (running or not) carrying `label=value`.
    async fn containers_with_label(
        &self,
        label: &str,
        value: &str,
    ) -> Result<Vec<(String, String, String)>, EngineError> {
        let mut filters: HashMap<String, Vec<String>> = HashMap::new();
        filters.insert("label".to_string(), vec![format!("{}={}", label, value)]);
        let opts = ListContainersOptions {
            all: true,
            filters: Some(filters),
            ..Default::default()
        };

        let containers = self.client.list_containers(Some(opts)).await?;
        Ok(containers
            .into_iter()
            .map(|c| {
                let name = c
                    .names
                    .unwrap_or_default()
                    .first()
                    .map(|n| n.trim_start_matches('/').to_string())
                    .unwrap_or_default();
                let state = c
                    .state
                    .map(|s| format!("{:?}", s).to_lowercase())
                    .unwrap_or_default();
                (name, state, c.status.unwrap_or_default())
            })
            .collect())
    }

    async fn single_status(&self, app: &AppName) -> Result<ContainerStatus, EngineError> {
        match self
            .client
            .inspect_container(&app.container_name(), None::<InspectContainerOptions>)
            .await
        {
            Ok(details) => Ok(single_container_status(details.state.as_ref())),
            Err(e) if is_not_found(&e) => Ok(ContainerStatus::Unknown),
            Err(e) => Err(e.into()),
        }
    }

    async fn compose_status(&self, app: &AppName) -> Result<ContainerStatus, EngineError> {
        let containers = self
            .containers_with_label(COMPOSE_PROJECT_LABEL, app.as_str())
            .await?;
        let states: Vec<(String, String)> = containers
            .into_iter()
            .map(|(_, state, status)| (state, status))
            .collect();
        Ok(aggregate_status(&states))
    }

    /// Remove compose containers by project label when no manifest is left to `down`.
    async fn remove_compose_by_label(&self, app: &AppName) -> Result<(), EngineError> {
        let containers = self
            .containers_with_label(COMPOSE_PROJECT_LABEL, app.as_str())
            .await?;
        try_join_all(
            containers
                .iter()
                .map(|(name, _, _)| self.remove_container_if_exists(name)),
        )
        .await?;
        Ok(())
    }
}

async fn run_checked(
    program: &str,
    operation: &str,
    args: &[String],
    cwd: &Path,
) -> Result<CommandOutput, EngineError> {
    let output = process::run(program, args, Some(cwd))
        .await
        .map_err(|source| EngineError::Spawn {
            program: program.to_string(),
            source,
        })?;
    if !output.success() {
        return Err(EngineError::CommandFailed {
            operation: operation.to_string(),
            message: output.failure_summary(),
        });
    }
    Ok(output)
}

fn single_container_status(state: Option<&bollard::models::ContainerState>) -> ContainerStatus {
    use bollard::models::ContainerStateStatusEnum as S;

    let Some(state) = state else {
        return ContainerStatus::Unknown;
    };
    match state.status {
        Some(S::RUNNING) => ContainerStatus::Running,
        Some(S::DEAD) | Some(S::RESTARTING) => ContainerStatus::Failed,
        Some(S::EXITED) if state.exit_code.is_some_and(|c| c != 0) => ContainerStatus::Failed,
        Some(_) => ContainerStatus::Stopped,
        None => ContainerStatus::Unknown,
    }
}

/// Combine per-container `(state, status)` pairs into one status.
///
/// Any failed container fails the application; all running means running.
fn aggregate_status(containers: &[(String, String)]) -> ContainerStatus {
    if containers.is_empty() {
        return ContainerStatus::Unknown;
    }

    let failed = |(state, status): &(String, String)| {
        matches!(state.as_str(), "dead" | "restarting")
            || (state == "exited" && exit_code_from_status(status).is_some_and(|c| c != 0))
    };

    if containers.iter().any(failed) {
        ContainerStatus::Failed
    } else if containers.iter().all(|(state, _)| state == "running") {
        ContainerStatus::Running
    } else {
        ContainerStatus::Stopped
    }
}

/// Parse the code out of a status string like `Exited (137) 2 minutes ago`.
fn exit_code_from_status(status: &str) -> Option<i64> {
    let start = status.find('(')? + 1;
    let end = status[start..].find(')')? + start;
    status[start..end].trim().parse().ok()
}

#[async_trait]
impl ContainerEngine for BollardEngine {
    async fn ping(&self) -> Result<(), EngineError> {
        self.client.ping().await?;
        Ok(())
    }

    async fn build_image(&self, workload: &Workload) -> Result<(), EngineError> {
        let app = &workload.app;
        match workload.build_type() {
            BuildType::SingleContainer => {
                let args = vec![
                    "build".to_string(),
                    "-t".to_string(),
                    app.image_tag(),
                    "-f".to_string(),
                    workload.manifest.path.to_string_lossy().into_owned(),
                    "--label".to_string(),
                    format!("{}={}", APP_LABEL, app),
                    ".".to_string(),
                ];
                self.cli("image build", &args, &workload.source_dir).await?;
            }
            BuildType::MultiServiceCompose => {
                self.compose("compose build", app, &workload.manifest.path, &["build"])
                    .await?;
            }
        }
        tracing::info!(app = %app, build_type = %workload.build_type(), "image built");
        Ok(())
    }

    async fn run_container(&self, workload: &Workload) -> Result<(), EngineError> {
        let app = &workload.app;
        match workload.build_type() {
            BuildType::SingleContainer => {
                let name = app.container_name();
                self.remove_container_if_exists(&name).await?;

                let labels = HashMap::from([
                    (APP_LABEL.to_string(), app.to_string()),
                    (MANAGED_LABEL.to_string(), "true".to_string()),
                ]);
                let host_config = HostConfig {
                    restart_policy: Some(RestartPolicy {
                        name: Some(RestartPolicyNameEnum::UNLESS_STOPPED),
                        maximum_retry_count: None,
                    }),
                    publish_all_ports: Some(true),
                    ..Default::default()
                };
                let body = ContainerCreateBody {
                    image: Some(app.image_tag()),
                    labels: Some(labels),
                    host_config: Some(host_config),
                    ..Default::default()
                };
                let opts = CreateContainerOptions {
                    name: Some(name.clone()),
                    ..Default::default()
                };

                let response = self.client.create_container(Some(opts), body).await?;
                self.client
                    .start_container(
                        &response.id,
                        None::<bollard::query_parameters::StartContainerOptions>,
                    )
                    .await?;
                tracing::info!(app = %app, container = %name, "container started");
            }
            BuildType::MultiServiceCompose => {
                self.compose(
                    "compose up",
                    app,
                    &workload.manifest.path,
                    &["up", "-d", "--remove-orphans"],
                )
                .await?;
                tracing::info!(app = %app, "compose project started");
            }
        }
        Ok(())
    }

    async fn container_status(
        &self,
        app: &AppName,
        build_type: BuildType,
    ) -> Result<ContainerStatus, EngineError> {
        match build_type {
            BuildType::SingleContainer => self.single_status(app).await,
            BuildType::MultiServiceCompose => self.compose_status(app).await,
        }
    }

    async fn remove(&self, request: &RemoveRequest) -> Result<(), EngineError> {
        let app = &request.app;
        let single = matches!(request.build_type, None | Some(BuildType::SingleContainer));
        let compose = matches!(request.build_type, None | Some(BuildType::MultiServiceCompose));

        if single {
            self.remove_container_if_exists(&app.container_name())
                .await?;
            self.remove_image_if_exists(&app.image_tag()).await?;
        }

        if compose {
            match request.manifest.as_deref().filter(|m| m.is_file()) {
                Some(manifest) if self.compose.is_some() => {
                    self.compose(
                        "compose down",
                        app,
                        manifest,
                        &["down", "--rmi", "local", "--remove-orphans"],
                    )
                    .await?;
                }
                _ => self.remove_compose_by_label(app).await?,
            }
        }

        tracing::info!(app = %app, "containers and images removed");
        Ok(())
    }
}
