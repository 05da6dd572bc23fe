// ABOUTME: Startup checks that a usable container engine is present.
// ABOUTME: Detects the socket, probes the CLI binary and pings the daemon.

use snafu::ResultExt;

use super::detection::detect_local;
use super::docker::{BollardEngine, ComposeCommand};
use super::error::{ConnectionSnafu, NotRunningSnafu, PrerequisiteError};
use super::traits::ContainerEngine;
use super::types::RuntimeConfig;
use crate::process;

/// Verify the engine prerequisites and return a connected engine.
///
/// Nothing here touches the application store.
pub async fn check_prerequisites(
    config: &RuntimeConfig,
) -> Result<BollardEngine, PrerequisiteError> {
    let info = detect_local(config)?;
    let binary = info.runtime_type.cli_binary();
    tracing::debug!(runtime = %info.runtime_type, socket = %info.socket_path, "engine detected");

    let version = process::run(binary, ["--version"], None).await.map_err(|source| {
        PrerequisiteError::CliMissing {
            binary: binary.to_string(),
            source,
        }
    })?;
    if !version.success() {
        return Err(PrerequisiteError::CliBroken {
            binary: binary.to_string(),
            message: version.failure_summary(),
        });
    }
    tracing::debug!(version = %version.stdout.trim(), "engine client");

    let engine = BollardEngine::connect(&info).context(ConnectionSnafu {
        socket: info.socket_path.clone(),
    })?;
    engine.ping().await.context(NotRunningSnafu {
        socket: info.socket_path.clone(),
    })?;

    let compose = ComposeCommand::detect(info.runtime_type).await;
    if compose.is_none() {
        tracing::warn!(
            runtime = %info.runtime_type,
            "compose not available; multi-service applications cannot be built"
        );
    }

    Ok(engine.with_compose(compose))
}
