// ABOUTME: Engine error types.
// ABOUTME: EngineError covers operations; PrerequisiteError (SNAFU) covers startup probing.

use snafu::Snafu;
use std::path::PathBuf;

use super::detection::DetectionError;

/// Failure of a container engine operation.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{operation} failed: {message}")]
    CommandFailed { operation: String, message: String },

    #[error("engine API error: {0}")]
    Api(String),

    #[error("no Dockerfile or compose manifest found in {}", dir.display())]
    NoManifest { dir: PathBuf },

    #[error("compose is not available for this engine (tried `compose version` and docker-compose)")]
    ComposeUnavailable,
}

impl From<bollard::errors::Error> for EngineError {
    fn from(err: bollard::errors::Error) -> Self {
        EngineError::Api(err.to_string())
    }
}

/// Unified prerequisite error for detection and connection failures.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum PrerequisiteError {
    #[snafu(display("container engine detection failed: {source}"))]
    Detection { source: DetectionError },

    #[snafu(display("`{binary}` is not installed or not on PATH: {source}"))]
    CliMissing {
        binary: String,
        source: std::io::Error,
    },

    #[snafu(display("`{binary} --version` failed: {message}"))]
    CliBroken { binary: String, message: String },

    #[snafu(display("cannot connect to {socket}: {source}"))]
    Connection { socket: String, source: EngineError },

    #[snafu(display("container engine at {socket} is not running: {source}"))]
    NotRunning { socket: String, source: EngineError },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrerequisiteKind {
    /// No engine socket found on the system.
    NoRuntimeFound,
    /// The engine command-line client is missing or broken.
    CliUnavailable,
    /// Failed to open the engine socket.
    ConnectionFailed,
    /// The daemon did not answer a ping.
    DaemonDown,
}

impl PrerequisiteError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> PrerequisiteKind {
        match self {
            PrerequisiteError::Detection { .. } => PrerequisiteKind::NoRuntimeFound,
            PrerequisiteError::CliMissing { .. } | PrerequisiteError::CliBroken { .. } => {
                PrerequisiteKind::CliUnavailable
            }
            PrerequisiteError::Connection { .. } => PrerequisiteKind::ConnectionFailed,
            PrerequisiteError::NotRunning { .. } => PrerequisiteKind::DaemonDown,
        }
    }
}

impl From<DetectionError> for PrerequisiteError {
    fn from(source: DetectionError) -> Self {
        PrerequisiteError::Detection { source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection_maps_to_no_runtime() {
        let err: PrerequisiteError = DetectionError::NoRuntimeFound.into();
        assert_eq!(err.kind(), PrerequisiteKind::NoRuntimeFound);
        assert!(err.to_string().contains("no container engine found"));
    }

    #[test]
    fn ping_failure_is_daemon_down() {
        let err = PrerequisiteError::NotRunning {
            socket: "/var/run/docker.sock".to_string(),
            source: EngineError::Api("connection refused".to_string()),
        };
        assert_eq!(err.kind(), PrerequisiteKind::DaemonDown);
        assert!(err.to_string().contains("/var/run/docker.sock"));
    }
}
