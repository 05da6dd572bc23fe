// ABOUTME: Engine identity: which runtime answers on which socket, and the settings override.
// ABOUTME: Also infers the runtime from a socket path when only the path is known.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeType {
    Docker,
    Podman,
}

impl RuntimeType {
    /// Name of the command-line client for this runtime.
    pub fn cli_binary(&self) -> &'static str {
        match self {
            RuntimeType::Docker => "docker",
            RuntimeType::Podman => "podman",
        }
    }

    /// Runtime implied by a socket path. Podman sockets are named after it;
    /// anything else speaks the Docker API as Docker.
    pub fn from_socket_path(path: &str) -> Self {
        if path.contains("podman") {
            RuntimeType::Podman
        } else {
            RuntimeType::Docker
        }
    }
}

impl fmt::Display for RuntimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cli_binary())
    }
}

/// An engine found on this host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeInfo {
    pub runtime_type: RuntimeType,
    pub socket_path: String,
}

impl RuntimeInfo {
    pub fn new(runtime_type: RuntimeType, socket_path: impl Into<String>) -> Self {
        Self {
            runtime_type,
            socket_path: socket_path.into(),
        }
    }

    /// Info for a socket whose runtime is inferred from its path.
    pub fn for_socket(socket_path: impl Into<String>) -> Self {
        let socket_path = socket_path.into();
        Self {
            runtime_type: RuntimeType::from_socket_path(&socket_path),
            socket_path,
        }
    }
}

/// `runtime` and `socket` from settings.yml; either may be left to detection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuntimeConfig {
    pub runtime: Option<RuntimeType>,
    pub socket: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn podman_sockets_are_recognized() {
        assert_eq!(
            RuntimeType::from_socket_path("/run/user/1000/podman/podman.sock"),
            RuntimeType::Podman
        );
        assert_eq!(
            RuntimeType::from_socket_path("/var/run/docker.sock"),
            RuntimeType::Docker
        );
        assert_eq!(
            RuntimeType::from_socket_path("/srv/engine.sock"),
            RuntimeType::Docker
        );
    }

    #[test]
    fn runtime_names_match_cli_binaries() {
        assert_eq!(RuntimeType::Podman.to_string(), "podman");
        assert_eq!(RuntimeType::Docker.cli_binary(), "docker");
        let parsed: RuntimeType = serde_yaml::from_str("podman").unwrap();
        assert_eq!(parsed, RuntimeType::Podman);
    }
}
