// ABOUTME: Local container engine detection.
// ABOUTME: Honors explicit settings and DOCKER_HOST, then probes Docker and Podman sockets.

use super::types::{RuntimeConfig, RuntimeInfo, RuntimeType};
use std::path::Path;

const DOCKER_SOCKET: &str = "/var/run/docker.sock";
const ROOTFUL_PODMAN: &str = "/run/podman/podman.sock";

/// Error during engine detection.
#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    #[error("no container engine found (checked Docker and Podman sockets)")]
    NoRuntimeFound,

    #[error("configured socket does not exist: {0}")]
    SocketMissing(String),
}

/// Detect the container engine on the local system.
///
/// Detection order (when not explicitly configured):
/// 1. `DOCKER_HOST` if it names a `unix://` socket
/// 2. Docker socket (`/var/run/docker.sock`)
/// 3. Rootless Docker socket (`$XDG_RUNTIME_DIR/docker.sock`)
/// 4. Rootless Podman socket (`/run/user/$UID/podman/podman.sock`)
/// 5. Rootful Podman socket (`/run/podman/podman.sock`)
pub fn detect_local(config: &RuntimeConfig) -> Result<RuntimeInfo, DetectionError> {
    if let Some(ref socket) = config.socket {
        if !Path::new(socket).exists() {
            return Err(DetectionError::SocketMissing(socket.clone()));
        }
        return Ok(match config.runtime {
            Some(runtime_type) => RuntimeInfo::new(runtime_type, socket.clone()),
            None => RuntimeInfo::for_socket(socket.clone()),
        });
    }

    let candidates = candidate_sockets(
        std::env::var("DOCKER_HOST").ok().as_deref(),
        std::env::var("XDG_RUNTIME_DIR").ok().as_deref(),
        get_uid().as_deref(),
    );

    candidates
        .into_iter()
        .filter(|info| config.runtime.is_none_or(|rt| rt == info.runtime_type))
        .find(|info| Path::new(&info.socket_path).exists())
        .ok_or(DetectionError::NoRuntimeFound)
}

/// Sockets to probe, in priority order.
fn candidate_sockets(
    docker_host: Option<&str>,
    xdg_runtime_dir: Option<&str>,
    uid: Option<&str>,
) -> Vec<RuntimeInfo> {
    let mut candidates = Vec::new();
    let docker = |path: String| RuntimeInfo::new(RuntimeType::Docker, path);
    let podman = |path: String| RuntimeInfo::new(RuntimeType::Podman, path);

    if let Some(path) = docker_host.and_then(|h| h.strip_prefix("unix://")) {
        candidates.push(RuntimeInfo::for_socket(path));
    }
    candidates.push(docker(DOCKER_SOCKET.to_string()));
    if let Some(dir) = xdg_runtime_dir {
        candidates.push(docker(format!("{}/docker.sock", dir)));
    }
    if let Some(uid) = uid {
        candidates.push(podman(format!("/run/user/{}/podman/podman.sock", uid)));
    }
    candidates.push(podman(ROOTFUL_PODMAN.to_string()));
    candidates
}

fn get_uid() -> Option<String> {
    std::env::var("UID").ok().or_else(|| {
        // Fall back to reading /proc/self/status
        std::fs::read_to_string("/proc/self/status")
            .ok()
            .and_then(|s| {
                s.lines()
                    .find(|l| l.starts_with("Uid:"))
                    .and_then(|l| l.split_whitespace().nth(1))
                    .map(|s| s.to_string())
            })
    })
}
