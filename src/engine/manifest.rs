// ABOUTME: Build manifest detection for a source checkout.
// ABOUTME: A compose file selects multi-service compose; otherwise a Dockerfile selects single-container.

use std::path::{Path, PathBuf};

use super::error::EngineError;
use crate::store::BuildType;

/// Compose file names, in lookup order.
pub const COMPOSE_FILES: [&str; 4] = [
    "compose.yaml",
    "compose.yml",
    "docker-compose.yaml",
    "docker-compose.yml",
];

pub const DOCKERFILE: &str = "Dockerfile";

/// The manifest that determines how an application is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub build_type: BuildType,
    pub path: PathBuf,
}

/// Inspect `dir` and decide the build type.
pub fn detect(dir: &Path) -> Result<Manifest, EngineError> {
    if let Some(path) = find_compose_file(dir) {
        return Ok(Manifest {
            build_type: BuildType::MultiServiceCompose,
            path,
        });
    }

    let dockerfile = dir.join(DOCKERFILE);
    if dockerfile.is_file() {
        return Ok(Manifest {
            build_type: BuildType::SingleContainer,
            path: dockerfile,
        });
    }

    Err(EngineError::NoManifest {
        dir: dir.to_path_buf(),
    })
}

/// First compose file present in `dir`, if any.
pub fn find_compose_file(dir: &Path) -> Option<PathBuf> {
    COMPOSE_FILES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dockerfile_is_single_container() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Dockerfile"), "FROM scratch\n").unwrap();

        let manifest = detect(dir.path()).unwrap();
        assert_eq!(manifest.build_type, BuildType::SingleContainer);
        assert_eq!(manifest.path, dir.path().join("Dockerfile"));
    }

    #[test]
    fn compose_wins_over_dockerfile() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Dockerfile"), "FROM scratch\n").unwrap();
        std::fs::write(dir.path().join("docker-compose.yml"), "services: {}\n").unwrap();

        let manifest = detect(dir.path()).unwrap();
        assert_eq!(manifest.build_type, BuildType::MultiServiceCompose);
        assert_eq!(manifest.path, dir.path().join("docker-compose.yml"));
    }

    #[test]
    fn compose_yaml_preferred_over_legacy_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("compose.yaml"), "services: {}\n").unwrap();
        std::fs::write(dir.path().join("docker-compose.yml"), "services: {}\n").unwrap();

        assert_eq!(
            find_compose_file(dir.path()),
            Some(dir.path().join("compose.yaml"))
        );
    }

    #[test]
    fn empty_dir_has_no_manifest() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            detect(dir.path()),
            Err(EngineError::NoManifest { .. })
        ));
    }
}
