// ABOUTME: Per-user filesystem layout for omk state.
// ABOUTME: Resolves $OMK_HOME or ~/.omk and names every file stored beneath it.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::AppName;

/// Environment variable overriding the state directory.
pub const HOME_ENV: &str = "OMK_HOME";

const STATE_DIR: &str = ".omk";
const STORE_FILE: &str = "apps.json";
const CREDENTIALS_FILE: &str = "github.json";
const SETTINGS_FILE: &str = "settings.yml";
const APPS_DIR: &str = "apps";
const LOCKS_DIR: &str = "locks";

/// Locations of omk's persisted state.
#[derive(Debug, Clone)]
pub struct Paths {
    root: PathBuf,
}

impl Paths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve the state directory from `$OMK_HOME`, falling back to `$HOME/.omk`.
    pub fn discover() -> Result<Self> {
        if let Some(dir) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::new(dir));
        }
        let home = std::env::var_os("HOME")
            .filter(|v| !v.is_empty())
            .ok_or(Error::HomeNotFound)?;
        Ok(Self::new(PathBuf::from(home).join(STATE_DIR)))
    }

    /// Create the state directory tree if it does not exist yet.
    pub fn ensure(&self) -> Result<()> {
        std::fs::create_dir_all(self.apps_dir())?;
        std::fs::create_dir_all(self.locks_dir())?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn store_file(&self) -> PathBuf {
        self.root.join(STORE_FILE)
    }

    pub fn credentials_file(&self) -> PathBuf {
        self.root.join(CREDENTIALS_FILE)
    }

    pub fn settings_file(&self) -> PathBuf {
        self.root.join(SETTINGS_FILE)
    }

    pub fn apps_dir(&self) -> PathBuf {
        self.root.join(APPS_DIR)
    }

    /// Checkout directory for an application's source.
    pub fn app_dir(&self, name: &AppName) -> PathBuf {
        self.apps_dir().join(name.as_str())
    }

    pub fn locks_dir(&self) -> PathBuf {
        self.root.join(LOCKS_DIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_under_root() {
        let paths = Paths::new("/tmp/omk-test");
        let name = AppName::new("blog").unwrap();
        assert_eq!(paths.store_file(), Path::new("/tmp/omk-test/apps.json"));
        assert_eq!(paths.credentials_file(), Path::new("/tmp/omk-test/github.json"));
        assert_eq!(paths.settings_file(), Path::new("/tmp/omk-test/settings.yml"));
        assert_eq!(paths.app_dir(&name), Path::new("/tmp/omk-test/apps/blog"));
        assert_eq!(paths.locks_dir(), Path::new("/tmp/omk-test/locks"));
    }

    #[test]
    fn discover_prefers_omk_home() {
        temp_env::with_vars(
            [(HOME_ENV, Some("/srv/omk")), ("HOME", Some("/home/someone"))],
            || {
                let paths = Paths::discover().unwrap();
                assert_eq!(paths.root(), Path::new("/srv/omk"));
            },
        );
    }

    #[test]
    fn discover_falls_back_to_home() {
        temp_env::with_vars(
            [(HOME_ENV, None::<&str>), ("HOME", Some("/home/someone"))],
            || {
                let paths = Paths::discover().unwrap();
                assert_eq!(paths.root(), Path::new("/home/someone/.omk"));
            },
        );
    }

    #[test]
    fn ensure_creates_tree() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::new(dir.path().join("state"));
        paths.ensure().unwrap();
        assert!(paths.apps_dir().is_dir());
        assert!(paths.locks_dir().is_dir());
    }
}
