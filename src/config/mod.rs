// ABOUTME: User settings (settings.yml) and the on-disk state layout.
// ABOUTME: Every field has a default so a missing settings file is a valid configuration.

mod paths;
mod secret;

pub use paths::{HOME_ENV, Paths};
pub use secret::SecretValue;

use crate::engine::{RuntimeConfig, RuntimeType};
use crate::error::{Error, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_GITHUB_API: &str = "https://api.github.com";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Explicit runtime type (overrides socket auto-detection).
    #[serde(default)]
    pub runtime: Option<RuntimeType>,

    /// Explicit engine socket path.
    #[serde(default)]
    pub socket: Option<String>,

    /// How long `deploy` waits for the container to be observed running.
    #[serde(default = "default_deploy_timeout", with = "humantime_serde")]
    pub deploy_timeout: Duration,

    /// Interval between container status polls during `deploy`.
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Consecutive failures of one step after which `run` refuses to resume
    /// without `--force`.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default)]
    pub webhook: WebhookSettings,

    #[serde(default)]
    pub github: GitHubSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookSettings {
    /// Public URL GitHub should deliver push events to. Unset disables the
    /// `webhook` step.
    #[serde(default)]
    pub callback_url: Option<String>,

    /// Shared secret for `X-Hub-Signature-256`.
    #[serde(default)]
    pub secret: Option<SecretValue>,

    /// Listen address for `omk serve`.
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,

    /// Request path accepted by `omk serve`.
    #[serde(default = "default_webhook_path")]
    pub path: String,
}

impl Default for WebhookSettings {
    fn default() -> Self {
        Self {
            callback_url: None,
            secret: None,
            bind: default_bind(),
            path: default_webhook_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GitHubSettings {
    #[serde(default = "default_github_api")]
    pub api_url: String,
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            api_url: default_github_api(),
        }
    }
}

fn default_deploy_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_max_attempts() -> u32 {
    5
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 9000))
}

fn default_webhook_path() -> String {
    "/webhook".to_string()
}

fn default_github_api() -> String {
    DEFAULT_GITHUB_API.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            runtime: None,
            socket: None,
            deploy_timeout: default_deploy_timeout(),
            poll_interval: default_poll_interval(),
            max_attempts: default_max_attempts(),
            webhook: WebhookSettings::default(),
            github: GitHubSettings::default(),
        }
    }
}

impl Settings {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Settings = serde_yaml::from_str(yaml)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_yaml(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::InvalidConfig(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::InvalidConfig(
                "poll_interval must be greater than zero".to_string(),
            ));
        }
        if !self.webhook.path.starts_with('/') {
            return Err(Error::InvalidConfig(format!(
                "webhook.path must start with '/': {}",
                self.webhook.path
            )));
        }
        if let Some(ref url) = self.webhook.callback_url {
            let parsed = url::Url::parse(url)
                .map_err(|e| Error::InvalidConfig(format!("webhook.callback_url: {}", e)))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(Error::InvalidConfig(format!(
                    "webhook.callback_url must be http(s): {}",
                    url
                )));
            }
        }
        Ok(())
    }

    /// Resolve the webhook secret, if one is configured.
    pub fn webhook_secret(&self) -> Result<Option<String>> {
        self.webhook.secret.as_ref().map(SecretValue::resolve).transpose()
    }

    /// Runtime override for engine detection.
    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            runtime: self.runtime,
            socket: self.socket.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let settings = Settings::from_yaml("").unwrap();
        assert_eq!(settings.deploy_timeout, Duration::from_secs(60));
        assert_eq!(settings.poll_interval, Duration::from_secs(1));
        assert_eq!(settings.max_attempts, 5);
        assert_eq!(settings.webhook.path, "/webhook");
        assert_eq!(settings.webhook.bind, "0.0.0.0:9000".parse().unwrap());
        assert_eq!(settings.github.api_url, DEFAULT_GITHUB_API);
        assert!(settings.webhook.callback_url.is_none());
    }

    #[test]
    fn full_file_parses() {
        let yaml = r#"
runtime: podman
socket: /run/user/1000/podman/podman.sock
deploy_timeout: 2m
poll_interval: 250ms
max_attempts: 3
webhook:
  callback_url: https://deploy.example.com/hooks/github
  secret:
    env: OMK_WEBHOOK_SECRET
  bind: 127.0.0.1:8080
  path: /hooks/github
github:
  api_url: https://github.example.com/api/v3
"#;
        let settings = Settings::from_yaml(yaml).unwrap();
        assert_eq!(settings.runtime, Some(RuntimeType::Podman));
        assert_eq!(settings.deploy_timeout, Duration::from_secs(120));
        assert_eq!(settings.poll_interval, Duration::from_millis(250));
        assert_eq!(settings.max_attempts, 3);
        assert_eq!(settings.webhook.path, "/hooks/github");
        assert_eq!(
            settings.webhook.secret,
            Some(SecretValue::Env {
                env: "OMK_WEBHOOK_SECRET".to_string()
            })
        );
        assert_eq!(settings.github.api_url, "https://github.example.com/api/v3");

        let runtime = settings.runtime_config();
        assert_eq!(runtime.runtime, Some(RuntimeType::Podman));
        assert_eq!(
            runtime.socket.as_deref(),
            Some("/run/user/1000/podman/podman.sock")
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(Settings::from_yaml("deploy_timout: 5s").is_err());
    }

    #[test]
    fn zero_attempts_are_rejected() {
        let err = Settings::from_yaml("max_attempts: 0").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn webhook_path_needs_leading_slash() {
        let err = Settings::from_yaml("webhook:\n  path: hooks").unwrap_err();
        assert!(err.to_string().contains("webhook.path"));
    }

    #[test]
    fn callback_url_must_be_http() {
        let err = Settings::from_yaml("webhook:\n  callback_url: ftp://example.com/hook").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("settings.yml")).unwrap();
        assert_eq!(settings.max_attempts, 5);
    }
}
