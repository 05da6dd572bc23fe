// ABOUTME: DNS-compatible application name validation.
// ABOUTME: Names double as container names and compose project names.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

const MAX_LEN: usize = 63;

/// Names omk keeps for itself.
pub const RESERVED_NAMES: &[&str] = &["omk"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AppNameError {
    #[error("application name cannot be empty")]
    Empty,

    #[error("application name exceeds maximum length of 63 characters")]
    TooLong,

    #[error("application name cannot start with a hyphen")]
    StartsWithHyphen,

    #[error("application name cannot end with a hyphen")]
    EndsWithHyphen,

    #[error("application name must be lowercase")]
    NotLowercase,

    #[error("invalid character in application name: '{0}'")]
    InvalidChar(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AppName(String);

impl AppName {
    pub fn new(value: &str) -> Result<Self, AppNameError> {
        if value.is_empty() {
            return Err(AppNameError::Empty);
        }

        if value.len() > MAX_LEN {
            return Err(AppNameError::TooLong);
        }

        if value.starts_with('-') {
            return Err(AppNameError::StartsWithHyphen);
        }

        if value.ends_with('-') {
            return Err(AppNameError::EndsWithHyphen);
        }

        for c in value.chars() {
            if c.is_ascii_uppercase() {
                return Err(AppNameError::NotLowercase);
            }
            if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '-' {
                return Err(AppNameError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    /// Derive a name from an arbitrary label such as a repository name.
    ///
    /// Lowercases, maps separators (`_`, `.`, whitespace) to hyphens, drops
    /// anything else outside `[a-z0-9-]`, collapses repeated hyphens and
    /// truncates to the maximum length.
    pub fn derive(label: &str) -> Result<Self, AppNameError> {
        let mut out = String::with_capacity(label.len());
        for c in label.chars() {
            let mapped = match c {
                'a'..='z' | '0'..='9' => Some(c),
                'A'..='Z' => Some(c.to_ascii_lowercase()),
                '-' | '_' | '.' => Some('-'),
                c if c.is_whitespace() => Some('-'),
                _ => None,
            };
            if let Some(m) = mapped {
                if m == '-' && (out.is_empty() || out.ends_with('-')) {
                    continue;
                }
                out.push(m);
            }
        }
        out.truncate(MAX_LEN);
        Self::new(out.trim_end_matches('-'))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_reserved(&self) -> bool {
        RESERVED_NAMES.contains(&self.0.as_str())
    }

    /// Container name used for single-container deployments.
    pub fn container_name(&self) -> String {
        format!("omk-{}", self.0)
    }

    /// Image tag produced by the build step.
    pub fn image_tag(&self) -> String {
        format!("omk/{}:latest", self.0)
    }
}

impl fmt::Display for AppName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for AppName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AppName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        AppName::new(&value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_dns_labels() {
        assert!(AppName::new("my-app").is_ok());
        assert!(AppName::new("app2").is_ok());
    }

    #[test]
    fn rejects_invalid_names() {
        assert_eq!(AppName::new(""), Err(AppNameError::Empty));
        assert_eq!(AppName::new("-app"), Err(AppNameError::StartsWithHyphen));
        assert_eq!(AppName::new("app-"), Err(AppNameError::EndsWithHyphen));
        assert_eq!(AppName::new("App"), Err(AppNameError::NotLowercase));
        assert_eq!(AppName::new("my_app"), Err(AppNameError::InvalidChar('_')));
        assert_eq!(AppName::new(&"a".repeat(64)), Err(AppNameError::TooLong));
    }

    #[test]
    fn derive_normalizes_repository_names() {
        assert_eq!(AppName::derive("My_Repo.rs").unwrap().as_str(), "my-repo-rs");
        assert_eq!(AppName::derive("--weird--").unwrap().as_str(), "weird");
        assert_eq!(AppName::derive("hello world").unwrap().as_str(), "hello-world");
        assert!(AppName::derive("___").is_err());
    }

    #[test]
    fn omk_is_reserved() {
        assert!(AppName::new("omk").unwrap().is_reserved());
        assert!(!AppName::new("omk-site").unwrap().is_reserved());
    }

    #[test]
    fn container_and_image_names() {
        let name = AppName::new("blog").unwrap();
        assert_eq!(name.container_name(), "omk-blog");
        assert_eq!(name.image_tag(), "omk/blog:latest");
    }

    #[test]
    fn deserialize_validates() {
        let ok: AppName = serde_json::from_str("\"blog\"").unwrap();
        assert_eq!(ok.as_str(), "blog");
        assert!(serde_json::from_str::<AppName>("\"Bad Name\"").is_err());
    }
}
