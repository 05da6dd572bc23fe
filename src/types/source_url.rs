// ABOUTME: Absolute source repository URL with scheme and host checks.
// ABOUTME: Also derives repository names and GitHub owner/repo pairs.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;
use url::Url;

const ALLOWED_SCHEMES: &[&str] = &["http", "https", "ssh", "git"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SourceUrlError {
    #[error("source URL cannot be empty")]
    Empty,

    #[error("invalid URL '{url}': {reason}")]
    Malformed { url: String, reason: String },

    #[error("unsupported URL scheme '{0}' (expected http, https, ssh or git)")]
    UnsupportedScheme(String),

    #[error("URL has no host: {0}")]
    MissingHost(String),

    #[error("URL has no repository path: {0}")]
    MissingPath(String),
}

/// A GitHub `owner/repo` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubRepo {
    pub owner: String,
    pub repo: String,
}

impl fmt::Display for GitHubRepo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUrl(Url);

impl SourceUrl {
    pub fn parse(value: &str) -> Result<Self, SourceUrlError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(SourceUrlError::Empty);
        }

        let url = Url::parse(value).map_err(|e| SourceUrlError::Malformed {
            url: value.to_string(),
            reason: e.to_string(),
        })?;

        if !ALLOWED_SCHEMES.contains(&url.scheme()) {
            return Err(SourceUrlError::UnsupportedScheme(url.scheme().to_string()));
        }

        match url.host_str() {
            Some(host) if !host.is_empty() => {}
            _ => return Err(SourceUrlError::MissingHost(value.to_string())),
        }

        let parsed = Self(url);
        if parsed.repo_name().is_none() {
            return Err(SourceUrlError::MissingPath(value.to_string()));
        }
        Ok(parsed)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn host(&self) -> &str {
        self.0.host_str().unwrap_or_default()
    }

    /// Last path segment with any `.git` suffix removed.
    pub fn repo_name(&self) -> Option<&str> {
        self.0
            .path_segments()?
            .filter(|s| !s.is_empty())
            .next_back()
            .map(|s| s.strip_suffix(".git").unwrap_or(s))
            .filter(|s| !s.is_empty())
    }

    /// Owner and repository when hosted on github.com.
    pub fn github_repo(&self) -> Option<GitHubRepo> {
        if !self.host().eq_ignore_ascii_case("github.com") {
            return None;
        }
        let mut segments = self.0.path_segments()?.filter(|s| !s.is_empty());
        let owner = segments.next()?.to_string();
        let repo = segments.next()?;
        let repo = repo.strip_suffix(".git").unwrap_or(repo).to_string();
        if repo.is_empty() {
            return None;
        }
        Some(GitHubRepo { owner, repo })
    }

    /// Whether `other` refers to the same repository, ignoring scheme,
    /// credentials, case of the host and a trailing `.git`.
    ///
    /// `other` may be any clone URL form including scp-like
    /// `git@host:owner/repo.git`.
    pub fn same_repository(&self, other: &str) -> bool {
        match (identity_key(self.as_str()), identity_key(other)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

/// Normalized `host/path` key for repository comparison.
fn identity_key(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let without_scheme = match raw.find("://") {
        Some(idx) => &raw[idx + 3..],
        None => raw,
    };
    let without_user = match without_scheme.find('@') {
        Some(at) if !without_scheme[..at].contains('/') => &without_scheme[at + 1..],
        _ => without_scheme,
    };

    let (host, path) = match (without_user.find('/'), without_user.find(':')) {
        // scp-like: host:owner/repo
        (Some(slash), Some(colon))
            if colon < slash
                && !without_user[colon + 1..slash]
                    .chars()
                    .all(|c| c.is_ascii_digit()) =>
        {
            (&without_user[..colon], &without_user[colon + 1..])
        }
        (None, Some(colon)) => (&without_user[..colon], &without_user[colon + 1..]),
        (Some(slash), _) => (&without_user[..slash], &without_user[slash + 1..]),
        (None, None) => return None,
    };

    // Drop an explicit port.
    let host = host.split(':').next().unwrap_or(host).to_ascii_lowercase();
    let path = path.trim_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    if host.is_empty() || path.is_empty() {
        return None;
    }
    Some(format!("{}/{}", host, path))
}

impl fmt::Display for SourceUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for SourceUrl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.as_str().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SourceUrl {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        SourceUrl::parse(&value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_https_repository() {
        let url = SourceUrl::parse("https://example.com/repo.git").unwrap();
        assert_eq!(url.host(), "example.com");
        assert_eq!(url.repo_name(), Some("repo"));
    }

    #[test]
    fn rejects_ftp_relative_and_empty() {
        assert!(matches!(
            SourceUrl::parse("ftp://x"),
            Err(SourceUrlError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            SourceUrl::parse("not-a-url"),
            Err(SourceUrlError::Malformed { .. })
        ));
        assert_eq!(SourceUrl::parse(""), Err(SourceUrlError::Empty));
    }

    #[test]
    fn rejects_missing_repository_path() {
        assert!(matches!(
            SourceUrl::parse("https://example.com/"),
            Err(SourceUrlError::MissingPath(_))
        ));
    }

    #[test]
    fn github_repo_extraction() {
        let url = SourceUrl::parse("https://github.com/ray-d-song/omk.git").unwrap();
        let repo = url.github_repo().unwrap();
        assert_eq!(repo.owner, "ray-d-song");
        assert_eq!(repo.repo, "omk");
        assert_eq!(repo.to_string(), "ray-d-song/omk");

        let other = SourceUrl::parse("https://gitlab.com/a/b").unwrap();
        assert!(other.github_repo().is_none());
    }

    #[test]
    fn same_repository_across_clone_forms() {
        let url = SourceUrl::parse("https://github.com/Owner/app.git").unwrap();
        assert!(url.same_repository("https://github.com/Owner/app"));
        assert!(url.same_repository("git@github.com:Owner/app.git"));
        assert!(url.same_repository("ssh://git@github.com/Owner/app.git"));
        assert!(url.same_repository("git://GitHub.com/Owner/app.git"));
        assert!(!url.same_repository("https://github.com/Owner/other"));
    }
}
