// ABOUTME: GitHub push event payload.
// ABOUTME: Only the repository URLs, the pushed ref and the deletion flag are read.

use serde::Deserialize;

use crate::types::Branch;

/// The parts of a `push` delivery needed to find the application.
#[derive(Debug, Clone, Deserialize)]
pub struct PushEvent {
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub repository: Repository,
    /// Set when the push removed the ref.
    #[serde(default)]
    pub deleted: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub clone_url: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub ssh_url: Option<String>,
    #[serde(default)]
    pub git_url: Option<String>,
}

impl PushEvent {
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// The pushed branch, or `None` for tag pushes and other refs.
    pub fn branch(&self) -> Option<Branch> {
        let name = self.git_ref.strip_prefix("refs/heads/")?;
        Branch::new(name).ok()
    }

    /// Every URL the repository is known by.
    pub fn repository_urls(&self) -> impl Iterator<Item = &str> {
        let r = &self.repository;
        [&r.clone_url, &r.html_url, &r.ssh_url, &r.git_url]
            .into_iter()
            .filter_map(|u| u.as_deref())
    }

    /// Short description for logs.
    pub fn describe(&self) -> String {
        let repo = self
            .repository
            .full_name
            .as_deref()
            .or_else(|| self.repository_urls().next())
            .unwrap_or("<unknown repository>");
        format!("{} {}", repo, self.git_ref)
    }
}
