// ABOUTME: Git branch name validation.
// ABOUTME: Rejects names git would refuse or that could be read as command flags.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

pub const DEFAULT_BRANCH: &str = "main";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BranchError {
    #[error("branch name cannot be empty")]
    Empty,

    #[error("branch name cannot start with '-'")]
    StartsWithHyphen,

    #[error("branch name cannot contain '..'")]
    DoubleDot,

    #[error("invalid character in branch name: {0:?}")]
    InvalidChar(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Branch(String);

impl Branch {
    pub fn new(value: &str) -> Result<Self, BranchError> {
        if value.is_empty() {
            return Err(BranchError::Empty);
        }
        if value.starts_with('-') {
            return Err(BranchError::StartsWithHyphen);
        }
        if value.contains("..") {
            return Err(BranchError::DoubleDot);
        }
        if let Some(c) = value.chars().find(|c| {
            c.is_whitespace()
                || c.is_control()
                || matches!(c, '~' | '^' | ':' | '?' | '*' | '[' | '\\')
        }) {
            return Err(BranchError::InvalidChar(c));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Full ref name as reported by push events.
    pub fn git_ref(&self) -> String {
        format!("refs/heads/{}", self.0)
    }
}

impl Default for Branch {
    fn default() -> Self {
        Self(DEFAULT_BRANCH.to_string())
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Branch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Branch {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Branch::new(&value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_main() {
        assert_eq!(Branch::default().as_str(), "main");
    }

    #[test]
    fn accepts_nested_branches() {
        assert_eq!(
            Branch::new("feature/login").unwrap().git_ref(),
            "refs/heads/feature/login"
        );
    }

    #[test]
    fn rejects_bad_branches() {
        assert_eq!(Branch::new(""), Err(BranchError::Empty));
        assert_eq!(
            Branch::new("--upload-pack"),
            Err(BranchError::StartsWithHyphen)
        );
        assert_eq!(Branch::new("a..b"), Err(BranchError::DoubleDot));
        assert_eq!(Branch::new("a b"), Err(BranchError::InvalidChar(' ')));
    }
}
