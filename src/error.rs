// ABOUTME: Application-wide error types for omk.
// ABOUTME: Uses thiserror; kind() maps every error onto the user-facing taxonomy.

use std::path::PathBuf;
use thiserror::Error;

use crate::engine::{EngineError, PrerequisiteError};
use crate::pipeline::{LockError, PipelineError};
use crate::source::SourceError;
use crate::store::{Step, StoreError};
use crate::types::{AppName, AppNameError, BranchError, SourceUrlError};

/// Input the user must correct. Raised before any state is touched.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error(transparent)]
    Url(#[from] SourceUrlError),

    #[error(transparent)]
    Name(#[from] AppNameError),

    #[error(transparent)]
    Branch(#[from] BranchError),

    #[error("cannot derive an application name from {0}; pass --name")]
    NoDerivableName(String),

    #[error("'{0}' is a reserved name; pass a different --name")]
    ReservedName(AppName),

    #[error("application '{name}' already exists for {existing}")]
    NameTaken { name: AppName, existing: String },

    #[error("application '{name}' tracks branch '{existing}'; delete it to change branches")]
    BranchChanged { name: AppName, existing: String },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Prerequisite(#[from] PrerequisiteError),

    #[error("deployment of '{name}' failed at step '{step}': {reason}")]
    StepFailed {
        name: AppName,
        step: Step,
        reason: String,
    },

    #[error("application not found: {0}")]
    NotFound(AppName),

    #[error("store error: {0}")]
    Store(StoreError),

    #[error("'{name}' failed {attempts} times at step '{step}'; fix the cause and rerun with --force")]
    RetryLimit {
        name: AppName,
        step: Step,
        attempts: u32,
    },

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error("container engine error: {0}")]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("no GitHub token given")]
    MissingToken,

    #[error("home directory not found; set HOME or OMK_HOME")]
    HomeNotFound,

    #[error("settings file not valid: {0}")]
    InvalidConfig(String),

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("failed to remove {}: {source}", path.display())]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("webhook server error: {0}")]
    Server(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Error categories reported to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Prerequisite,
    StepFailure,
    Store,
    NotFound,
    Other,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Prerequisite => "prerequisite",
            ErrorKind::StepFailure => "step_failure",
            ErrorKind::Store => "store",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Other => "error",
        }
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::Prerequisite(_) => ErrorKind::Prerequisite,
            Error::StepFailed { .. } | Error::RetryLimit { .. } => ErrorKind::StepFailure,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Store(_) => ErrorKind::Store,
            _ => ErrorKind::Other,
        }
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(name) => Error::NotFound(name),
            other => Error::Store(other),
        }
    }
}

impl From<PipelineError> for Error {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Store(e) => e.into(),
            PipelineError::Lock(e) => Error::Lock(e),
            PipelineError::RetryLimit {
                name,
                step,
                attempts,
            } => Error::RetryLimit {
                name,
                step,
                attempts,
            },
        }
    }
}

impl From<AppNameError> for Error {
    fn from(err: AppNameError) -> Self {
        Error::Validation(err.into())
    }
}

impl From<SourceUrlError> for Error {
    fn from(err: SourceUrlError) -> Self {
        Error::Validation(err.into())
    }
}

impl From<BranchError> for Error {
    fn from(err: BranchError) -> Self {
        Error::Validation(err.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_not_found_maps_to_not_found() {
        let name = AppName::new("blog").unwrap();
        let err: Error = StoreError::NotFound(name.clone()).into();
        assert!(matches!(err, Error::NotFound(ref n) if *n == name));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn url_errors_are_validation() {
        let err: Error = SourceUrlError::Empty.into();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn step_failure_message_names_step() {
        let err = Error::StepFailed {
            name: AppName::new("blog").unwrap(),
            step: Step::Build,
            reason: "exit 1".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::StepFailure);
        assert!(err.to_string().contains("step 'build'"));
    }
}
