// ABOUTME: Deployment pipeline: step executor, controller and per-application run lock.
// ABOUTME: Steps run app_name -> app_desc -> build -> deploy -> webhook with a checkpoint after each.

mod controller;
mod error;
mod executor;
mod lock;

pub use controller::{Controller, RunOutcome, RunReport, RunRequest};
pub use error::{LockError, PipelineError};
pub use executor::{
    ExecutorOptions, MAX_DESCRIPTION_CHARS, StepExecutor, StepOutcome, normalize_description,
};
pub use lock::{LockInfo, RunLock};
