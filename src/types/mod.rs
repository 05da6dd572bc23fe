// ABOUTME: Validated domain types for application identity and source descriptors.
// ABOUTME: Parsing happens once at the boundary so the pipeline never sees raw strings.

mod app_name;
mod branch;
mod source_url;

pub use app_name::{AppName, AppNameError, RESERVED_NAMES};
pub use branch::{Branch, BranchError, DEFAULT_BRANCH};
pub use source_url::{GitHubRepo, SourceUrl, SourceUrlError};
