// ABOUTME: Library root for omk - exposes the registry, pipeline and collaborators.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod registry;
pub mod source;
pub mod store;
pub mod types;
pub mod webhook;
