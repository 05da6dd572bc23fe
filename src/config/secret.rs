// ABOUTME: Secret settings given inline, through an environment variable or in a file.
// ABOUTME: Keeps the webhook secret out of settings.yml; Debug output never shows the value.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

/// Where a secret setting's value comes from.
///
/// ```yaml
/// secret: inline-value
/// secret: { env: OMK_WEBHOOK_SECRET }
/// secret: { file: /run/secrets/omk-webhook }
/// ```
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SecretValue {
    Inline(String),
    Env { env: String },
    File { file: PathBuf },
}

impl SecretValue {
    /// Read the secret; surrounding whitespace is dropped and an empty value is an error.
    pub fn resolve(&self) -> Result<String> {
        let value = match self {
            SecretValue::Inline(s) => s.clone(),
            SecretValue::Env { env } => {
                std::env::var(env).map_err(|_| Error::MissingEnvVar(env.clone()))?
            }
            SecretValue::File { file } => std::fs::read_to_string(file).map_err(|e| {
                Error::InvalidConfig(format!("reading secret from {}: {}", file.display(), e))
            })?,
        };

        let value = value.trim();
        if value.is_empty() {
            return Err(Error::InvalidConfig(format!("{} is empty", self.describe())));
        }
        Ok(value.to_string())
    }

    fn describe(&self) -> String {
        match self {
            SecretValue::Inline(_) => "inline secret".to_string(),
            SecretValue::Env { env } => format!("environment variable {}", env),
            SecretValue::File { file } => format!("secret file {}", file.display()),
        }
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretValue::Inline(_) => f.write_str("Inline(<redacted>)"),
            SecretValue::Env { env } => f.debug_struct("Env").field("env", env).finish(),
            SecretValue::File { file } => f.debug_struct("File").field("file", file).finish(),
        }
    }
}
