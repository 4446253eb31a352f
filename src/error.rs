use std::path::PathBuf;

use thiserror::Error;

/// A failed oracle or search attempt. Both variants are retried and then
/// replaced by the stage's fallback value; neither aborts a run.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("provider call failed: {0:#}")]
    Provider(#[from] anyhow::Error),

    #[error("malformed oracle response: {0}")]
    Malformed(String),
}

impl OracleError {
    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::Malformed(detail.into())
    }
}

/// Errors that abort a run before any pipeline stage starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration value for '{field}': {reason}")]
    Invalid { field: String, reason: String },

    #[error("environment variable {0} is not set")]
    MissingEnv(String),

    #[error("no perspective files found in {}", .0.display())]
    NoPerspectives(PathBuf),
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
