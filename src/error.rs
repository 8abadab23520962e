use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for release operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("Invalid target version: {0}")]
    InvalidVersion(String),

    #[error("Manifest error in {}: {reason}", path.display())]
    Manifest { path: PathBuf, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Command `{program} {}` failed with exit code {}: {stderr}", args.join(" "), code.map_or_else(|| "none".to_string(), |c| c.to_string()))]
    Command {
        program: String,
        args: Vec<String>,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Prompt failed: {0}")]
    Prompt(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in monorelease
pub type Result<T> = std::result::Result<T, ReleaseError>;

impl ReleaseError {
    /// Create a version validation error
    pub fn invalid_version(msg: impl Into<String>) -> Self {
        ReleaseError::InvalidVersion(msg.into())
    }

    /// Create a manifest error for the given file
    pub fn manifest(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        ReleaseError::Manifest {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        ReleaseError::Config(msg.into())
    }

    /// Create a prompt error with context
    pub fn prompt(msg: impl Into<String>) -> Self {
        ReleaseError::Prompt(msg.into())
    }

    /// Captured stderr of a failed external command, if this is one.
    pub fn command_stderr(&self) -> Option<&str> {
        match self {
            ReleaseError::Command { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}
