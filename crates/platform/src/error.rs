//! Error types for forge-platform

use thiserror::Error;

/// Errors that can occur in shell operations
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("command exited with code {code:?}: {cmd}")]
    CommandFailed { cmd: String, code: Option<i32> },

    #[error("failed to spawn '{cmd}': {source}")]
    Spawn {
        cmd: String,
        #[source]
        source: std::io::Error,
    },

    #[error("environment variable '{0}' is not set")]
    MissingEnv(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
