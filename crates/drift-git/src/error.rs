//! Error types for drift-git

use std::path::PathBuf;

/// Result type for drift-git operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in git and host operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Subprocess exited with non-zero status
    #[error("Command failed (exit code {code}): {stderr}")]
    CommandFailed { code: i32, stderr: String },

    #[error("Branch '{name}' not found")]
    BranchNotFound { name: String },

    #[error("Invalid branch name: {name}")]
    InvalidBranchName { name: String },

    #[error("Not a git checkout: {path}")]
    NotACheckout { path: PathBuf },

    #[error("Nothing to commit in {path}")]
    NothingToCommit { path: PathBuf },

    #[error("Cannot parse remote URL: {url}")]
    InvalidRemote { url: String },

    #[error("Source-control host error: {message}")]
    Host { message: String },

    #[error("Background git task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl Error {
    pub fn host(message: impl Into<String>) -> Self {
        Self::Host {
            message: message.into(),
        }
    }
}
