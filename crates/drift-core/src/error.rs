//! Error types for drift-core

use std::path::PathBuf;

/// Result type for drift-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in engine operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Stored repository carries an unknown type discriminator
    #[error("Unknown repository type: {0}")]
    UnknownRepositoryType(String),

    #[error("Unknown module type: {0}")]
    UnknownModuleType(String),

    /// A module patch names a module the repository does not have
    #[error("Module '{module}' not found in repository '{repository}'")]
    UnknownModule { repository: String, module: String },

    /// The mutation cannot be applied; retrying will not help
    #[error("Mutation failed: {message}")]
    Mutation { message: String },

    /// Registry or chart index client failure
    #[error("Client error: {message}")]
    Client { message: String },

    #[error("No source-control host is configured")]
    HostUnavailable,

    #[error("Invalid task payload: {message}")]
    InvalidTask { message: String },

    #[error("Invalid task transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Cannot apply patch at '{path}': {reason}")]
    Patch { path: String, reason: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Configuration error in {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Store(#[from] drift_store::Error),

    #[error(transparent)]
    Git(#[from] drift_git::Error),

    #[error(transparent)]
    Manifest(#[from] drift_manifest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn mutation(message: impl Into<String>) -> Self {
        Self::Mutation {
            message: message.into(),
        }
    }

    pub fn client(message: impl Into<String>) -> Self {
        Self::Client {
            message: message.into(),
        }
    }

    /// Whether a failed task should be retried.
    ///
    /// Transient I/O (git subprocesses, host and registry clients, datastore
    /// backend I/O) is retriable. Validation, divergence and mutation errors
    /// are not.
    pub fn is_retriable(&self) -> bool {
        match self {
            Error::Client { .. } | Error::Io { .. } => true,
            Error::Store(e) => matches!(
                e,
                drift_store::Error::Io { .. }
                    | drift_store::Error::LockFailed { .. }
                    | drift_store::Error::Join(_)
            ),
            Error::Git(e) => matches!(
                e,
                drift_git::Error::Git(_)
                    | drift_git::Error::Spawn { .. }
                    | drift_git::Error::CommandFailed { .. }
                    | drift_git::Error::Host { .. }
                    | drift_git::Error::Join(_)
            ),
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Store(e) if e.is_not_found())
    }
}
