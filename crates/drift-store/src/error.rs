//! Error types for drift-store

use std::path::PathBuf;

/// Result type for drift-store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in datastore operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{kind} '{id}' not found")]
    NotFound { kind: String, id: String },

    #[error("Invalid entity kind: {kind:?}")]
    InvalidKind { kind: String },

    #[error("Failed to decode {kind} record: {message}")]
    Decode { kind: String, message: String },

    #[error("Unsupported filter on field '{field}': {reason}")]
    InvalidFilter { field: String, reason: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Lock acquisition failed for {path}")]
    LockFailed { path: PathBuf },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Background I/O task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }

    pub fn decode(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Whether this is the expected "absent" outcome rather than a backend failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display_names_kind_and_id() {
        let err = Error::not_found("Repository", "charts");
        assert_eq!(err.to_string(), "Repository 'charts' not found");
        assert!(err.is_not_found());
    }

    #[test]
    fn other_errors_are_not_not_found() {
        let err = Error::InvalidKind {
            kind: "../etc".to_string(),
        };
        assert!(!err.is_not_found());
    }
}
