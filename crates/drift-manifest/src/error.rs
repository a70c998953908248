//! Error types for drift-manifest

/// Result type for drift-manifest operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading or editing manifests
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to parse {format} content: {message}")]
    ParseError { format: String, message: String },

    #[error("No {what} reference matching '{target}'")]
    ReferenceNotFound { what: String, target: String },

    #[error("Reference to '{target}' has no editable {field} value")]
    NotEditable { target: String, field: String },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    pub fn parse(format: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ParseError {
            format: format.into(),
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>, target: impl Into<String>) -> Self {
        Self::ReferenceNotFound {
            what: what.into(),
            target: target.into(),
        }
    }
}
