//! Core error types for Cadence
use crate::types::PlayerErrorKind;
use thiserror::Error;

/// Result type alias using `CadenceError`
pub type Result<T> = std::result::Result<T, CadenceError>;

/// Core error type shared by the engine and its collaborators
#[derive(Error, Debug)]
pub enum CadenceError {
    /// A selector, search or URI resolved to zero entries
    #[error("Selection resolved to no playable entries")]
    ResolutionEmpty,

    /// Queue index out of bounds (caller error)
    #[error("Invalid queue position {position} (queue length {len})")]
    InvalidPosition { position: usize, len: usize },

    /// Non-fatal failure reported by an underlying audio player
    #[error("Playback error ({0}): {1}")]
    Playback(PlayerErrorKind, String),

    /// Unrecognized external command or custom action
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// A custom action arrived without a required extra
    #[error("Custom action {action} is missing extra '{key}'")]
    MissingExtra { action: String, key: String },

    /// Selector text could not be parsed
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Entity not found
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl CadenceError {
    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a not found error
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Create a missing extra error
    pub fn missing_extra(action: impl Into<String>, key: impl Into<String>) -> Self {
        Self::MissingExtra {
            action: action.into(),
            key: key.into(),
        }
    }

    /// Whether the error comes from malformed external input that must be
    /// ignored rather than surfaced
    pub fn is_ignorable_command(&self) -> bool {
        matches!(
            self,
            Self::UnknownCommand(_) | Self::MissingExtra { .. } | Self::InvalidSelector(_)
        )
    }
}

#[cfg(feature = "sqlx-support")]
impl From<sqlx::Error> for CadenceError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(err.to_string())
    }
}
