//! Error types for the playback engine

use cadence_core::CadenceError;
use thiserror::Error;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Errors shared with collaborators (resolution, positions, storage)
    #[error(transparent)]
    Core(#[from] CadenceError),

    /// The session's command loop is no longer running
    #[error("Playback session is closed")]
    SessionClosed,
}

impl PlaybackError {
    /// Shorthand for an out-of-bounds queue index
    pub fn invalid_position(position: usize, len: usize) -> Self {
        Self::Core(CadenceError::InvalidPosition { position, len })
    }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
