//! Playback Events
//!
//! Published on a broadcast bus for UI observers. The session also bridges
//! metadata and state events into the notification coalescer.

use cadence_core::{
    MetadataEntity, PlaybackSession, RepeatMode, ShuffleMode, SkipActions,
};
use serde::{Deserialize, Serialize};

/// Events emitted by the playback controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlaybackEvent {
    /// Current entry changed (`None` once the queue is empty)
    MetadataChanged {
        metadata: Option<MetadataEntity>,
    },

    /// Status, bookmark or error of the session changed
    StateChanged {
        session: PlaybackSession,
    },

    /// Skip controls must be re-enabled or disabled
    SkipActionsChanged {
        actions: SkipActions,
    },

    /// Queue structure changed
    QueueChanged {
        len: usize,
        /// Index of the current entry
        current: Option<usize>,
    },

    RepeatModeChanged {
        mode: RepeatMode,
    },

    ShuffleModeChanged {
        mode: ShuffleMode,
    },

    /// Non-fatal error worth surfacing to the user
    Error {
        message: String,
    },
}

impl PlaybackEvent {
    /// Get event type as string (for logging)
    pub fn event_type(&self) -> &'static str {
        match self {
            PlaybackEvent::MetadataChanged { .. } => "metadata_changed",
            PlaybackEvent::StateChanged { .. } => "state_changed",
            PlaybackEvent::SkipActionsChanged { .. } => "skip_actions_changed",
            PlaybackEvent::QueueChanged { .. } => "queue_changed",
            PlaybackEvent::RepeatModeChanged { .. } => "repeat_mode_changed",
            PlaybackEvent::ShuffleModeChanged { .. } => "shuffle_mode_changed",
            PlaybackEvent::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = PlaybackEvent::RepeatModeChanged {
            mode: RepeatMode::All,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("RepeatModeChanged"));
        assert!(json.contains("all"));
        assert_eq!(event.event_type(), "repeat_mode_changed");
    }
}
