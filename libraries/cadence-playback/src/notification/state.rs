//! Change filtering for the notification snapshot

use crate::config::NotificationConfig;
use cadence_core::{MetadataEntity, NotificationState, PlaybackStatus, TrackId};
use std::time::Duration;

/// One incoming change to the notification snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationUpdate {
    /// Current entry changed; `None` once nothing is loaded
    Metadata(Option<MetadataEntity>),
    State(PlaybackStatus),
    Favorite(bool),
}

impl NotificationUpdate {
    /// Publish delay for this kind of change
    pub fn delay(&self, config: &NotificationConfig) -> Duration {
        match self {
            Self::Metadata(_) => config.metadata_delay(),
            Self::State(_) => config.state_delay(),
            Self::Favorite(_) => config.favorite_delay(),
        }
    }
}

/// The single mutable snapshot kept by the coalescer
#[derive(Debug, Default)]
pub struct Snapshot {
    state: NotificationState,
}

impl Snapshot {
    pub fn state(&self) -> &NotificationState {
        &self.state
    }

    /// Id of the entry the snapshot describes
    pub fn current_id(&self) -> Option<&TrackId> {
        self.state.metadata.as_ref().map(|m| &m.id)
    }

    /// Apply `update` if it changes the snapshot
    ///
    /// Only the sub-field the update targets is compared. Returns `false`
    /// for a no-op update, which must not schedule a publish.
    pub fn apply(&mut self, update: NotificationUpdate) -> bool {
        match update {
            NotificationUpdate::Metadata(metadata) => {
                if self.state.metadata == metadata {
                    return false;
                }
                self.state.metadata = metadata;
            }
            NotificationUpdate::State(status) => {
                if !self.state.is_different_status(status) {
                    return false;
                }
                self.state.status = status;
            }
            NotificationUpdate::Favorite(is_favorite) => {
                if !self.state.is_different_favorite(is_favorite) {
                    return false;
                }
                self.state.is_favorite = is_favorite;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(id: &str) -> MetadataEntity {
        MetadataEntity {
            id: TrackId::new(id),
            title: id.to_uppercase(),
            artist: None,
            album: None,
            duration_ms: 1_000,
            is_podcast: false,
        }
    }

    #[test]
    fn duplicate_updates_are_filtered() {
        let mut snapshot = Snapshot::default();
        assert!(snapshot.apply(NotificationUpdate::Metadata(Some(metadata("a")))));
        assert!(!snapshot.apply(NotificationUpdate::Metadata(Some(metadata("a")))));
        assert!(snapshot.apply(NotificationUpdate::State(PlaybackStatus::Playing)));
        assert!(!snapshot.apply(NotificationUpdate::State(PlaybackStatus::Playing)));
        assert!(!snapshot.apply(NotificationUpdate::Favorite(false)));
        assert!(snapshot.apply(NotificationUpdate::Favorite(true)));

        assert_eq!(snapshot.current_id().unwrap().as_str(), "a");
        assert!(snapshot.state().is_favorite);
    }

    #[test]
    fn delays_follow_kind() {
        let config = NotificationConfig::default();
        assert_eq!(
            NotificationUpdate::Metadata(None).delay(&config),
            Duration::from_millis(350)
        );
        assert_eq!(
            NotificationUpdate::State(PlaybackStatus::Paused).delay(&config),
            Duration::from_millis(100)
        );
    }
}
