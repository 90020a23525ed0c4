/// Notification snapshot types
use super::{PlaybackStatus, QueueEntry, TrackId};
use serde::{Deserialize, Serialize};

/// Display metadata of the current entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEntity {
    pub id: TrackId,
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub duration_ms: u64,
    pub is_podcast: bool,
}

impl From<&QueueEntry> for MetadataEntity {
    fn from(entry: &QueueEntry) -> Self {
        Self {
            id: entry.id.clone(),
            title: entry.title.clone(),
            artist: entry.artist.clone(),
            album: entry.album.clone(),
            duration_ms: entry.duration_ms,
            is_podcast: entry.is_podcast,
        }
    }
}

/// Value snapshot rendered into the platform notification
///
/// Two states that compare equal render identically, so an unchanged state
/// never needs to be published again.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NotificationState {
    pub metadata: Option<MetadataEntity>,
    pub status: PlaybackStatus,
    pub is_favorite: bool,
}

impl NotificationState {
    /// Whether `metadata` differs from the snapshot's metadata
    #[must_use]
    pub fn is_different_metadata(&self, metadata: &MetadataEntity) -> bool {
        self.metadata.as_ref() != Some(metadata)
    }

    /// Whether `status` differs from the snapshot's playback status
    #[must_use]
    pub fn is_different_status(&self, status: PlaybackStatus) -> bool {
        self.status != status
    }

    /// Whether `is_favorite` differs from the snapshot's favorite flag
    #[must_use]
    pub fn is_different_favorite(&self, is_favorite: bool) -> bool {
        self.is_favorite != is_favorite
    }
}

/// Opaque handle to a rendered platform notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NotificationHandle(pub u64);

/// Favorite flag change published by the favorite gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteChange {
    pub track_id: TrackId,
    pub is_favorite: bool,
}
