/// Track and queue entry types
use super::TrackId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A playable item as returned by the data retriever
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Track identifier
    pub id: TrackId,
    /// Display title
    pub title: String,
    /// Artist name, if known
    pub artist: Option<String>,
    /// Album title, if known
    pub album: Option<String>,
    /// Duration in milliseconds (0 when unknown)
    pub duration_ms: u64,
    /// Whether the track is a podcast episode (resumes from its bookmark)
    pub is_podcast: bool,
}

impl Track {
    /// Create a song with only the required fields set
    pub fn new(id: TrackId, title: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            id,
            title: title.into(),
            artist: None,
            album: None,
            duration_ms,
            is_podcast: false,
        }
    }

    /// Set the artist
    #[must_use]
    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    /// Set the album
    #[must_use]
    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    /// Mark the track as a podcast episode
    #[must_use]
    pub fn podcast(mut self) -> Self {
        self.is_podcast = true;
        self
    }
}

/// One entry of the playing queue
///
/// Entries are immutable once created. Reordering the queue moves entries
/// around wholesale but never edits them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Track identifier
    pub id: TrackId,
    /// Identifier of the collection the entry was resolved from
    pub source_id: String,
    /// Insertion ordinal, unique within a queue
    pub position: u32,
    /// Whether the entry is a podcast episode
    pub is_podcast: bool,
    /// Duration in milliseconds (0 when unknown)
    pub duration_ms: u64,
    /// Display title
    pub title: String,
    /// Artist name
    pub artist: Option<String>,
    /// Album title
    pub album: Option<String>,
}

impl QueueEntry {
    /// Build an entry from a resolved track
    pub fn from_track(track: Track, source_id: impl Into<String>, position: u32) -> Self {
        Self {
            id: track.id,
            source_id: source_id.into(),
            position,
            is_podcast: track.is_podcast,
            duration_ms: track.duration_ms,
            title: track.title,
            artist: track.artist,
            album: track.album,
        }
    }

    /// Duration as a `Duration`, `None` when unknown
    pub fn duration(&self) -> Option<Duration> {
        (self.duration_ms > 0).then(|| Duration::from_millis(self.duration_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_track_copies_metadata() {
        let track = Track::new(TrackId::new("t1"), "Intro", 90_000)
            .with_artist("Band")
            .with_album("Debut")
            .podcast();

        let entry = QueueEntry::from_track(track, "albums/3", 4);

        assert_eq!(entry.id.as_str(), "t1");
        assert_eq!(entry.source_id, "albums/3");
        assert_eq!(entry.position, 4);
        assert!(entry.is_podcast);
        assert_eq!(entry.artist.as_deref(), Some("Band"));
        assert_eq!(entry.duration(), Some(Duration::from_secs(90)));
    }

    #[test]
    fn zero_duration_is_unknown() {
        let entry = QueueEntry::from_track(Track::new(TrackId::new("live"), "Stream", 0), "", 0);
        assert_eq!(entry.duration(), None);
    }
}
