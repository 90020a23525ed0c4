/// Library selectors used to resolve a collection into queue entries
use super::TrackId;
use crate::error::CadenceError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Library collection kinds a selector can address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaCategory {
    Folders,
    Playlists,
    Songs,
    Albums,
    Artists,
    Genres,
    Podcasts,
    PodcastPlaylists,
    PodcastAlbums,
    PodcastArtists,
}

impl MediaCategory {
    /// Convert to string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Folders => "folders",
            Self::Playlists => "playlists",
            Self::Songs => "songs",
            Self::Albums => "albums",
            Self::Artists => "artists",
            Self::Genres => "genres",
            Self::Podcasts => "podcasts",
            Self::PodcastPlaylists => "podcast_playlists",
            Self::PodcastAlbums => "podcast_albums",
            Self::PodcastArtists => "podcast_artists",
        }
    }

    /// Parse from string
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "folders" => Some(Self::Folders),
            "playlists" => Some(Self::Playlists),
            "songs" => Some(Self::Songs),
            "albums" => Some(Self::Albums),
            "artists" => Some(Self::Artists),
            "genres" => Some(Self::Genres),
            "podcasts" => Some(Self::Podcasts),
            "podcast_playlists" => Some(Self::PodcastPlaylists),
            "podcast_albums" => Some(Self::PodcastAlbums),
            "podcast_artists" => Some(Self::PodcastArtists),
            _ => None,
        }
    }

    /// Whether entries resolved from this category are podcast episodes
    #[must_use]
    pub fn is_podcast(&self) -> bool {
        matches!(
            self,
            Self::Podcasts | Self::PodcastPlaylists | Self::PodcastAlbums | Self::PodcastArtists
        )
    }
}

impl fmt::Display for MediaCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Addresses a library collection and optionally a track to start from
///
/// Text form is `category/value[/track]`, e.g. `albums/42/1337`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selector {
    /// Collection kind
    pub category: MediaCategory,
    /// Collection identifier within the category
    pub value: String,
    /// Track to start playback from
    pub track: Option<TrackId>,
}

impl Selector {
    /// Selector for a whole collection
    pub fn new(category: MediaCategory, value: impl Into<String>) -> Self {
        Self {
            category,
            value: value.into(),
            track: None,
        }
    }

    /// Start playback from a specific track of the collection
    #[must_use]
    pub fn with_track(mut self, track: TrackId) -> Self {
        self.track = Some(track);
        self
    }

    /// The same collection without a start track
    #[must_use]
    pub fn collection(&self) -> Self {
        Self::new(self.category, self.value.clone())
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category, self.value)?;
        if let Some(track) = &self.track {
            write!(f, "/{track}")?;
        }
        Ok(())
    }
}

impl FromStr for Selector {
    type Err = CadenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().splitn(3, '/');
        let category = parts
            .next()
            .and_then(MediaCategory::parse)
            .ok_or_else(|| CadenceError::InvalidSelector(s.to_string()))?;
        let value = parts
            .next()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| CadenceError::InvalidSelector(s.to_string()))?;
        let track = parts.next().filter(|t| !t.is_empty()).map(TrackId::new);

        Ok(Self {
            category,
            value: value.to_string(),
            track,
        })
    }
}

/// Which field of a voice/text search the query targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchFocus {
    /// Free text, matched against everything
    #[default]
    Unstructured,
    /// "Play something", anything goes
    Any,
    Artist,
    Album,
    Track,
    Genre,
}

/// Structured hints accompanying a search query
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SearchHints {
    pub focus: SearchFocus,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub title: Option<String>,
    pub genre: Option<String>,
}
