/// Playback mode and status types
use serde::{Deserialize, Serialize};
use std::fmt;

/// Repeat mode for playback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    #[default]
    Off,
    All,
    One,
}

impl RepeatMode {
    /// Convert to string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::All => "all",
            Self::One => "one",
        }
    }

    /// Parse from string
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "off" => Some(Self::Off),
            "all" => Some(Self::All),
            "one" => Some(Self::One),
            _ => None,
        }
    }
}

impl fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shuffle mode for playback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShuffleMode {
    #[default]
    Off,
    On,
}

impl ShuffleMode {
    /// Convert to string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::On => "on",
        }
    }

    /// Parse from string
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "off" => Some(Self::Off),
            "on" => Some(Self::On),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_on(&self) -> bool {
        matches!(self, Self::On)
    }
}

impl fmt::Display for ShuffleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Repeat and shuffle modes, persisted together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlaybackModes {
    pub repeat: RepeatMode,
    pub shuffle: ShuffleMode,
}

/// Externally visible playback status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackStatus {
    #[default]
    Idle,
    Preparing,
    Playing,
    Paused,
    SkippingNext,
    SkippingPrevious,
    Stopped,
    Error,
}

impl PlaybackStatus {
    /// Whether audio is (about to be) audible
    #[must_use]
    pub fn is_playing(&self) -> bool {
        matches!(self, Self::Playing)
    }

    /// Convert to string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Preparing => "preparing",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::SkippingNext => "skipping_next",
            Self::SkippingPrevious => "skipping_previous",
            Self::Stopped => "stopped",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the current entry changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipType {
    /// Not a skip: explicit play of a new selection or queue item
    None,
    SkipNext,
    SkipPrevious,
    /// Same entry again from position 0
    Restart,
    /// Natural end of the previous entry
    TrackEnded,
}

impl SkipType {
    /// Status reported while the skip is in flight
    #[must_use]
    pub fn transient_status(&self) -> Option<PlaybackStatus> {
        match self {
            Self::SkipNext | Self::TrackEnded => Some(PlaybackStatus::SkippingNext),
            Self::SkipPrevious => Some(PlaybackStatus::SkippingPrevious),
            Self::None | Self::Restart => None,
        }
    }
}

/// Classification of the current index, used for skip affordances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionInQueue {
    First,
    InMiddle,
    Last,
    /// Single-entry (or empty) queue
    FirstAndLast,
}

impl PositionInQueue {
    /// Classify an index purely by its place in a list of `len` entries
    #[must_use]
    pub fn classify(index: usize, len: usize) -> Self {
        if len <= 1 {
            Self::FirstAndLast
        } else if index == 0 {
            Self::First
        } else if index + 1 >= len {
            Self::Last
        } else {
            Self::InMiddle
        }
    }
}

/// UI-facing flags enabling the skip controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SkipActions {
    pub can_skip_next: bool,
    pub can_skip_previous: bool,
}

impl From<PositionInQueue> for SkipActions {
    fn from(position: PositionInQueue) -> Self {
        match position {
            PositionInQueue::First => Self {
                can_skip_next: true,
                can_skip_previous: false,
            },
            PositionInQueue::InMiddle => Self {
                can_skip_next: true,
                can_skip_previous: true,
            },
            PositionInQueue::Last => Self {
                can_skip_next: false,
                can_skip_previous: true,
            },
            PositionInQueue::FirstAndLast => Self::default(),
        }
    }
}

/// Classification of an underlying player failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerErrorKind {
    /// The media could not be read or decoded
    Source,
    /// The output pipeline failed
    Renderer,
    Unexpected,
}

impl fmt::Display for PlayerErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Source => "source",
            Self::Renderer => "renderer",
            Self::Unexpected => "unexpected",
        })
    }
}

/// Snapshot of the controller's playback session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSession {
    pub status: PlaybackStatus,
    /// Last known position of the current entry in milliseconds
    pub bookmark_ms: u64,
    pub speed: f32,
    pub last_error: Option<String>,
}

impl Default for PlaybackSession {
    fn default() -> Self {
        Self {
            status: PlaybackStatus::Idle,
            bookmark_ms: 0,
            speed: 1.0,
            last_error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_positions() {
        assert_eq!(PositionInQueue::classify(0, 0), PositionInQueue::FirstAndLast);
        assert_eq!(PositionInQueue::classify(0, 1), PositionInQueue::FirstAndLast);
        assert_eq!(PositionInQueue::classify(0, 3), PositionInQueue::First);
        assert_eq!(PositionInQueue::classify(1, 3), PositionInQueue::InMiddle);
        assert_eq!(PositionInQueue::classify(2, 3), PositionInQueue::Last);
    }

    #[test]
    fn skip_actions_follow_position() {
        let first = SkipActions::from(PositionInQueue::First);
        assert!(first.can_skip_next && !first.can_skip_previous);

        let last = SkipActions::from(PositionInQueue::Last);
        assert!(!last.can_skip_next && last.can_skip_previous);

        assert_eq!(
            SkipActions::from(PositionInQueue::FirstAndLast),
            SkipActions::default()
        );
    }

    #[test]
    fn modes_round_trip_through_strings() {
        for mode in [RepeatMode::Off, RepeatMode::All, RepeatMode::One] {
            assert_eq!(RepeatMode::parse(mode.as_str()), Some(mode));
        }
        assert_eq!(ShuffleMode::parse("on"), Some(ShuffleMode::On));
        assert_eq!(ShuffleMode::parse("sideways"), None);
    }
}
