//! External command vocabulary: media buttons, audio focus and the named
//! custom actions that arrive with a JSON object of extras

use cadence_core::{CadenceError, Result, Selector, TrackId};
use serde_json::Value;

/// Hardware and headset media buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaButton {
    PlayPause,
    Play,
    Pause,
    Stop,
    Next,
    Previous,
    /// Treated as the current entry ending
    FastForward,
    /// Single headset button, multiplexed by click count
    HeadsetHook,
}

impl MediaButton {
    /// Parse from string
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "play_pause" => Some(Self::PlayPause),
            "play" => Some(Self::Play),
            "pause" => Some(Self::Pause),
            "stop" => Some(Self::Stop),
            "next" => Some(Self::Next),
            "previous" => Some(Self::Previous),
            "fast_forward" => Some(Self::FastForward),
            "headset_hook" => Some(Self::HeadsetHook),
            _ => None,
        }
    }
}

/// Audio focus transitions reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusChange {
    Gain,
    Loss,
    /// Short interruption; playback resumes on the next `Gain`
    LossTransient,
    /// Another app wants to play over us at low volume
    Duck,
}

/// Custom actions understood by the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomAction {
    Shuffle {
        selector: Selector,
        filter: Option<String>,
    },
    Swap {
        from: usize,
        to: usize,
    },
    SwapRelative {
        from: usize,
        to: usize,
    },
    Remove(usize),
    RemoveRelative(usize),
    /// Move the entry at a relative offset to play next
    MoveRelative(usize),
    PlayRecentlyAdded(Selector),
    PlayMostPlayed(Selector),
    Forward10,
    Forward30,
    Replay10,
    Replay30,
    ToggleFavorite,
    AddToPlayLater(Vec<TrackId>),
    AddToPlayNext(Vec<TrackId>),
}

const ARG_MEDIA_ID: &str = "media_id";
const ARG_FILTER: &str = "filter";
const ARG_FROM: &str = "from";
const ARG_TO: &str = "to";
const ARG_POSITION: &str = "position";
const ARG_MEDIA_ID_LIST: &str = "media_id_list";

impl CustomAction {
    /// Parse a named action and its extras
    ///
    /// Unknown names yield `UnknownCommand`, absent or mistyped extras yield
    /// `MissingExtra`; callers log and drop both.
    pub fn parse(name: &str, extras: &Value) -> Result<Self> {
        let action = match name {
            "SHUFFLE" => Self::Shuffle {
                selector: selector(name, extras)?,
                filter: extras
                    .get(ARG_FILTER)
                    .and_then(Value::as_str)
                    .map(str::to_string),
            },
            "SWAP" => Self::Swap {
                from: index(name, extras, ARG_FROM)?,
                to: index(name, extras, ARG_TO)?,
            },
            "SWAP_RELATIVE" => Self::SwapRelative {
                from: index(name, extras, ARG_FROM)?,
                to: index(name, extras, ARG_TO)?,
            },
            "REMOVE" => Self::Remove(index(name, extras, ARG_POSITION)?),
            "REMOVE_RELATIVE" => Self::RemoveRelative(index(name, extras, ARG_POSITION)?),
            "MOVE_RELATIVE" => Self::MoveRelative(index(name, extras, ARG_POSITION)?),
            "PLAY_RECENTLY_ADDED" => Self::PlayRecentlyAdded(selector(name, extras)?),
            "PLAY_MOST_PLAYED" => Self::PlayMostPlayed(selector(name, extras)?),
            "FORWARD_10" => Self::Forward10,
            "FORWARD_30" => Self::Forward30,
            "REPLAY_10" => Self::Replay10,
            "REPLAY_30" => Self::Replay30,
            "TOGGLE_FAVORITE" => Self::ToggleFavorite,
            "ADD_TO_PLAY_LATER" => Self::AddToPlayLater(id_list(name, extras)?),
            "ADD_TO_PLAY_NEXT" => Self::AddToPlayNext(id_list(name, extras)?),
            other => return Err(CadenceError::UnknownCommand(other.to_string())),
        };
        Ok(action)
    }

    /// Whether handling the action may change the current entry or queue
    pub fn is_queue_mutation(&self) -> bool {
        !matches!(
            self,
            Self::Forward10 | Self::Forward30 | Self::Replay10 | Self::Replay30 | Self::ToggleFavorite
        )
    }
}

fn selector(action: &str, extras: &Value) -> Result<Selector> {
    extras
        .get(ARG_MEDIA_ID)
        .and_then(Value::as_str)
        .ok_or_else(|| CadenceError::missing_extra(action, ARG_MEDIA_ID))?
        .parse()
}

fn index(action: &str, extras: &Value, key: &str) -> Result<usize> {
    extras
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|v| usize::try_from(v).ok())
        .ok_or_else(|| CadenceError::missing_extra(action, key))
}

fn id_list(action: &str, extras: &Value) -> Result<Vec<TrackId>> {
    let list = extras
        .get(ARG_MEDIA_ID_LIST)
        .and_then(Value::as_array)
        .ok_or_else(|| CadenceError::missing_extra(action, ARG_MEDIA_ID_LIST))?;

    list.iter()
        .map(|v| match v {
            Value::String(s) => Some(TrackId::new(s.as_str())),
            Value::Number(n) => Some(TrackId::new(n.to_string())),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| CadenceError::missing_extra(action, ARG_MEDIA_ID_LIST))
}
