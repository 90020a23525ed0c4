//! Playback configuration
//!
//! Every UX threshold the engine applies lives here so hosts can tune them.
//! Durations are stored in milliseconds to keep config files readable.

use crate::player::CrossfadeSettings;
use crate::shuffle::ShuffleStrategy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default restart threshold for skip-to-previous
pub const DEFAULT_SKIP_TO_PREVIOUS_THRESHOLD_MS: u64 = 10_000;

/// Default headset click window
pub const DEFAULT_MEDIA_BUTTON_DEBOUNCE_MS: u64 = 300;

/// Playback engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Skip-to-previous restarts the current entry past this bookmark
    pub skip_to_previous_threshold_ms: u64,

    /// A bookmark this close to the end is saved as 0
    pub podcast_restart_margin_ms: u64,

    /// Crossfade/gapless transition settings
    pub crossfade: CrossfadeSettings,

    /// How long before the end the next entry is pre-buffered
    pub preload_window_ms: u64,

    /// Headset button multiplexing
    pub media_button: MediaButtonConfig,

    /// Notification debounce settings
    pub notification: NotificationConfig,

    /// Algorithm used when shuffle is turned on
    pub shuffle_strategy: ShuffleStrategy,

    /// Max volume while another app holds transient "duck" focus
    pub duck_volume: f32,

    /// Step for forward/replay 10
    pub seek_step_short_ms: u64,

    /// Step for forward/replay 30
    pub seek_step_long_ms: u64,

    /// Interval of the delegate's progress tick
    pub progress_interval_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            skip_to_previous_threshold_ms: DEFAULT_SKIP_TO_PREVIOUS_THRESHOLD_MS,
            podcast_restart_margin_ms: 5_000,
            crossfade: CrossfadeSettings::default(),
            preload_window_ms: 5_000,
            media_button: MediaButtonConfig::default(),
            notification: NotificationConfig::default(),
            shuffle_strategy: ShuffleStrategy::default(),
            duck_volume: 0.2,
            seek_step_short_ms: 10_000,
            seek_step_long_ms: 30_000,
            progress_interval_ms: 250,
        }
    }
}

impl PlaybackConfig {
    pub fn skip_to_previous_threshold(&self) -> Duration {
        Duration::from_millis(self.skip_to_previous_threshold_ms)
    }

    pub fn podcast_restart_margin(&self) -> Duration {
        Duration::from_millis(self.podcast_restart_margin_ms)
    }

    pub fn preload_window(&self) -> Duration {
        Duration::from_millis(self.preload_window_ms)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms.max(1))
    }
}

/// Headset button multiplexing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaButtonConfig {
    /// Quiet period after the last click before the click count is dispatched
    pub debounce_ms: u64,
    /// Clicks past this count within one window are discarded
    pub max_clicks: u8,
}

impl Default for MediaButtonConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_MEDIA_BUTTON_DEBOUNCE_MS,
            max_clicks: 3,
        }
    }
}

impl MediaButtonConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Per-event-kind publish delays of the notification coalescer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub metadata_delay_ms: u64,
    pub state_delay_ms: u64,
    pub favorite_delay_ms: u64,
    /// Publish the first notification after becoming audible without delay
    pub promote_immediately: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            metadata_delay_ms: 350,
            state_delay_ms: 100,
            favorite_delay_ms: 100,
            promote_immediately: true,
        }
    }
}

impl NotificationConfig {
    pub fn metadata_delay(&self) -> Duration {
        Duration::from_millis(self.metadata_delay_ms)
    }

    pub fn state_delay(&self) -> Duration {
        Duration::from_millis(self.state_delay_ms)
    }

    pub fn favorite_delay(&self) -> Duration {
        Duration::from_millis(self.favorite_delay_ms)
    }
}
