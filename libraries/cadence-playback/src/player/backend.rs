//! Underlying audio player abstraction
//!
//! Decoding and rendering belong to the host's audio pipeline. The delegate
//! drives two `AudioPlayer`s through this trait; every call must return
//! quickly and push real work onto the backend's own threads. Outcomes come
//! back asynchronously as [`BackendEvent`]s tagged with the slot and the load
//! they describe, so an event that was already queued when the slot got
//! reloaded can be told apart from one about the new media.

use cadence_core::{PlayerErrorKind, QueueEntry};
use std::time::Duration;
use tokio::sync::mpsc;

/// One underlying audio player instance
pub trait AudioPlayer: Send {
    /// Load `entry` and position it at `start_at`, without starting playback
    ///
    /// Every event about this media must be reported through a sink stamped
    /// with `load_id` (see [`EventSink::for_load`]).
    fn load(&mut self, entry: &QueueEntry, start_at: Duration, load_id: u64);

    /// Start (true) or pause (false) once media is ready
    fn set_play_when_ready(&mut self, play: bool);

    fn seek(&mut self, position: Duration);

    /// Current playback position
    fn position(&self) -> Duration;

    /// Media duration, `None` for live or unknown-length streams
    fn duration(&self) -> Option<Duration>;

    /// Output gain, 0.0 to 1.0
    fn set_volume(&mut self, volume: f32);

    /// Free every resource; the instance is not used afterwards
    fn release(&mut self);
}

/// What a backend reports about its current media
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEventKind {
    /// Media is buffered and can start without delay
    Ready,
    /// Playback reached the end of the media
    Ended,
    /// Decode or render failure
    Error(PlayerErrorKind, String),
}

/// Backend event tagged with the slot and load it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendEvent {
    pub slot: usize,
    /// Id passed to the `AudioPlayer::load` call this event is about
    pub load: u64,
    pub kind: BackendEventKind,
}

/// Handed to each backend so it can report events for its slot
#[derive(Debug, Clone)]
pub struct EventSink {
    slot: usize,
    load: u64,
    tx: mpsc::UnboundedSender<BackendEvent>,
}

impl EventSink {
    /// Sinks for slot 0 and slot 1 sharing one channel
    pub fn pair(tx: &mpsc::UnboundedSender<BackendEvent>) -> [EventSink; 2] {
        [
            EventSink {
                slot: 0,
                load: 0,
                tx: tx.clone(),
            },
            EventSink {
                slot: 1,
                load: 0,
                tx: tx.clone(),
            },
        ]
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Copy of this sink whose events describe the load `load_id`
    pub fn for_load(&self, load_id: u64) -> EventSink {
        EventSink {
            slot: self.slot,
            load: load_id,
            tx: self.tx.clone(),
        }
    }

    pub fn load_id(&self) -> u64 {
        self.load
    }

    pub fn ready(&self) {
        self.send(BackendEventKind::Ready);
    }

    pub fn ended(&self) {
        self.send(BackendEventKind::Ended);
    }

    pub fn error(&self, kind: PlayerErrorKind, message: impl Into<String>) {
        self.send(BackendEventKind::Error(kind, message.into()));
    }

    fn send(&self, kind: BackendEventKind) {
        // The receiver is gone only after the session stopped
        let _ = self.tx.send(BackendEvent {
            slot: self.slot,
            load: self.load,
            kind,
        });
    }
}
