//! Wall-clock audio backend
//!
//! The terminal front end has no decoder, so this player only keeps time: the
//! position advances while playing and `Ended` is reported once the entry's
//! duration has elapsed. Entries without a known duration never end.

use cadence_core::QueueEntry;
use cadence_playback::{AudioPlayer, EventSink};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{trace, warn};

pub struct ClockPlayer {
    sink: EventSink,
    duration: Option<Duration>,
    loaded: bool,
    /// Position when the clock was last (re)started or stopped
    base: Duration,
    /// Set while playing
    started: Option<Instant>,
    volume: f32,
    end_timer: Option<JoinHandle<()>>,
}

impl ClockPlayer {
    pub fn new(sink: EventSink) -> Self {
        Self {
            sink,
            duration: None,
            loaded: false,
            base: Duration::ZERO,
            started: None,
            volume: 1.0,
            end_timer: None,
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    fn clamp(&self, position: Duration) -> Duration {
        match self.duration {
            Some(duration) => position.min(duration),
            None => position,
        }
    }

    fn start_clock(&mut self) {
        self.started = Some(Instant::now());
        self.arm_end_timer();
    }

    fn stop_clock(&mut self) {
        self.base = self.position();
        self.started = None;
        self.disarm_end_timer();
    }

    fn arm_end_timer(&mut self) {
        self.disarm_end_timer();
        let Some(duration) = self.duration else {
            return;
        };
        let Ok(runtime) = Handle::try_current() else {
            warn!(slot = self.sink.slot(), "No runtime, end of media will not be reported");
            return;
        };

        let remaining = duration.saturating_sub(self.base);
        let sink = self.sink.clone();
        self.end_timer = Some(runtime.spawn(async move {
            tokio::time::sleep(remaining).await;
            sink.ended();
        }));
    }

    fn disarm_end_timer(&mut self) {
        if let Some(timer) = self.end_timer.take() {
            timer.abort();
        }
    }
}

impl AudioPlayer for ClockPlayer {
    fn load(&mut self, entry: &QueueEntry, start_at: Duration, load_id: u64) {
        self.disarm_end_timer();
        self.sink = self.sink.for_load(load_id);
        self.duration = entry.duration();
        self.loaded = true;
        self.started = None;
        self.base = self.clamp(start_at);
        trace!(slot = self.sink.slot(), id = %entry.id, "Loaded");
        self.sink.ready();
    }

    fn set_play_when_ready(&mut self, play: bool) {
        match (play, self.started.is_some()) {
            (true, false) if self.loaded => self.start_clock(),
            (false, true) => self.stop_clock(),
            _ => {}
        }
    }

    fn seek(&mut self, position: Duration) {
        self.base = self.clamp(position);
        if self.started.is_some() {
            self.start_clock();
        }
    }

    fn position(&self) -> Duration {
        let elapsed = self
            .started
            .map(|started| started.elapsed())
            .unwrap_or_default();
        self.clamp(self.base + elapsed)
    }

    fn duration(&self) -> Option<Duration> {
        self.duration
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn release(&mut self) {
        self.disarm_end_timer();
        self.loaded = false;
        self.started = None;
        self.base = Duration::ZERO;
        self.duration = None;
    }
}

impl Drop for ClockPlayer {
    fn drop(&mut self) {
        self.disarm_end_timer();
    }
}
