//! Dual-player delegate
//!
//! Holds two `AudioPlayer` instances in an indexed pair and an active index.
//! The standby slot pre-buffers the next entry so a track-ended transition is
//! a role swap instead of a fresh load. With crossfade enabled the outgoing
//! slot keeps playing while the volumes follow the fade curve.
//!
//! Every load gets a fresh id. Backend events carry the id of the load they
//! describe and are dropped once their slot has been reloaded.
//!
//! Slot lifecycle:
//!
//! ```text
//! Unprepared -> Prepared -> Playing <-> Paused
//!      any state ---------------------------> Released (terminal)
//! ```

use super::backend::{AudioPlayer, BackendEvent, BackendEventKind};
use super::crossfade::{CrossfadeSettings, Fade};
use cadence_core::{PlayerErrorKind, QueueEntry};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

/// Lifecycle state of one player slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Unprepared,
    Prepared,
    Playing,
    Paused,
    Released,
}

/// Event surfaced to the controller, always about the active slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    /// Active media buffered
    Ready,
    /// Active entry played to its end
    Ended,
    /// Active entry failed; it should be treated as unplayable
    Error(PlayerErrorKind, String),
}

/// How `DualPlayer::play` started the entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayStart {
    /// Loaded directly on the active slot
    Loaded,
    /// Swapped to the pre-buffered standby slot
    Swapped,
    /// Swapped and fading from the previous slot
    Crossfading,
}

struct Slot {
    player: Box<dyn AudioPlayer>,
    state: SlotState,
    entry: Option<QueueEntry>,
    /// Id of the media currently loaded, 0 before the first load
    load_id: u64,
}

impl Slot {
    fn load(&mut self, entry: &QueueEntry, start_at: Duration, load_id: u64) {
        self.load_id = load_id;
        self.player.load(entry, start_at, load_id);
        self.player.set_play_when_ready(false);
        self.entry = Some(entry.clone());
        self.state = SlotState::Prepared;
    }

    fn holds(&self, entry: &QueueEntry) -> bool {
        self.state == SlotState::Prepared
            && self
                .entry
                .as_ref()
                .is_some_and(|e| e.id == entry.id && e.position == entry.position)
    }

    fn start(&mut self) {
        self.player.set_play_when_ready(true);
        self.state = SlotState::Playing;
    }

    fn halt(&mut self) {
        if matches!(self.state, SlotState::Playing | SlotState::Paused) {
            self.player.set_play_when_ready(false);
        }
        if self.state != SlotState::Released {
            self.state = SlotState::Unprepared;
        }
        self.entry = None;
    }
}

/// Two player instances behind one playback surface
pub struct DualPlayer {
    slots: [Slot; 2],
    active: usize,
    crossfade: CrossfadeSettings,
    fade: Option<Fade>,
    /// Ceiling applied on top of fade gains (ducking)
    max_volume: f32,
    last_load_id: u64,
}

impl DualPlayer {
    /// Wrap two backends; slot indices match the order given
    pub fn new(players: [Box<dyn AudioPlayer>; 2], crossfade: CrossfadeSettings) -> Self {
        let [first, second] = players;
        let slot = |player: Box<dyn AudioPlayer>| Slot {
            player,
            state: SlotState::Unprepared,
            entry: None,
            load_id: 0,
        };
        Self {
            slots: [slot(first), slot(second)],
            active: 0,
            crossfade,
            fade: None,
            max_volume: 1.0,
            last_load_id: 0,
        }
    }

    fn standby(&self) -> usize {
        1 - self.active
    }

    fn load_slot(&mut self, slot: usize, entry: &QueueEntry, start_at: Duration) {
        self.last_load_id += 1;
        self.slots[slot].load(entry, start_at, self.last_load_id);
    }

    pub fn active_slot(&self) -> usize {
        self.active
    }

    pub fn slot_state(&self, slot: usize) -> SlotState {
        self.slots[slot].state
    }

    /// Entry loaded on the active slot
    pub fn active_entry(&self) -> Option<&QueueEntry> {
        self.slots[self.active].entry.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.slots[self.active].state == SlotState::Playing
    }

    pub fn is_fading(&self) -> bool {
        self.fade.is_some()
    }

    /// Whether `entry` is already pre-buffered in the standby slot
    pub fn is_prepared_next(&self, entry: &QueueEntry) -> bool {
        self.slots[self.standby()].holds(entry)
    }

    pub fn set_crossfade(&mut self, settings: CrossfadeSettings) {
        self.crossfade = settings;
    }

    /// Load `entry` into the standby slot without starting it
    ///
    /// Unless the active slot is playing (fresh start, restore, paused edit)
    /// the roles swap right away so `resume` starts the prepared entry.
    pub fn prepare(&mut self, entry: &QueueEntry, bookmark: Duration) {
        let standby = self.standby();
        if self.slots[standby].state == SlotState::Released {
            return;
        }
        self.load_slot(standby, entry, bookmark);
        debug!(slot = standby, entry = %entry.id, ?bookmark, "Prepared entry");

        if self.slots[self.active].state != SlotState::Playing && self.fade.is_none() {
            self.slots[self.active].halt();
            self.active = standby;
            self.apply_volumes();
        }
    }

    /// Drop whatever the standby slot pre-buffered
    pub fn discard_prepared(&mut self) {
        let standby = self.standby();
        if self.fade.is_none() {
            self.slots[standby].halt();
        }
    }

    /// Start `entry`
    ///
    /// Swaps to the standby slot if it already holds `entry`; otherwise loads
    /// it. Without focus the entry is loaded but left paused.
    pub fn play(
        &mut self,
        entry: &QueueEntry,
        start_at: Duration,
        has_focus: bool,
        is_track_ended: bool,
    ) -> PlayStart {
        self.finish_fade();

        let standby = self.standby();
        let outgoing_audible = self.slots[self.active].state == SlotState::Playing;
        let fade = has_focus && outgoing_audible && self.crossfade.applies_to(!is_track_ended);

        let start = if self.slots[standby].holds(entry) || fade {
            if !self.slots[standby].holds(entry) {
                self.load_slot(standby, entry, start_at);
            }
            let outgoing = self.active;
            self.active = standby;
            if fade {
                self.fade = Some(Fade::start(outgoing, &self.crossfade));
                PlayStart::Crossfading
            } else {
                self.slots[outgoing].halt();
                PlayStart::Swapped
            }
        } else {
            self.slots[standby].halt();
            self.load_slot(self.active, entry, start_at);
            PlayStart::Loaded
        };

        if has_focus {
            self.slots[self.active].start();
        }
        self.apply_volumes();
        debug!(slot = self.active, entry = %entry.id, ?start, has_focus, "Playing entry");
        start
    }

    /// Pause the active slot; `stop_after` also drops the pre-buffered entry
    pub fn pause(&mut self, stop_after: bool) {
        self.finish_fade();
        let active = &mut self.slots[self.active];
        if active.state == SlotState::Playing {
            active.player.set_play_when_ready(false);
            active.state = SlotState::Paused;
        }
        if stop_after {
            self.discard_prepared();
        }
    }

    /// Resume the active slot
    pub fn resume(&mut self) -> bool {
        let active = &mut self.slots[self.active];
        if matches!(active.state, SlotState::Paused | SlotState::Prepared) {
            active.start();
            self.apply_volumes();
            true
        } else {
            false
        }
    }

    /// Seek the active slot, clamped into `[0, duration]`
    pub fn seek_to(&mut self, position: Duration) -> Duration {
        let clamped = match self.duration() {
            Some(duration) => position.min(duration),
            None => position,
        };
        let active = &mut self.slots[self.active];
        if active.entry.is_some() {
            active.player.seek(clamped);
        }
        clamped
    }

    /// Position of the active slot
    pub fn bookmark(&self) -> Duration {
        let active = &self.slots[self.active];
        if active.entry.is_some() {
            active.player.position()
        } else {
            Duration::ZERO
        }
    }

    /// Duration of the active slot, `None` when unknown
    pub fn duration(&self) -> Option<Duration> {
        let active = &self.slots[self.active];
        active
            .entry
            .as_ref()
            .and_then(|_| active.player.duration())
            .filter(|d| !d.is_zero())
    }

    /// Time left on the active slot, `None` when the duration is unknown
    pub fn remaining(&self) -> Option<Duration> {
        self.duration()
            .map(|duration| duration.saturating_sub(self.bookmark()))
    }

    /// Ducking ceiling, 0.0 to 1.0
    pub fn set_max_volume(&mut self, volume: f32) {
        self.max_volume = volume.clamp(0.0, 1.0);
        self.apply_volumes();
    }

    /// Advance any running fade; called on the progress tick
    pub fn tick(&mut self) {
        if let Some(fade) = self.fade {
            if fade.is_complete(Instant::now()) {
                self.finish_fade();
            } else {
                self.apply_volumes();
            }
        }
    }

    fn finish_fade(&mut self) {
        if let Some(fade) = self.fade.take() {
            trace!(outgoing = fade.outgoing, "Crossfade finished");
            self.slots[fade.outgoing].halt();
            self.apply_volumes();
        }
    }

    fn apply_volumes(&mut self) {
        let ceiling = self.max_volume;
        match self.fade {
            Some(fade) => {
                let (out_gain, in_gain) = fade.gains(Instant::now());
                self.slots[fade.outgoing].player.set_volume(out_gain * ceiling);
                self.slots[self.active].player.set_volume(in_gain * ceiling);
            }
            None => self.slots[self.active].player.set_volume(ceiling),
        }
    }

    /// Filter a backend event down to what the controller must act on
    ///
    /// Standby and outgoing slots never produce track events: a standby
    /// failure just discards the pre-buffered entry. Events about media the
    /// slot no longer holds are dropped.
    pub fn handle_backend_event(&mut self, event: BackendEvent) -> Option<PlayerEvent> {
        let Some(slot) = self.slots.get(event.slot) else {
            warn!(slot = event.slot, "Event from unknown player slot");
            return None;
        };
        if slot.state == SlotState::Released {
            return None;
        }
        if event.load != slot.load_id {
            trace!(
                slot = event.slot,
                load = event.load,
                current = slot.load_id,
                kind = ?event.kind,
                "Dropping event for replaced media"
            );
            return None;
        }

        if event.slot != self.active {
            match event.kind {
                BackendEventKind::Error(kind, message) => {
                    warn!(slot = event.slot, %kind, %message, "Standby player failed, dropping pre-buffer");
                    if self.fade.is_some_and(|f| f.outgoing == event.slot) {
                        self.finish_fade();
                    } else {
                        self.slots[event.slot].halt();
                    }
                }
                BackendEventKind::Ended => {
                    if self.fade.is_some_and(|f| f.outgoing == event.slot) {
                        self.finish_fade();
                    }
                }
                BackendEventKind::Ready => trace!(slot = event.slot, "Standby ready"),
            }
            return None;
        }

        match event.kind {
            BackendEventKind::Ready => Some(PlayerEvent::Ready),
            BackendEventKind::Ended => {
                if slot.state != SlotState::Playing {
                    return None;
                }
                self.slots[self.active].state = SlotState::Paused;
                Some(PlayerEvent::Ended)
            }
            BackendEventKind::Error(kind, message) => {
                self.slots[self.active].halt();
                Some(PlayerEvent::Error(kind, message))
            }
        }
    }

    /// Release both instances; the delegate is unusable afterwards
    pub fn release(&mut self) {
        self.fade = None;
        for slot in &mut self.slots {
            if slot.state != SlotState::Released {
                slot.player.release();
                slot.state = SlotState::Released;
                slot.entry = None;
            }
        }
    }
}
