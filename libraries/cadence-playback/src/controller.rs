//! Playback controller
//!
//! The command/state machine of the engine. It owns the queue, the dual
//! player and the playback session, and is driven one [`Message`] at a time
//! by the session loop, so none of its state needs locking.
//!
//! Slow work (resolving selections, toggling favorites, disk writes) runs on
//! spawned tasks. Resolution results come back through the loopback channel
//! as messages; a newer play request aborts the one still in flight and
//! stale results are recognized by their generation number.
//!
//! Ordering rule: whenever the current entry is about to change, the outgoing
//! entry's bookmark is queued for saving before the queue is touched.

use crate::actions::{CustomAction, FocusChange, MediaButton};
use crate::config::PlaybackConfig;
use crate::events::PlaybackEvent;
use crate::media_button::{ClickBurst, HeadsetAction, HeadsetMultiplexer};
use crate::notification::{CoalescerInput, NotificationUpdate};
use crate::persister::Persister;
use crate::player::{BackendEvent, DualPlayer, PlayerEvent};
use crate::queue::{PreviousOutcome, Queue, RemoveOutcome};
use crate::shuffle;
use cadence_core::{
    CadenceError, DataRetriever, FavoriteGateway, MetadataEntity, PersistenceGateway,
    PlaybackModes, PlaybackSession, PlaybackStatus, QueueEntry, RepeatMode, SearchHints, Selector,
    ShuffleMode, SkipActions, SkipType, Track, TrackId,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use url::Url;

const EVENT_CAPACITY: usize = 256;

/// Source id given to entries added through play-next / play-later
const ADDED_SOURCE: &str = "added";

/// External playback commands
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Prepare {
        forced: bool,
    },
    PlayFromSelection {
        selector: Selector,
        filter: Option<String>,
    },
    PlayShuffled {
        selector: Selector,
        filter: Option<String>,
    },
    PlayFromUri(Url),
    PlayFromSearch {
        query: String,
        hints: SearchHints,
    },
    PlayRecentlyAdded(Selector),
    PlayMostPlayed(Selector),
    /// Resume
    Play,
    Pause,
    PlayPause,
    Stop,
    SkipToNext,
    SkipToPrevious,
    /// Jump to the entry with this insertion ordinal
    SkipToQueueItem(u32),
    SeekTo(Duration),
    SetRepeatMode(RepeatMode),
    SetShuffleMode(ShuffleMode),
    MoveRelative {
        from: usize,
        to: usize,
    },
    SwapRelative {
        from: usize,
        to: usize,
    },
    RemoveRelative(usize),
    AddToPlayNext(Vec<TrackId>),
    AddToPlayLater(Vec<TrackId>),
    ToggleFavorite,
    AudioFocus(FocusChange),
    MediaButton(MediaButton),
    CustomAction {
        name: String,
        extras: serde_json::Value,
    },
}

/// Where resolved tracks go in an insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Next,
    Later,
}

/// How a resolved play request turns into a queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayTarget {
    /// Source id stamped on every entry
    pub source_id: String,
    /// Entry to start from, first entry when absent or not found
    pub start: Option<TrackId>,
    /// Shuffle the resolved list before loading it
    pub shuffled: bool,
    /// Entries are podcast episodes
    pub podcast: bool,
}

/// Everything the controller reacts to, in one serialized stream
#[derive(Debug)]
pub enum Message {
    Command(Command),
    /// A play request finished resolving
    Resolved {
        generation: u64,
        target: PlayTarget,
        result: cadence_core::Result<Vec<Track>>,
    },
    /// Tracks for play-next / play-later finished resolving
    Inserted {
        placement: Placement,
        result: cadence_core::Result<Vec<Track>>,
    },
    Backend(BackendEvent),
    /// Settled headset click burst
    HeadsetClicks(ClickBurst),
    /// Progress tick
    Tick,
}

/// Retrieval calls a play request can make
#[derive(Debug, Clone)]
enum Query {
    Selection {
        selector: Selector,
        filter: Option<String>,
    },
    Uri(Url),
    Search {
        query: String,
        hints: SearchHints,
    },
    RecentlyAdded(Selector),
    MostPlayed(Selector),
}

impl Query {
    async fn run(self, retriever: &dyn DataRetriever) -> cadence_core::Result<Vec<Track>> {
        match self {
            Query::Selection { selector, filter } => {
                retriever
                    .resolve(&selector.collection(), filter.as_deref())
                    .await
            }
            Query::Uri(uri) => retriever.resolve_by_uri(&uri).await,
            Query::Search { query, hints } => retriever.resolve_by_search(&query, &hints).await,
            Query::RecentlyAdded(selector) => {
                retriever.resolve_recently_added(&selector.collection()).await
            }
            Query::MostPlayed(selector) => {
                retriever.resolve_most_played(&selector.collection()).await
            }
        }
    }
}

/// External collaborators of the controller
#[derive(Clone)]
pub struct Collaborators {
    pub retriever: Arc<dyn DataRetriever>,
    pub persistence: Arc<dyn PersistenceGateway>,
    pub favorites: Arc<dyn FavoriteGateway>,
}

#[derive(Debug, Clone, Copy)]
struct Focus {
    has_focus: bool,
    resume_on_gain: bool,
}

/// Playback command/state machine
pub struct PlaybackController {
    config: PlaybackConfig,
    queue: Queue,
    player: DualPlayer,
    session: PlaybackSession,

    retriever: Arc<dyn DataRetriever>,
    persistence: Arc<dyn PersistenceGateway>,
    favorites: Arc<dyn FavoriteGateway>,
    persister: Persister,

    events: broadcast::Sender<PlaybackEvent>,
    notifications: Option<mpsc::UnboundedSender<CoalescerInput>>,
    loopback: mpsc::UnboundedSender<Message>,

    resolution: Option<JoinHandle<()>>,
    generation: u64,
    headset: HeadsetMultiplexer<Message>,
    focus: Focus,

    /// Bookmarks saved during this session, read before asking the gateway
    bookmarks: HashMap<TrackId, u64>,
    /// Entry last handed to the standby slot, not retried after a failure
    preloaded: Option<(TrackId, u32)>,
    consecutive_errors: usize,
}

impl PlaybackController {
    pub fn new(
        config: PlaybackConfig,
        player: DualPlayer,
        collaborators: Collaborators,
        persister: Persister,
        loopback: mpsc::UnboundedSender<Message>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let headset =
            HeadsetMultiplexer::new(config.media_button.clone(), loopback.clone(), Message::HeadsetClicks);

        Self {
            queue: Queue::new(config.shuffle_strategy, config.skip_to_previous_threshold()),
            player,
            session: PlaybackSession::default(),
            retriever: collaborators.retriever,
            persistence: collaborators.persistence,
            favorites: collaborators.favorites,
            persister,
            events,
            notifications: None,
            loopback,
            resolution: None,
            generation: 0,
            headset,
            focus: Focus {
                has_focus: true,
                resume_on_gain: false,
            },
            bookmarks: HashMap::new(),
            preloaded: None,
            consecutive_errors: 0,
            config,
        }
    }

    /// Forward metadata and status changes to a notification coalescer
    pub fn attach_notifications(&mut self, tx: mpsc::UnboundedSender<CoalescerInput>) {
        self.notifications = Some(tx);
    }

    /// Subscribe to playback events
    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.events.subscribe()
    }

    /// Sender side of the event bus, for handing out more subscriptions
    pub fn event_sender(&self) -> broadcast::Sender<PlaybackEvent> {
        self.events.clone()
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn player(&self) -> &DualPlayer {
        &self.player
    }

    // ===== Message dispatch =====

    /// Handle one message from the session loop
    pub async fn handle(&mut self, message: Message) {
        match message {
            Message::Command(command) => {
                self.consecutive_errors = 0;
                self.handle_command(command).await;
            }
            Message::Resolved {
                generation,
                target,
                result,
            } => {
                if generation != self.generation {
                    debug!(generation, current = self.generation, "Dropping stale resolution");
                    return;
                }
                self.resolution = None;
                self.on_resolved(target, result).await;
            }
            Message::Inserted { placement, result } => self.on_inserted(placement, result).await,
            Message::Backend(event) => {
                if let Some(event) = self.player.handle_backend_event(event) {
                    self.on_player_event(event).await;
                }
            }
            Message::HeadsetClicks(burst) => match self.headset.settle(burst) {
                Some(HeadsetAction::PlayPause) => self.play_pause().await,
                Some(HeadsetAction::SkipToNext) => self.skip_to_next(false).await,
                Some(HeadsetAction::SkipToPrevious) => self.skip_to_previous().await,
                None => debug!(clicks = burst.clicks, "Headset click count ignored"),
            },
            Message::Tick => self.on_tick().await,
        }
    }

    async fn handle_command(&mut self, command: Command) {
        debug!(?command, "Command");
        match command {
            Command::Prepare { forced } => self.prepare(forced).await,
            Command::PlayFromSelection { selector, filter } => {
                self.play_from_selection(selector, filter, false);
            }
            Command::PlayShuffled { selector, filter } => {
                self.play_from_selection(selector, filter, true);
            }
            Command::PlayFromUri(uri) => self.play_from_uri(uri),
            Command::PlayFromSearch { query, hints } => self.play_from_search(query, hints),
            Command::PlayRecentlyAdded(selector) => {
                self.prepare(false).await;
                self.play_query(&selector, Query::RecentlyAdded(selector.clone()));
            }
            Command::PlayMostPlayed(selector) => {
                self.prepare(false).await;
                self.play_query(&selector, Query::MostPlayed(selector.clone()));
            }
            Command::Play => self.resume().await,
            Command::Pause => self.pause(),
            Command::PlayPause => self.play_pause().await,
            Command::Stop => self.stop(),
            Command::SkipToNext => self.skip_to_next(false).await,
            Command::SkipToPrevious => self.skip_to_previous().await,
            Command::SkipToQueueItem(ordinal) => self.skip_to_queue_item(ordinal).await,
            Command::SeekTo(position) => self.seek_to(position),
            Command::SetRepeatMode(mode) => self.set_repeat_mode(mode),
            Command::SetShuffleMode(mode) => self.set_shuffle_mode(mode),
            Command::MoveRelative { from, to } => {
                let result = self.queue.move_relative(from, to);
                self.after_reorder("move", result);
            }
            Command::SwapRelative { from, to } => {
                let result = self.queue.swap_relative(from, to);
                self.after_reorder("swap", result);
            }
            Command::RemoveRelative(offset) => self.remove_relative(offset).await,
            Command::AddToPlayNext(ids) => self.add_tracks(ids, Placement::Next),
            Command::AddToPlayLater(ids) => self.add_tracks(ids, Placement::Later),
            Command::ToggleFavorite => self.toggle_favorite(),
            Command::AudioFocus(change) => self.on_focus_change(change).await,
            Command::MediaButton(button) => self.on_media_button(button).await,
            Command::CustomAction { name, extras } => self.on_custom_action(&name, &extras).await,
        }
    }

    // ===== Restore & prepare =====

    /// Load the saved queue, modes and bookmark and prepare the current entry
    pub async fn restore(&mut self) {
        match self.persistence.load_modes().await {
            Ok(modes) => {
                self.queue.set_repeat_mode(modes.repeat);
                self.queue.set_shuffle_mode(modes.shuffle);
            }
            Err(e) => warn!("Failed to load playback modes: {}", e),
        }

        match self.persistence.load_queue().await {
            Ok((entries, position)) if !entries.is_empty() => {
                let position = position.min(entries.len() - 1);
                let len = entries.len();
                if let Err(e) = self.queue.replace(entries, position) {
                    warn!("Saved queue could not be restored: {}", e);
                    return;
                }
                info!(len, position, "Restored playing queue");
                self.prepare(true).await;
            }
            Ok(_) => debug!("No saved queue"),
            Err(e) => warn!("Failed to load saved queue: {}", e),
        }
    }

    /// Load the current entry without starting it
    ///
    /// Does nothing unless `forced` or the player holds nothing yet.
    pub async fn prepare(&mut self, forced: bool) {
        if !forced && self.player.active_entry().is_some() {
            return;
        }
        let Some(entry) = self.queue.current().cloned() else {
            return;
        };

        let bookmark = self.start_position(&entry).await;
        self.player.prepare(&entry, bookmark);
        self.preloaded = None;
        self.session.bookmark_ms = duration_ms(bookmark);
        self.session.last_error = None;

        self.emit_metadata();
        self.emit_skip_actions();
        self.emit_queue_changed();
        self.set_status(PlaybackStatus::Paused);
    }

    // ===== Play requests =====

    fn play_from_selection(&mut self, selector: Selector, filter: Option<String>, shuffled: bool) {
        let target = PlayTarget {
            source_id: selector.collection().to_string(),
            start: if shuffled { None } else { selector.track.clone() },
            shuffled,
            podcast: selector.category.is_podcast(),
        };
        self.spawn_resolution(Query::Selection { selector, filter }, target);
    }

    fn play_from_uri(&mut self, uri: Url) {
        let target = PlayTarget {
            source_id: uri.to_string(),
            start: None,
            shuffled: false,
            podcast: false,
        };
        self.spawn_resolution(Query::Uri(uri), target);
    }

    fn play_from_search(&mut self, query: String, hints: SearchHints) {
        let target = PlayTarget {
            source_id: format!("search:{query}"),
            start: None,
            shuffled: false,
            podcast: false,
        };
        self.spawn_resolution(Query::Search { query, hints }, target);
    }

    fn play_query(&mut self, selector: &Selector, query: Query) {
        let target = PlayTarget {
            source_id: selector.collection().to_string(),
            start: None,
            shuffled: false,
            podcast: selector.category.is_podcast(),
        };
        self.spawn_resolution(query, target);
    }

    /// Start resolving a play request, superseding the one in flight
    fn spawn_resolution(&mut self, query: Query, target: PlayTarget) {
        if let Some(previous) = self.resolution.take() {
            debug!(generation = self.generation, "Cancelling superseded resolution");
            previous.abort();
        }
        self.generation += 1;

        let generation = self.generation;
        let retriever = Arc::clone(&self.retriever);
        let tx = self.loopback.clone();
        self.resolution = Some(tokio::spawn(async move {
            let result = query.run(retriever.as_ref()).await;
            let _ = tx.send(Message::Resolved {
                generation,
                target,
                result,
            });
        }));
    }

    async fn on_resolved(&mut self, target: PlayTarget, result: cadence_core::Result<Vec<Track>>) {
        let tracks = match result {
            Ok(tracks) if !tracks.is_empty() => tracks,
            Ok(_) => {
                info!(source = %target.source_id, "{}", CadenceError::ResolutionEmpty);
                self.settle_stopped();
                return;
            }
            Err(e) => {
                warn!(source = %target.source_id, "Resolution failed: {}", e);
                self.settle_stopped();
                return;
            }
        };

        let entries: Vec<QueueEntry> = tracks
            .into_iter()
            .zip(0u32..)
            .map(|(track, position)| {
                let mut entry = QueueEntry::from_track(track, target.source_id.clone(), position);
                entry.is_podcast |= target.podcast;
                entry
            })
            .collect();

        let (entries, start) = if target.shuffled {
            (shuffle::shuffle(entries, None, self.config.shuffle_strategy), 0)
        } else {
            let start = target
                .start
                .as_ref()
                .and_then(|id| entries.iter().position(|e| &e.id == id))
                .unwrap_or(0);
            (entries, start)
        };

        self.save_outgoing_bookmark();

        if let Err(e) = self.queue.replace(entries, start) {
            error!("Resolved queue rejected: {}", e);
            return;
        }
        if target.shuffled {
            self.queue.set_shuffle_mode(ShuffleMode::On);
            self.save_modes();
            self.emit(PlaybackEvent::ShuffleModeChanged {
                mode: ShuffleMode::On,
            });
        } else if self.queue.shuffle_mode().is_on() {
            // Keep the chosen start entry first, shuffle the rest
            self.queue.shuffle();
        }
        info!(len = self.queue.len(), source = %target.source_id, "Playing new queue");

        self.persist_queue();
        self.focus.has_focus = true;
        if let Some(entry) = self.queue.current().cloned() {
            self.play_entry(entry, SkipType::None).await;
        }
    }

    fn add_tracks(&mut self, ids: Vec<TrackId>, placement: Placement) {
        if ids.is_empty() {
            return;
        }
        let retriever = Arc::clone(&self.retriever);
        let tx = self.loopback.clone();
        tokio::spawn(async move {
            let result = retriever.resolve_tracks(&ids).await;
            let _ = tx.send(Message::Inserted { placement, result });
        });
    }

    async fn on_inserted(&mut self, placement: Placement, result: cadence_core::Result<Vec<Track>>) {
        let tracks = match result {
            Ok(tracks) if !tracks.is_empty() => tracks,
            Ok(_) => return,
            Err(e) => {
                warn!(?placement, "Failed to resolve tracks to add: {}", e);
                return;
            }
        };

        let was_empty = self.queue.is_empty();
        let entries = tracks
            .into_iter()
            .map(|track| QueueEntry::from_track(track, ADDED_SOURCE, 0))
            .collect();
        let at = match placement {
            Placement::Next => self.queue.insert_next(entries),
            Placement::Later => self.queue.insert_later(entries),
        };
        debug!(?placement, at, len = self.queue.len(), "Added entries");

        self.preloaded = None;
        self.player.discard_prepared();
        self.persist_queue();
        self.emit_queue_changed();
        self.emit_skip_actions();

        if was_empty {
            self.prepare(true).await;
        }
    }

    // ===== Playback control =====

    /// Start `entry` on the delegate and publish the new state
    async fn play_entry(&mut self, entry: QueueEntry, skip: SkipType) {
        if let Some(status) = skip.transient_status() {
            self.set_status(status);
        }

        let start_at = self.start_position(&entry).await;
        let start = self.player.play(
            &entry,
            start_at,
            self.focus.has_focus,
            skip == SkipType::TrackEnded,
        );
        debug!(entry = %entry.id, ?skip, ?start, "Entry started");

        self.preloaded = None;
        self.session.bookmark_ms = duration_ms(start_at);
        self.session.last_error = None;

        self.emit_metadata();
        self.emit_skip_actions();
        self.emit_queue_changed();
        self.set_status(if self.focus.has_focus {
            PlaybackStatus::Playing
        } else {
            PlaybackStatus::Paused
        });
    }

    pub async fn resume(&mut self) {
        self.focus.has_focus = true;
        self.focus.resume_on_gain = false;
        self.player.set_max_volume(1.0);

        if self.player.resume() {
            self.set_status(PlaybackStatus::Playing);
            return;
        }
        match self.queue.current().cloned() {
            Some(entry) => self.play_entry(entry, SkipType::None).await,
            None => debug!("Nothing to resume"),
        }
    }

    /// Pause, saving the bookmark first
    pub fn pause(&mut self) {
        self.save_outgoing_bookmark();
        self.player.pause(false);
        self.session.bookmark_ms = duration_ms(self.player.bookmark());
        if self.queue.current().is_some() {
            self.set_status(PlaybackStatus::Paused);
        }
    }

    async fn play_pause(&mut self) {
        if self.player.is_playing() {
            self.pause();
        } else {
            self.resume().await;
        }
    }

    /// Stop on request: settle in STOPPED and remove the notification
    pub fn stop(&mut self) {
        self.halt();
        if let Some(tx) = &self.notifications {
            let _ = tx.send(CoalescerInput::Dismiss);
        }
    }

    /// Pause for good and settle in STOPPED, keeping the notification
    fn halt(&mut self) {
        self.save_outgoing_bookmark();
        self.player.pause(true);
        self.focus.resume_on_gain = false;
        self.preloaded = None;
        self.session.bookmark_ms = duration_ms(self.player.bookmark());
        self.set_status(PlaybackStatus::Stopped);
    }

    fn settle_stopped(&mut self) {
        self.player.pause(true);
        self.set_status(PlaybackStatus::Stopped);
    }

    /// Advance per the repeat mode
    ///
    /// Past the end of the queue the current entry is reloaded at 0 and left
    /// paused instead of stopping.
    pub async fn skip_to_next(&mut self, track_ended: bool) {
        if self.queue.is_empty() {
            return;
        }
        self.save_outgoing_bookmark();

        match self.queue.next(track_ended) {
            Some(entry) => {
                let skip = if track_ended {
                    SkipType::TrackEnded
                } else {
                    SkipType::SkipNext
                };
                self.persist_queue();
                self.play_entry(entry, skip).await;
            }
            None => self.restart_and_pause(),
        }
    }

    fn restart_and_pause(&mut self) {
        let Some(entry) = self.queue.current().cloned() else {
            return;
        };
        info!(entry = %entry.id, "End of queue, rewinding current entry");
        self.player.play(&entry, Duration::ZERO, false, false);
        self.player.seek_to(Duration::ZERO);
        self.preloaded = None;
        self.session.bookmark_ms = 0;
        self.emit_skip_actions();
        self.set_status(PlaybackStatus::Paused);
    }

    pub async fn skip_to_previous(&mut self) {
        let bookmark = self.player.bookmark();
        self.save_outgoing_bookmark();

        match self.queue.previous(bookmark) {
            Some(PreviousOutcome::Restart) => {
                debug!(?bookmark, "Restarting current entry");
                self.player.seek_to(Duration::ZERO);
                self.session.bookmark_ms = 0;
                self.emit_state();
            }
            Some(PreviousOutcome::Previous(entry)) => {
                self.persist_queue();
                self.play_entry(entry, SkipType::SkipPrevious).await;
            }
            None => {}
        }
    }

    async fn skip_to_queue_item(&mut self, ordinal: u32) {
        self.save_outgoing_bookmark();
        let entry = match self.queue.skip_to(ordinal) {
            Ok(entry) => entry.clone(),
            Err(e) => {
                warn!(ordinal, "Cannot skip to queue item: {}", e);
                return;
            }
        };
        self.persist_queue();
        self.focus.has_focus = true;
        self.play_entry(entry, SkipType::None).await;
    }

    /// Seek the current entry; out-of-range positions are clamped
    pub fn seek_to(&mut self, position: Duration) {
        let position = self.player.seek_to(position);
        self.session.bookmark_ms = duration_ms(position);
        self.emit_state();
    }

    fn seek_by(&mut self, step_ms: u64, forward: bool) {
        let step = Duration::from_millis(step_ms);
        let bookmark = self.player.bookmark();
        let target = if forward {
            bookmark.saturating_add(step)
        } else {
            bookmark.saturating_sub(step)
        };
        self.seek_to(target);
    }

    // ===== Modes =====

    pub fn set_repeat_mode(&mut self, mode: RepeatMode) {
        self.queue.set_repeat_mode(mode);
        self.preloaded = None;
        self.player.discard_prepared();
        self.save_modes();
        self.emit(PlaybackEvent::RepeatModeChanged { mode });
        self.emit_skip_actions();
    }

    pub fn set_shuffle_mode(&mut self, mode: ShuffleMode) {
        match mode {
            ShuffleMode::On => self.queue.shuffle(),
            ShuffleMode::Off => self.queue.sort(),
        }
        self.preloaded = None;
        self.player.discard_prepared();
        self.persist_queue();
        self.save_modes();
        self.emit(PlaybackEvent::ShuffleModeChanged { mode });
        self.emit_queue_changed();
        self.emit_skip_actions();
    }

    // ===== Queue edits =====

    fn after_reorder(&mut self, operation: &str, result: crate::Result<()>) {
        if let Err(e) = result {
            warn!(operation, "Queue edit rejected: {}", e);
            return;
        }
        self.preloaded = None;
        self.player.discard_prepared();
        self.persist_queue();
        self.emit_queue_changed();
        self.emit_skip_actions();
    }

    async fn remove_at(&mut self, index: usize) {
        if self.queue.current_index() == Some(index) {
            self.save_outgoing_bookmark();
        }
        let was_playing = self.player.is_playing();
        let result = self.queue.remove_at(index);
        self.after_remove(result, was_playing).await;
    }

    /// Relative offsets never address the current entry
    async fn remove_relative(&mut self, offset: usize) {
        let was_playing = self.player.is_playing();
        let result = self.queue.remove_relative(offset);
        self.after_remove(result, was_playing).await;
    }

    async fn after_remove(&mut self, result: crate::Result<RemoveOutcome>, was_playing: bool) {
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Cannot remove queue entry: {}", e);
                return;
            }
        };
        debug!(removed = %outcome.removed.id, was_current = outcome.was_current, "Removed entry");

        self.preloaded = None;
        self.player.discard_prepared();
        self.persist_queue();
        self.emit_queue_changed();

        if self.queue.is_empty() {
            info!("Queue emptied, stopping");
            self.halt();
            self.emit_metadata();
            self.emit_skip_actions();
            return;
        }

        if outcome.was_current {
            if was_playing {
                if let Some(entry) = self.queue.current().cloned() {
                    self.play_entry(entry, SkipType::None).await;
                }
            } else {
                self.prepare(true).await;
            }
        } else {
            self.emit_skip_actions();
        }
    }

    // ===== Favorites & focus =====

    fn toggle_favorite(&self) {
        let Some(id) = self.queue.current().map(|e| e.id.clone()) else {
            return;
        };
        let favorites = Arc::clone(&self.favorites);
        tokio::spawn(async move {
            match favorites.toggle_favorite(&id).await {
                Ok(is_favorite) => debug!(track = %id, is_favorite, "Favorite toggled"),
                Err(e) => warn!(track = %id, "Failed to toggle favorite: {}", e),
            }
        });
    }

    async fn on_focus_change(&mut self, change: FocusChange) {
        debug!(?change, "Audio focus");
        match change {
            FocusChange::Gain => {
                self.focus.has_focus = true;
                self.player.set_max_volume(1.0);
                if self.focus.resume_on_gain {
                    self.resume().await;
                }
            }
            FocusChange::Loss => {
                self.focus.has_focus = false;
                self.focus.resume_on_gain = false;
                self.pause();
            }
            FocusChange::LossTransient => {
                let was_playing = self.player.is_playing();
                self.focus.has_focus = false;
                self.pause();
                self.focus.resume_on_gain = was_playing;
            }
            FocusChange::Duck => self.player.set_max_volume(self.config.duck_volume),
        }
    }

    async fn on_media_button(&mut self, button: MediaButton) {
        match button {
            MediaButton::PlayPause => self.play_pause().await,
            MediaButton::Play => self.resume().await,
            MediaButton::Pause => self.pause(),
            MediaButton::Stop => self.stop(),
            MediaButton::Next => self.skip_to_next(false).await,
            MediaButton::Previous => self.skip_to_previous().await,
            MediaButton::FastForward => self.skip_to_next(true).await,
            MediaButton::HeadsetHook => self.headset.click(),
        }
    }

    async fn on_custom_action(&mut self, name: &str, extras: &serde_json::Value) {
        let action = match CustomAction::parse(name, extras) {
            Ok(action) => action,
            Err(e) => {
                warn!(action = name, "Ignoring custom action: {}", e);
                return;
            }
        };
        if action.is_queue_mutation() {
            self.prepare(false).await;
        }

        match action {
            CustomAction::Shuffle { selector, filter } => {
                self.play_from_selection(selector, filter, true);
            }
            CustomAction::Swap { from, to } => {
                let result = self.queue.swap(from, to);
                self.after_reorder("swap", result);
            }
            CustomAction::SwapRelative { from, to } => {
                let result = self.queue.swap_relative(from, to);
                self.after_reorder("swap", result);
            }
            CustomAction::Remove(index) => self.remove_at(index).await,
            CustomAction::RemoveRelative(offset) => self.remove_relative(offset).await,
            CustomAction::MoveRelative(offset) => {
                let result = self.queue.move_relative_to_next(offset);
                self.after_reorder("move", result);
            }
            CustomAction::PlayRecentlyAdded(selector) => {
                self.play_query(&selector, Query::RecentlyAdded(selector.clone()));
            }
            CustomAction::PlayMostPlayed(selector) => {
                self.play_query(&selector, Query::MostPlayed(selector.clone()));
            }
            CustomAction::Forward10 => self.seek_by(self.config.seek_step_short_ms, true),
            CustomAction::Forward30 => self.seek_by(self.config.seek_step_long_ms, true),
            CustomAction::Replay10 => self.seek_by(self.config.seek_step_short_ms, false),
            CustomAction::Replay30 => self.seek_by(self.config.seek_step_long_ms, false),
            CustomAction::ToggleFavorite => self.toggle_favorite(),
            CustomAction::AddToPlayLater(ids) => self.add_tracks(ids, Placement::Later),
            CustomAction::AddToPlayNext(ids) => self.add_tracks(ids, Placement::Next),
        }
    }

    // ===== Player events & progress =====

    async fn on_player_event(&mut self, event: PlayerEvent) {
        match event {
            PlayerEvent::Ready => debug!("Active player ready"),
            PlayerEvent::Ended => {
                self.consecutive_errors = 0;
                self.skip_to_next(true).await;
            }
            PlayerEvent::Error(kind, message) => {
                self.consecutive_errors += 1;
                let err = CadenceError::Playback(kind, message);
                error!(consecutive = self.consecutive_errors, "{}", err);

                self.session.status = PlaybackStatus::Error;
                self.session.last_error = Some(err.to_string());
                self.emit_state();
                self.emit(PlaybackEvent::Error {
                    message: err.to_string(),
                });

                if self.consecutive_errors >= self.queue.len() {
                    warn!("Every queued entry failed, stopping");
                    self.settle_stopped();
                } else {
                    self.skip_to_next(false).await;
                }
            }
        }
    }

    async fn on_tick(&mut self) {
        self.player.tick();
        if !self.player.is_playing() {
            return;
        }
        self.session.bookmark_ms = duration_ms(self.player.bookmark());

        let Some(remaining) = self.player.remaining() else {
            return;
        };
        let Some(next) = self.queue.peek_next().cloned() else {
            return;
        };

        if remaining <= self.config.preload_window() && !self.player.is_fading() {
            let key = (next.id.clone(), next.position);
            if self.preloaded.as_ref() != Some(&key) {
                let start_at = self.start_position(&next).await;
                debug!(entry = %next.id, ?remaining, "Pre-buffering next entry");
                self.player.prepare(&next, start_at);
                self.preloaded = Some(key);
            }
        }

        let crossfade = &self.config.crossfade;
        if crossfade.applies_to(false)
            && remaining <= crossfade.duration()
            && !self.player.is_fading()
            && self.player.is_prepared_next(&next)
        {
            debug!(?remaining, "Starting crossfade into next entry");
            self.skip_to_next(true).await;
        }
    }

    // ===== Persistence helpers =====

    /// Queue the current entry's bookmark for saving
    ///
    /// A bookmark within the restart margin of the end is saved as 0 so the
    /// entry starts over next time.
    fn save_outgoing_bookmark(&mut self) {
        let Some(entry) = self.queue.current() else {
            return;
        };
        if self.player.active_entry().map(|e| &e.id) != Some(&entry.id) {
            return;
        }

        let bookmark = self.player.bookmark();
        let near_end = self
            .player
            .duration()
            .is_some_and(|d| bookmark + self.config.podcast_restart_margin() >= d);
        let bookmark_ms = if near_end { 0 } else { duration_ms(bookmark) };

        self.bookmarks.insert(entry.id.clone(), bookmark_ms);
        self.persister.save_bookmark(entry.id.clone(), bookmark_ms);
    }

    /// Where `entry` should start: its bookmark for podcasts, 0 otherwise
    async fn start_position(&mut self, entry: &QueueEntry) -> Duration {
        if !entry.is_podcast {
            return Duration::ZERO;
        }
        if let Some(ms) = self.bookmarks.get(&entry.id) {
            return Duration::from_millis(*ms);
        }
        match self.persistence.load_bookmark(&entry.id).await {
            Ok(ms) => Duration::from_millis(ms),
            Err(e) => {
                warn!(track = %entry.id, "Failed to load bookmark: {}", e);
                Duration::ZERO
            }
        }
    }

    fn persist_queue(&self) {
        let (entries, position) = self.queue.snapshot();
        self.persister.save_queue(entries, position);
    }

    fn save_modes(&self) {
        self.persister.save_modes(PlaybackModes {
            repeat: self.queue.repeat_mode(),
            shuffle: self.queue.shuffle_mode(),
        });
    }

    // ===== Event emission =====

    fn set_status(&mut self, status: PlaybackStatus) {
        self.session.status = status;
        self.emit_state();
    }

    fn emit_state(&self) {
        self.emit(PlaybackEvent::StateChanged {
            session: self.session.clone(),
        });
    }

    fn emit_metadata(&self) {
        self.emit(PlaybackEvent::MetadataChanged {
            metadata: self.queue.current().map(MetadataEntity::from),
        });
    }

    fn emit_skip_actions(&self) {
        self.emit(PlaybackEvent::SkipActionsChanged {
            actions: SkipActions::from(self.queue.position_in_queue()),
        });
    }

    fn emit_queue_changed(&self) {
        self.emit(PlaybackEvent::QueueChanged {
            len: self.queue.len(),
            current: self.queue.current_index(),
        });
    }

    fn emit(&self, event: PlaybackEvent) {
        if let Some(tx) = &self.notifications {
            let update = match &event {
                PlaybackEvent::MetadataChanged { metadata } => {
                    Some(NotificationUpdate::Metadata(metadata.clone()))
                }
                PlaybackEvent::StateChanged { session } => {
                    Some(NotificationUpdate::State(session.status))
                }
                _ => None,
            };
            if let Some(update) = update {
                let _ = tx.send(CoalescerInput::Update(update));
            }
        }
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    // ===== Teardown =====

    /// Abort in-flight work and release both players
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.resolution.take() {
            handle.abort();
        }
        self.save_outgoing_bookmark();
        self.player.release();
        self.session.status = PlaybackStatus::Stopped;
        info!("Playback controller shut down");
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
