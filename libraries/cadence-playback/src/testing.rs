//! In-memory collaborators for tests and demos
//!
//! Every fake keeps its state behind an `Arc<Mutex<_>>` so a test can keep a
//! monitor while the engine owns the fake itself.

use crate::player::{AudioPlayer, EventSink};
use async_trait::async_trait;
use cadence_core::{
    CadenceError, DataRetriever, FavoriteChange, FavoriteGateway, NotificationHandle,
    NotificationRenderer, NotificationState, PersistenceGateway, PlaybackModes, PlayerErrorKind,
    QueueEntry, Result, SearchHints, Selector, Track, TrackId,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use url::Url;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ===== Audio player =====

#[derive(Debug)]
struct FakePlayerState {
    loaded: Option<QueueEntry>,
    position: Duration,
    playing: bool,
    volume: f32,
    released: bool,
    loads: usize,
    load_id: u64,
}

/// Audio backend that only records what it was told
pub struct FakePlayer {
    state: Arc<Mutex<FakePlayerState>>,
    sink: Option<EventSink>,
}

/// Test-side view of a [`FakePlayer`]
#[derive(Clone)]
pub struct FakePlayerMonitor {
    state: Arc<Mutex<FakePlayerState>>,
    sink: Option<EventSink>,
}

impl FakePlayer {
    /// A player that never reports events
    pub fn new() -> (Self, FakePlayerMonitor) {
        Self::build(None)
    }

    /// A player whose monitor can report events for its slot
    pub fn with_sink(sink: EventSink) -> (Self, FakePlayerMonitor) {
        Self::build(Some(sink))
    }

    fn build(sink: Option<EventSink>) -> (Self, FakePlayerMonitor) {
        let state = Arc::new(Mutex::new(FakePlayerState {
            loaded: None,
            position: Duration::ZERO,
            playing: false,
            volume: 1.0,
            released: false,
            loads: 0,
            load_id: 0,
        }));
        (
            Self {
                state: Arc::clone(&state),
                sink: sink.clone(),
            },
            FakePlayerMonitor { state, sink },
        )
    }

    /// Two event-reporting players for `Session::start`
    pub fn pair(sinks: [EventSink; 2]) -> ([Box<dyn AudioPlayer>; 2], [FakePlayerMonitor; 2]) {
        let [first, second] = sinks;
        let (a, monitor_a) = Self::with_sink(first);
        let (b, monitor_b) = Self::with_sink(second);
        ([Box::new(a), Box::new(b)], [monitor_a, monitor_b])
    }
}

impl AudioPlayer for FakePlayer {
    fn load(&mut self, entry: &QueueEntry, start_at: Duration, load_id: u64) {
        let mut state = lock(&self.state);
        state.loaded = Some(entry.clone());
        state.position = start_at;
        state.playing = false;
        state.loads += 1;
        state.load_id = load_id;
    }

    fn set_play_when_ready(&mut self, play: bool) {
        lock(&self.state).playing = play;
    }

    fn seek(&mut self, position: Duration) {
        lock(&self.state).position = position;
    }

    fn position(&self) -> Duration {
        lock(&self.state).position
    }

    fn duration(&self) -> Option<Duration> {
        lock(&self.state).loaded.as_ref().and_then(QueueEntry::duration)
    }

    fn set_volume(&mut self, volume: f32) {
        lock(&self.state).volume = volume;
    }

    fn release(&mut self) {
        let mut state = lock(&self.state);
        state.released = true;
        state.playing = false;
        if let Some(sink) = &self.sink {
            tracing::trace!(slot = sink.slot(), "Fake player released");
        }
    }
}

impl FakePlayerMonitor {
    pub fn is_playing(&self) -> bool {
        lock(&self.state).playing
    }

    pub fn loaded(&self) -> Option<TrackId> {
        lock(&self.state).loaded.as_ref().map(|e| e.id.clone())
    }

    pub fn position(&self) -> Duration {
        lock(&self.state).position
    }

    /// Pretend playback progressed to `position`
    pub fn set_position(&self, position: Duration) {
        lock(&self.state).position = position;
    }

    pub fn volume(&self) -> f32 {
        lock(&self.state).volume
    }

    pub fn is_released(&self) -> bool {
        lock(&self.state).released
    }

    /// Number of `load` calls so far
    pub fn loads(&self) -> usize {
        lock(&self.state).loads
    }

    /// Report the end of the loaded media
    pub fn finish(&self) {
        if let Some(sink) = self.current_sink() {
            sink.ended();
        }
    }

    /// Report a failure of the loaded media
    pub fn fail(&self, kind: PlayerErrorKind, message: &str) {
        if let Some(sink) = self.current_sink() {
            sink.error(kind, message);
        }
    }

    fn current_sink(&self) -> Option<EventSink> {
        let load_id = lock(&self.state).load_id;
        self.sink.as_ref().map(|sink| sink.for_load(load_id))
    }
}

// ===== Data retrieval =====

#[derive(Default)]
struct LibraryState {
    collections: HashMap<String, Vec<Track>>,
    delays: HashMap<String, Duration>,
    calls: Vec<String>,
}

/// Retriever over a fixed in-memory library
#[derive(Clone, Default)]
pub struct InMemoryRetriever {
    state: Arc<Mutex<LibraryState>>,
}

impl InMemoryRetriever {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the tracks of a collection (`category/value`)
    pub fn insert(&self, collection: &str, tracks: Vec<Track>) {
        lock(&self.state)
            .collections
            .insert(collection.to_string(), tracks);
    }

    /// Make resolving `collection` take `delay`
    pub fn delay(&self, collection: &str, delay: Duration) {
        lock(&self.state)
            .delays
            .insert(collection.to_string(), delay);
    }

    /// Keys of every resolution so far, in call order
    pub fn calls(&self) -> Vec<String> {
        lock(&self.state).calls.clone()
    }

    async fn lookup(&self, key: String) -> Vec<Track> {
        let delay = {
            let mut state = lock(&self.state);
            state.calls.push(key.clone());
            state.delays.get(&key).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        lock(&self.state)
            .collections
            .get(&key)
            .cloned()
            .unwrap_or_default()
    }

    fn all_tracks(&self) -> Vec<Track> {
        let state = lock(&self.state);
        let mut seen = HashSet::new();
        let mut keys: Vec<_> = state.collections.keys().collect();
        keys.sort();
        keys.into_iter()
            .flat_map(|k| state.collections[k].iter())
            .filter(|t| seen.insert(t.id.clone()))
            .cloned()
            .collect()
    }
}

fn matches_filter(track: &Track, filter: &str) -> bool {
    let filter = filter.to_lowercase();
    let contains = |field: Option<&str>| field.is_some_and(|f| f.to_lowercase().contains(&filter));
    contains(Some(&track.title)) || contains(track.artist.as_deref()) || contains(track.album.as_deref())
}

#[async_trait]
impl DataRetriever for InMemoryRetriever {
    async fn resolve(&self, selector: &Selector, filter: Option<&str>) -> Result<Vec<Track>> {
        let tracks = self.lookup(selector.to_string()).await;
        Ok(match filter.filter(|f| !f.is_empty()) {
            Some(filter) => tracks
                .into_iter()
                .filter(|t| matches_filter(t, filter))
                .collect(),
            None => tracks,
        })
    }

    async fn resolve_recently_added(&self, selector: &Selector) -> Result<Vec<Track>> {
        let mut tracks = self.lookup(selector.to_string()).await;
        tracks.reverse();
        Ok(tracks)
    }

    async fn resolve_most_played(&self, selector: &Selector) -> Result<Vec<Track>> {
        Ok(self.lookup(selector.to_string()).await)
    }

    async fn resolve_by_uri(&self, uri: &Url) -> Result<Vec<Track>> {
        Ok(self.lookup(uri.to_string()).await)
    }

    async fn resolve_by_search(&self, query: &str, _hints: &SearchHints) -> Result<Vec<Track>> {
        Ok(self
            .all_tracks()
            .into_iter()
            .filter(|t| matches_filter(t, query))
            .collect())
    }

    async fn resolve_tracks(&self, ids: &[TrackId]) -> Result<Vec<Track>> {
        let all = self.all_tracks();
        Ok(ids
            .iter()
            .filter_map(|id| all.iter().find(|t| &t.id == id).cloned())
            .collect())
    }
}

// ===== Persistence =====

#[derive(Debug, Default)]
struct StoreState {
    queue: Vec<QueueEntry>,
    position: usize,
    bookmarks: HashMap<TrackId, u64>,
    modes: PlaybackModes,
    log: Vec<String>,
    fail: bool,
}

/// Persistence gateway backed by memory, with an operation log
#[derive(Clone, Default)]
pub struct InMemoryPersistence {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every save fail
    pub fn fail_saves(&self, fail: bool) {
        lock(&self.state).fail = fail;
    }

    /// Saves performed so far, e.g. `bookmark:a:1500` or `queue:3@1`
    pub fn log(&self) -> Vec<String> {
        lock(&self.state).log.clone()
    }

    pub fn bookmark(&self, id: &str) -> Option<u64> {
        lock(&self.state).bookmarks.get(&TrackId::new(id)).copied()
    }

    pub fn saved_queue(&self) -> (Vec<QueueEntry>, usize) {
        let state = lock(&self.state);
        (state.queue.clone(), state.position)
    }

    pub fn saved_modes(&self) -> PlaybackModes {
        lock(&self.state).modes
    }

    fn check(&self) -> Result<()> {
        if lock(&self.state).fail {
            Err(CadenceError::storage("disk full"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PersistenceGateway for InMemoryPersistence {
    async fn save_queue(&self, entries: &[QueueEntry], position: usize) -> Result<()> {
        self.check()?;
        let mut state = lock(&self.state);
        state.queue = entries.to_vec();
        state.position = position;
        state.log.push(format!("queue:{}@{}", entries.len(), position));
        Ok(())
    }

    async fn load_queue(&self) -> Result<(Vec<QueueEntry>, usize)> {
        Ok(self.saved_queue())
    }

    async fn save_bookmark(&self, id: &TrackId, bookmark_ms: u64) -> Result<()> {
        self.check()?;
        let mut state = lock(&self.state);
        state.bookmarks.insert(id.clone(), bookmark_ms);
        state.log.push(format!("bookmark:{id}:{bookmark_ms}"));
        Ok(())
    }

    async fn load_bookmark(&self, id: &TrackId) -> Result<u64> {
        Ok(lock(&self.state).bookmarks.get(id).copied().unwrap_or(0))
    }

    async fn save_modes(&self, modes: PlaybackModes) -> Result<()> {
        self.check()?;
        let mut state = lock(&self.state);
        state.modes = modes;
        state.log.push(format!("modes:{}:{}", modes.repeat, modes.shuffle));
        Ok(())
    }

    async fn load_modes(&self) -> Result<PlaybackModes> {
        Ok(lock(&self.state).modes)
    }
}

// ===== Favorites =====

/// Favorite gateway backed by a set
#[derive(Clone)]
pub struct InMemoryFavorites {
    favorites: Arc<Mutex<HashSet<TrackId>>>,
    changes: broadcast::Sender<FavoriteChange>,
}

impl Default for InMemoryFavorites {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryFavorites {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            favorites: Arc::new(Mutex::new(HashSet::new())),
            changes,
        }
    }

    /// Mark a track as favorite without publishing a change
    pub fn seed(&self, id: &str) {
        lock(&self.favorites).insert(TrackId::new(id));
    }

    pub fn contains(&self, id: &str) -> bool {
        lock(&self.favorites).contains(&TrackId::new(id))
    }
}

#[async_trait]
impl FavoriteGateway for InMemoryFavorites {
    async fn is_favorite(&self, id: &TrackId) -> Result<bool> {
        Ok(lock(&self.favorites).contains(id))
    }

    async fn toggle_favorite(&self, id: &TrackId) -> Result<bool> {
        let is_favorite = {
            let mut favorites = lock(&self.favorites);
            if favorites.remove(id) {
                false
            } else {
                favorites.insert(id.clone());
                true
            }
        };
        let _ = self.changes.send(FavoriteChange {
            track_id: id.clone(),
            is_favorite,
        });
        Ok(is_favorite)
    }

    fn subscribe(&self) -> broadcast::Receiver<FavoriteChange> {
        self.changes.subscribe()
    }
}

// ===== Notification renderer =====

/// What a [`RecordingRenderer`] was asked to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RendererCall {
    Render(NotificationState),
    Promote,
    Demote { remove: bool },
}

/// Renderer that records every call
#[derive(Clone, Default)]
pub struct RecordingRenderer {
    calls: Arc<Mutex<Vec<RendererCall>>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<RendererCall> {
        lock(&self.calls).clone()
    }

    /// Only the rendered states, in order
    pub fn renders(&self) -> Vec<NotificationState> {
        lock(&self.calls)
            .iter()
            .filter_map(|call| match call {
                RendererCall::Render(state) => Some(state.clone()),
                _ => None,
            })
            .collect()
    }
}

impl NotificationRenderer for RecordingRenderer {
    fn render(&mut self, state: &NotificationState) -> NotificationHandle {
        let mut calls = lock(&self.calls);
        calls.push(RendererCall::Render(state.clone()));
        NotificationHandle(calls.len() as u64)
    }

    fn promote_to_foreground(&mut self, _handle: NotificationHandle) {
        lock(&self.calls).push(RendererCall::Promote);
    }

    fn demote_from_foreground(&mut self, remove: bool) {
        lock(&self.calls).push(RendererCall::Demote { remove });
    }
}

/// A song with a three minute duration
pub fn song(id: &str, artist: &str) -> Track {
    Track::new(TrackId::new(id), format!("Song {id}"), 180_000).with_artist(artist)
}
