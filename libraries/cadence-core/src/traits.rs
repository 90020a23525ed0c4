//! Collaborator traits the playback engine calls through
//!
//! Implementations live outside the engine: `cadence-storage` provides the
//! SQLite gateways, the application provides retrieval and rendering.

use crate::error::Result;
use crate::types::{
    FavoriteChange, NotificationHandle, NotificationState, PlaybackModes, QueueEntry, SearchHints,
    Selector, Track, TrackId,
};
use async_trait::async_trait;
use tokio::sync::broadcast;
use url::Url;

/// Resolves library selections into ordered track lists
///
/// Every method returns tracks in play order. An empty list is a valid
/// answer; the engine turns it into `CadenceError::ResolutionEmpty`.
#[async_trait]
pub trait DataRetriever: Send + Sync {
    /// Resolve a collection, optionally keeping only tracks whose title,
    /// artist or album contains `filter` (case-insensitive)
    async fn resolve(&self, selector: &Selector, filter: Option<&str>) -> Result<Vec<Track>>;

    /// Most recently added tracks of the collection
    async fn resolve_recently_added(&self, selector: &Selector) -> Result<Vec<Track>>;

    /// Most played tracks of the collection
    async fn resolve_most_played(&self, selector: &Selector) -> Result<Vec<Track>>;

    /// Tracks addressed by a content URI
    async fn resolve_by_uri(&self, uri: &Url) -> Result<Vec<Track>>;

    /// Tracks matching a search query
    async fn resolve_by_search(&self, query: &str, hints: &SearchHints) -> Result<Vec<Track>>;

    /// Fetch specific tracks, preserving the order of `ids`
    async fn resolve_tracks(&self, ids: &[TrackId]) -> Result<Vec<Track>>;
}

/// Stores everything needed to restore playback after a restart
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Replace the saved queue and its current index
    async fn save_queue(&self, entries: &[QueueEntry], position: usize) -> Result<()>;

    /// Load the saved queue; an empty list when nothing was saved
    async fn load_queue(&self) -> Result<(Vec<QueueEntry>, usize)>;

    async fn save_bookmark(&self, id: &TrackId, bookmark_ms: u64) -> Result<()>;

    /// Saved bookmark for `id`, 0 when none
    async fn load_bookmark(&self, id: &TrackId) -> Result<u64>;

    async fn save_modes(&self, modes: PlaybackModes) -> Result<()>;

    async fn load_modes(&self) -> Result<PlaybackModes>;
}

/// Favorite flag storage
#[async_trait]
pub trait FavoriteGateway: Send + Sync {
    async fn is_favorite(&self, id: &TrackId) -> Result<bool>;

    /// Flip the flag and return its new value
    async fn toggle_favorite(&self, id: &TrackId) -> Result<bool>;

    /// Stream of favorite flag changes
    fn subscribe(&self) -> broadcast::Receiver<FavoriteChange>;
}

/// Renders notification snapshots on the host platform
///
/// Calls come from a single task and must return quickly.
pub trait NotificationRenderer: Send {
    /// Render (or update) the notification for `state`
    fn render(&mut self, state: &NotificationState) -> NotificationHandle;

    /// Keep the host process in the foreground while audio is audible
    fn promote_to_foreground(&mut self, handle: NotificationHandle);

    /// Leave the foreground; `remove` also dismisses the notification
    fn demote_from_foreground(&mut self, remove: bool);
}
