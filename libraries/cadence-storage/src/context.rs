use crate::{bookmarks, favorites, library, modes, queue};
use async_trait::async_trait;
use cadence_core::{
    DataRetriever, FavoriteChange, FavoriteGateway, PersistenceGateway, PlaybackModes,
    QueueEntry, Result, SearchHints, Selector, Track, TrackId,
};
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use tracing::debug;
use url::Url;

const FAVORITE_CHANNEL_CAPACITY: usize = 64;

/// URI scheme wrapping a selector, e.g. `cadence:albums/42`
pub const SELECTOR_SCHEME: &str = "cadence";

/// Queue, bookmark, mode and favorite storage backed by `SQLite`
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    favorite_changes: broadcast::Sender<FavoriteChange>,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        let (favorite_changes, _) = broadcast::channel(FAVORITE_CHANNEL_CAPACITY);
        Self {
            pool,
            favorite_changes,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl PersistenceGateway for SqliteStore {
    async fn save_queue(&self, entries: &[QueueEntry], position: usize) -> Result<()> {
        queue::save(&self.pool, entries, position).await?;
        debug!(len = entries.len(), position, "Queue saved");
        Ok(())
    }

    async fn load_queue(&self) -> Result<(Vec<QueueEntry>, usize)> {
        Ok(queue::load(&self.pool).await?)
    }

    async fn save_bookmark(&self, id: &TrackId, bookmark_ms: u64) -> Result<()> {
        Ok(bookmarks::save(&self.pool, id, bookmark_ms).await?)
    }

    async fn load_bookmark(&self, id: &TrackId) -> Result<u64> {
        Ok(bookmarks::load(&self.pool, id).await?)
    }

    async fn save_modes(&self, modes: PlaybackModes) -> Result<()> {
        Ok(modes::save(&self.pool, modes).await?)
    }

    async fn load_modes(&self) -> Result<PlaybackModes> {
        Ok(modes::load(&self.pool).await?)
    }
}

#[async_trait]
impl FavoriteGateway for SqliteStore {
    async fn is_favorite(&self, id: &TrackId) -> Result<bool> {
        Ok(favorites::is_favorite(&self.pool, id).await?)
    }

    async fn toggle_favorite(&self, id: &TrackId) -> Result<bool> {
        let is_favorite = favorites::toggle(&self.pool, id).await?;
        // No subscribers is fine
        let _ = self.favorite_changes.send(FavoriteChange {
            track_id: id.clone(),
            is_favorite,
        });
        Ok(is_favorite)
    }

    fn subscribe(&self) -> broadcast::Receiver<FavoriteChange> {
        self.favorite_changes.subscribe()
    }
}

/// Data retriever over the `SQLite` media library
#[derive(Clone)]
pub struct SqliteLibrary {
    pool: SqlitePool,
}

impl SqliteLibrary {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DataRetriever for SqliteLibrary {
    async fn resolve(&self, selector: &Selector, filter: Option<&str>) -> Result<Vec<Track>> {
        Ok(library::by_selector(&self.pool, selector, filter).await?)
    }

    async fn resolve_recently_added(&self, selector: &Selector) -> Result<Vec<Track>> {
        Ok(library::recently_added(&self.pool, selector).await?)
    }

    async fn resolve_most_played(&self, selector: &Selector) -> Result<Vec<Track>> {
        Ok(library::most_played(&self.pool, selector).await?)
    }

    async fn resolve_by_uri(&self, uri: &Url) -> Result<Vec<Track>> {
        match uri.scheme() {
            "file" => Ok(library::by_path(&self.pool, uri.path()).await?),
            SELECTOR_SCHEME => {
                let selector: Selector = uri.path().parse()?;
                Ok(library::by_selector(&self.pool, &selector.collection(), None).await?)
            }
            other => {
                debug!(scheme = other, "Unsupported URI scheme");
                Ok(Vec::new())
            }
        }
    }

    async fn resolve_by_search(&self, query: &str, hints: &SearchHints) -> Result<Vec<Track>> {
        Ok(library::search(&self.pool, query, hints).await?)
    }

    async fn resolve_tracks(&self, ids: &[TrackId]) -> Result<Vec<Track>> {
        Ok(library::by_ids(&self.pool, ids).await?)
    }
}
