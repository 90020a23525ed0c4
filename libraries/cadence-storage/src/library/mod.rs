//! Media library: tracks, playlists and the selection queries run over them
//!
//! Selectors map onto a scoped `SELECT` over `tracks`:
//!
//! | Category | Scope |
//! |---|---|
//! | `songs` | every track |
//! | `albums`, `podcasts`, `podcast_albums` | `album = value` |
//! | `artists`, `podcast_artists` | `artist = value` |
//! | `genres` | `genre = value` |
//! | `folders` | a `/value/` segment in `path` |
//! | `playlists`, `podcast_playlists` | playlist membership, playlist order |
//!
//! Podcast categories additionally require `is_podcast = 1`.

use crate::error::{signed, unsigned, Result};
use cadence_core::{MediaCategory, SearchFocus, SearchHints, Selector, Track, TrackId};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

/// Cap on recently-added and most-played results
pub const TOP_LIMIT: i64 = 100;

/// Cap on search results
pub const SEARCH_LIMIT: i64 = 500;

const SELECT_TRACKS: &str =
    "SELECT t.id, t.title, t.artist, t.album, t.duration_ms, t.is_podcast FROM tracks t";

/// A track as added to the library
#[derive(Debug, Clone)]
pub struct NewTrack {
    pub track: Track,
    pub genre: Option<String>,
    pub path: Option<String>,
    /// Unix timestamp (seconds)
    pub added_at: i64,
}

impl NewTrack {
    /// A track added now, without genre or path
    pub fn new(track: Track) -> Self {
        Self {
            track,
            genre: None,
            path: None,
            added_at: chrono::Utc::now().timestamp(),
        }
    }

    #[must_use]
    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = Some(genre.into());
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn added_at(mut self, timestamp: i64) -> Self {
        self.added_at = timestamp;
        self
    }
}

// ===== Writes =====

/// Insert or update a track
pub async fn upsert_track(pool: &SqlitePool, new: &NewTrack) -> Result<()> {
    let track = &new.track;
    sqlx::query(
        "INSERT INTO tracks (id, title, artist, album, genre, path, duration_ms, is_podcast, added_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            artist = excluded.artist,
            album = excluded.album,
            genre = excluded.genre,
            path = excluded.path,
            duration_ms = excluded.duration_ms,
            is_podcast = excluded.is_podcast",
    )
    .bind(&track.id)
    .bind(&track.title)
    .bind(&track.artist)
    .bind(&track.album)
    .bind(&new.genre)
    .bind(&new.path)
    .bind(signed("duration_ms", track.duration_ms)?)
    .bind(track.is_podcast)
    .bind(new.added_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Create (or replace) a playlist with the given track order
pub async fn save_playlist(
    pool: &SqlitePool,
    id: &str,
    name: &str,
    track_ids: &[TrackId],
) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO playlists (id, name) VALUES (?, ?)
         ON CONFLICT(id) DO UPDATE SET name = excluded.name",
    )
    .bind(id)
    .bind(name)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM playlist_tracks WHERE playlist_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    for (position, track_id) in track_ids.iter().enumerate() {
        sqlx::query("INSERT INTO playlist_tracks (playlist_id, track_id, position) VALUES (?, ?, ?)")
            .bind(id)
            .bind(track_id)
            .bind(signed("position", position)?)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Count one more play of a track
pub async fn record_play(pool: &SqlitePool, track_id: &TrackId) -> Result<()> {
    sqlx::query("UPDATE tracks SET play_count = play_count + 1 WHERE id = ?")
        .bind(track_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn count(pool: &SqlitePool) -> Result<u64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tracks")
        .fetch_one(pool)
        .await?;
    unsigned("count", count)
}

// ===== Selection queries =====

/// Tracks of a collection in collection order, optionally filtered
pub async fn by_selector(
    pool: &SqlitePool,
    selector: &Selector,
    filter: Option<&str>,
) -> Result<Vec<Track>> {
    let mut query = scoped(selector);
    if let Some(filter) = filter.map(str::trim).filter(|f| !f.is_empty()) {
        let pattern = format!("%{filter}%");
        query.push(" AND (t.title LIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR t.artist LIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR t.album LIKE ");
        query.push_bind(pattern);
        query.push(")");
    }
    query.push(collection_order(selector));
    fetch(pool, query).await
}

/// Newest tracks of a collection first
pub async fn recently_added(pool: &SqlitePool, selector: &Selector) -> Result<Vec<Track>> {
    let mut query = scoped(selector);
    query.push(" ORDER BY t.added_at DESC, t.rowid DESC LIMIT ");
    query.push_bind(TOP_LIMIT);
    fetch(pool, query).await
}

/// Most played tracks of a collection first
pub async fn most_played(pool: &SqlitePool, selector: &Selector) -> Result<Vec<Track>> {
    let mut query = scoped(selector);
    query.push(" ORDER BY t.play_count DESC, t.rowid LIMIT ");
    query.push_bind(TOP_LIMIT);
    fetch(pool, query).await
}

/// Tracks stored under exactly this path
pub async fn by_path(pool: &SqlitePool, path: &str) -> Result<Vec<Track>> {
    let mut query = QueryBuilder::new(SELECT_TRACKS);
    query.push(" WHERE t.path = ");
    query.push_bind(path.to_string());
    fetch(pool, query).await
}

/// Tracks for the given ids, in the order asked for; unknown ids are skipped
pub async fn by_ids(pool: &SqlitePool, ids: &[TrackId]) -> Result<Vec<Track>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut query = QueryBuilder::new(SELECT_TRACKS);
    query.push(" WHERE t.id IN (");
    let mut separated = query.separated(", ");
    for id in ids {
        separated.push_bind(id.as_str().to_string());
    }
    separated.push_unseparated(")");

    let found = fetch(pool, query).await?;
    Ok(ids
        .iter()
        .filter_map(|id| found.iter().find(|t| &t.id == id).cloned())
        .collect())
}

/// Free-text search narrowed by hints
///
/// The focus decides which column the query text is matched against;
/// structured hint fields always narrow further. An empty query with no
/// hints returns the most played tracks.
pub async fn search(pool: &SqlitePool, text: &str, hints: &SearchHints) -> Result<Vec<Track>> {
    let mut query = QueryBuilder::new(SELECT_TRACKS);
    query.push(" WHERE 1 = 1");

    let text = text.trim();
    if !text.is_empty() {
        let pattern = format!("%{text}%");
        let columns: &[&str] = match hints.focus {
            SearchFocus::Artist => &["t.artist"],
            SearchFocus::Album => &["t.album"],
            SearchFocus::Track => &["t.title"],
            SearchFocus::Genre => &["t.genre"],
            SearchFocus::Unstructured | SearchFocus::Any => {
                &["t.title", "t.artist", "t.album", "t.genre"]
            }
        };
        query.push(" AND (");
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                query.push(" OR ");
            }
            query.push(*column);
            query.push(" LIKE ");
            query.push_bind(pattern.clone());
        }
        query.push(")");
    }

    let structured = [
        ("t.artist", &hints.artist),
        ("t.album", &hints.album),
        ("t.title", &hints.title),
        ("t.genre", &hints.genre),
    ];
    for (column, value) in structured {
        if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            query.push(" AND ");
            query.push(column);
            query.push(" LIKE ");
            query.push_bind(format!("%{value}%"));
        }
    }

    query.push(" ORDER BY t.play_count DESC, t.rowid LIMIT ");
    query.push_bind(SEARCH_LIMIT);
    fetch(pool, query).await
}

fn scoped(selector: &Selector) -> QueryBuilder<'static, Sqlite> {
    let mut query = QueryBuilder::new(SELECT_TRACKS);
    let value = selector.value.clone();

    match selector.category {
        MediaCategory::Songs => {
            query.push(" WHERE 1 = 1");
        }
        MediaCategory::Albums | MediaCategory::Podcasts | MediaCategory::PodcastAlbums => {
            query.push(" WHERE t.album = ");
            query.push_bind(value);
        }
        MediaCategory::Artists | MediaCategory::PodcastArtists => {
            query.push(" WHERE t.artist = ");
            query.push_bind(value);
        }
        MediaCategory::Genres => {
            query.push(" WHERE t.genre = ");
            query.push_bind(value);
        }
        MediaCategory::Folders => {
            query.push(" WHERE t.path LIKE ");
            query.push_bind(format!("%/{value}/%"));
        }
        MediaCategory::Playlists | MediaCategory::PodcastPlaylists => {
            query.push(" JOIN playlist_tracks pt ON pt.track_id = t.id WHERE pt.playlist_id = ");
            query.push_bind(value);
        }
    }

    if selector.category.is_podcast() {
        query.push(" AND t.is_podcast = 1");
    }
    query
}

fn collection_order(selector: &Selector) -> &'static str {
    match selector.category {
        MediaCategory::Playlists | MediaCategory::PodcastPlaylists => " ORDER BY pt.position",
        MediaCategory::Songs => " ORDER BY t.title, t.rowid",
        _ => " ORDER BY t.rowid",
    }
}

async fn fetch(pool: &SqlitePool, mut query: QueryBuilder<'_, Sqlite>) -> Result<Vec<Track>> {
    let rows = query.build().fetch_all(pool).await?;
    rows.iter().map(track_from_row).collect()
}

fn track_from_row(row: &SqliteRow) -> Result<Track> {
    Ok(Track {
        id: TrackId::new(row.get::<String, _>("id")),
        title: row.get("title"),
        artist: row.get("artist"),
        album: row.get("album"),
        duration_ms: unsigned("duration_ms", row.get::<i64, _>("duration_ms"))?,
        is_podcast: row.get("is_podcast"),
    })
}
