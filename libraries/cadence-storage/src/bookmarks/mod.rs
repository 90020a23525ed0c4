//! Per-track resume positions

use crate::error::{signed, unsigned, Result};
use cadence_core::TrackId;
use sqlx::SqlitePool;

/// Store the bookmark of a track, replacing any previous one
pub async fn save(pool: &SqlitePool, track_id: &TrackId, bookmark_ms: u64) -> Result<()> {
    sqlx::query(
        "INSERT INTO bookmarks (track_id, bookmark_ms, updated_at) VALUES (?, ?, ?)
         ON CONFLICT(track_id) DO UPDATE SET
            bookmark_ms = excluded.bookmark_ms,
            updated_at = excluded.updated_at",
    )
    .bind(track_id)
    .bind(signed("bookmark_ms", bookmark_ms)?)
    .bind(chrono::Utc::now().timestamp())
    .execute(pool)
    .await?;
    Ok(())
}

/// Bookmark of a track, 0 when none was saved
pub async fn load(pool: &SqlitePool, track_id: &TrackId) -> Result<u64> {
    let bookmark: Option<i64> =
        sqlx::query_scalar("SELECT bookmark_ms FROM bookmarks WHERE track_id = ?")
            .bind(track_id)
            .fetch_optional(pool)
            .await?;
    unsigned("bookmark_ms", bookmark.unwrap_or(0))
}
