//! Playing queue persistence
//!
//! The queue is stored row per entry in play order plus a single
//! `queue_state` row holding the current index. Saving replaces both in one
//! transaction so a crash never leaves a half-written queue.

use crate::error::{signed, unsigned, Result};
use cadence_core::{QueueEntry, TrackId};
use sqlx::{Row, SqlitePool};

/// Replace the saved queue
pub async fn save(pool: &SqlitePool, entries: &[QueueEntry], current_index: usize) -> Result<()> {
    let now = chrono::Utc::now().timestamp();
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM playing_queue")
        .execute(&mut *tx)
        .await?;

    for (idx, entry) in entries.iter().enumerate() {
        sqlx::query(
            "INSERT INTO playing_queue
             (idx, track_id, source_id, position, is_podcast, duration_ms, title, artist, album)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(signed("idx", idx)?)
        .bind(&entry.id)
        .bind(&entry.source_id)
        .bind(i64::from(entry.position))
        .bind(entry.is_podcast)
        .bind(signed("duration_ms", entry.duration_ms)?)
        .bind(&entry.title)
        .bind(&entry.artist)
        .bind(&entry.album)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query(
        "INSERT INTO queue_state (id, current_index, updated_at) VALUES (1, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
            current_index = excluded.current_index,
            updated_at = excluded.updated_at",
    )
    .bind(signed("current_index", current_index)?)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Load the saved queue and current index
///
/// An empty queue loads as `(vec![], 0)`. A stored index past the end is
/// clamped to the last entry.
pub async fn load(pool: &SqlitePool) -> Result<(Vec<QueueEntry>, usize)> {
    let rows = sqlx::query(
        "SELECT track_id, source_id, position, is_podcast, duration_ms, title, artist, album
         FROM playing_queue ORDER BY idx",
    )
    .fetch_all(pool)
    .await?;

    let entries = rows
        .iter()
        .map(|row| {
            Ok(QueueEntry {
                id: TrackId::new(row.get::<String, _>("track_id")),
                source_id: row.get("source_id"),
                position: unsigned("position", row.get::<i64, _>("position"))?,
                is_podcast: row.get("is_podcast"),
                duration_ms: unsigned("duration_ms", row.get::<i64, _>("duration_ms"))?,
                title: row.get("title"),
                artist: row.get("artist"),
                album: row.get("album"),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    if entries.is_empty() {
        return Ok((entries, 0));
    }

    let current: Option<i64> = sqlx::query_scalar("SELECT current_index FROM queue_state WHERE id = 1")
        .fetch_optional(pool)
        .await?;
    let current: usize = unsigned("current_index", current.unwrap_or(0))?;

    let last = entries.len() - 1;
    Ok((entries, current.min(last)))
}

/// Drop the saved queue
pub async fn clear(pool: &SqlitePool) -> Result<()> {
    save(pool, &[], 0).await
}
