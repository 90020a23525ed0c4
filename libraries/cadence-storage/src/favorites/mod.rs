//! Favorite tracks

use crate::error::Result;
use cadence_core::TrackId;
use sqlx::SqlitePool;

pub async fn is_favorite(pool: &SqlitePool, track_id: &TrackId) -> Result<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM favorites WHERE track_id = ?")
        .bind(track_id)
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}

/// Flip the favorite flag and return the new value
pub async fn toggle(pool: &SqlitePool, track_id: &TrackId) -> Result<bool> {
    let mut tx = pool.begin().await?;

    let removed = sqlx::query("DELETE FROM favorites WHERE track_id = ?")
        .bind(track_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let is_favorite = removed == 0;
    if is_favorite {
        sqlx::query("INSERT INTO favorites (track_id, created_at) VALUES (?, ?)")
            .bind(track_id)
            .bind(chrono::Utc::now().timestamp())
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(is_favorite)
}

/// All favorite track ids, most recent first
pub async fn list(pool: &SqlitePool) -> Result<Vec<TrackId>> {
    let ids: Vec<String> =
        sqlx::query_scalar("SELECT track_id FROM favorites ORDER BY created_at DESC, track_id")
            .fetch_all(pool)
            .await?;
    Ok(ids.into_iter().map(TrackId::new).collect())
}
