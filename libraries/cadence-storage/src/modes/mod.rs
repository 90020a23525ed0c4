//! Repeat and shuffle mode persistence

use crate::error::{Result, StorageError};
use cadence_core::{PlaybackModes, RepeatMode, ShuffleMode};
use sqlx::{Row, SqlitePool};

/// Save both modes
pub async fn save(pool: &SqlitePool, modes: PlaybackModes) -> Result<()> {
    sqlx::query(
        "INSERT INTO playback_modes (id, repeat_mode, shuffle_mode, updated_at) VALUES (1, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
            repeat_mode = excluded.repeat_mode,
            shuffle_mode = excluded.shuffle_mode,
            updated_at = excluded.updated_at",
    )
    .bind(modes.repeat.as_str())
    .bind(modes.shuffle.as_str())
    .bind(chrono::Utc::now().timestamp())
    .execute(pool)
    .await?;
    Ok(())
}

/// Load the saved modes, both off when nothing was saved
pub async fn load(pool: &SqlitePool) -> Result<PlaybackModes> {
    let Some(row) = sqlx::query("SELECT repeat_mode, shuffle_mode FROM playback_modes WHERE id = 1")
        .fetch_optional(pool)
        .await?
    else {
        return Ok(PlaybackModes::default());
    };

    let repeat: String = row.get("repeat_mode");
    let shuffle: String = row.get("shuffle_mode");
    Ok(PlaybackModes {
        repeat: RepeatMode::parse(&repeat)
            .ok_or_else(|| StorageError::corrupt("repeat_mode", repeat))?,
        shuffle: ShuffleMode::parse(&shuffle)
            .ok_or_else(|| StorageError::corrupt("shuffle_mode", shuffle))?,
    })
}
