//! Cadence Core
//!
//! Platform-agnostic domain types, collaborator traits and error handling for
//! the Cadence playback engine.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `Track`, `QueueEntry`, `Selector`, playback modes and statuses
//! - **Collaborator Traits**: `DataRetriever`, `PersistenceGateway`,
//!   `FavoriteGateway`, `NotificationRenderer`
//! - **Error Handling**: Unified `CadenceError` and `Result` types
//!
//! The engine itself lives in `cadence-playback`; everything it needs from the
//! outside world (library queries, storage, favorites, notification rendering)
//! is reached through the traits defined here.
//!
//! # Example
//!
//! ```rust
//! use cadence_core::types::{MediaCategory, QueueEntry, Selector, Track, TrackId};
//!
//! let selector: Selector = "albums/42".parse().unwrap();
//! assert_eq!(selector.category, MediaCategory::Albums);
//!
//! let track = Track::new(TrackId::new("7"), "Song", 180_000);
//! let entry = QueueEntry::from_track(track, selector.to_string(), 0);
//! assert_eq!(entry.position, 0);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{CadenceError, Result};
pub use traits::{DataRetriever, FavoriteGateway, NotificationRenderer, PersistenceGateway};
pub use types::{
    FavoriteChange, MediaCategory, MetadataEntity, NotificationHandle, NotificationState,
    PlaybackModes, PlaybackSession, PlaybackStatus, PlayerErrorKind, PositionInQueue, QueueEntry,
    RepeatMode, SearchFocus, SearchHints, Selector, ShuffleMode, SkipActions, SkipType, Track,
    TrackId,
};
