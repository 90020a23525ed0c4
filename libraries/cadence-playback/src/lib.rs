//! Cadence - Playback Engine
//!
//! Platform-agnostic playback engine for Cadence.
//!
//! This crate provides:
//! - Queue store (ordinals, relative edits, repeat/shuffle navigation)
//! - Shuffle engine (Random + Smart)
//! - Dual-player delegate (pre-buffered next track, crossfade, ducking)
//! - Playback controller (commands, audio focus, media buttons, custom actions)
//! - Notification state coalescer
//!
//! # Architecture
//!
//! `cadence-playback` knows nothing about decoding, audio devices or where
//! tracks come from. Those are plugged in through traits:
//! - [`AudioPlayer`] for the two audio backends
//! - [`cadence_core::DataRetriever`] for turning selections into tracks
//! - [`cadence_core::PersistenceGateway`] and [`cadence_core::FavoriteGateway`]
//!   for storage
//! - [`cadence_core::NotificationRenderer`] for the playback notification
//!
//! A [`Session`] owns one engine. It runs a single command loop, so the
//! controller sees every command, backend event and resolution result in
//! order and never needs a lock.
//!
//! # Example
//!
//! ```rust
//! use cadence_playback::testing::{FakePlayer, InMemoryFavorites, InMemoryPersistence,
//!     InMemoryRetriever, RecordingRenderer, song};
//! use cadence_playback::{Collaborators, Command, PlaybackConfig, Session};
//! use cadence_core::Selector;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let library = InMemoryRetriever::new();
//! library.insert("albums/1", vec![song("a", "X"), song("b", "Y")]);
//!
//! let session = Session::start(
//!     PlaybackConfig::default(),
//!     |sinks| FakePlayer::pair(sinks).0,
//!     Collaborators {
//!         retriever: Arc::new(library),
//!         persistence: Arc::new(InMemoryPersistence::new()),
//!         favorites: Arc::new(InMemoryFavorites::new()),
//!     },
//!     Box::new(RecordingRenderer::new()),
//! );
//!
//! let selector: Selector = "albums/1".parse().unwrap();
//! session
//!     .send(Command::PlayFromSelection { selector, filter: None })
//!     .unwrap();
//! session.stop().await;
//! # }
//! ```

mod actions;
mod config;
mod controller;
mod error;
mod events;
mod media_button;
pub mod notification;
mod persister;
pub mod player;
mod queue;
mod session;
pub mod shuffle;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Public exports
pub use actions::{CustomAction, FocusChange, MediaButton};
pub use config::{MediaButtonConfig, NotificationConfig, PlaybackConfig};
pub use controller::{Collaborators, Command, Message, Placement, PlayTarget, PlaybackController};
pub use error::{PlaybackError, Result};
pub use events::PlaybackEvent;
pub use media_button::{ClickBurst, HeadsetAction, HeadsetMultiplexer};
pub use persister::Persister;
pub use player::{AudioPlayer, CrossfadeSettings, DualPlayer, EventSink, FadeCurve};
pub use queue::{PreviousOutcome, Queue, RemoveOutcome};
pub use session::{CommandSender, Session};
pub use shuffle::ShuffleStrategy;
