//! Dual-player delegate and the audio backend seam it drives

mod backend;
mod crossfade;
mod delegate;

pub use backend::{AudioPlayer, BackendEvent, BackendEventKind, EventSink};
pub use crossfade::{CrossfadeSettings, Fade, FadeCurve, MAX_CROSSFADE_MS};
pub use delegate::{DualPlayer, PlayStart, PlayerEvent, SlotState};
