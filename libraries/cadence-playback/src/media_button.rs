//! Headset button multiplexing
//!
//! A single headset button maps click bursts to actions:
//! one click toggles play/pause, two skip to next, three skip to previous.
//! Each click restarts a short quiet window; when it elapses the collected
//! count is dispatched as a burst and the count starts over. Clicks beyond
//! the maximum neither count nor extend the window.

use crate::config::MediaButtonConfig;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::trace;

/// Action selected by a click burst
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadsetAction {
    PlayPause,
    SkipToNext,
    SkipToPrevious,
}

impl HeadsetAction {
    /// Map a dispatched click count; counts outside 1..=3 select nothing
    pub fn from_clicks(clicks: u8) -> Option<Self> {
        match clicks {
            1 => Some(Self::PlayPause),
            2 => Some(Self::SkipToNext),
            3 => Some(Self::SkipToPrevious),
            _ => None,
        }
    }
}

/// A finished click burst, as delivered on the multiplexer's channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickBurst {
    pub id: u64,
    pub clicks: u8,
}

/// Debounces headset clicks and reports each settled burst on a channel
///
/// `wrap` turns the burst into the channel's message type so it can land in
/// the same queue as every other command. A click arriving once the quiet
/// window has elapsed opens a new burst even if the previous one has not
/// been settled yet.
pub struct HeadsetMultiplexer<T> {
    config: MediaButtonConfig,
    burst: u64,
    clicks: u8,
    deadline: Option<Instant>,
    pending: Option<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<T>,
    wrap: fn(ClickBurst) -> T,
}

impl<T: Send + 'static> HeadsetMultiplexer<T> {
    pub fn new(
        config: MediaButtonConfig,
        tx: mpsc::UnboundedSender<T>,
        wrap: fn(ClickBurst) -> T,
    ) -> Self {
        Self {
            config,
            burst: 0,
            clicks: 0,
            deadline: None,
            pending: None,
            tx,
            wrap,
        }
    }

    /// Register one click
    pub fn click(&mut self) {
        let now = Instant::now();
        if self.deadline.is_some_and(|deadline| now >= deadline) {
            // Previous burst is already dispatched or about to be
            self.start_burst();
        }

        self.clicks = self.clicks.saturating_add(1);
        if self.clicks > self.config.max_clicks {
            trace!(clicks = self.clicks, "Extra headset click discarded");
            return;
        }

        self.cancel_pending();
        let burst = ClickBurst {
            id: self.burst,
            clicks: self.clicks,
        };
        let deadline = now + self.config.debounce();
        self.deadline = Some(deadline);
        let tx = self.tx.clone();
        let wrap = self.wrap;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let _ = tx.send(wrap(burst));
        }));
    }

    /// Take a dispatched burst
    ///
    /// Resets the count only when `burst` is the one still being counted.
    pub fn settle(&mut self, burst: ClickBurst) -> Option<HeadsetAction> {
        if burst.id == self.burst {
            self.start_burst();
        }
        HeadsetAction::from_clicks(burst.clicks)
    }

    fn start_burst(&mut self) {
        self.burst += 1;
        self.clicks = 0;
        self.deadline = None;
        // A finished timer still delivers; it is not aborted
        self.pending = None;
    }

    fn cancel_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl<T> Drop for HeadsetMultiplexer<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}
