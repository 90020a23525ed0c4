//! Notification state coalescer
//!
//! Turns the noisy stream of metadata, status and favorite changes into a
//! throttled stream of render requests. Runs as its own task fed through a
//! single-consumer channel:
//!
//! 1. drop updates that do not change the snapshot
//! 2. cancel any pending publish
//! 3. schedule a publish after the update kind's delay, carrying a copy of
//!    the snapshot taken at scheduling time
//!
//! The first publish after becoming audible happens immediately when the host
//! requires instant foreground promotion.

use super::state::{NotificationUpdate, Snapshot};
use crate::config::NotificationConfig;
use cadence_core::{
    FavoriteChange, FavoriteGateway, NotificationRenderer, NotificationState, TrackId,
};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Input accepted by the coalescer task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoalescerInput {
    Update(NotificationUpdate),
    /// Playback was stopped on request: drop pending work and remove the
    /// notification. The next audible update brings it back.
    Dismiss,
}

struct PendingPublish {
    at: Instant,
    snapshot: NotificationState,
}

/// Debounces notification updates into renderer calls
pub struct NotificationCoalescer {
    config: NotificationConfig,
    renderer: Box<dyn NotificationRenderer>,
    favorites: Arc<dyn FavoriteGateway>,
    snapshot: Snapshot,
    pending: Option<PendingPublish>,
    is_foreground: bool,
    dismissed: bool,
}

impl NotificationCoalescer {
    pub fn new(
        config: NotificationConfig,
        renderer: Box<dyn NotificationRenderer>,
        favorites: Arc<dyn FavoriteGateway>,
    ) -> Self {
        Self {
            config,
            renderer,
            favorites,
            snapshot: Snapshot::default(),
            pending: None,
            is_foreground: false,
            dismissed: false,
        }
    }

    /// Spawn the coalescer loop
    ///
    /// The task ends when `cancel` fires or every sender of `rx` is dropped;
    /// either way the notification is removed on the way out.
    pub fn spawn(
        self,
        rx: mpsc::UnboundedReceiver<CoalescerInput>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let favorite_rx = self.favorites.subscribe();
        tokio::spawn(self.run(rx, favorite_rx, cancel))
    }

    async fn run(
        mut self,
        mut rx: mpsc::UnboundedReceiver<CoalescerInput>,
        favorite_rx: broadcast::Receiver<FavoriteChange>,
        cancel: CancellationToken,
    ) {
        let mut favorite_rx = Some(favorite_rx);

        loop {
            let deadline = self.pending.as_ref().map(|p| p.at);

            tokio::select! {
                biased;

                () = cancel.cancelled() => break,

                input = rx.recv() => match input {
                    Some(CoalescerInput::Update(update)) => self.on_update(update).await,
                    Some(CoalescerInput::Dismiss) => self.dismiss(),
                    None => break,
                },

                change = next_favorite(&mut favorite_rx) => match change {
                    Ok(change) => self.on_favorite_change(&change),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Favorite stream lagged, re-reading flag");
                        self.refresh_favorite().await;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Favorite stream closed");
                        favorite_rx = None;
                    }
                },

                () = sleep_until_deadline(deadline), if deadline.is_some() => {
                    self.publish_pending();
                }
            }
        }

        if !self.dismissed {
            self.dismiss();
        }
        debug!("Notification coalescer stopped");
    }

    async fn on_update(&mut self, update: NotificationUpdate) {
        let metadata_id = match &update {
            NotificationUpdate::Metadata(Some(metadata)) => Some(metadata.id.clone()),
            _ => None,
        };
        let delay = update.delay(&self.config);

        if !self.snapshot.apply(update) {
            trace!("Notification update filtered as duplicate");
            return;
        }

        // Seed the favorite flag for the new entry before publishing it
        if let Some(id) = metadata_id {
            let is_favorite = query_favorite(self.favorites.as_ref(), &id).await;
            self.snapshot.apply(NotificationUpdate::Favorite(is_favorite));
        }

        let snapshot = self.snapshot.state().clone();
        self.pending = None;

        if self.config.promote_immediately && !self.is_foreground && snapshot.status.is_playing()
        {
            debug!("Publishing immediately for foreground promotion");
            self.publish(&snapshot);
            return;
        }

        self.pending = Some(PendingPublish {
            at: Instant::now() + delay,
            snapshot,
        });
    }

    fn on_favorite_change(&mut self, change: &FavoriteChange) {
        if self.snapshot.current_id() != Some(&change.track_id) {
            return;
        }
        let update = NotificationUpdate::Favorite(change.is_favorite);
        let delay = update.delay(&self.config);
        if self.snapshot.apply(update) {
            self.pending = Some(PendingPublish {
                at: Instant::now() + delay,
                snapshot: self.snapshot.state().clone(),
            });
        }
    }

    async fn refresh_favorite(&mut self) {
        if let Some(id) = self.snapshot.current_id().cloned() {
            let is_favorite = query_favorite(self.favorites.as_ref(), &id).await;
            self.on_favorite_change(&FavoriteChange {
                track_id: id,
                is_favorite,
            });
        }
    }

    fn publish_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            self.publish(&pending.snapshot);
        }
    }

    fn publish(&mut self, snapshot: &NotificationState) {
        let handle = self.renderer.render(snapshot);
        self.dismissed = false;
        debug!(status = %snapshot.status, favorite = snapshot.is_favorite, "Notification published");

        if snapshot.status.is_playing() {
            self.renderer.promote_to_foreground(handle);
            self.is_foreground = true;
        } else if self.is_foreground {
            self.renderer.demote_from_foreground(false);
            self.is_foreground = false;
        }
    }

    fn dismiss(&mut self) {
        self.pending = None;
        self.renderer.demote_from_foreground(true);
        self.is_foreground = false;
        self.dismissed = true;
    }
}

async fn query_favorite(favorites: &dyn FavoriteGateway, id: &TrackId) -> bool {
    match favorites.is_favorite(id).await {
        Ok(is_favorite) => is_favorite,
        Err(e) => {
            warn!(track = %id, "Failed to read favorite flag: {}", e);
            false
        }
    }
}

async fn next_favorite(
    rx: &mut Option<broadcast::Receiver<FavoriteChange>>,
) -> Result<FavoriteChange, broadcast::error::RecvError> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
