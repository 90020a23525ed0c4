//! Ordered, best-effort persistence off the command loop
//!
//! Saves are queued on a channel and executed one at a time by a dedicated
//! task, so a bookmark queued before a queue save is always written first.
//! Failures are logged and never reach the controller.

use cadence_core::{PersistenceGateway, PlaybackModes, QueueEntry, TrackId};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

enum PersistJob {
    Queue {
        entries: Vec<QueueEntry>,
        position: usize,
    },
    Bookmark {
        id: TrackId,
        bookmark_ms: u64,
    },
    Modes(PlaybackModes),
    Flush(oneshot::Sender<()>),
}

/// Handle to the persister task
#[derive(Clone)]
pub struct Persister {
    tx: mpsc::UnboundedSender<PersistJob>,
}

impl Persister {
    /// Spawn the persister task; it ends once every handle is dropped
    pub fn spawn(gateway: Arc<dyn PersistenceGateway>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run(gateway, rx));
        (Self { tx }, handle)
    }

    pub fn save_queue(&self, entries: Vec<QueueEntry>, position: usize) {
        self.send(PersistJob::Queue { entries, position });
    }

    pub fn save_bookmark(&self, id: TrackId, bookmark_ms: u64) {
        self.send(PersistJob::Bookmark { id, bookmark_ms });
    }

    pub fn save_modes(&self, modes: PlaybackModes) {
        self.send(PersistJob::Modes(modes));
    }

    /// Wait until every job queued so far has been executed
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        self.send(PersistJob::Flush(done_tx));
        let _ = done_rx.await;
    }

    fn send(&self, job: PersistJob) {
        if self.tx.send(job).is_err() {
            warn!("Persister task is gone, dropping save");
        }
    }
}

async fn run(gateway: Arc<dyn PersistenceGateway>, mut rx: mpsc::UnboundedReceiver<PersistJob>) {
    while let Some(job) = rx.recv().await {
        match job {
            PersistJob::Queue { entries, position } => {
                if let Err(e) = gateway.save_queue(&entries, position).await {
                    warn!(len = entries.len(), "Failed to save queue: {}", e);
                }
            }
            PersistJob::Bookmark { id, bookmark_ms } => {
                if let Err(e) = gateway.save_bookmark(&id, bookmark_ms).await {
                    warn!(track = %id, "Failed to save bookmark: {}", e);
                }
            }
            PersistJob::Modes(modes) => {
                if let Err(e) = gateway.save_modes(modes).await {
                    warn!("Failed to save playback modes: {}", e);
                }
            }
            PersistJob::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!("Persister stopped");
}
