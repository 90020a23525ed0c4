//! Notification renderer that writes to the log

use cadence_core::{NotificationHandle, NotificationRenderer, NotificationState};
use tracing::{debug, info};

/// Logs each published notification instead of drawing one
#[derive(Debug, Default)]
pub struct LogRenderer {
    next_handle: u64,
    foreground: bool,
}

impl LogRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NotificationRenderer for LogRenderer {
    fn render(&mut self, state: &NotificationState) -> NotificationHandle {
        self.next_handle += 1;
        match &state.metadata {
            Some(metadata) => info!(
                status = %state.status,
                favorite = state.is_favorite,
                "♪ {} - {}",
                metadata.artist.as_deref().unwrap_or("Unknown artist"),
                metadata.title
            ),
            None => info!(status = %state.status, "♪ Nothing queued"),
        }
        NotificationHandle(self.next_handle)
    }

    fn promote_to_foreground(&mut self, handle: NotificationHandle) {
        if !self.foreground {
            debug!(handle = handle.0, "Notification in foreground");
        }
        self.foreground = true;
    }

    fn demote_from_foreground(&mut self, remove: bool) {
        self.foreground = false;
        debug!(remove, "Notification left foreground");
    }
}
