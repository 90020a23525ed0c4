//! Notification state coalescing

mod coalescer;
mod state;

pub use coalescer::{CoalescerInput, NotificationCoalescer};
pub use state::{NotificationUpdate, Snapshot};
