//! Playing queue
//!
//! A single ordered list of entries plus the index of the current one:
//!
//! ```text
//!   0  Entry A   (ordinal 0)
//! > 1  Entry B   (ordinal 1)   <- current
//!   2  Entry C   (ordinal 2)   <- relative offset 0
//!   3  Entry D   (ordinal 3)   <- relative offset 1
//! ```
//!
//! Every entry carries an insertion ordinal (`QueueEntry::position`) that
//! survives reordering; `sort()` restores ordinal order.
//!
//! The queue is plain data. It is owned by the playback controller, which is
//! the only writer, so nothing here is synchronized.

use crate::error::{PlaybackError, Result};
use crate::shuffle::{self, ShuffleStrategy};
use cadence_core::{PositionInQueue, QueueEntry, RepeatMode, ShuffleMode};
use std::time::Duration;

/// What `Queue::previous` decided
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviousOutcome {
    /// Seek the current entry back to 0 instead of skipping
    Restart,
    /// The previous entry, now current
    Previous(QueueEntry),
}

/// Result of removing one entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveOutcome {
    pub removed: QueueEntry,
    /// The removed entry was the current one
    pub was_current: bool,
}

/// Ordered queue with a current position and repeat/shuffle modes
#[derive(Debug, Clone)]
pub struct Queue {
    entries: Vec<QueueEntry>,

    /// Index of the current entry; meaningful only when non-empty
    current: usize,

    repeat: RepeatMode,
    shuffle: ShuffleMode,
    strategy: ShuffleStrategy,

    /// Bookmark past which `previous` restarts instead of skipping
    restart_threshold: Duration,
}

impl Queue {
    /// Create new empty queue
    pub fn new(strategy: ShuffleStrategy, restart_threshold: Duration) -> Self {
        Self {
            entries: Vec::new(),
            current: 0,
            repeat: RepeatMode::Off,
            shuffle: ShuffleMode::Off,
            strategy,
            restart_threshold,
        }
    }

    // ===== Queries =====

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    /// Index of the current entry, `None` when empty
    pub fn current_index(&self) -> Option<usize> {
        (!self.entries.is_empty()).then_some(self.current)
    }

    pub fn current(&self) -> Option<&QueueEntry> {
        self.entries.get(self.current)
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        self.repeat
    }

    pub fn set_repeat_mode(&mut self, mode: RepeatMode) {
        self.repeat = mode;
    }

    pub fn shuffle_mode(&self) -> ShuffleMode {
        self.shuffle
    }

    /// Record the shuffle mode without reordering (used on restore)
    pub fn set_shuffle_mode(&mut self, mode: ShuffleMode) {
        self.shuffle = mode;
    }

    /// Owned copy of the entries and current index, for persistence
    pub fn snapshot(&self) -> (Vec<QueueEntry>, usize) {
        (self.entries.clone(), self.current)
    }

    /// Classify the current index for skip affordances
    ///
    /// Repeat ALL and ONE never run out of entries, so every position reports
    /// `InMiddle` under them.
    pub fn position_in_queue(&self) -> PositionInQueue {
        if self.entries.is_empty() {
            return PositionInQueue::FirstAndLast;
        }
        match self.repeat {
            RepeatMode::All | RepeatMode::One => PositionInQueue::InMiddle,
            RepeatMode::Off => PositionInQueue::classify(self.current, self.entries.len()),
        }
    }

    /// Ordinal to give the next inserted entry
    fn next_ordinal(&self) -> u32 {
        self.entries
            .iter()
            .map(|e| e.position)
            .max()
            .map_or(0, |max| max + 1)
    }

    /// Absolute index of a relative offset (0 = entry after current)
    ///
    /// Offsets come from outside; one too large to address any index fails
    /// instead of wrapping around.
    fn absolute(&self, offset: usize) -> Result<usize> {
        self.current
            .checked_add(1)
            .and_then(|next| next.checked_add(offset))
            .ok_or_else(|| PlaybackError::invalid_position(offset, self.entries.len()))
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.entries.len() {
            Ok(())
        } else {
            Err(PlaybackError::invalid_position(index, self.entries.len()))
        }
    }

    // ===== Structural mutations =====

    /// Replace the whole queue, starting at `start`
    ///
    /// An out-of-bounds `start` for a non-empty list fails and leaves the
    /// queue unchanged.
    pub fn replace(&mut self, entries: Vec<QueueEntry>, start: usize) -> Result<()> {
        if !entries.is_empty() && start >= entries.len() {
            return Err(PlaybackError::invalid_position(start, entries.len()));
        }
        self.entries = entries;
        self.current = if self.entries.is_empty() { 0 } else { start };
        Ok(())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.current = 0;
    }

    /// Insert right after the current entry ("play next")
    ///
    /// Returns the absolute index of the first inserted entry.
    pub fn insert_next(&mut self, entries: Vec<QueueEntry>) -> usize {
        let at = if self.entries.is_empty() { 0 } else { self.current + 1 };
        self.insert_at(at, entries)
    }

    /// Append at the tail ("play later")
    ///
    /// Returns the absolute index of the first inserted entry.
    pub fn insert_later(&mut self, entries: Vec<QueueEntry>) -> usize {
        self.insert_at(self.entries.len(), entries)
    }

    fn insert_at(&mut self, at: usize, entries: Vec<QueueEntry>) -> usize {
        let first_ordinal = self.next_ordinal();
        let stamped = entries
            .into_iter()
            .zip(first_ordinal..)
            .map(|(entry, position)| QueueEntry { position, ..entry });
        self.entries.splice(at..at, stamped);
        at
    }

    /// Move the entry at `from` to `to` (absolute indices)
    pub fn move_item(&mut self, from: usize, to: usize) -> Result<()> {
        self.check_index(from)?;
        self.check_index(to)?;
        if from == to {
            return Ok(());
        }

        let entry = self.entries.remove(from);
        self.entries.insert(to, entry);

        if from == self.current {
            self.current = to;
        } else if from < self.current && to >= self.current {
            self.current -= 1;
        } else if from > self.current && to <= self.current {
            self.current += 1;
        }
        Ok(())
    }

    /// Move between relative offsets; a no-op when `from == to`
    pub fn move_relative(&mut self, from: usize, to: usize) -> Result<()> {
        if from == to {
            return Ok(());
        }
        self.move_item(self.absolute(from)?, self.absolute(to)?)
    }

    /// Move the entry at a relative offset so it plays next
    pub fn move_relative_to_next(&mut self, offset: usize) -> Result<()> {
        self.move_relative(offset, 0)
    }

    /// Swap two entries (absolute indices)
    pub fn swap(&mut self, from: usize, to: usize) -> Result<()> {
        self.check_index(from)?;
        self.check_index(to)?;
        if from == to {
            return Ok(());
        }

        self.entries.swap(from, to);
        if self.current == from {
            self.current = to;
        } else if self.current == to {
            self.current = from;
        }
        Ok(())
    }

    /// Swap between relative offsets; a no-op when `from == to`
    pub fn swap_relative(&mut self, from: usize, to: usize) -> Result<()> {
        if from == to {
            return Ok(());
        }
        self.swap(self.absolute(from)?, self.absolute(to)?)
    }

    /// Remove the entry at an absolute index
    ///
    /// Removing the current entry makes the following one current (the new
    /// last entry when the removed one was last).
    pub fn remove_at(&mut self, index: usize) -> Result<RemoveOutcome> {
        self.check_index(index)?;

        let removed = self.entries.remove(index);
        let was_current = index == self.current;

        if index < self.current {
            self.current -= 1;
        } else if was_current {
            self.current = index.min(self.entries.len().saturating_sub(1));
        }

        Ok(RemoveOutcome {
            removed,
            was_current,
        })
    }

    /// Remove the entry at a relative offset
    pub fn remove_relative(&mut self, offset: usize) -> Result<RemoveOutcome> {
        self.remove_at(self.absolute(offset)?)
    }

    /// Make the entry with insertion ordinal `ordinal` current
    pub fn skip_to(&mut self, ordinal: u32) -> Result<&QueueEntry> {
        let index = self
            .entries
            .iter()
            .position(|e| e.position == ordinal)
            .ok_or_else(|| PlaybackError::invalid_position(ordinal as usize, self.entries.len()))?;
        self.current = index;
        Ok(&self.entries[index])
    }

    // ===== Navigation =====

    fn next_index(&self) -> Option<usize> {
        if self.entries.is_empty() {
            return None;
        }
        match self.repeat {
            RepeatMode::One => Some(self.current),
            RepeatMode::All => Some((self.current + 1) % self.entries.len()),
            RepeatMode::Off => {
                let next = self.current + 1;
                (next < self.entries.len()).then_some(next)
            }
        }
    }

    /// Advance per the repeat mode and return the new current entry
    ///
    /// Repeat ONE never advances, ALL wraps, OFF returns `None` past the end
    /// (leaving the current index untouched).
    pub fn next(&mut self, track_ended: bool) -> Option<QueueEntry> {
        let index = self.next_index()?;
        tracing::trace!(from = self.current, to = index, track_ended, "queue advance");
        self.current = index;
        self.entries.get(index).cloned()
    }

    /// The entry `next(true)` would return, without moving
    pub fn peek_next(&self) -> Option<&QueueEntry> {
        self.next_index().and_then(|index| self.entries.get(index))
    }

    /// Step back, or restart the current entry past the threshold
    ///
    /// At the first entry ALL wraps to the last one; otherwise the current
    /// entry restarts.
    pub fn previous(&mut self, bookmark: Duration) -> Option<PreviousOutcome> {
        if self.entries.is_empty() {
            return None;
        }
        if bookmark > self.restart_threshold {
            return Some(PreviousOutcome::Restart);
        }

        let index = match (self.current, self.repeat) {
            (0, RepeatMode::All) => self.entries.len() - 1,
            (0, _) => return Some(PreviousOutcome::Restart),
            (current, _) => current - 1,
        };
        self.current = index;
        Some(PreviousOutcome::Previous(self.entries[index].clone()))
    }

    // ===== Ordering =====

    /// Shuffle the queue keeping the current entry current (at index 0)
    pub fn shuffle(&mut self) {
        let current = self.current().cloned();
        let entries = std::mem::take(&mut self.entries);
        self.entries = shuffle::shuffle(entries, current.as_ref(), self.strategy);
        self.current = 0;
        self.shuffle = ShuffleMode::On;
    }

    /// Restore insertion order keeping the current entry current
    pub fn sort(&mut self) {
        let current_ordinal = self.current().map(|e| e.position);
        self.entries.sort_by_key(|e| e.position);
        self.current = current_ordinal
            .and_then(|ordinal| self.entries.iter().position(|e| e.position == ordinal))
            .unwrap_or(0);
        self.shuffle = ShuffleMode::Off;
    }
}
