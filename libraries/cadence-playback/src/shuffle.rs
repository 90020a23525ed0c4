//! Shuffle algorithms for queue randomization
//!
//! Both strategies pin the currently playing entry at the head of the new
//! ordering so playback is not disrupted; only the rest is randomized.

use cadence_core::QueueEntry;
use rand::seq::SliceRandom;
use rand::thread_rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How the tail of the queue is randomized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShuffleStrategy {
    /// Uniform Fisher-Yates shuffle
    #[default]
    Random,
    /// Spread artists out so the same artist rarely plays twice in a row
    Smart,
}

/// Shuffle `entries`, moving `current` (matched by id and ordinal) to index 0
///
/// Calls are unseeded: the same input yields different orderings except for
/// the pinned head.
pub fn shuffle(
    mut entries: Vec<QueueEntry>,
    current: Option<&QueueEntry>,
    strategy: ShuffleStrategy,
) -> Vec<QueueEntry> {
    let head = current.and_then(|current| {
        entries
            .iter()
            .position(|e| e.id == current.id && e.position == current.position)
            .map(|index| entries.remove(index))
    });

    match strategy {
        ShuffleStrategy::Random => shuffle_random(&mut entries),
        ShuffleStrategy::Smart => entries = shuffle_smart(entries),
    }

    if let Some(head) = head {
        entries.insert(0, head);
    }
    entries
}

fn shuffle_random(entries: &mut [QueueEntry]) {
    entries.shuffle(&mut thread_rng());
}

/// Group by artist, shuffle within groups and interleave the groups
/// round-robin in random artist order
fn shuffle_smart(mut entries: Vec<QueueEntry>) -> Vec<QueueEntry> {
    if entries.len() <= 2 {
        shuffle_random(&mut entries);
        return entries;
    }

    let mut rng = thread_rng();
    let total = entries.len();

    let mut by_artist: HashMap<Option<String>, Vec<QueueEntry>> = HashMap::new();
    for entry in entries {
        by_artist.entry(entry.artist.clone()).or_default().push(entry);
    }

    let mut groups: Vec<std::vec::IntoIter<QueueEntry>> = by_artist
        .into_values()
        .map(|mut group| {
            group.shuffle(&mut rng);
            group.into_iter()
        })
        .collect();
    groups.shuffle(&mut rng);

    let mut result = Vec::with_capacity(total);
    while result.len() < total {
        for group in &mut groups {
            if let Some(entry) = group.next() {
                result.push(entry);
            }
        }
    }
    result
}
