//! Checkpoint notification fan-out.
//!
//! Whoever owns the flush/checkpoint event holds a [`CheckpointFanout`]
//! with one handle per index, and calls [`notify`](CheckpointFanout::notify)
//! once per event. Each index compacts itself under its own lock; the
//! indices do not coordinate with each other.

use std::sync::Arc;

use crate::operation::OpId;

/// An index that can compact itself when a checkpoint is signalled.
pub trait Checkpoint: Send + Sync {
    /// Short name for logging.
    fn name(&self) -> &'static str;

    /// Drops state that can no longer affect a read of any row with id at
    /// or above `low_watermark`. Returns the number of entries removed.
    fn checkpoint(&self, low_watermark: OpId) -> usize;
}

/// Explicit list of checkpoint subscribers.
#[derive(Clone, Default)]
pub struct CheckpointFanout {
    subscribers: Vec<Arc<dyn Checkpoint>>,
}

impl CheckpointFanout {
    /// Creates a fan-out with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a subscriber; it is notified after those already registered.
    pub fn subscribe(&mut self, subscriber: Arc<dyn Checkpoint>) {
        self.subscribers.push(subscriber);
    }

    /// Number of subscribers.
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Returns true if nothing is subscribed.
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Signals every subscriber in registration order. Returns the total
    /// number of entries removed.
    pub fn notify(&self, low_watermark: OpId) -> usize {
        self.subscribers
            .iter()
            .map(|s| s.checkpoint(low_watermark))
            .sum()
    }
}

impl std::fmt::Debug for CheckpointFanout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.subscribers.iter().map(|s| s.name()))
            .finish()
    }
}
