//! Commit-time watermark index.
//!
//! Maps a commit timestamp to the highest operation id included in that
//! commit. A reader at snapshot time `t` may see exactly the operations up
//! to the id recorded under the greatest timestamp `<= t`.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use tracing::{debug, warn};

use super::checkpoint::Checkpoint;
use crate::operation::OpId;

/// Commit timestamp, in the upstream's clock units.
pub type CommitTime = i64;

/// Commit time to highest committed operation id.
#[derive(Debug, Default)]
pub struct CommitTimeIndex {
    entries: RwLock<BTreeMap<CommitTime, OpId>>,
}

impl CommitTimeIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that every operation with id `<= max_id` is committed as of
    /// `time`.
    ///
    /// Both arguments must be non-decreasing across calls. An entry that
    /// would move either backwards is logged and ignored, so keys and
    /// values stay monotonic. Returns whether the entry was recorded.
    pub fn put(&self, time: CommitTime, max_id: OpId) -> bool {
        let mut entries = self.entries.write();
        if let Some((&last_time, &last_id)) = entries.iter().next_back() {
            if time < last_time || max_id < last_id {
                warn!(
                    time,
                    max_id, last_time, last_id, "ignoring non-monotonic commit watermark"
                );
                return false;
            }
        }
        entries.insert(time, max_id);
        true
    }

    /// Returns the highest operation id visible at `snapshot_time`, or
    /// `None` if nothing had committed by then.
    pub fn max_visible(&self, snapshot_time: CommitTime) -> Option<OpId> {
        self.entries
            .read()
            .range(..=snapshot_time)
            .next_back()
            .map(|(_, &id)| id)
    }

    /// Collapses entries whose id is below `min_id` into the latest such
    /// entry. Returns the number of entries removed.
    ///
    /// Lookups keep returning the same bound for every snapshot time at or
    /// after the surviving entry.
    pub fn compact_below(&self, min_id: OpId) -> usize {
        let mut entries = self.entries.write();
        let stale: Vec<CommitTime> = entries
            .iter()
            .take_while(|(_, id)| **id < min_id)
            .map(|(&time, _)| time)
            .collect();
        let Some((_, older)) = stale.split_last() else {
            return 0;
        };
        for time in older {
            entries.remove(time);
        }
        older.len()
    }

    /// Number of watermark entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing has committed yet.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns every `(time, max_id)` entry in ascending time order.
    pub fn snapshot(&self) -> Vec<(CommitTime, OpId)> {
        self.entries.read().iter().map(|(&t, &id)| (t, id)).collect()
    }
}

impl Checkpoint for CommitTimeIndex {
    fn name(&self) -> &'static str {
        "commit_time"
    }

    fn checkpoint(&self, low_watermark: OpId) -> usize {
        let removed = self.compact_below(low_watermark);
        debug!(index = self.name(), removed, low_watermark, "checkpoint");
        removed
    }
}
