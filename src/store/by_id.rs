//! Operations keyed by id.
//!
//! Holds every operation that cannot be found through the indexed-column
//! lookup. Replay asks for a contiguous id range, so the map is ordered.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::checkpoint::Checkpoint;
use crate::operation::{OpId, Operation};

/// Operations keyed by id, for those not routed to the indexed-value lookup.
#[derive(Debug, Default)]
pub struct ById {
    ops: RwLock<BTreeMap<OpId, Arc<Operation>>>,
}

impl ById {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `op`. Re-registering the same id replaces the entry.
    pub fn insert(&self, op: Arc<Operation>) {
        self.ops.write().insert(op.id(), op);
    }

    /// Returns owned handles to every operation with
    /// `after < id <= up_to`, in ascending id order.
    pub fn range(&self, after: OpId, up_to: OpId) -> Vec<Arc<Operation>> {
        if up_to <= after {
            return Vec::new();
        }
        self.ops
            .read()
            .range((Bound::Excluded(after), Bound::Included(up_to)))
            .map(|(_, op)| Arc::clone(op))
            .collect()
    }

    /// Removes every operation with id strictly below `min_id`.
    ///
    /// Returns the number of operations removed.
    pub fn remove_below(&self, min_id: OpId) -> usize {
        let mut ops = self.ops.write();
        let kept = ops.split_off(&min_id);
        let removed = ops.len();
        *ops = kept;
        removed
    }

    /// Returns true if an operation with `id` is registered.
    pub fn contains(&self, id: OpId) -> bool {
        self.ops.read().contains_key(&id)
    }

    /// Number of registered operations.
    pub fn len(&self) -> usize {
        self.ops.read().len()
    }

    /// Returns true if no operation is registered.
    pub fn is_empty(&self) -> bool {
        self.ops.read().is_empty()
    }

    /// Returns owned handles to every registered operation.
    pub fn snapshot(&self) -> Vec<Arc<Operation>> {
        self.ops.read().values().cloned().collect()
    }
}

impl Checkpoint for ById {
    fn name(&self) -> &'static str {
        "by_id"
    }

    fn checkpoint(&self, low_watermark: OpId) -> usize {
        let removed = self.remove_below(low_watermark);
        debug!(index = self.name(), removed, low_watermark, "checkpoint");
        removed
    }
}
