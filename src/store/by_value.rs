//! Operations keyed by the indexed column's value.
//!
//! An operation whose selector is `indexed_column = literal` lives here,
//! under the literal's [`IndexKey`], so replay can find it from the row's
//! value without scanning every pending operation. Each key's list is kept
//! in insertion order, which is ascending id order.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::checkpoint::Checkpoint;
use crate::datum::IndexKey;
use crate::operation::{OpId, Operation};

/// Operations keyed by the literal of an `indexed_column = literal` selector.
#[derive(Debug)]
pub struct ByIndexedValue {
    column: usize,
    ops: RwLock<HashMap<IndexKey, Vec<Arc<Operation>>>>,
}

impl ByIndexedValue {
    /// Creates an empty index over the column at `column`.
    pub fn new(column: usize) -> Self {
        Self {
            column,
            ops: RwLock::new(HashMap::new()),
        }
    }

    /// Position of the indexed column.
    pub fn column(&self) -> usize {
        self.column
    }

    /// Appends `op` under `key`. An id already present under the key is not
    /// added twice.
    pub fn insert(&self, key: IndexKey, op: Arc<Operation>) {
        let mut ops = self.ops.write();
        let list = ops.entry(key).or_default();
        if list.iter().any(|existing| existing.id() == op.id()) {
            return;
        }
        list.push(op);
    }

    /// Returns owned handles to every operation registered under `key`.
    pub fn lookup(&self, key: &IndexKey) -> Vec<Arc<Operation>> {
        self.ops.read().get(key).cloned().unwrap_or_default()
    }

    /// Removes every operation with id strictly below `min_id`, dropping
    /// keys left empty. Returns the number of operations removed.
    pub fn remove_below(&self, min_id: OpId) -> usize {
        let mut removed = 0;
        self.ops.write().retain(|_, list| {
            let before = list.len();
            list.retain(|op| op.id() >= min_id);
            removed += before - list.len();
            !list.is_empty()
        });
        removed
    }

    /// Total number of operations across all keys.
    pub fn len(&self) -> usize {
        self.ops.read().values().map(Vec::len).sum()
    }

    /// Returns true if no key holds an operation.
    pub fn is_empty(&self) -> bool {
        self.ops.read().is_empty()
    }

    /// Number of distinct keys.
    pub fn key_count(&self) -> usize {
        self.ops.read().len()
    }

    /// Returns owned handles to every registered operation.
    pub fn snapshot(&self) -> Vec<Arc<Operation>> {
        self.ops.read().values().flatten().cloned().collect()
    }
}

impl Checkpoint for ByIndexedValue {
    fn name(&self) -> &'static str {
        "by_indexed_value"
    }

    fn checkpoint(&self, low_watermark: OpId) -> usize {
        let removed = self.remove_below(low_watermark);
        debug!(index = self.name(), removed, low_watermark, "checkpoint");
        removed
    }
}
