//! Backup and recovery hooks.
//!
//! The store does not persist anything on its own. An external checkpoint
//! subsystem plugs in a [`PersistenceHook`]; the store hands it an owned
//! [`StoreSnapshot`] on backup and re-registers whatever it returns on
//! recovery. Neither path holds an index lock while the hook runs.

use std::path::Path;
use std::sync::Arc;

use super::commit::CommitTime;
use super::error::StoreError;
use crate::operation::{OpId, Operation};

/// Owned copy of the store's contents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreSnapshot {
    /// Every registered operation, ascending by id.
    pub operations: Vec<Arc<Operation>>,
    /// Commit watermark entries, ascending by time.
    pub commits: Vec<(CommitTime, OpId)>,
    /// Last shrink boundary.
    pub low_watermark: OpId,
}

/// Pluggable persistence for the operation store.
pub trait PersistenceHook: Send + Sync {
    /// Persists `snapshot` under `path`.
    fn backup(&self, snapshot: &StoreSnapshot, path: &Path) -> Result<(), StoreError>;

    /// Returns previously persisted state, if any.
    fn recover(&self) -> Result<Option<StoreSnapshot>, StoreError>;
}

/// Hook that persists nothing and recovers nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPersistence;

impl PersistenceHook for NoopPersistence {
    fn backup(&self, _snapshot: &StoreSnapshot, _path: &Path) -> Result<(), StoreError> {
        Ok(())
    }

    fn recover(&self) -> Result<Option<StoreSnapshot>, StoreError> {
        Ok(None)
    }
}
