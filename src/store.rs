//! The pending-operation store and snapshot replay.
//!
//! [`OperationStore`] records updates and deletes that have not been applied
//! to the append-only base table, and overlays them onto base rows at read
//! time. Three indices back it, each behind its own reader/writer lock:
//!
//! | Index              | Key                   | Holds                              |
//! |--------------------|-----------------------|------------------------------------|
//! | [`ById`]           | operation id          | operations not found by value      |
//! | [`ByIndexedValue`] | indexed column value  | `indexed_col = literal` operations |
//! | [`CommitTimeIndex`]| commit time           | max committed operation id         |
//!
//! Every operation lives in exactly one of the first two. There is no lock
//! covering all three, so a reader may see an `add` before the matching
//! `put` (or the other way around); an operation whose commit is not yet
//! visible is simply not replayed on that pass.
//!
//! # Replay
//!
//! For a row with id `r`, read at snapshot time `t`:
//!
//! 1. `max = CommitTimeIndex[greatest key <= t]`; with no such key nothing
//!    is visible and the row passes through unchanged.
//! 2. Candidates are ById entries in `(r, max]` plus the ByIndexedValue
//!    entries under the row's indexed-column value with id in `(r, max]`.
//! 3. Candidates are applied in ascending id order. A delete that selects
//!    the row suppresses it and ends replay.

mod by_id;
mod by_value;
mod checkpoint;
mod commit;
mod config;
mod error;
mod persistence;

pub use by_id::ById;
pub use by_value::ByIndexedValue;
pub use checkpoint::{Checkpoint, CheckpointFanout};
pub use commit::{CommitTime, CommitTimeIndex};
pub use config::StoreConfig;
pub use error::StoreError;
pub use persistence::{NoopPersistence, PersistenceHook, StoreSnapshot};

use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use bytes::{Buf, BytesMut};
use tracing::{debug, info, trace};

use crate::catalog::Catalog;
use crate::datum::IndexKey;
use crate::expr::EvalError;
use crate::operation::{OpId, Operation, RowOutcome};
use crate::row::{Row, RowCodec, TextFormat};

/// Entry counts per index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreStats {
    pub by_id: usize,
    pub by_indexed_value: usize,
    pub commits: usize,
    pub low_watermark: OpId,
}

/// Pending update/delete log for one table.
pub struct OperationStore {
    codec: RowCodec,
    by_id: Arc<ById>,
    by_value: Option<Arc<ByIndexedValue>>,
    commits: Arc<CommitTimeIndex>,
    checkpoints: CheckpointFanout,
    low_watermark: AtomicI64,
    persistence: Box<dyn PersistenceHook>,
    config: StoreConfig,
}

impl OperationStore {
    /// Creates an empty store for the table described by `catalog`.
    pub fn new(catalog: &dyn Catalog, config: StoreConfig) -> Self {
        let by_id = Arc::new(ById::new());
        let by_value = catalog
            .indexed_column()
            .map(|column| Arc::new(ByIndexedValue::new(column)));
        let commits = Arc::new(CommitTimeIndex::new());

        let mut checkpoints = CheckpointFanout::new();
        checkpoints.subscribe(by_id.clone());
        if let Some(by_value) = &by_value {
            checkpoints.subscribe(by_value.clone());
        }
        checkpoints.subscribe(commits.clone());

        Self {
            codec: RowCodec::from_catalog(catalog),
            by_id,
            by_value,
            commits,
            checkpoints,
            low_watermark: AtomicI64::new(OpId::MIN),
            persistence: Box::new(NoopPersistence),
            config,
        }
    }

    /// Replaces the persistence hook.
    pub fn with_persistence(mut self, hook: Box<dyn PersistenceHook>) -> Self {
        self.persistence = hook;
        self
    }

    /// Row codec for this table.
    pub fn codec(&self) -> &RowCodec {
        &self.codec
    }

    /// Store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Registers a pending operation.
    ///
    /// An operation selecting `indexed_column = literal` goes to the
    /// indexed-value lookup; every other operation is keyed by id.
    pub fn add(&self, op: Operation) {
        let op = Arc::new(op);
        let indexed = self
            .by_value
            .as_ref()
            .and_then(|index| Some((index, op.index_key(Some(index.column()))?)));
        match indexed {
            Some((index, key)) => {
                trace!(id = op.id(), ?key, "add operation by indexed value");
                index.insert(key, op);
            }
            None => {
                trace!(id = op.id(), "add operation by id");
                self.by_id.insert(op);
            }
        }
    }

    /// Records that every operation with id `<= max_id` is committed as of
    /// `time`. Calls must be non-decreasing in both arguments.
    pub fn put(&self, time: CommitTime, max_id: OpId) {
        self.commits.put(time, max_id);
    }

    /// Discards id-keyed operations below `min_row_id`.
    ///
    /// The caller guarantees no row with id below `min_row_id` will be read
    /// again. Indexed-value entries below the boundary are dropped too when
    /// [`StoreConfig::compact_indexed_on_shrink`] is set. Returns the
    /// number of operations removed.
    pub fn shrink(&self, min_row_id: OpId) -> usize {
        self.low_watermark.fetch_max(min_row_id, Ordering::SeqCst);
        let mut removed = self.by_id.remove_below(min_row_id);
        if self.config.compact_indexed_on_shrink {
            if let Some(index) = &self.by_value {
                removed += index.remove_below(min_row_id);
            }
        }
        debug!(min_row_id, removed, "shrink");
        removed
    }

    /// The highest boundary passed to [`shrink`](Self::shrink) so far.
    pub fn low_watermark(&self) -> OpId {
        self.low_watermark.load(Ordering::SeqCst)
    }

    /// Handles to every index, for registration with an external
    /// checkpoint event source.
    pub fn checkpoint_subscribers(&self) -> CheckpointFanout {
        self.checkpoints.clone()
    }

    /// Signals a checkpoint to every index. Returns the number of entries
    /// reclaimed.
    pub fn checkpoint(&self) -> usize {
        let low_watermark = self.low_watermark();
        let removed = self.checkpoints.notify(low_watermark);
        info!(low_watermark, removed, "checkpoint");
        removed
    }

    /// Entry counts per index and the current low watermark.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            by_id: self.by_id.len(),
            by_indexed_value: self.by_value.as_ref().map_or(0, |index| index.len()),
            commits: self.commits.len(),
            low_watermark: self.low_watermark(),
        }
    }

    /// Returns an owned copy of every index.
    pub fn snapshot(&self) -> StoreSnapshot {
        let mut operations = self.by_id.snapshot();
        if let Some(index) = &self.by_value {
            operations.extend(index.snapshot());
        }
        operations.sort_by_key(|op| op.id());
        StoreSnapshot {
            operations,
            commits: self.commits.snapshot(),
            low_watermark: self.low_watermark(),
        }
    }

    /// Hands a snapshot of the store to the persistence hook.
    pub fn backup(&self, path: &Path) -> Result<(), StoreError> {
        let snapshot = self.snapshot();
        self.persistence.backup(&snapshot, path)
    }

    /// Re-registers state returned by the persistence hook, if any.
    ///
    /// Operations already present are not duplicated, and commit entries
    /// that would move the watermark backwards are ignored.
    pub fn recover(&self) -> Result<bool, StoreError> {
        let Some(snapshot) = self.persistence.recover()? else {
            return Ok(false);
        };
        let count = snapshot.operations.len();
        for op in snapshot.operations {
            self.add(Arc::unwrap_or_clone(op));
        }
        for (time, max_id) in snapshot.commits {
            self.commits.put(time, max_id);
        }
        self.low_watermark
            .fetch_max(snapshot.low_watermark, Ordering::SeqCst);
        info!(operations = count, "recovered operation store");
        Ok(true)
    }

    /// Replays every visible operation onto `row` as of `snapshot_time`.
    pub fn replay(&self, row: Row, snapshot_time: CommitTime) -> Result<RowOutcome, EvalError> {
        match self.commits.max_visible(snapshot_time) {
            Some(max_visible) => self.replay_bounded(row, max_visible),
            None => Ok(RowOutcome::Kept(row)),
        }
    }

    fn replay_bounded(&self, mut row: Row, max_visible: OpId) -> Result<RowOutcome, EvalError> {
        let row_id = OpId::from(row.id);
        let mut candidates = self.by_id.range(row_id, max_visible);

        if let Some(index) = &self.by_value {
            // Looked up once from the value as read; an update that rewrites
            // the indexed column does not pull in operations keyed by the
            // new value.
            if let Some(key) = row.get(index.column()).and_then(IndexKey::from_value) {
                candidates.extend(
                    index
                        .lookup(&key)
                        .into_iter()
                        .filter(|op| op.id() > row_id && op.id() <= max_visible),
                );
                candidates.sort_by_key(|op| op.id());
            }
        }

        for op in candidates {
            match op.apply(row)? {
                RowOutcome::Kept(next) => row = next,
                RowOutcome::Suppressed => return Ok(RowOutcome::Suppressed),
            }
        }
        Ok(RowOutcome::Kept(row))
    }

    /// Decodes every row in `source`, replays visible operations onto it,
    /// and writes the surviving rows to `sink`.
    ///
    /// Rows are written as delimited text when `format` is given and in the
    /// binary wire format otherwise. Returns the number of bytes written.
    /// An error aborts the call; bytes already written stay written.
    pub fn process_rows<W: Write>(
        &self,
        source: &mut impl Buf,
        snapshot_time: CommitTime,
        sink: &mut W,
        format: Option<&TextFormat>,
    ) -> Result<u64, StoreError> {
        let max_visible = self.commits.max_visible(snapshot_time);
        let mut out = BytesMut::new();
        let mut written = 0u64;
        let mut rows_in = 0usize;
        let mut rows_out = 0usize;

        while RowCodec::has_more(&*source) {
            let row = self.codec.decode(source)?;
            rows_in += 1;

            let outcome = match max_visible {
                Some(max_visible) => self.replay_bounded(row, max_visible)?,
                None => RowOutcome::Kept(row),
            };
            let RowOutcome::Kept(row) = outcome else {
                continue;
            };

            out.clear();
            match format {
                Some(format) => {
                    self.codec
                        .encode_text(&row, format, &self.config.line_terminator, &mut out);
                }
                None => {
                    self.codec.encode(&row, &mut out)?;
                }
            }
            sink.write_all(&out)?;
            written += out.len() as u64;
            rows_out += 1;
        }

        debug!(
            snapshot_time,
            ?max_visible,
            rows_in,
            rows_out,
            bytes = written,
            "processed rows"
        );
        Ok(written)
    }

    /// Copies `source` to `sink` unmodified, for callers that know no
    /// pending operation can apply. Returns the number of bytes written.
    pub fn pass_through<W: Write>(source: &mut impl Buf, sink: &mut W) -> Result<u64, StoreError> {
        let mut written = 0u64;
        while source.has_remaining() {
            let chunk = source.chunk();
            let len = chunk.len();
            sink.write_all(chunk)?;
            source.advance(len);
            written += len as u64;
        }
        Ok(written)
    }
}

impl std::fmt::Debug for OperationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationStore")
            .field("stats", &self.stats())
            .field("checkpoints", &self.checkpoints)
            .field("config", &self.config)
            .finish()
    }
}
