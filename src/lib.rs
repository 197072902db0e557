//! Deferred update/delete replay for append-only tables.
//!
//! Updates and deletes issued against a continuously appended base table
//! are not applied to the stored rows. They are logged in an
//! [`OperationStore`](store::OperationStore) and replayed onto rows as they
//! are read, bounded by the commit watermark at the reader's snapshot time.

pub mod catalog;
pub mod datum;
pub mod execution;
pub mod expr;
pub mod operation;
pub mod row;
pub mod store;

pub use catalog::{Catalog, CatalogError, TableSchema};
pub use datum::{Type, Value};
pub use execution::{Assignment, Execution, ExecutionError, StatementKind};
pub use expr::{CompareOp, EvalError, Expression};
pub use operation::{OpId, OpIdAllocator, Operation, OperationError, RowOutcome};
pub use row::{CodecError, Row, RowCodec, TextFormat};
pub use store::{CommitTime, OperationStore, StoreConfig, StoreError};
