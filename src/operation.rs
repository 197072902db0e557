//! Pending update/delete operations.
//!
//! An [`Operation`] is one logical mutation issued against the base table
//! that has not been physically applied. Operations are replayed onto rows
//! at read time; their ids order them both causally and in time.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::datum::IndexKey;
use crate::expr::{CompareOp, EvalError, Expression};
use crate::row::Row;

/// Operation identifier. Higher ids were issued later.
pub type OpId = i64;

/// Errors from constructing an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    /// An update was built without any column assignments.
    EmptyAssignments { id: OpId },
}

impl fmt::Display for OperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationError::EmptyAssignments { id } => {
                write!(f, "update {} has no assignments", id)
            }
        }
    }
}

impl std::error::Error for OperationError {}

/// Result of replaying one operation onto a row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    /// The row survives, possibly rewritten.
    Kept(Row),
    /// The row is logically deleted and must be omitted from output.
    Suppressed,
}

/// A pending mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Removes every selected row.
    Delete {
        id: OpId,
        /// `None` selects every row.
        selector: Option<Expression>,
    },
    /// Rewrites columns of every selected row.
    Update {
        id: OpId,
        /// `None` selects every row.
        selector: Option<Expression>,
        /// Column assignments applied in order. Never empty.
        assignments: Vec<Expression>,
    },
}

impl Operation {
    /// Creates a delete operation.
    pub fn delete(id: OpId, selector: Option<Expression>) -> Self {
        Operation::Delete { id, selector }
    }

    /// Creates an update operation.
    pub fn update(
        id: OpId,
        selector: Option<Expression>,
        assignments: Vec<Expression>,
    ) -> Result<Self, OperationError> {
        if assignments.is_empty() {
            return Err(OperationError::EmptyAssignments { id });
        }
        Ok(Operation::Update {
            id,
            selector,
            assignments,
        })
    }

    /// Operation id.
    pub fn id(&self) -> OpId {
        match self {
            Operation::Delete { id, .. } | Operation::Update { id, .. } => *id,
        }
    }

    /// Selecting expression, or `None` if the operation applies to every row.
    pub fn selector(&self) -> Option<&Expression> {
        match self {
            Operation::Delete { selector, .. } | Operation::Update { selector, .. } => {
                selector.as_ref()
            }
        }
    }

    /// Returns true for a delete.
    pub fn is_delete(&self) -> bool {
        matches!(self, Operation::Delete { .. })
    }

    /// Returns the key under which this operation belongs in the
    /// indexed-column lookup, if its selector is an equality on
    /// `indexed_column` against a non-null literal.
    pub fn index_key(&self, indexed_column: Option<usize>) -> Option<IndexKey> {
        let column = indexed_column?;
        let selector = self.selector()?;
        if selector.op() != CompareOp::Eq || selector.column() != column {
            return None;
        }
        IndexKey::from_value(selector.value())
    }

    /// Replays this operation onto `row`.
    ///
    /// A delete suppresses a selected row and passes any other row through.
    /// An update overwrites the assigned columns of a selected row; it never
    /// suppresses.
    pub fn apply(&self, mut row: Row) -> Result<RowOutcome, EvalError> {
        match self {
            Operation::Delete { selector, .. } => {
                if selects(selector.as_ref(), &row)? {
                    Ok(RowOutcome::Suppressed)
                } else {
                    Ok(RowOutcome::Kept(row))
                }
            }
            Operation::Update {
                selector,
                assignments,
                ..
            } => {
                if selects(selector.as_ref(), &row)? {
                    for assignment in assignments {
                        assignment.assign(&mut row)?;
                    }
                }
                Ok(RowOutcome::Kept(row))
            }
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Delete { id, .. } => write!(f, "#{} DELETE", id)?,
            Operation::Update {
                id, assignments, ..
            } => {
                write!(f, "#{} UPDATE SET ", id)?;
                for (i, a) in assignments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", a)?;
                }
            }
        }
        if let Some(selector) = self.selector() {
            write!(f, " WHERE {}", selector)?;
        }
        Ok(())
    }
}

/// Shared selection rule: a missing selector matches every row.
fn selects(selector: Option<&Expression>, row: &Row) -> Result<bool, EvalError> {
    match selector {
        None => Ok(true),
        Some(expr) => expr.evaluate(row),
    }
}

/// Allocates strictly increasing operation ids.
#[derive(Debug)]
pub struct OpIdAllocator {
    next: AtomicI64,
}

impl OpIdAllocator {
    /// Creates an allocator whose first id is `first`.
    pub fn new(first: OpId) -> Self {
        Self {
            next: AtomicI64::new(first),
        }
    }

    /// Allocates the next id.
    pub fn allocate(&self) -> OpId {
        self.next.fetch_add(1, Ordering::SeqCst)
    }

    /// Returns the id the next call to [`allocate`](Self::allocate) returns.
    pub fn peek(&self) -> OpId {
        self.next.load(Ordering::SeqCst)
    }
}

impl Default for OpIdAllocator {
    fn default() -> Self {
        Self::new(1)
    }
}
