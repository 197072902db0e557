//! Prepared update/delete statement templates.
//!
//! An [`Execution`] is the shape of a parameterized statement such as
//! `UPDATE t SET a = ?, b = 'x' WHERE c = ?`. Binding parameter values to it
//! yields a concrete [`Operation`] ready to be registered with the store.
//!
//! Parameters bind in statement order: first every placeholder in the SET
//! list, then the WHERE literal. `param_columns` records the column each
//! parameter targets and is checked against the template when it is built.

use std::fmt;

use crate::datum::Value;
use crate::expr::{CompareOp, Expression};
use crate::operation::{OpId, Operation, OperationError};

/// Errors from building or binding a statement template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// Wrong number of parameters.
    ParameterCount { expected: usize, found: usize },
    /// A parameter's declared column does not match its binding slot.
    ParameterColumn {
        index: usize,
        expected: usize,
        found: usize,
    },
    /// The WHERE clause references more than one column.
    MultiColumnWhere(usize),
    /// A DELETE template carries assignments.
    AssignmentsOnDelete,
    /// An UPDATE template has an empty SET list.
    NoAssignments,
    /// The bound operation was invalid.
    Operation(OperationError),
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionError::ParameterCount { expected, found } => {
                write!(f, "expected {} parameters, found {}", expected, found)
            }
            ExecutionError::ParameterColumn {
                index,
                expected,
                found,
            } => {
                write!(
                    f,
                    "parameter {} targets column {}, expected column {}",
                    index, found, expected
                )
            }
            ExecutionError::MultiColumnWhere(n) => {
                write!(f, "where clause references {} columns, at most 1 supported", n)
            }
            ExecutionError::AssignmentsOnDelete => write!(f, "delete cannot carry assignments"),
            ExecutionError::NoAssignments => write!(f, "update has no assignments"),
            ExecutionError::Operation(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ExecutionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExecutionError::Operation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<OperationError> for ExecutionError {
    fn from(e: OperationError) -> Self {
        ExecutionError::Operation(e)
    }
}

/// Kind of statement a template produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Update,
    Delete,
}

/// One `column = value` entry of a SET list.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub expr: Expression,
    /// True if the value is a `?` placeholder filled at bind time.
    pub placeholder: bool,
}

impl Assignment {
    /// A constant assignment.
    pub fn literal(column: usize, value: Value) -> Self {
        Self {
            expr: Expression::new(column, value),
            placeholder: false,
        }
    }

    /// A placeholder assignment.
    pub fn placeholder(column: usize) -> Self {
        Self {
            expr: Expression::new(column, Value::Null),
            placeholder: true,
        }
    }
}

/// A prepared-statement template.
#[derive(Debug, Clone)]
pub struct Execution {
    kind: StatementKind,
    assignments: Vec<Assignment>,
    param_columns: Vec<usize>,
    where_columns: Vec<usize>,
    where_op: CompareOp,
    sql: String,
}

impl Execution {
    /// Builds a template, checking that `param_columns` lines up with the
    /// placeholder assignments followed by the WHERE columns.
    pub fn new(
        kind: StatementKind,
        assignments: Vec<Assignment>,
        param_columns: Vec<usize>,
        where_columns: Vec<usize>,
        sql: impl Into<String>,
    ) -> Result<Self, ExecutionError> {
        if where_columns.len() > 1 {
            return Err(ExecutionError::MultiColumnWhere(where_columns.len()));
        }
        match kind {
            StatementKind::Delete if !assignments.is_empty() => {
                return Err(ExecutionError::AssignmentsOnDelete);
            }
            StatementKind::Update if assignments.is_empty() => {
                return Err(ExecutionError::NoAssignments);
            }
            _ => {}
        }

        let slots: Vec<usize> = assignments
            .iter()
            .filter(|a| a.placeholder)
            .map(|a| a.expr.column())
            .chain(where_columns.iter().copied())
            .collect();
        if slots.len() != param_columns.len() {
            return Err(ExecutionError::ParameterCount {
                expected: slots.len(),
                found: param_columns.len(),
            });
        }
        for (index, (&expected, &found)) in slots.iter().zip(&param_columns).enumerate() {
            if expected != found {
                return Err(ExecutionError::ParameterColumn {
                    index,
                    expected,
                    found,
                });
            }
        }

        Ok(Self {
            kind,
            assignments,
            param_columns,
            where_columns,
            where_op: CompareOp::Eq,
            sql: sql.into(),
        })
    }

    /// Sets the WHERE operator. Defaults to `=`.
    pub fn with_where_op(mut self, op: CompareOp) -> Self {
        self.where_op = op;
        self
    }

    /// Kind of statement the template produces.
    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    /// SET list in statement order.
    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    /// Target column of each parameter, in binding order.
    pub fn param_columns(&self) -> &[usize] {
        &self.param_columns
    }

    /// Columns referenced by the WHERE clause (at most one).
    pub fn where_columns(&self) -> &[usize] {
        &self.where_columns
    }

    /// The statement text, kept for diagnostics.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Binds parameter values and produces the operation with id `id`.
    pub fn bind(&self, id: OpId, params: &[Value]) -> Result<Operation, ExecutionError> {
        if params.len() != self.param_columns.len() {
            return Err(ExecutionError::ParameterCount {
                expected: self.param_columns.len(),
                found: params.len(),
            });
        }

        let mut params = params.iter().cloned();
        let mut assignments = Vec::with_capacity(self.assignments.len());
        for assignment in &self.assignments {
            let mut expr = assignment.expr.clone();
            if assignment.placeholder {
                // Length was checked above.
                if let Some(value) = params.next() {
                    expr.set_value(value);
                }
            }
            assignments.push(expr);
        }

        let selector = match (self.where_columns.first(), params.next()) {
            (Some(&column), Some(value)) => Some(Expression::with_op(column, self.where_op, value)),
            _ => None,
        };

        match self.kind {
            StatementKind::Delete => Ok(Operation::delete(id, selector)),
            StatementKind::Update => Ok(Operation::update(id, selector, assignments)?),
        }
    }
}
