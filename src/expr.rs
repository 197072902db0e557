//! Single-column predicates and assignments.
//!
//! An [`Expression`] is `column <op> literal`. Operations use it in two
//! roles: as a selector deciding which rows a mutation touches, and (with
//! `=`) as an assignment naming the column an update overwrites and the
//! value written there.

use std::cmp::Ordering;
use std::fmt;

use crate::catalog::{Catalog, CatalogError};
use crate::datum::{compare_values, Value};
use crate::row::Row;

/// Errors from evaluating an expression against a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// Column index exceeds the number of columns in the row.
    ColumnIndexOutOfBounds { index: usize, len: usize },
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::ColumnIndexOutOfBounds { index, len } => {
                write!(
                    f,
                    "column index {} out of bounds for row with {} columns",
                    index, len
                )
            }
        }
    }
}

impl std::error::Error for EvalError {}

/// Comparison operator of an [`Expression`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    NotEq,
    Gt,
    GtEq,
    Lt,
    LtEq,
    IsNull,
    IsNotNull,
}

impl CompareOp {
    /// Returns the SQL spelling of the operator.
    pub const fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "<>",
            CompareOp::Gt => ">",
            CompareOp::GtEq => ">=",
            CompareOp::Lt => "<",
            CompareOp::LtEq => "<=",
            CompareOp::IsNull => "IS NULL",
            CompareOp::IsNotNull => "IS NOT NULL",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// A `column <op> literal` predicate, or a `column = value` assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    column: usize,
    name: Option<String>,
    op: CompareOp,
    value: Value,
}

impl Expression {
    /// Creates an equality expression on the column at `column`.
    pub fn new(column: usize, value: Value) -> Self {
        Self::with_op(column, CompareOp::Eq, value)
    }

    /// Creates an expression with an explicit operator.
    pub fn with_op(column: usize, op: CompareOp, value: Value) -> Self {
        Self {
            column,
            name: None,
            op,
            value,
        }
    }

    /// Creates an expression on a column looked up by name.
    ///
    /// The name is kept for diagnostics; evaluation uses the resolved
    /// position.
    pub fn for_column_name(
        catalog: &dyn Catalog,
        name: &str,
        op: CompareOp,
        value: Value,
    ) -> Result<Self, CatalogError> {
        let column = catalog
            .column_position(name)
            .ok_or_else(|| CatalogError::UnknownColumn(name.to_string()))?;
        Ok(Self {
            column,
            name: Some(name.to_string()),
            op,
            value,
        })
    }

    /// Position of the column this expression reads or writes.
    pub fn column(&self) -> usize {
        self.column
    }

    /// Column name, if the expression was built by name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Comparison operator.
    pub fn op(&self) -> CompareOp {
        self.op
    }

    /// Literal compared against, or assigned.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Retargets the expression to another column position.
    pub fn set_column(&mut self, column: usize) {
        self.column = column;
    }

    /// Replaces the comparison operator.
    pub fn set_op(&mut self, op: CompareOp) {
        self.op = op;
    }

    /// Replaces the literal.
    pub fn set_value(&mut self, value: Value) {
        self.value = value;
    }

    /// Evaluates the predicate against `row`.
    ///
    /// `IS NULL` and `IS NOT NULL` test the expression's own literal, not
    /// the row's column value; a selector built as `col IS NULL` carries a
    /// NULL literal and therefore matches every row.
    pub fn evaluate(&self, row: &Row) -> Result<bool, EvalError> {
        match self.op {
            CompareOp::IsNull => return Ok(self.value.is_null()),
            CompareOp::IsNotNull => return Ok(!self.value.is_null()),
            _ => {}
        }

        let actual = row.get(self.column).ok_or(EvalError::ColumnIndexOutOfBounds {
            index: self.column,
            len: row.len(),
        })?;
        let Some(ordering) = compare_values(actual, &self.value) else {
            return Ok(false);
        };

        let result = match self.op {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::NotEq => ordering != Ordering::Equal,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::GtEq => ordering != Ordering::Less,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::LtEq => ordering != Ordering::Greater,
            CompareOp::IsNull | CompareOp::IsNotNull => unreachable!(),
        };
        Ok(result)
    }

    /// Overwrites this expression's target column in `row` with its value.
    pub fn assign(&self, row: &mut Row) -> Result<(), EvalError> {
        let len = row.len();
        let slot = row
            .values
            .get_mut(self.column)
            .ok_or(EvalError::ColumnIndexOutOfBounds {
                index: self.column,
                len,
            })?;
        *slot = self.value.clone();
        Ok(())
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}", name)?,
            None => write!(f, "${}", self.column)?,
        }
        match self.op {
            CompareOp::IsNull | CompareOp::IsNotNull => write!(f, " {}", self.op),
            op => write!(f, " {} {}", op, self.value),
        }
    }
}
