//! Catalog-specific errors.

use crate::datum::Type;

/// Errors raised while loading or querying a table schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// A column declared a SQL type code this store cannot decode.
    UnsupportedType { column: usize, code: i32 },

    /// The type list is not exactly one longer than the name list.
    TypeCountMismatch { names: usize, types: usize },

    /// The trailing row id column is not a 4-byte integer.
    InvalidIdentifierType(Type),

    /// The indexed column position does not name a declared column.
    IndexedColumnOutOfRange { index: usize, len: usize },

    /// No column has the given name.
    UnknownColumn(String),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::UnsupportedType { column, code } => {
                write!(f, "column {} has unsupported sql type {}", column, code)
            }
            CatalogError::TypeCountMismatch { names, types } => {
                write!(
                    f,
                    "expected {} column types for {} columns plus row id, found {}",
                    names + 1,
                    names,
                    types
                )
            }
            CatalogError::InvalidIdentifierType(ty) => {
                write!(f, "row id column must be integer, found {}", ty)
            }
            CatalogError::IndexedColumnOutOfRange { index, len } => {
                write!(
                    f,
                    "indexed column {} out of range for {} columns",
                    index, len
                )
            }
            CatalogError::UnknownColumn(name) => {
                write!(f, "column \"{}\" does not exist", name)
            }
        }
    }
}

impl std::error::Error for CatalogError {}
