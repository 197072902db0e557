//! Table schema supplied by the upstream schema service.
//!
//! The store never owns schema metadata. It consumes it through the
//! [`Catalog`] trait: ordered column names, column types (with one extra
//! trailing entry for the row id), and the position of the single indexed
//! column, if any. [`TableSchema`] is the in-memory implementation, and
//! validates everything at load time so that no unknown type ever reaches
//! the row decoder.

mod error;

pub use error::CatalogError;

use crate::datum::Type;

/// Schema metadata for one replicated table.
pub trait Catalog: Send + Sync {
    /// Declared column names in order.
    fn column_names(&self) -> &[String];

    /// Declared column types in order, followed by the row id type.
    ///
    /// The returned slice is always one longer than
    /// [`column_names`](Self::column_names).
    fn column_types(&self) -> &[Type];

    /// Position of the indexed column, or `None` if the table has none.
    fn indexed_column(&self) -> Option<usize>;

    /// Resolves a column name to its position.
    fn column_position(&self, name: &str) -> Option<usize> {
        self.column_names().iter().position(|n| n == name)
    }
}

/// A validated, immutable table schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    names: Vec<String>,
    types: Vec<Type>,
    indexed_column: Option<usize>,
}

impl TableSchema {
    /// Creates a schema from column names and types.
    ///
    /// `types` must hold one entry per name plus a trailing
    /// [`Type::Integer`] for the row id.
    pub fn new(
        names: Vec<String>,
        types: Vec<Type>,
        indexed_column: Option<usize>,
    ) -> Result<Self, CatalogError> {
        if types.len() != names.len() + 1 {
            return Err(CatalogError::TypeCountMismatch {
                names: names.len(),
                types: types.len(),
            });
        }
        if let Some(&id_type) = types.last() {
            if id_type != Type::Integer {
                return Err(CatalogError::InvalidIdentifierType(id_type));
            }
        }
        if let Some(index) = indexed_column {
            if index >= names.len() {
                return Err(CatalogError::IndexedColumnOutOfRange {
                    index,
                    len: names.len(),
                });
            }
        }

        Ok(Self {
            names,
            types,
            indexed_column,
        })
    }

    /// Creates a schema from upstream SQL type codes.
    ///
    /// Unknown codes are rejected here rather than when the first row
    /// arrives.
    pub fn from_sql_codes(
        names: Vec<String>,
        codes: &[i32],
        indexed_column: Option<usize>,
    ) -> Result<Self, CatalogError> {
        let types = codes
            .iter()
            .enumerate()
            .map(|(column, &code)| {
                Type::from_sql_code(code).ok_or(CatalogError::UnsupportedType { column, code })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(names, types, indexed_column)
    }
}

impl Catalog for TableSchema {
    fn column_names(&self) -> &[String] {
        &self.names
    }

    fn column_types(&self) -> &[Type] {
        &self.types
    }

    fn indexed_column(&self) -> Option<usize> {
        self.indexed_column
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datum::sql_code;

    fn names() -> Vec<String> {
        vec!["id".to_string(), "name".to_string()]
    }

    #[test]
    fn test_new_schema() {
        let schema =
            TableSchema::new(names(), vec![Type::Bigint, Type::Varchar, Type::Integer], Some(0))
                .unwrap();
        assert_eq!(schema.column_names().len(), 2);
        assert_eq!(schema.column_types().len(), 3);
        assert_eq!(schema.indexed_column(), Some(0));
        assert_eq!(schema.column_position("name"), Some(1));
        assert_eq!(schema.column_position("nope"), None);
    }

    #[test]
    fn test_type_count_mismatch() {
        let err = TableSchema::new(names(), vec![Type::Bigint, Type::Integer], None).unwrap_err();
        assert_eq!(err, CatalogError::TypeCountMismatch { names: 2, types: 2 });
    }

    #[test]
    fn test_row_id_must_be_integer() {
        let err = TableSchema::new(names(), vec![Type::Bigint, Type::Varchar, Type::Bigint], None)
            .unwrap_err();
        assert_eq!(err, CatalogError::InvalidIdentifierType(Type::Bigint));
    }

    #[test]
    fn test_indexed_column_out_of_range() {
        let err =
            TableSchema::new(names(), vec![Type::Bigint, Type::Varchar, Type::Integer], Some(2))
                .unwrap_err();
        assert_eq!(err, CatalogError::IndexedColumnOutOfRange { index: 2, len: 2 });
    }

    #[test]
    fn test_from_sql_codes() {
        let schema = TableSchema::from_sql_codes(
            names(),
            &[sql_code::NUMERIC, sql_code::LONGVARCHAR, sql_code::INTEGER],
            None,
        )
        .unwrap();
        assert_eq!(
            schema.column_types(),
            &[Type::Double, Type::LongVarchar, Type::Integer]
        );
    }

    #[test]
    fn test_from_sql_codes_rejects_unknown() {
        let err = TableSchema::from_sql_codes(names(), &[sql_code::BIGINT, 2004, sql_code::INTEGER], None)
            .unwrap_err();
        assert_eq!(err, CatalogError::UnsupportedType { column: 1, code: 2004 });
    }
}
