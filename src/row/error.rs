//! Error types for the row codec.

use std::fmt;

use crate::datum::{Type, Value};

/// Errors from decoding or encoding rows.
#[derive(Debug)]
pub enum CodecError {
    /// Source buffer ended in the middle of a row.
    BufferTooSmall {
        /// Bytes required for the next field.
        required: usize,
        /// Bytes remaining in the buffer.
        available: usize,
    },
    /// Null marker byte was neither the null nor the present marker.
    InvalidNullMarker(u8),
    /// Text length prefix was negative.
    NegativeLength(i32),
    /// Text or date payload was not valid UTF-8.
    InvalidUtf8(std::string::FromUtf8Error),
    /// Date payload was not a `YYYY-MM-DD` calendar date.
    InvalidDate(String),
    /// The trailing row id was encoded as NULL.
    NullRowId,
    /// A value did not match its column's declared type on encode.
    TypeMismatch {
        column: usize,
        expected: Type,
        found: Value,
    },
    /// Row has a different number of values than the schema has columns.
    ColumnCountMismatch { expected: usize, found: usize },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::BufferTooSmall {
                required,
                available,
            } => {
                write!(
                    f,
                    "buffer too small: need {} bytes, have {}",
                    required, available
                )
            }
            CodecError::InvalidNullMarker(b) => write!(f, "invalid null marker 0x{:02X}", b),
            CodecError::NegativeLength(len) => write!(f, "negative text length {}", len),
            CodecError::InvalidUtf8(e) => write!(f, "invalid utf-8: {}", e),
            CodecError::InvalidDate(s) => write!(f, "invalid date \"{}\"", s),
            CodecError::NullRowId => write!(f, "row id is null"),
            CodecError::TypeMismatch {
                column,
                expected,
                found,
            } => {
                write!(
                    f,
                    "column {}: expected {} value, found {:?}",
                    column, expected, found
                )
            }
            CodecError::ColumnCountMismatch { expected, found } => {
                write!(f, "expected {} columns, found {}", expected, found)
            }
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CodecError::InvalidUtf8(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::string::FromUtf8Error> for CodecError {
    fn from(e: std::string::FromUtf8Error) -> Self {
        CodecError::InvalidUtf8(e)
    }
}
