//! Operation store errors.

use std::fmt;
use std::io;

use crate::expr::EvalError;
use crate::row::CodecError;

/// Errors surfaced by the operation store.
///
/// None of these are retried inside the store. A failed read leaves every
/// index untouched; bytes already written to the sink are not rolled back.
#[derive(Debug)]
pub enum StoreError {
    /// A source row could not be decoded or a result row encoded.
    Codec(CodecError),
    /// An operation could not be evaluated against a row.
    Eval(EvalError),
    /// Writing to the sink failed.
    Io(io::Error),
    /// The persistence hook failed.
    Persistence(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Codec(e) => write!(f, "codec error: {}", e),
            StoreError::Eval(e) => write!(f, "evaluation error: {}", e),
            StoreError::Io(e) => write!(f, "I/O error: {}", e),
            StoreError::Persistence(msg) => write!(f, "persistence error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Codec(e) => Some(e),
            StoreError::Eval(e) => Some(e),
            StoreError::Io(e) => Some(e),
            StoreError::Persistence(_) => None,
        }
    }
}

impl From<CodecError> for StoreError {
    fn from(e: CodecError) -> Self {
        StoreError::Codec(e)
    }
}

impl From<EvalError> for StoreError {
    fn from(e: EvalError) -> Self {
        StoreError::Eval(e)
    }
}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        StoreError::Io(e)
    }
}
