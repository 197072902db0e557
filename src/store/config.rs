//! Operation store configuration.

/// Tunables for an [`OperationStore`](super::OperationStore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Also drop indexed-column entries below the boundary when
    /// [`shrink`](super::OperationStore::shrink) runs. When false they are
    /// only reclaimed by an explicit checkpoint.
    pub compact_indexed_on_shrink: bool,
    /// Appended after every line of delimited text output.
    pub line_terminator: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            compact_indexed_on_shrink: true,
            line_terminator: "\n".to_string(),
        }
    }
}
