//! Engine Error Types
//!
//! The four error kinds a query against the pattern index can surface,
//! mirroring the teacher's `storage::StorageError` in shape (a `thiserror`
//! enum with one variant per failure family) but scoped to the set named by
//! the operation framework: bad input, timeout, out-of-memory, and index
//! corruption.

use thiserror::Error;

/// Errors that can propagate out of `compute_result` and friends.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// A bound term could not be resolved against the vocabulary, the width
    /// of the predicate alphabet overflowed 2**64, or an on-disk version
    /// byte was unrecognised.
    #[error("bad input in '{node}': {message}")]
    BadInput { node: String, message: String },

    /// The query-wide cancellation token expired.
    #[error("query exceeded its time budget in '{node}'")]
    Timeout { node: String },

    /// The per-query memory quota was exceeded while materialising a
    /// result table.
    #[error("out of memory in '{node}': used {used} bytes, limit {limit} bytes")]
    OutOfMemory {
        node: String,
        used: usize,
        limit: usize,
    },

    /// An on-disk pattern index violated one of the invariants of the data
    /// model at load time.
    #[error("index corruption: {0}")]
    IndexCorruption(String),
}

impl Error {
    pub fn bad_input(node: impl Into<String>, message: impl Into<String>) -> Self {
        Error::BadInput {
            node: node.into(),
            message: message.into(),
        }
    }

    pub fn timeout(node: impl Into<String>) -> Self {
        Error::Timeout { node: node.into() }
    }

    pub fn out_of_memory(node: impl Into<String>, used: usize, limit: usize) -> Self {
        Error::OutOfMemory {
            node: node.into(),
            used,
            limit,
        }
    }

    pub fn index_corruption(message: impl Into<String>) -> Self {
        Error::IndexCorruption(message.into())
    }
}

/// Crate-wide result alias, mirroring the teacher's `StorageResult<T>`.
pub type Result<T> = std::result::Result<T, Error>;
