use std::path::PathBuf;

use thiserror::Error;

use crate::abort::AbortSignal;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Location Error: cannot create {location:?}: {source}")]
    Location {
        location: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Initialization Error: cannot open environment at {location:?}: {source}")]
    Initialization {
        location: PathBuf,
        #[source]
        source: redb::DatabaseError,
    },

    #[error("Configuration Error: {0}")]
    Configuration(String),

    #[error("Invalid Index: sub-database {index} does not exist (environment has {count})")]
    InvalidIndex { index: usize, count: usize },

    #[error("Environment Closed")]
    Closed,

    #[error("Environment Busy: {0} transaction(s) still open")]
    Busy(usize),

    #[error("Redb Transaction Error: {0}")]
    TransactionOpen(#[from] redb::TransactionError),

    #[error("Redb Set Durability Error: {0}")]
    Durability(#[from] redb::SetDurabilityError),

    #[error("Redb Commit Error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Capacity Exceeded: commit needs {required} bytes, ceiling is {limit}")]
    CapacityExceeded { limit: u64, required: u64 },

    #[error("Cursor Error in sub-database {subdatabase}: {source}")]
    Cursor {
        subdatabase: usize,
        #[source]
        source: redb::Error,
    },

    #[error("Write Error in sub-database {subdatabase}: {source}")]
    Write {
        subdatabase: usize,
        #[source]
        source: redb::Error,
    },

    #[error("Delete Error in sub-database {subdatabase}: {source}")]
    Delete {
        subdatabase: usize,
        #[source]
        source: redb::Error,
    },

    #[error("Key Not Found in sub-database {subdatabase}: {key:?}")]
    KeyNotFound { subdatabase: usize, key: Vec<u8> },

    #[error("Transaction is read-only")]
    ReadOnly,

    #[error(transparent)]
    Aborted(#[from] AbortSignal),

    #[error("Redb Storage Error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Redb Table Error: {0}")]
    Table(#[from] redb::TableError),
}

impl StoreError {
    /// True when this error is an abort signal rather than an engine failure.
    pub fn is_abort(&self) -> bool {
        matches!(self, StoreError::Aborted(_))
    }

    /// Operation-time failures the caller may handle and carry on from.
    ///
    /// Open-time and programmer errors (configuration, bad index, closed
    /// environment) are not recoverable.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StoreError::TransactionOpen(_)
                | StoreError::Durability(_)
                | StoreError::Commit(_)
                | StoreError::CapacityExceeded { .. }
                | StoreError::Cursor { .. }
                | StoreError::Write { .. }
                | StoreError::Delete { .. }
                | StoreError::KeyNotFound { .. }
                | StoreError::Aborted(_)
        )
    }

    pub(crate) fn cursor(subdatabase: usize, source: impl Into<redb::Error>) -> Self {
        StoreError::Cursor {
            subdatabase,
            source: source.into(),
        }
    }

    pub(crate) fn write(subdatabase: usize, source: impl Into<redb::Error>) -> Self {
        StoreError::Write {
            subdatabase,
            source: source.into(),
        }
    }

    pub(crate) fn delete(subdatabase: usize, source: impl Into<redb::Error>) -> Self {
        StoreError::Delete {
            subdatabase,
            source: source.into(),
        }
    }
}
