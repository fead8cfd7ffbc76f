//! Error types for task persistence and the task store.

use std::path::PathBuf;

use labeeb_core::LabeebError;
use labeeb_vector::IndexError;

/// Errors from the task store.
///
/// Embedding failures never appear here: the store degrades to a zero
/// vector or an unfiltered result instead.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("Task file I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed task file {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Index error: {0}")]
    Index(#[from] IndexError),
    #[error("Storage error: {0}")]
    Core(#[from] LabeebError),
}

impl TaskError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TaskError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<TaskError> for LabeebError {
    fn from(err: TaskError) -> Self {
        match err {
            TaskError::Core(inner) => inner,
            TaskError::Io { source, .. } => LabeebError::Io(source),
            other => LabeebError::Serialization(other.to_string()),
        }
    }
}
