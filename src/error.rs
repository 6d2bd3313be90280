//! Error types for the board engine

use std::path::PathBuf;
use thiserror::Error;

/// Result type for board operations
pub type Result<T> = std::result::Result<T, BoardError>;

/// Errors that can occur while mutating or persisting a board
#[derive(Debug, Error)]
pub enum BoardError {
    /// Task not found anywhere on the board
    #[error("task not found: {id}")]
    TaskNotFound { id: String },

    /// Column not found
    #[error("column not found: {id}")]
    ColumnNotFound { id: String },

    /// A task with this id already exists on the board
    #[error("duplicate task ID: {id}")]
    DuplicateTask { id: String },

    /// Column is at its task limit
    #[error("column '{id}' is full ({limit} tasks)")]
    ColumnFull { id: String, limit: usize },

    /// The persistence collaborator rejected an operation
    #[error("persistence failed: {message}")]
    Persistence { message: String },

    /// Config file could not be read or parsed
    #[error("invalid config at {path}: {message}")]
    Config { path: PathBuf, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BoardError {
    /// Create a task-not-found error
    pub fn task_not_found(id: impl Into<String>) -> Self {
        Self::TaskNotFound { id: id.into() }
    }

    /// Create a column-not-found error
    pub fn column_not_found(id: impl Into<String>) -> Self {
        Self::ColumnNotFound { id: id.into() }
    }

    /// Create a persistence error
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }
}
