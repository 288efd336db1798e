use thiserror::Error;

/// Errors that can occur within the task repository.
#[derive(Debug, Error)]
pub enum TaskError {
    /// No task matches the given name or id.
    #[error("Task not found: {key}")]
    NotFound { key: String },

    /// A unique column (name, task_id or slug) already holds this value.
    #[error("Task conflict: {0}")]
    Conflict(String),

    /// Underlying SQLite / rusqlite error. Open transactions are rolled back
    /// before this is returned.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Schedule descriptor could not be encoded for storage.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error while touching a task artifact or log.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TaskError {
    pub fn not_found(key: impl Into<String>) -> Self {
        TaskError::NotFound { key: key.into() }
    }
}

pub type Result<T> = std::result::Result<T, TaskError>;
