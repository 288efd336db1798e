use cadence_tasks::TaskError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    /// The schedule sentence is invalid (zero interval, bad time literal).
    #[error("invalid schedule: {0}")]
    Configuration(String),

    /// Task name/description could not be resolved.
    #[error("invalid task manifest: {0}")]
    Manifest(String),

    /// Source missing or the compiler rejected it. Nothing was persisted.
    #[error("build of '{task}' failed: {reason}")]
    BuildFailed { task: String, reason: String },

    #[error(transparent)]
    Persistence(#[from] TaskError),
}

impl BuildError {
    pub fn failed(task: impl Into<String>, reason: impl Into<String>) -> Self {
        BuildError::BuildFailed {
            task: task.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BuildError>;
