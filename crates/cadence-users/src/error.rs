use thiserror::Error;

/// All user-layer errors.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("User not found: {0}")]
    NotFound(String),

    #[error("User already exists: {0}")]
    Conflict(String),

    /// Unknown user, wrong password and unknown token all map here so a
    /// caller cannot tell them apart.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

pub type Result<T> = std::result::Result<T, UserError>;
