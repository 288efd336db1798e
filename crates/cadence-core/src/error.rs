use thiserror::Error;

#[derive(Debug, Error)]
pub enum CadenceError {
    /// The config file exists but could not be parsed or merged.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CadenceError {
    /// Short error code string, stable across releases so operators can grep logs.
    pub fn code(&self) -> &'static str {
        match self {
            CadenceError::Config(_) => "CONFIG_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, CadenceError>;
