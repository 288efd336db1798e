use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("bus transport error ({addr}): {source}")]
    Transport {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out connecting to bus at {addr} after {after:?}")]
    Timeout { addr: String, after: Duration },

    #[error("cannot encode bus message: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("malformed bus message: {0}")]
    Decode(#[source] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BusError>;
