//! `cadence-core`: configuration, workspace layout and identifiers shared by
//! every cadence crate.

pub mod config;
pub mod error;
pub mod paths;
pub mod types;

pub use config::CadenceConfig;
pub use error::{CadenceError, Result};
pub use paths::WorkspacePaths;
pub use types::{slugify, TaskId};
