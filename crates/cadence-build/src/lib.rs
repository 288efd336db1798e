//! `cadence-build`: schedule sentences and the pipeline that compiles a task
//! and records it.
//!
//! | Step                      | Where                         |
//! |---------------------------|-------------------------------|
//! | `Schedule::new()…` DSL    | [`dsl`]                       |
//! | Validation                | [`Action::schedule_info`]     |
//! | Exclusive build slot      | [`BuildLock`]                 |
//! | Source → artifact         | [`Compiler`] implementations  |
//! | Persist                   | [`BuildPipeline::build`]      |

pub mod compiler;
pub mod dsl;
pub mod error;
pub mod pipeline;

pub use compiler::{Compiler, ToolchainCompiler};
pub use dsl::{Action, Schedule, TaskManifest};
pub use error::{BuildError, Result};
pub use pipeline::{BuildLock, BuildPipeline, BuildTask};
