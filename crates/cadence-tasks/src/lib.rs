//! `cadence-tasks`: task records, their state machine, SQLite persistence
//! and the retry wrapper tasks run under.
//!
//! # Task states
//!
//! | State      | Meaning                                              |
//! |------------|------------------------------------------------------|
//! | `Runnable` | No status flag set; the scheduler may pick it up     |
//! | `Queued`   | Picked up, waiting for an executor                   |
//! | `Running`  | Executing                                            |
//! | `Errored`  | Last run failed; `error_text` says why               |
//! | `Disabled` | Switched off by an operator; dominates all the above |
//!
//! The scheduler loop that drives these transitions lives outside this crate;
//! it talks to [`TaskRepository`] only.

pub mod db;
pub mod error;
pub mod logs;
pub mod repo;
pub mod retry;
pub mod schedule;
pub mod types;

pub use error::{Result, TaskError};
pub use logs::DEFAULT_TAIL_LINES;
pub use repo::TaskRepository;
pub use retry::{run_with_retry, RetryError, RetryPolicy};
pub use schedule::compute_next_run;
pub use types::{
    Day, IntervalUnit, ScheduleInfo, ScheduleKind, TaskDraft, TaskRecord, TaskState, Transition,
};
