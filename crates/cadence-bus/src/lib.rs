//! `cadence-bus`: the control channel used to stop, disable or delete a live
//! task.
//!
//! One TCP connection carries exactly one newline-terminated JSON object.
//! Senders dial the push port (8005 by default); the consuming scheduler
//! listens on the pull port (8006). The listener and what it does with a
//! command live in the scheduler, not here.

pub mod client;
pub mod error;
pub mod message;

pub use client::BusClient;
pub use error::{BusError, Result};
pub use message::{BusMessage, Command};
