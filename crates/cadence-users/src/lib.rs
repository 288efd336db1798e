//! `cadence-users`: the administrative account that gates task mutation.
//!
//! One bootstrap user (`admin`/`admin`) is created on first start. Its
//! password is stored as an argon2 PHC string and it carries a random bearer
//! token that is rotated whenever the password changes.

pub mod auth;
pub mod db;
pub mod error;
pub mod store;
pub mod types;

pub use error::{Result, UserError};
pub use store::{UserStore, BOOTSTRAP_USER};
pub use types::{User, UserUpdate};
