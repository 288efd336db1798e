//! Subcommand implementations. Each module exposes one `execute` per
//! command group.

pub mod bus;
pub mod tasks;
pub mod user;

use anyhow::{bail, Context as _, Result};
use cadence_core::{CadenceConfig, WorkspacePaths};
use cadence_tasks::TaskRepository;
use cadence_users::{User, UserStore};
use tracing::debug;

/// Environment variable consulted when `--token` is not given.
pub const TOKEN_ENV: &str = "CADENCE_TOKEN";

/// Everything a command needs: resolved config, workspace layout and the
/// caller's bearer token, if any.
pub struct Context {
    pub config: CadenceConfig,
    pub paths: WorkspacePaths,
    token: Option<String>,
}

impl Context {
    pub fn new(config: CadenceConfig, paths: WorkspacePaths, token: Option<String>) -> Self {
        Self {
            config,
            paths,
            token,
        }
    }

    pub fn tasks(&self) -> Result<TaskRepository> {
        TaskRepository::open(&self.config.database.path)
            .with_context(|| format!("failed to open task database {}", self.config.database.path))
    }

    pub fn users(&self) -> Result<UserStore> {
        UserStore::open(&self.config.database.path)
            .with_context(|| format!("failed to open user database {}", self.config.database.path))
    }

    /// Resolve the caller's token to the admin user. Every command that
    /// changes state goes through here first.
    pub fn authorize(&self) -> Result<User> {
        let token = match &self.token {
            Some(t) => t.clone(),
            None => match std::env::var(TOKEN_ENV) {
                Ok(t) => t,
                Err(_) => bail!("this command needs --token or {TOKEN_ENV}"),
            },
        };
        let user = self
            .users()?
            .validate_token(token.trim())
            .context("token rejected")?;
        debug!(user = %user.user_name, "authorized");
        Ok(user)
    }
}
