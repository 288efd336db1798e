use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, TransactionBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::{generate_token, hash_password, verify_password};
use crate::db::{init_db, row_to_user, USER_SELECT_SQL};
use crate::error::{Result, UserError};
use crate::types::{User, UserUpdate};

/// Name and initial password of the account created on first start.
pub const BOOTSTRAP_USER: &str = "admin";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Credential store for the single administrative account.
///
/// Lookups are always fresh queries; writes run under the connection lock
/// inside an immediate transaction, same as the task repository.
pub struct UserStore {
    conn: Mutex<Connection>,
}

impl UserStore {
    /// Wrap `conn`, create the schema and make sure the bootstrap user exists.
    pub fn new(conn: Connection) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        init_db(&conn)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.ensure_bootstrap_user()?;
        Ok(store)
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::new(conn)
    }

    /// Check a name/password pair. Unknown user and wrong password produce the
    /// same error.
    pub fn authenticate(&self, user_name: &str, password: &str) -> Result<User> {
        let conn = self.lock();
        authenticate_in(&conn, user_name, password)
    }

    /// Re-authenticate with the current credentials, then apply whichever
    /// fields `update` carries. A new password also rotates the token.
    pub fn update_user(
        &self,
        current_name: &str,
        current_password: &str,
        update: &UserUpdate,
    ) -> Result<User> {
        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut user = authenticate_in(&tx, current_name, current_password)?;

        if update.is_empty() {
            debug!(user = %current_name, "empty user update");
            return Ok(user);
        }
        if let Some(name) = update.user_name.as_deref().filter(|n| !n.is_empty()) {
            user.user_name = name.to_string();
        }
        let rotated = match update.password.as_deref().filter(|p| !p.is_empty()) {
            Some(password) => {
                user.password = hash_password(password)?;
                user.token = generate_token();
                true
            }
            None => false,
        };
        user.updated_at = Utc::now().to_rfc3339();

        tx.execute(
            "UPDATE users SET user_name=?2, password=?3, token=?4, updated_at=?5 WHERE id=?1",
            params![
                user.id,
                user.user_name,
                user.password,
                user.token,
                user.updated_at
            ],
        )
        .map_err(|e| conflict_or(e, &user.user_name))?;
        tx.commit()?;
        info!(user = %user.user_name, token_rotated = rotated, "user updated");
        Ok(user)
    }

    /// Resolve a bearer token to its user.
    pub fn validate_token(&self, token: &str) -> Result<User> {
        if token.is_empty() {
            return Err(UserError::InvalidCredentials);
        }
        let conn = self.lock();
        select_one(&conn, "token", token)?.ok_or(UserError::InvalidCredentials)
    }

    pub fn get_by_name(&self, user_name: &str) -> Result<User> {
        let conn = self.lock();
        select_one(&conn, "user_name", user_name)?
            .ok_or_else(|| UserError::NotFound(user_name.to_string()))
    }

    fn ensure_bootstrap_user(&self) -> Result<()> {
        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if select_one(&tx, "user_name", BOOTSTRAP_USER)?.is_some() {
            return Ok(());
        }

        let now = Utc::now().to_rfc3339();
        tx.execute(
            "INSERT INTO users (id, user_name, password, token, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![
                Uuid::now_v7().to_string(),
                BOOTSTRAP_USER,
                hash_password(BOOTSTRAP_USER)?,
                generate_token(),
                now,
            ],
        )?;
        tx.commit()?;
        warn!(
            user = BOOTSTRAP_USER,
            "bootstrap user created with default password; change it"
        );
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn authenticate_in(conn: &Connection, user_name: &str, password: &str) -> Result<User> {
    match select_one(conn, "user_name", user_name)? {
        Some(user) if verify_password(&user.password, password) => Ok(user),
        _ => {
            debug!(user = %user_name, "authentication failed");
            Err(UserError::InvalidCredentials)
        }
    }
}

fn select_one(conn: &Connection, column: &str, value: &str) -> Result<Option<User>> {
    let mut stmt = conn.prepare_cached(&format!("{USER_SELECT_SQL} WHERE {column} = ?1"))?;
    Ok(stmt.query_row([value], row_to_user).optional()?)
}

fn conflict_or(e: rusqlite::Error, user_name: &str) -> UserError {
    match e {
        rusqlite::Error::SqliteFailure(ref err, _)
            if err.code == ErrorCode::ConstraintViolation =>
        {
            UserError::Conflict(user_name.to_string())
        }
        other => UserError::Database(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> UserStore {
        UserStore::new(Connection::open_in_memory().unwrap()).unwrap()
    }

    #[test]
    fn bootstrap_creates_admin_once() {
        let store = store();
        let admin = store.authenticate("admin", "admin").unwrap();
        assert!(!admin.token.is_empty());
        assert_ne!(admin.password, "admin");

        store.ensure_bootstrap_user().unwrap();
        let again = store.get_by_name("admin").unwrap();
        assert_eq!(again.token, admin.token);
        assert_eq!(again.password, admin.password);
    }

    #[test]
    fn failures_are_indistinguishable() {
        let store = store();
        let unknown = store.authenticate("nobody", "admin").unwrap_err();
        let wrong = store.authenticate("admin", "guess").unwrap_err();
        assert!(matches!(unknown, UserError::InvalidCredentials));
        assert!(matches!(wrong, UserError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[test]
    fn token_lookup() {
        let store = store();
        let admin = store.get_by_name("admin").unwrap();
        assert_eq!(store.validate_token(&admin.token).unwrap().id, admin.id);
        assert!(matches!(
            store.validate_token("bogus"),
            Err(UserError::InvalidCredentials)
        ));
        assert!(matches!(
            store.validate_token(""),
            Err(UserError::InvalidCredentials)
        ));
    }

    #[test]
    fn get_by_name_misses_with_not_found() {
        assert!(matches!(
            store().get_by_name("ghost"),
            Err(UserError::NotFound(_))
        ));
    }

    #[test]
    fn debug_hides_secrets() {
        let admin = store().get_by_name("admin").unwrap();
        let shown = format!("{admin:?}");
        assert!(!shown.contains(&admin.token));
        assert!(!shown.contains(&admin.password));
    }
}
