use rusqlite::{Connection, Result};

use crate::types::User;

/// Column order shared by every user SELECT in this crate.
pub(crate) const USER_SELECT_SQL: &str =
    "SELECT id, user_name, password, token, created_at, updated_at FROM users";

/// Map a SELECT row (column order from USER_SELECT_SQL) to a User.
pub(crate) fn row_to_user(row: &rusqlite::Row<'_>) -> Result<User> {
    Ok(User {
        id: row.get(0)?,
        user_name: row.get(1)?,
        password: row.get(2)?,
        token: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

/// Initialise the users table. Safe to call on every startup.
pub fn init_db(conn: &Connection) -> Result<()> {
    // UNIQUE(token) backs validate_token's single-row lookup.
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY NOT NULL,
            user_name   TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            token       TEXT NOT NULL UNIQUE,
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        );",
    )
}
