use rusqlite::Connection;

use crate::error::Result;

/// Initialise the task schema in `conn`.
///
/// Creates the `tasks` table (idempotent) and an index on `state` so the
/// scheduler's runnable poll stays cheap.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS tasks (
            task_id             TEXT NOT NULL PRIMARY KEY,
            name                TEXT NOT NULL UNIQUE,
            slug                TEXT NOT NULL UNIQUE,
            description         TEXT NOT NULL DEFAULT '',
            schedule_kind       TEXT NOT NULL,      -- 'interval' | 'day_time'
            schedule_info       TEXT NOT NULL,      -- JSON-encoded ScheduleInfo
            schedule            TEXT NOT NULL,      -- flattened, human readable
            executable_path     TEXT NOT NULL DEFAULT '',
            log_path            TEXT NOT NULL DEFAULT '',
            last_execution_time TEXT,               -- RFC 3339, whole seconds
            next_execution_time TEXT,               -- RFC 3339, whole seconds
            state               TEXT NOT NULL DEFAULT 'runnable',
            error_text          TEXT,
            created_at          TEXT NOT NULL,
            updated_at          TEXT NOT NULL
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_tasks_state ON tasks (state);
        ",
    )?;
    Ok(())
}
