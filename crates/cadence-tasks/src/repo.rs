use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use cadence_core::{slugify, TaskId};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, TransactionBehavior};
use tracing::{debug, info, instrument, warn};

use crate::{
    db::init_db,
    error::{Result, TaskError},
    logs,
    schedule::truncate_to_secs,
    types::{ScheduleInfo, TaskDraft, TaskRecord, TaskState, Transition},
};

/// How long a writer waits for another process's write lock before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const TASK_SELECT_SQL: &str = "SELECT task_id, name, slug, description, schedule_info, schedule,
            executable_path, log_path, last_execution_time, next_execution_time,
            state, error_text, created_at, updated_at
     FROM tasks";

/// Persistent store for task records and the only place their status changes.
///
/// Every write runs inside a `BEGIN IMMEDIATE` transaction while holding the
/// in-process connection lock, so concurrent writers (threads here, or other
/// processes sharing the database file) serialise on the read-then-write.
/// Nothing is cached: every read is a fresh query.
pub struct TaskRepository {
    conn: Mutex<Connection>,
}

impl TaskRepository {
    /// Wrap an already-open connection and initialise the schema if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        init_db(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open (creating if necessary) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        info!(path = %path.display(), "task repository opened");
        Self::new(conn)
    }

    /// Create the task if `draft.name` is new, otherwise refresh its schedule
    /// metadata, description, paths and execution times.
    ///
    /// An existing task keeps its `task_id`, `slug` and state.
    #[instrument(skip(self, draft), fields(task = %draft.name))]
    pub fn upsert_task(&self, draft: &TaskDraft) -> Result<TaskRecord> {
        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let now = Utc::now().to_rfc3339();
        let info_json = serde_json::to_string(&draft.schedule_info)?;
        let last = draft.last_execution_time.map(truncate_to_secs);
        let next = draft.next_execution_time.map(truncate_to_secs);

        let task = match select_one(&tx, "name", &draft.name)? {
            Some(mut task) => {
                task.description = draft.description.clone();
                task.schedule_info = draft.schedule_info.clone();
                task.schedule = draft.schedule_info.flatten();
                task.executable_path = draft.executable_path.clone();
                task.log_path = draft.log_path.clone();
                task.last_execution_time = last;
                task.next_execution_time = next;
                task.updated_at = now;

                tx.execute(
                    "UPDATE tasks SET description=?2, schedule_kind=?3, schedule_info=?4,
                        schedule=?5, executable_path=?6, log_path=?7,
                        last_execution_time=?8, next_execution_time=?9, updated_at=?10
                     WHERE task_id=?1",
                    params![
                        task.task_id.as_str(),
                        task.description,
                        task.schedule_kind().to_string(),
                        info_json,
                        task.schedule,
                        task.executable_path,
                        task.log_path,
                        last.map(|t| t.to_rfc3339()),
                        next.map(|t| t.to_rfc3339()),
                        task.updated_at,
                    ],
                )?;
                info!(task_id = %task.task_id, "task updated");
                task
            }
            None => {
                let task = TaskRecord {
                    task_id: TaskId::new(),
                    name: draft.name.clone(),
                    slug: slugify(&draft.name),
                    description: draft.description.clone(),
                    schedule_info: draft.schedule_info.clone(),
                    schedule: draft.schedule_info.flatten(),
                    executable_path: draft.executable_path.clone(),
                    log_path: draft.log_path.clone(),
                    last_execution_time: last,
                    next_execution_time: next,
                    state: TaskState::Runnable,
                    error_text: None,
                    created_at: now.clone(),
                    updated_at: now,
                };

                tx.execute(
                    "INSERT INTO tasks
                     (task_id, name, slug, description, schedule_kind, schedule_info, schedule,
                      executable_path, log_path, last_execution_time, next_execution_time,
                      state, error_text, created_at, updated_at)
                     VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,NULL,?13,?13)",
                    params![
                        task.task_id.as_str(),
                        task.name,
                        task.slug,
                        task.description,
                        task.schedule_kind().to_string(),
                        info_json,
                        task.schedule,
                        task.executable_path,
                        task.log_path,
                        last.map(|t| t.to_rfc3339()),
                        next.map(|t| t.to_rfc3339()),
                        task.state.to_string(),
                        task.created_at,
                    ],
                )
                .map_err(|e| conflict_or(e, &task.name))?;
                info!(task_id = %task.task_id, slug = %task.slug, "task created");
                task
            }
        };

        tx.commit()?;
        Ok(task)
    }

    pub fn get_by_name(&self, name: &str) -> Result<TaskRecord> {
        let conn = self.lock();
        select_one(&conn, "name", name)?.ok_or_else(|| TaskError::not_found(name))
    }

    pub fn get_by_id(&self, task_id: &str) -> Result<TaskRecord> {
        let conn = self.lock();
        select_one(&conn, "task_id", task_id)?.ok_or_else(|| TaskError::not_found(task_id))
    }

    /// Tasks with no status flag set, i.e. eligible for scheduling.
    pub fn list_runnable(&self) -> Result<Vec<TaskRecord>> {
        self.list_in_state(TaskState::Runnable)
    }

    pub fn list_running(&self) -> Result<Vec<TaskRecord>> {
        self.list_in_state(TaskState::Running)
    }

    /// Return all known tasks ordered by creation time.
    pub fn list_all(&self) -> Result<Vec<TaskRecord>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!("{TASK_SELECT_SQL} ORDER BY created_at, name"))?;
        let tasks = stmt
            .query_map([], row_to_task)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    /// Move every queued task back to runnable. Meant to run once at scheduler
    /// startup to repair state left by an unclean shutdown. Other states are
    /// untouched. Returns the number of tasks reset.
    pub fn reset_all_queued_flags(&self) -> Result<usize> {
        let conn = self.lock();
        let n = conn.execute(
            "UPDATE tasks SET state = 'runnable', updated_at = ?1 WHERE state = 'queued'",
            [Utc::now().to_rfc3339()],
        )?;
        if n > 0 {
            warn!(count = n, "queued flags reset");
        }
        Ok(n)
    }

    pub fn set_running(&self, name: &str, value: bool) -> Result<TaskRecord> {
        self.transition(name, Transition::Running(value), None)
    }

    /// Mark (or clear) a failed run. `text` replaces the stored error text in
    /// both directions; pass `""` to clear it.
    pub fn set_error(&self, name: &str, value: bool, text: &str) -> Result<TaskRecord> {
        self.transition(name, Transition::Error(value), Some(text))
    }

    pub fn set_queued(&self, name: &str, value: bool) -> Result<TaskRecord> {
        self.transition(name, Transition::Queued(value), None)
    }

    pub fn set_disabled(&self, name: &str, value: bool) -> Result<TaskRecord> {
        self.transition(name, Transition::Disabled(value), None)
    }

    /// Record a completed scheduling step: the previous `next_execution_time`
    /// becomes the last one (or `fallback_last` when there was none) and
    /// `next` becomes the new target.
    pub fn update_execution_time(
        &self,
        name: &str,
        next: Option<DateTime<Utc>>,
        fallback_last: Option<DateTime<Utc>>,
    ) -> Result<TaskRecord> {
        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut task = select_one(&tx, "name", name)?.ok_or_else(|| TaskError::not_found(name))?;

        task.last_execution_time = task
            .next_execution_time
            .or(fallback_last)
            .map(truncate_to_secs);
        task.next_execution_time = next.map(truncate_to_secs);
        task.updated_at = Utc::now().to_rfc3339();

        tx.execute(
            "UPDATE tasks SET last_execution_time=?2, next_execution_time=?3, updated_at=?4
             WHERE task_id=?1",
            params![
                task.task_id.as_str(),
                task.last_execution_time.map(|t| t.to_rfc3339()),
                task.next_execution_time.map(|t| t.to_rfc3339()),
                task.updated_at,
            ],
        )?;
        tx.commit()?;
        debug!(task = %name, next = ?task.next_execution_time, "execution time updated");
        Ok(task)
    }

    /// Delete a task together with its compiled artifact and its log file.
    /// Returns the removed record.
    ///
    /// The row is removed first; a missing file is logged, any other
    /// filesystem failure is returned after the row is already gone.
    #[instrument(skip(self))]
    pub fn delete_task(&self, task_id: &str) -> Result<TaskRecord> {
        let task = {
            let mut conn = self.lock();
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let task = select_one(&tx, "task_id", task_id)?
                .ok_or_else(|| TaskError::not_found(task_id))?;
            tx.execute("DELETE FROM tasks WHERE task_id = ?1", [task_id])?;
            tx.commit()?;
            task
        };
        info!(task = %task.name, "task deleted");

        if !task.executable_path.is_empty() {
            match std::fs::remove_file(&task.executable_path) {
                Ok(()) => debug!(path = %task.executable_path, "artifact removed"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    warn!(path = %task.executable_path, "artifact already absent")
                }
                Err(e) => return Err(TaskError::Io(e)),
            }
        }
        if !task.log_path.is_empty() {
            logs::remove_log(Path::new(&task.log_path))?;
        }
        Ok(task)
    }

    /// Last `max_lines` lines of the task's log. A task that has not written
    /// a log yet has no lines.
    pub fn read_log(&self, name: &str, max_lines: usize) -> Result<Vec<String>> {
        let task = self.get_by_name(name)?;
        if task.log_path.is_empty() {
            return Ok(Vec::new());
        }
        match logs::tail_lines(Path::new(&task.log_path), max_lines) {
            Err(TaskError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(task = %name, path = %task.log_path, "no log written yet");
                Ok(Vec::new())
            }
            other => other,
        }
    }

    /// Check whether `info` differs from the schedule stored for `name`.
    pub fn schedule_changed(&self, name: &str, info: &ScheduleInfo) -> Result<bool> {
        Ok(self.get_by_name(name)?.schedule_changed(info))
    }

    // --- private helpers ---------------------------------------------------

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock cannot leave a half-applied write:
        // the open transaction is rolled back when it is dropped.
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn list_in_state(&self, state: TaskState) -> Result<Vec<TaskRecord>> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(&format!(
            "{TASK_SELECT_SQL} WHERE state = ?1 ORDER BY created_at, name"
        ))?;
        let tasks = stmt
            .query_map([state.to_string()], row_to_task)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    fn transition(
        &self,
        name: &str,
        transition: Transition,
        error_text: Option<&str>,
    ) -> Result<TaskRecord> {
        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut task = select_one(&tx, "name", name)?.ok_or_else(|| TaskError::not_found(name))?;

        let from = task.state;
        task.state = from.apply(transition);
        if from == TaskState::Disabled && task.state == TaskState::Disabled {
            if transition != Transition::Disabled(true) {
                warn!(task = %name, ?transition, "task is disabled; state unchanged");
            }
            return Ok(task);
        }
        if let Some(text) = error_text {
            task.error_text = (!text.is_empty()).then(|| text.to_string());
        }
        task.updated_at = Utc::now().to_rfc3339();

        tx.execute(
            "UPDATE tasks SET state=?2, error_text=?3, updated_at=?4 WHERE task_id=?1",
            params![
                task.task_id.as_str(),
                task.state.to_string(),
                task.error_text,
                task.updated_at,
            ],
        )?;
        tx.commit()?;
        debug!(task = %name, %from, to = %task.state, "task state changed");
        Ok(task)
    }
}

/// Look up a single task by a unique column (`name` or `task_id`).
fn select_one(conn: &Connection, column: &str, value: &str) -> Result<Option<TaskRecord>> {
    let mut stmt = conn.prepare_cached(&format!("{TASK_SELECT_SQL} WHERE {column} = ?1"))?;
    Ok(stmt.query_row([value], row_to_task).optional()?)
}

/// Map a SELECT row (column order from TASK_SELECT_SQL) to a TaskRecord.
fn row_to_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<TaskRecord> {
    let info_json: String = row.get(4)?;
    let schedule_info: ScheduleInfo =
        serde_json::from_str(&info_json).map_err(|e| conversion_failure(4, e))?;
    let state_str: String = row.get(10)?;
    let state: TaskState = state_str
        .parse()
        .map_err(|e: String| conversion_failure(10, e))?;

    Ok(TaskRecord {
        task_id: TaskId::from(row.get::<_, String>(0)?),
        name: row.get(1)?,
        slug: row.get(2)?,
        description: row.get(3)?,
        schedule_info,
        schedule: row.get(5)?,
        executable_path: row.get(6)?,
        log_path: row.get(7)?,
        last_execution_time: parse_time_column(row, 8)?,
        next_execution_time: parse_time_column(row, 9)?,
        state,
        error_text: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

fn parse_time_column(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    row.get::<_, Option<String>>(idx)?
        .map(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| conversion_failure(idx, e))
        })
        .transpose()
}

fn conversion_failure(
    idx: usize,
    e: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, e.into())
}

/// Turn a unique-constraint violation into `Conflict`; pass anything else through.
fn conflict_or(e: rusqlite::Error, name: &str) -> TaskError {
    match e {
        rusqlite::Error::SqliteFailure(ref err, _)
            if err.code == ErrorCode::ConstraintViolation =>
        {
            TaskError::Conflict(format!("task '{name}' (or its slug) already exists"))
        }
        other => TaskError::Database(other),
    }
}
