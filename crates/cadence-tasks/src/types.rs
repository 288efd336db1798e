use cadence_core::TaskId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unit of an interval schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalUnit {
    Seconds,
    Minutes,
    Hours,
}

impl IntervalUnit {
    pub fn as_secs(&self) -> u64 {
        match self {
            IntervalUnit::Seconds => 1,
            IntervalUnit::Minutes => 60,
            IntervalUnit::Hours => 3_600,
        }
    }
}

impl std::fmt::Display for IntervalUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IntervalUnit::Seconds => "seconds",
            IntervalUnit::Minutes => "minutes",
            IntervalUnit::Hours => "hours",
        };
        write!(f, "{s}")
    }
}

/// Day of the week for day-time schedules. Serialised with its full English name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Day {
    pub fn weekday(&self) -> chrono::Weekday {
        match self {
            Day::Monday => chrono::Weekday::Mon,
            Day::Tuesday => chrono::Weekday::Tue,
            Day::Wednesday => chrono::Weekday::Wed,
            Day::Thursday => chrono::Weekday::Thu,
            Day::Friday => chrono::Weekday::Fri,
            Day::Saturday => chrono::Weekday::Sat,
            Day::Sunday => chrono::Weekday::Sun,
        }
    }
}

impl std::fmt::Display for Day {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Which sentence form of the schedule DSL produced a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleKind {
    Interval,
    DayTime,
}

impl std::fmt::Display for ScheduleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ScheduleKind::Interval => "interval",
            ScheduleKind::DayTime => "day_time",
        };
        write!(f, "{s}")
    }
}

/// Kind-specific schedule descriptor, stored as a JSON blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScheduleInfo {
    /// Fire every `interval` `unit`s.
    Interval { unit: IntervalUnit, interval: u64 },

    /// Fire weekly on `day` at `time` (`HH:MM`, 24-hour, UTC).
    DayTime { day: Day, time: String },
}

impl ScheduleInfo {
    pub fn kind(&self) -> ScheduleKind {
        match self {
            ScheduleInfo::Interval { .. } => ScheduleKind::Interval,
            ScheduleInfo::DayTime { .. } => ScheduleKind::DayTime,
        }
    }

    /// Human-readable flattening, e.g. `unit:seconds,interval:10` or
    /// `day:Monday,time:09:30`. Field order is fixed.
    pub fn flatten(&self) -> String {
        match self {
            ScheduleInfo::Interval { unit, interval } => format!("unit:{unit},interval:{interval}"),
            ScheduleInfo::DayTime { day, time } => format!("day:{day},time:{time}"),
        }
    }
}

/// Lifecycle state of a task. Replaces four mutually exclusive booleans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Eligible for pickup by the scheduler.
    Runnable,
    Queued,
    Running,
    /// Last execution failed; see `error_text`.
    Errored,
    /// Operator switched the task off. Dominates every other state.
    Disabled,
}

/// A status-setter call: which flag is being asserted or cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Running(bool),
    Queued(bool),
    Error(bool),
    Disabled(bool),
}

impl TaskState {
    /// Apply a status-setter call.
    ///
    /// | call             | effect                                   |
    /// |------------------|------------------------------------------|
    /// | `Disabled(true)` | → Disabled from anywhere                 |
    /// | `Disabled(false)`| Disabled → Runnable                      |
    /// | `X(true)`        | → X, unless Disabled                     |
    /// | `X(false)`       | X → Runnable, any other state unchanged  |
    pub fn apply(self, transition: Transition) -> TaskState {
        use TaskState::*;
        match (self, transition) {
            (_, Transition::Disabled(true)) => Disabled,
            (Disabled, Transition::Disabled(false)) => Runnable,
            (Disabled, _) => Disabled,
            (_, Transition::Running(true)) => Running,
            (_, Transition::Queued(true)) => Queued,
            (_, Transition::Error(true)) => Errored,
            (Running, Transition::Running(false))
            | (Queued, Transition::Queued(false))
            | (Errored, Transition::Error(false)) => Runnable,
            (state, _) => state,
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskState::Runnable => "runnable",
            TaskState::Queued => "queued",
            TaskState::Running => "running",
            TaskState::Errored => "errored",
            TaskState::Disabled => "disabled",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for TaskState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "runnable" => Ok(TaskState::Runnable),
            "queued" => Ok(TaskState::Queued),
            "running" => Ok(TaskState::Running),
            "errored" => Ok(TaskState::Errored),
            "disabled" => Ok(TaskState::Disabled),
            other => Err(format!("unknown task state: {other}")),
        }
    }
}

/// A persisted task record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// UUIDv7 string. Primary key, immutable.
    pub task_id: TaskId,
    /// Human identifier, unique and immutable.
    pub name: String,
    /// Derived from `name`; names the task's log file.
    pub slug: String,
    pub description: String,
    pub schedule_info: ScheduleInfo,
    /// Flattened `schedule_info`.
    pub schedule: String,
    pub executable_path: String,
    pub log_path: String,
    pub last_execution_time: Option<DateTime<Utc>>,
    pub next_execution_time: Option<DateTime<Utc>>,
    pub state: TaskState,
    pub error_text: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl TaskRecord {
    pub fn schedule_kind(&self) -> ScheduleKind {
        self.schedule_info.kind()
    }

    pub fn is_running(&self) -> bool {
        self.state == TaskState::Running
    }

    pub fn is_queued(&self) -> bool {
        self.state == TaskState::Queued
    }

    pub fn is_error(&self) -> bool {
        self.state == TaskState::Errored
    }

    pub fn is_disabled(&self) -> bool {
        self.state == TaskState::Disabled
    }

    /// True iff none of the four status flags is set.
    pub fn is_runnable(&self) -> bool {
        self.state == TaskState::Runnable
    }

    /// True when `info` differs from what is stored for this task.
    pub fn schedule_changed(&self, info: &ScheduleInfo) -> bool {
        self.schedule_info != *info
    }
}

impl std::fmt::Display for TaskRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ts = |t: &Option<DateTime<Utc>>| {
            t.map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "N/A".to_string())
        };
        writeln!(f, "TaskId: {}", self.task_id)?;
        writeln!(f, "Name: {}", self.name)?;
        writeln!(f, "Description: {}", self.description)?;
        writeln!(f, "Schedule: {} ({})", self.schedule, self.schedule_kind())?;
        writeln!(f, "LastExecutionTime: {}", ts(&self.last_execution_time))?;
        writeln!(f, "NextExecutionTime: {}", ts(&self.next_execution_time))?;
        writeln!(f, "LogPath: {}", self.log_path)?;
        writeln!(f, "Slug: {}", self.slug)?;
        writeln!(f, "Executable: {}", self.executable_path)?;
        writeln!(f, "State: {}", self.state)?;
        write!(f, "ErrorText: {}", self.error_text.as_deref().unwrap_or(""))
    }
}

/// Input to [`crate::TaskRepository::upsert_task`]: the fields a build may
/// write. Identity (`task_id`, `slug`) and status are owned by the repository.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDraft {
    pub name: String,
    pub description: String,
    pub schedule_info: ScheduleInfo,
    pub executable_path: String,
    pub log_path: String,
    pub last_execution_time: Option<DateTime<Utc>>,
    pub next_execution_time: Option<DateTime<Utc>>,
}

impl TaskDraft {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        schedule_info: ScheduleInfo,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            schedule_info,
            executable_path: String::new(),
            log_path: String::new(),
            last_execution_time: None,
            next_execution_time: None,
        }
    }

    pub fn with_executable(mut self, path: impl Into<String>) -> Self {
        self.executable_path = path.into();
        self
    }

    pub fn with_log_path(mut self, path: impl Into<String>) -> Self {
        self.log_path = path.into();
        self
    }

    pub fn with_next_execution(mut self, at: DateTime<Utc>) -> Self {
        self.next_execution_time = Some(at);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_info_serializes_unit_and_interval() {
        let info = ScheduleInfo::Interval {
            unit: IntervalUnit::Seconds,
            interval: 10,
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["unit"], "seconds");
        assert_eq!(json["interval"], 10);
        assert_eq!(info.flatten(), "unit:seconds,interval:10");
        assert_eq!(info.kind(), ScheduleKind::Interval);
    }

    #[test]
    fn day_time_info_flattens_day_and_time() {
        let info = ScheduleInfo::DayTime {
            day: Day::Monday,
            time: "09:30".into(),
        };
        assert_eq!(info.flatten(), "day:Monday,time:09:30");
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["day"], "Monday");
        assert_eq!(json["kind"], "day_time");
    }

    #[test]
    fn disabled_dominates_every_state() {
        for state in [
            TaskState::Runnable,
            TaskState::Queued,
            TaskState::Running,
            TaskState::Errored,
            TaskState::Disabled,
        ] {
            assert_eq!(state.apply(Transition::Disabled(true)), TaskState::Disabled);
        }
        let disabled = TaskState::Disabled;
        assert_eq!(
            disabled.apply(Transition::Running(true)),
            TaskState::Disabled
        );
        assert_eq!(
            disabled.apply(Transition::Queued(true)),
            TaskState::Disabled
        );
        assert_eq!(disabled.apply(Transition::Error(true)), TaskState::Disabled);
        assert_eq!(
            disabled.apply(Transition::Disabled(false)),
            TaskState::Runnable
        );
    }

    #[test]
    fn clearing_a_flag_only_affects_its_own_state() {
        assert_eq!(
            TaskState::Running.apply(Transition::Running(false)),
            TaskState::Runnable
        );
        assert_eq!(
            TaskState::Queued.apply(Transition::Running(false)),
            TaskState::Queued
        );
        assert_eq!(
            TaskState::Errored.apply(Transition::Queued(false)),
            TaskState::Errored
        );
        assert_eq!(
            TaskState::Runnable.apply(Transition::Disabled(false)),
            TaskState::Runnable
        );
    }

    #[test]
    fn asserting_a_flag_clears_the_others() {
        assert_eq!(
            TaskState::Queued.apply(Transition::Running(true)),
            TaskState::Running
        );
        assert_eq!(
            TaskState::Running.apply(Transition::Queued(true)),
            TaskState::Queued
        );
        assert_eq!(
            TaskState::Errored.apply(Transition::Queued(true)),
            TaskState::Queued
        );
        assert_eq!(
            TaskState::Running.apply(Transition::Error(true)),
            TaskState::Errored
        );
    }

    #[test]
    fn state_round_trips_through_str() {
        for s in ["runnable", "queued", "running", "errored", "disabled"] {
            let state: TaskState = s.parse().unwrap();
            assert_eq!(state.to_string(), s);
        }
        assert!("paused".parse::<TaskState>().is_err());
    }
}
