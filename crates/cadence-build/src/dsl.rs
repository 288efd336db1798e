//! Fluent schedule sentences.
//!
//! ```rust,no_run
//! use cadence_build::{BuildPipeline, Schedule};
//!
//! # async fn demo(pipeline: &BuildPipeline) -> cadence_build::Result<()> {
//! Schedule::new().run().every(10).seconds().build(pipeline).await?;
//! Schedule::new().on().monday().at("09:30").build(pipeline).await?;
//! # Ok(())
//! # }
//! ```
//!
//! Nothing is checked until the sentence is built, so a bad interval or time
//! literal surfaces as [`BuildError::Configuration`] from `build`.

use std::path::Path;

use cadence_tasks::schedule::{parse_time, TIME_LAYOUT};
use cadence_tasks::{Day, IntervalUnit, ScheduleInfo, TaskRecord};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use tracing::debug;

use crate::error::{BuildError, Result};
use crate::pipeline::{BuildPipeline, BuildTask};

/// File read from the task's working directory by [`Action::build`].
pub const MANIFEST_FILE: &str = "task.toml";

/// Name and description of the task being built.
///
/// Resolved from `task.toml` with `TASK_NAME` / `TASK_DESCRIPTION`
/// environment overrides.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TaskManifest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl TaskManifest {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }

    /// Load from `<dir>/task.toml` merged with `TASK_*` env vars.
    pub fn load(dir: &Path) -> Result<Self> {
        let manifest: Self = Figment::new()
            .merge(Toml::file(dir.join(MANIFEST_FILE)))
            .merge(Env::prefixed("TASK_").only(&["name", "description"]))
            .extract()
            .map_err(|e| BuildError::Manifest(e.to_string()))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// The name becomes a directory under the tasks dir and a file stem
    /// under the workspace, so it must stay a single path component.
    fn validate(&self) -> Result<()> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(BuildError::Manifest("task name is empty".into()));
        }
        if name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
            return Err(BuildError::Manifest(format!(
                "task name '{}' must not contain path separators or be '.' or '..'",
                self.name
            )));
        }
        Ok(())
    }
}

/// Start of every sentence.
#[derive(Debug, Clone, Copy, Default)]
pub struct Schedule;

impl Schedule {
    pub fn new() -> Self {
        Schedule
    }

    /// `run().every(n).<unit>()`
    pub fn run(self) -> Run {
        Run
    }

    /// `on().<day>().at("HH:MM")`
    pub fn on(self) -> On {
        On
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Run;

impl Run {
    pub fn every(self, n: i64) -> Every {
        Every { n }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Every {
    n: i64,
}

impl Every {
    pub fn seconds(self) -> Action {
        self.unit(IntervalUnit::Seconds)
    }

    pub fn minutes(self) -> Action {
        self.unit(IntervalUnit::Minutes)
    }

    pub fn hours(self) -> Action {
        self.unit(IntervalUnit::Hours)
    }

    fn unit(self, unit: IntervalUnit) -> Action {
        Action(Pending::Interval { n: self.n, unit })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct On;

impl On {
    pub fn monday(self) -> OnDay {
        OnDay(Day::Monday)
    }
    pub fn tuesday(self) -> OnDay {
        OnDay(Day::Tuesday)
    }
    pub fn wednesday(self) -> OnDay {
        OnDay(Day::Wednesday)
    }
    pub fn thursday(self) -> OnDay {
        OnDay(Day::Thursday)
    }
    pub fn friday(self) -> OnDay {
        OnDay(Day::Friday)
    }
    pub fn saturday(self) -> OnDay {
        OnDay(Day::Saturday)
    }
    pub fn sunday(self) -> OnDay {
        OnDay(Day::Sunday)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OnDay(Day);

impl OnDay {
    pub fn at(self, time: impl Into<String>) -> Action {
        Action(Pending::DayTime {
            day: self.0,
            time: time.into(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Pending {
    Interval { n: i64, unit: IntervalUnit },
    DayTime { day: Day, time: String },
}

/// A complete, not yet validated schedule sentence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action(Pending);

impl Action {
    /// Validate the sentence into a storable descriptor.
    pub fn schedule_info(&self) -> Result<ScheduleInfo> {
        match &self.0 {
            Pending::Interval { n, unit } => {
                let interval = u64::try_from(*n)
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| {
                        BuildError::Configuration(format!("interval must be positive, got {n}"))
                    })?;
                Ok(ScheduleInfo::Interval {
                    unit: *unit,
                    interval,
                })
            }
            Pending::DayTime { day, time } => {
                let parsed = parse_time(time).ok_or_else(|| {
                    BuildError::Configuration(format!(
                        "invalid time '{time}', expected 24-hour HH:MM"
                    ))
                })?;
                Ok(ScheduleInfo::DayTime {
                    day: *day,
                    time: parsed.format(TIME_LAYOUT).to_string(),
                })
            }
        }
    }

    /// Build using the manifest found in the current directory.
    pub async fn build(self, pipeline: &BuildPipeline) -> Result<TaskRecord> {
        let schedule_info = self.schedule_info()?;
        let cwd = std::env::current_dir()
            .map_err(|e| BuildError::Manifest(format!("cannot read working directory: {e}")))?;
        let manifest = TaskManifest::load(&cwd)?;
        run(pipeline, manifest, schedule_info).await
    }

    /// Build with an explicit manifest; no file or environment lookup.
    pub async fn build_with(
        self,
        pipeline: &BuildPipeline,
        manifest: TaskManifest,
    ) -> Result<TaskRecord> {
        let schedule_info = self.schedule_info()?;
        manifest.validate()?;
        run(pipeline, manifest, schedule_info).await
    }
}

async fn run(
    pipeline: &BuildPipeline,
    manifest: TaskManifest,
    schedule_info: ScheduleInfo,
) -> Result<TaskRecord> {
    debug!(task = %manifest.name, schedule = %schedule_info.flatten(), "schedule accepted");
    pipeline
        .build(BuildTask {
            name: manifest.name,
            description: manifest.description,
            schedule_info,
        })
        .await
}
