use std::path::{Path, PathBuf};

use crate::config::WorkspaceConfig;
use crate::types::slugify;

/// Resolved on-disk layout.
///
/// ```text
/// <root>/logs/tasks/<slug>.log       per-task log
/// <root>/logs/services/<name>.log    service logs
/// <root>/exec/tasks/<slug>.bin       compiled task artifacts
/// <tasks_dir>/<task name>/           task sources
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspacePaths {
    root: PathBuf,
    tasks_dir: PathBuf,
}

impl WorkspacePaths {
    pub fn new(root: impl Into<PathBuf>, tasks_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            tasks_dir: tasks_dir.into(),
        }
    }

    pub fn from_config(config: &WorkspaceConfig) -> Self {
        Self::new(&config.root, &config.tasks_dir)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tasks_dir(&self) -> &Path {
        &self.tasks_dir
    }

    pub fn task_log_dir(&self) -> PathBuf {
        self.root.join("logs").join("tasks")
    }

    pub fn service_log_dir(&self) -> PathBuf {
        self.root.join("logs").join("services")
    }

    pub fn task_exec_dir(&self) -> PathBuf {
        self.root.join("exec").join("tasks")
    }

    pub fn service_log(&self, service: &str) -> PathBuf {
        self.service_log_dir().join(format!("{service}.log"))
    }

    pub fn task_log(&self, task_name: &str) -> PathBuf {
        self.task_log_dir()
            .join(format!("{}.log", slugify(task_name)))
    }

    /// Artifact path for a task. Deterministic in the task name so rebuilding
    /// a task overwrites its previous artifact.
    pub fn task_executable(&self, task_name: &str) -> PathBuf {
        self.task_exec_dir()
            .join(format!("{}.bin", slugify(task_name)))
    }

    /// Source directory for a task (not validated here).
    pub fn task_source(&self, task_name: &str) -> PathBuf {
        self.tasks_dir.join(task_name)
    }

    /// Create every directory cadence writes into. Idempotent.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [
            self.task_log_dir(),
            self.service_log_dir(),
            self.task_exec_dir(),
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}
