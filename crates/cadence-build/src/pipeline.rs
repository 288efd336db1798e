use std::sync::Arc;

use cadence_core::WorkspacePaths;
use cadence_tasks::{
    compute_next_run, ScheduleInfo, TaskDraft, TaskError, TaskRecord, TaskRepository,
};
use chrono::Utc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{info, instrument};

use crate::compiler::Compiler;
use crate::error::{BuildError, Result};

/// Serialises builds. Clones share one lock; separately created locks are
/// independent.
#[derive(Debug, Clone, Default)]
pub struct BuildLock(Arc<Mutex<()>>);

impl BuildLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access. The build slot is released when the guard
    /// drops.
    pub async fn acquire(&self) -> MutexGuard<'_, ()> {
        self.0.lock().await
    }
}

/// A validated schedule plus the task identity it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTask {
    pub name: String,
    pub description: String,
    pub schedule_info: ScheduleInfo,
}

/// Compile a task's source into its artifact and record the task.
#[derive(Clone)]
pub struct BuildPipeline {
    repo: Arc<TaskRepository>,
    paths: WorkspacePaths,
    compiler: Arc<dyn Compiler>,
    lock: BuildLock,
}

impl BuildPipeline {
    /// A pipeline with its own lock.
    pub fn new(
        repo: Arc<TaskRepository>,
        paths: WorkspacePaths,
        compiler: Arc<dyn Compiler>,
    ) -> Self {
        Self::with_lock(repo, paths, compiler, BuildLock::new())
    }

    /// A pipeline sharing `lock` with whoever else holds a clone of it.
    pub fn with_lock(
        repo: Arc<TaskRepository>,
        paths: WorkspacePaths,
        compiler: Arc<dyn Compiler>,
        lock: BuildLock,
    ) -> Self {
        Self {
            repo,
            paths,
            compiler,
            lock,
        }
    }

    pub fn lock(&self) -> &BuildLock {
        &self.lock
    }

    pub fn paths(&self) -> &WorkspacePaths {
        &self.paths
    }

    pub fn repo(&self) -> &Arc<TaskRepository> {
        &self.repo
    }

    /// Compile and upsert `task` while holding the build lock.
    ///
    /// On compiler failure nothing is written. A rebuild with an unchanged
    /// schedule keeps the stored execution times; otherwise the next run is
    /// computed from now.
    #[instrument(skip(self, task), fields(task = %task.name))]
    pub async fn build(&self, task: BuildTask) -> Result<TaskRecord> {
        let _guard = self.lock.acquire().await;

        let source = self.paths.task_source(&task.name);
        if !source.is_dir() {
            return Err(BuildError::failed(
                &task.name,
                format!("source directory {} does not exist", source.display()),
            ));
        }
        let output = self.paths.task_executable(&task.name);
        let log_path = self.paths.task_log(&task.name);
        self.paths.ensure_dirs().map_err(|e| {
            BuildError::failed(&task.name, format!("cannot prepare workspace: {e}"))
        })?;
        info!(source = %source.display(), output = %output.display(), "building task");

        self.compiler.compile(&task.name, &source, &output).await?;

        let draft = TaskDraft::new(&task.name, &task.description, task.schedule_info)
            .with_executable(output.to_string_lossy())
            .with_log_path(log_path.to_string_lossy());
        let repo = Arc::clone(&self.repo);
        let record = tokio::task::spawn_blocking(move || persist(&repo, draft))
            .await
            .map_err(|e| BuildError::failed(&task.name, format!("persist task failed: {e}")))??;
        info!(task_id = %record.task_id, schedule = %record.schedule, "task saved");
        Ok(record)
    }
}

/// Upsert the built task. Runs on the blocking pool since the repository may
/// wait on another writer's lock.
fn persist(repo: &TaskRepository, mut draft: TaskDraft) -> Result<TaskRecord> {
    match repo.get_by_name(&draft.name) {
        Ok(existing) if !existing.schedule_changed(&draft.schedule_info) => {
            draft.last_execution_time = existing.last_execution_time;
            draft.next_execution_time = existing.next_execution_time;
        }
        Ok(_) | Err(TaskError::NotFound { .. }) => {
            draft.next_execution_time = compute_next_run(&draft.schedule_info, Utc::now());
        }
        Err(e) => return Err(e.into()),
    }
    Ok(repo.upsert_task(&draft)?)
}
