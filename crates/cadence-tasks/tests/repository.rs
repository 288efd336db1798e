// Repository behaviour against a real database file, including the
// multi-writer cases an in-memory connection cannot show.

use std::sync::Arc;
use std::thread;

use cadence_tasks::{IntervalUnit, ScheduleInfo, TaskDraft, TaskError, TaskRepository, TaskState};
use chrono::DateTime;

fn every(n: u64) -> ScheduleInfo {
    ScheduleInfo::Interval {
        unit: IntervalUnit::Seconds,
        interval: n,
    }
}

fn open(dir: &tempfile::TempDir) -> TaskRepository {
    TaskRepository::open(dir.path().join("db").join("cadence.db")).unwrap()
}

#[test]
fn concurrent_upserts_of_one_name_create_one_record() {
    let dir = tempfile::tempdir().unwrap();
    let repo = Arc::new(open(&dir));

    let handles: Vec<_> = (0..8u64)
        .map(|i| {
            let repo = Arc::clone(&repo);
            thread::spawn(move || {
                let draft = TaskDraft::new("shared", format!("writer {i}"), every(10 + i));
                repo.upsert_task(&draft).unwrap()
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let all = repo.list_all().unwrap();
    assert_eq!(all.len(), 1);
    for task in &results {
        assert_eq!(task.task_id, all[0].task_id);
        assert_eq!(task.slug, "shared");
    }

    // The surviving row is exactly one writer's fields, never a mix.
    let stored = &all[0];
    let writer = (0..8u64)
        .find(|i| stored.description == format!("writer {i}"))
        .expect("description written by one of the writers");
    assert_eq!(stored.schedule_info, every(10 + writer));
    assert_eq!(
        stored.schedule,
        format!("unit:seconds,interval:{}", 10 + writer)
    );

    // Writers commit one after another, so the row is the last commit's.
    let last = results
        .iter()
        .max_by_key(|t| DateTime::parse_from_rfc3339(&t.updated_at).unwrap())
        .unwrap();
    assert_eq!(stored, last);
}

#[test]
fn serialized_upserts_leave_the_last_writers_fields() {
    let dir = tempfile::tempdir().unwrap();
    let a = open(&dir);
    let b = open(&dir);

    for i in 0..6u64 {
        let repo = if i % 2 == 0 { &a } else { &b };
        repo.upsert_task(&TaskDraft::new("shared", format!("writer {i}"), every(10 + i)))
            .unwrap();
    }

    let stored = a.get_by_name("shared").unwrap();
    assert_eq!(stored.description, "writer 5");
    assert_eq!(stored.schedule_info, every(15));
    assert_eq!(b.get_by_name("shared").unwrap(), stored);
}

#[test]
fn two_connections_on_one_file_share_identity() {
    let dir = tempfile::tempdir().unwrap();
    let a = Arc::new(open(&dir));
    let b = Arc::new(open(&dir));

    let ta = {
        let a = Arc::clone(&a);
        thread::spawn(move || {
            a.upsert_task(&TaskDraft::new("dual", "a", every(1)))
                .unwrap()
        })
    };
    let tb = {
        let b = Arc::clone(&b);
        thread::spawn(move || {
            b.upsert_task(&TaskDraft::new("dual", "b", every(1)))
                .unwrap()
        })
    };
    let (ra, rb) = (ta.join().unwrap(), tb.join().unwrap());

    assert_eq!(ra.task_id, rb.task_id);
    assert_eq!(a.list_all().unwrap().len(), 1);
    assert_eq!(b.get_by_name("dual").unwrap().task_id, ra.task_id);
}

#[test]
fn disabled_task_ignores_run_and_queue_requests() {
    let dir = tempfile::tempdir().unwrap();
    let repo = open(&dir);
    repo.upsert_task(&TaskDraft::new("paused", "", every(5)))
        .unwrap();

    let disabled = repo.set_disabled("paused", true).unwrap();
    assert!(repo.set_running("paused", true).unwrap().is_disabled());
    assert!(repo.set_queued("paused", true).unwrap().is_disabled());

    let task = repo.set_error("paused", true, "ignored").unwrap();
    assert!(task.is_disabled());
    assert_eq!(task.error_text, None);
    assert_eq!(repo.get_by_name("paused").unwrap(), disabled);

    let task = repo.set_disabled("paused", false).unwrap();
    assert!(task.is_runnable());
    assert!(!task.is_running() && !task.is_queued() && !task.is_error());
    assert_eq!(task.error_text, None);
}

#[test]
fn at_most_one_flag_is_ever_set() {
    let dir = tempfile::tempdir().unwrap();
    let repo = open(&dir);
    repo.upsert_task(&TaskDraft::new("cycle", "", every(5)))
        .unwrap();

    let steps = [
        repo.set_queued("cycle", true).unwrap(),
        repo.set_running("cycle", true).unwrap(),
        repo.set_error("cycle", true, "failed").unwrap(),
        repo.set_queued("cycle", true).unwrap(),
        repo.set_queued("cycle", false).unwrap(),
    ];
    for task in &steps {
        let flags = [
            task.is_running(),
            task.is_queued(),
            task.is_error(),
            task.is_disabled(),
        ];
        assert!(flags.iter().filter(|f| **f).count() <= 1, "{task}");
    }
    assert_eq!(steps.last().unwrap().state, TaskState::Runnable);
}

#[test]
fn runnable_listing_and_queued_reset() {
    let dir = tempfile::tempdir().unwrap();
    let repo = open(&dir);
    for name in ["a", "b", "c", "d"] {
        repo.upsert_task(&TaskDraft::new(name, "", every(1)))
            .unwrap();
    }
    repo.set_queued("a", true).unwrap();
    repo.set_queued("b", true).unwrap();
    repo.set_running("c", true).unwrap();

    let runnable: Vec<_> = repo
        .list_runnable()
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(runnable, vec!["d"]);
    assert_eq!(repo.list_running().unwrap().len(), 1);

    assert_eq!(repo.reset_all_queued_flags().unwrap(), 2);
    assert!(repo.get_by_name("a").unwrap().is_runnable());
    assert!(repo.get_by_name("b").unwrap().is_runnable());
    assert!(repo.get_by_name("c").unwrap().is_running());
    assert_eq!(repo.reset_all_queued_flags().unwrap(), 0);
}

#[test]
fn delete_removes_row_and_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let repo = open(&dir);
    let artifact = dir.path().join("doomed.bin");
    std::fs::write(&artifact, b"\x7fELF").unwrap();

    let task = repo
        .upsert_task(
            &TaskDraft::new("doomed", "", every(1)).with_executable(artifact.to_string_lossy()),
        )
        .unwrap();

    let removed = repo.delete_task(task.task_id.as_str()).unwrap();
    assert_eq!(removed.name, "doomed");
    assert!(!artifact.exists());
    assert!(matches!(
        repo.get_by_name("doomed"),
        Err(TaskError::NotFound { .. })
    ));
    assert!(matches!(
        repo.delete_task(task.task_id.as_str()),
        Err(TaskError::NotFound { .. })
    ));
}

#[test]
fn delete_removes_the_task_log() {
    let dir = tempfile::tempdir().unwrap();
    let repo = open(&dir);
    let log = dir.path().join("noisy.log");
    std::fs::write(&log, "started\nfinished\n").unwrap();

    let task = repo
        .upsert_task(&TaskDraft::new("noisy", "", every(1)).with_log_path(log.to_string_lossy()))
        .unwrap();
    assert_eq!(repo.read_log("noisy", 1).unwrap(), vec!["finished"]);

    repo.delete_task(task.task_id.as_str()).unwrap();
    assert!(!log.exists());
}

#[test]
fn read_log_of_a_task_that_never_ran_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let repo = open(&dir);
    let log = dir.path().join("fresh.log");
    repo.upsert_task(&TaskDraft::new("fresh", "", every(1)).with_log_path(log.to_string_lossy()))
        .unwrap();

    assert!(repo.read_log("fresh", 100).unwrap().is_empty());
    assert!(matches!(
        repo.read_log("missing", 100),
        Err(TaskError::NotFound { .. })
    ));
}

#[test]
fn delete_tolerates_missing_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let repo = open(&dir);
    let task = repo
        .upsert_task(
            &TaskDraft::new("ghost", "", every(1))
                .with_executable("/nonexistent/ghost.bin")
                .with_log_path("/nonexistent/ghost.log"),
        )
        .unwrap();
    assert!(repo.delete_task(task.task_id.as_str()).is_ok());
    assert!(repo.list_all().unwrap().is_empty());
}
