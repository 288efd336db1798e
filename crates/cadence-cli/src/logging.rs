use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use cadence_core::WorkspacePaths;
use tracing_subscriber::EnvFilter;

/// Service log name under `<root>/logs/services/`.
pub const SERVICE_NAME: &str = "cadence";

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `default_filter`. Output goes to the service log
/// file; if that cannot be opened it goes to stderr instead. Returns the log
/// file path when the file sink is active.
pub fn init(paths: &WorkspacePaths, default_filter: &str) -> Option<PathBuf> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let log_path = paths.service_log(SERVICE_NAME);

    match open_append(&log_path) {
        Ok(file) => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
            Some(log_path)
        }
        Err(e) => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            tracing::warn!(
                path = %log_path.display(),
                error = %e,
                "log file unavailable; logging to stderr"
            );
            None
        }
    }
}

fn open_append(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_is_created_with_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/services/cadence.log");
        open_append(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn unwritable_location_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"").unwrap();
        assert!(open_append(&blocker.join("nested.log")).is_err());
    }
}
