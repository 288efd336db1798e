//! Reading and removing per-task log files.

use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;

use tracing::{debug, warn};

use crate::error::Result;

/// Lines returned by a log tail unless the caller asks otherwise.
pub const DEFAULT_TAIL_LINES: usize = 100;

/// Only this many bytes from the end of a log are ever read.
pub const TAIL_WINDOW_BYTES: u64 = 10 * 1024;

/// Last `max_lines` lines of the log at `path`, oldest first.
///
/// Reads at most [`TAIL_WINDOW_BYTES`] from the end of the file. When the
/// window starts mid-file the first, partial line is dropped. Invalid UTF-8
/// is replaced rather than rejected.
pub fn tail_lines(path: &Path, max_lines: usize) -> Result<Vec<String>> {
    let mut file = File::open(path)?;
    let size = file.metadata()?.len();
    let start = size.saturating_sub(TAIL_WINDOW_BYTES);
    file.seek(SeekFrom::Start(start))?;

    let mut buf = Vec::with_capacity((size - start) as usize);
    file.read_to_end(&mut buf)?;
    let text = String::from_utf8_lossy(&buf);

    let mut lines: Vec<&str> = text.lines().collect();
    if start > 0 && !lines.is_empty() {
        lines.remove(0);
    }
    let skip = lines.len().saturating_sub(max_lines);
    Ok(lines[skip..].iter().map(|l| l.to_string()).collect())
}

/// Remove a task's log file. A file that is already gone is only logged.
pub fn remove_log(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "task log removed");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!(path = %path.display(), "task log already absent");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn short_log_is_returned_whole() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.log");
        std::fs::write(&path, "one\ntwo\nthree\n").unwrap();
        assert_eq!(tail_lines(&path, 100).unwrap(), vec!["one", "two", "three"]);
        assert_eq!(tail_lines(&path, 2).unwrap(), vec!["two", "three"]);
    }

    #[test]
    fn long_log_keeps_only_the_last_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.log");
        let mut f = File::create(&path).unwrap();
        for i in 0..5_000 {
            writeln!(f, "line {i}").unwrap();
        }
        drop(f);

        let lines = tail_lines(&path, DEFAULT_TAIL_LINES).unwrap();
        assert_eq!(lines.len(), DEFAULT_TAIL_LINES);
        assert_eq!(lines.first().unwrap(), "line 4900");
        assert_eq!(lines.last().unwrap(), "line 4999");
    }

    #[test]
    fn window_drops_the_partial_first_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.log");
        let long = "x".repeat(TAIL_WINDOW_BYTES as usize);
        std::fs::write(&path, format!("{long}\nlast\n")).unwrap();
        assert_eq!(tail_lines(&path, 10).unwrap(), vec!["last"]);
    }

    #[test]
    fn empty_log_has_no_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.log");
        std::fs::write(&path, "").unwrap();
        assert!(tail_lines(&path, 10).unwrap().is_empty());
    }

    #[test]
    fn removing_a_missing_log_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.log");
        remove_log(&path).unwrap();
        std::fs::write(&path, "x").unwrap();
        remove_log(&path).unwrap();
        assert!(!path.exists());
    }
}
