use serde::{Deserialize, Serialize};

use crate::error::{BusError, Result};

/// What the consumer should do with the named task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    /// Stop the current run; the task stays scheduled.
    Stop,
    Disable,
    Delete,
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Stop => write!(f, "stop"),
            Command::Disable => write!(f, "disable"),
            Command::Delete => write!(f, "delete"),
        }
    }
}

/// One control message.
/// Wire: `{"cmd":"stop","taskId":"0190…"}` followed by `\n`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusMessage {
    pub cmd: Command,
    /// Older senders spell the key `taskID`; both are accepted on decode.
    #[serde(rename = "taskId", alias = "taskID")]
    pub task_id: String,
}

impl BusMessage {
    pub fn new(cmd: Command, task_id: impl Into<String>) -> Self {
        Self {
            cmd,
            task_id: task_id.into(),
        }
    }

    /// Serialise as a single newline-terminated JSON line.
    pub fn encode_line(&self) -> Result<Vec<u8>> {
        let mut buf = serde_json::to_vec(self).map_err(BusError::Encode)?;
        buf.push(b'\n');
        Ok(buf)
    }

    /// Decode one received line. Surrounding whitespace, including the
    /// trailing newline, is ignored.
    pub fn from_line(line: &str) -> Result<Self> {
        serde_json::from_str(line.trim()).map_err(BusError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_one_terminated_line() {
        let line = BusMessage::new(Command::Disable, "t-1")
            .encode_line()
            .unwrap();
        assert_eq!(line, b"{\"cmd\":\"disable\",\"taskId\":\"t-1\"}\n");
    }

    #[test]
    fn decodes_legacy_key() {
        let msg = BusMessage::from_line("{\"cmd\":\"delete\",\"taskID\":\"t-2\"}\n").unwrap();
        assert_eq!(msg, BusMessage::new(Command::Delete, "t-2"));
    }

    #[test]
    fn rejects_unknown_command() {
        assert!(matches!(
            BusMessage::from_line(r#"{"cmd":"restart","taskId":"t"}"#),
            Err(BusError::Decode(_))
        ));
    }
}
