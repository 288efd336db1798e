use std::time::Duration;

use cadence_core::config::BusConfig;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::error::{BusError, Result};
use crate::message::{BusMessage, Command};

/// Fire-and-forget sender for control messages.
///
/// Every send opens a fresh connection, writes one line and closes. Nothing
/// is acknowledged or retried; a failure is only reported to the caller.
#[derive(Debug, Clone)]
pub struct BusClient {
    addr: String,
    connect_timeout: Duration,
}

impl BusClient {
    pub fn new(addr: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            connect_timeout,
        }
    }

    /// Client for the configured push address.
    pub fn from_config(cfg: &BusConfig) -> Self {
        Self::new(
            cfg.push_addr(),
            Duration::from_millis(cfg.connect_timeout_ms),
        )
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Deliver one message.
    pub async fn push(&self, msg: &BusMessage) -> Result<()> {
        let line = msg.encode_line()?;

        let mut stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| BusError::Timeout {
                addr: self.addr.clone(),
                after: self.connect_timeout,
            })?
            .map_err(|e| self.transport(e))?;

        stream
            .write_all(&line)
            .await
            .map_err(|e| self.transport(e))?;
        stream.shutdown().await.map_err(|e| self.transport(e))?;

        info!(addr = %self.addr, cmd = %msg.cmd, task_id = %msg.task_id, "bus message sent");
        Ok(())
    }

    pub async fn send(&self, cmd: Command, task_id: &str) -> Result<()> {
        debug!(%cmd, task_id, "sending bus command");
        self.push(&BusMessage::new(cmd, task_id)).await
    }

    pub async fn stop_task(&self, task_id: &str) -> Result<()> {
        self.send(Command::Stop, task_id).await
    }

    pub async fn disable_task(&self, task_id: &str) -> Result<()> {
        self.send(Command::Disable, task_id).await
    }

    pub async fn delete_task(&self, task_id: &str) -> Result<()> {
        self.send(Command::Delete, task_id).await
    }

    fn transport(&self, source: std::io::Error) -> BusError {
        BusError::Transport {
            addr: self.addr.clone(),
            source,
        }
    }
}
