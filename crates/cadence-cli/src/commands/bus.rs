//! `cadence bus …`

use anyhow::{Context as _, Result};
use cadence_bus::{BusClient, Command};

use super::Context;
use crate::BusCommands;

pub async fn execute(ctx: &Context, cmd: BusCommands) -> Result<()> {
    ctx.authorize()?;
    let (command, task_id) = match cmd {
        BusCommands::Stop { task_id } => (Command::Stop, task_id),
        BusCommands::Disable { task_id } => (Command::Disable, task_id),
        BusCommands::Delete { task_id } => (Command::Delete, task_id),
    };
    let client = BusClient::from_config(&ctx.config.bus);
    client
        .send(command, &task_id)
        .await
        .with_context(|| format!("could not deliver '{command}' for {task_id}"))?;
    println!("sent {command} for {task_id} to {}", client.addr());
    Ok(())
}
