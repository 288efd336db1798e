//! `cadence tasks …`

use std::sync::Arc;

use anyhow::{bail, Result};
use cadence_build::{Action, BuildPipeline, Schedule, TaskManifest, ToolchainCompiler};
use cadence_tasks::TaskRecord;
use tracing::info;

use super::Context;
use crate::{DayArg, TaskCommands, UnitArg};

pub async fn execute(ctx: &Context, cmd: TaskCommands) -> Result<()> {
    match cmd {
        TaskCommands::List => list(ctx),
        TaskCommands::Show { name } => {
            println!("{}", ctx.tasks()?.get_by_name(&name)?);
            Ok(())
        }
        TaskCommands::ResetQueued => {
            ctx.authorize()?;
            let n = ctx.tasks()?.reset_all_queued_flags()?;
            println!("{n} queued task(s) reset");
            Ok(())
        }
        TaskCommands::Disable { name } => {
            ctx.authorize()?;
            let task = ctx.tasks()?.set_disabled(&name, true)?;
            println!("{} is now {}", task.name, task.state);
            Ok(())
        }
        TaskCommands::Enable { name } => {
            ctx.authorize()?;
            let task = ctx.tasks()?.set_disabled(&name, false)?;
            println!("{} is now {}", task.name, task.state);
            Ok(())
        }
        TaskCommands::Logs { name, lines } => {
            for line in ctx.tasks()?.read_log(&name, lines)? {
                println!("{line}");
            }
            Ok(())
        }
        TaskCommands::Delete { task_id } => {
            ctx.authorize()?;
            let task = ctx.tasks()?.delete_task(&task_id)?;
            println!("deleted {} ({})", task.name, task.task_id);
            Ok(())
        }
        TaskCommands::Build {
            name,
            description,
            every,
            unit,
            on,
            at,
        } => {
            ctx.authorize()?;
            let action = schedule_action(every, unit, on, at)?;
            build(ctx, action, name, description).await
        }
    }
}

fn list(ctx: &Context) -> Result<()> {
    let tasks = ctx.tasks()?.list_all()?;
    if tasks.is_empty() {
        println!("no tasks");
        return Ok(());
    }
    println!(
        "{:<24} {:<10} {:<32} {}",
        "NAME", "STATE", "SCHEDULE", "NEXT RUN"
    );
    for t in &tasks {
        println!("{}", row(t));
    }
    Ok(())
}

fn row(t: &TaskRecord) -> String {
    let next = t
        .next_execution_time
        .map(|n| n.to_rfc3339())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{:<24} {:<10} {:<32} {}",
        t.name,
        t.state.to_string(),
        t.schedule,
        next
    )
}

/// Turn the `--every/--unit` or `--on/--at` flags into a schedule sentence.
pub(crate) fn schedule_action(
    every: Option<i64>,
    unit: UnitArg,
    on: Option<DayArg>,
    at: Option<String>,
) -> Result<Action> {
    match (every, on, at) {
        (Some(n), None, None) => {
            let every = Schedule::new().run().every(n);
            Ok(match unit {
                UnitArg::Seconds => every.seconds(),
                UnitArg::Minutes => every.minutes(),
                UnitArg::Hours => every.hours(),
            })
        }
        (None, Some(day), Some(at)) => {
            let on = Schedule::new().on();
            let day = match day {
                DayArg::Monday => on.monday(),
                DayArg::Tuesday => on.tuesday(),
                DayArg::Wednesday => on.wednesday(),
                DayArg::Thursday => on.thursday(),
                DayArg::Friday => on.friday(),
                DayArg::Saturday => on.saturday(),
                DayArg::Sunday => on.sunday(),
            };
            Ok(day.at(at))
        }
        _ => bail!("give either --every N [--unit U] or --on DAY --at HH:MM"),
    }
}

async fn build(
    ctx: &Context,
    action: Action,
    name: Option<String>,
    description: Option<String>,
) -> Result<()> {
    let repo = Arc::new(ctx.tasks()?);
    let compiler = Arc::new(ToolchainCompiler::from_config(&ctx.config.build));
    let pipeline = BuildPipeline::new(repo, ctx.paths.clone(), compiler);

    let record = match name {
        Some(name) => {
            let manifest = TaskManifest::new(name, description.unwrap_or_default());
            action.build_with(&pipeline, manifest).await?
        }
        None => action.build(&pipeline).await?,
    };
    info!(task = %record.name, task_id = %record.task_id, "build finished");
    println!("{record}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_tasks::ScheduleInfo;

    #[test]
    fn interval_flags_make_interval_sentence() {
        let action = schedule_action(Some(15), UnitArg::Minutes, None, None).unwrap();
        assert_eq!(
            action.schedule_info().unwrap().flatten(),
            "unit:minutes,interval:15"
        );
    }

    #[test]
    fn day_flags_make_day_time_sentence() {
        let action = schedule_action(
            None,
            UnitArg::Seconds,
            Some(DayArg::Thursday),
            Some("06:00".into()),
        )
        .unwrap();
        assert!(matches!(
            action.schedule_info().unwrap(),
            ScheduleInfo::DayTime { .. }
        ));
    }

    #[test]
    fn mixed_flags_are_rejected() {
        assert!(schedule_action(
            Some(1),
            UnitArg::Seconds,
            Some(DayArg::Monday),
            Some("01:00".into())
        )
        .is_err());
        assert!(schedule_action(None, UnitArg::Seconds, None, None).is_err());
    }
}
