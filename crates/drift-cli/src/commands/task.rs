//! Task commands

use colored::Colorize;
use serde_json::{Value, json};

use crate::context::Context;
use crate::error::{CliError, Result};
use crate::output;

pub async fn run_task_show(ctx: &Context, id: &str) -> Result<()> {
    let task = ctx.api().dispatch("get_task", json!({ "id": id })).await?;
    if ctx.json {
        output::print_json(&task);
    } else {
        output::print_task(&task);
    }
    Ok(())
}

pub async fn run_task_list(ctx: &Context, status: Option<&str>, kind: Option<&str>) -> Result<()> {
    let tasks = ctx
        .api()
        .dispatch("list_tasks", json!({ "status": status, "type": kind }))
        .await?;
    if ctx.json {
        output::print_json(&tasks);
    } else {
        output::print_tasks(&tasks);
    }
    Ok(())
}

pub async fn run_task_retry(ctx: &Context, id: &str) -> Result<()> {
    let task = ctx.api().dispatch("retry_task", json!({ "id": id })).await?;
    report(ctx, task).await
}

/// Last task of the retry chain starting at `id`.
pub(crate) async fn last_attempt(ctx: &Context, id: &str) -> Result<Value> {
    let tasks = ctx.api().dispatch("list_tasks", Value::Null).await?;
    let tasks = tasks.as_array().map(Vec::as_slice).unwrap_or_default();

    let mut current = id.to_string();
    while let Some(next) = tasks
        .iter()
        .find(|t| t.get("previous_id").and_then(Value::as_str) == Some(current.as_str()))
        .and_then(|t| t.get("id").and_then(Value::as_str))
    {
        current = next.to_string();
    }
    Ok(ctx.api().dispatch("get_task", json!({ "id": current })).await?)
}

/// Print an enqueued task, waiting for it first when running in-process.
///
/// A task that ends in error, after any retries, fails the command.
pub(crate) async fn report(ctx: &Context, task: Value) -> Result<()> {
    let id = task
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| CliError::user("queued task has no id"))?
        .to_string();

    if !ctx.is_attached() {
        if ctx.json {
            output::print_json(&task);
        } else {
            println!("Queued task {} (run {} to process)", id.cyan(), "drift work".cyan());
        }
        return Ok(());
    }

    ctx.settle().await;
    let last = last_attempt(ctx, &id).await?;
    if ctx.json {
        output::print_json(&last);
    } else {
        output::print_task(&last);
    }

    match last.get("status").and_then(Value::as_str) {
        Some("error") => Err(CliError::user(format!(
            "task {} failed",
            last.get("id").and_then(Value::as_str).unwrap_or(&id)
        ))),
        _ => Ok(()),
    }
}
