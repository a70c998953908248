//! Process pending tasks

use std::sync::Arc;

use colored::Colorize;
use drift_core::{BrokerQueue, ChannelBroker, TaskExecutor, Worker};
use serde_json::{Value, json};

use crate::context::Context;
use crate::error::Result;

/// Publish every pending task and drain them with `concurrency` workers.
///
/// Returns the number of task deliveries handled, retries and follow-ups
/// included.
pub async fn drain_pending(ctx: &Context, concurrency: usize) -> Result<usize> {
    let engine = ctx.engine().clone();
    let broker = Arc::new(ChannelBroker::new());
    let queue = BrokerQueue::new(engine.store().clone(), broker.clone());

    let pending = ctx
        .api()
        .dispatch("list_tasks", json!({ "status": "pending" }))
        .await?;
    for id in pending
        .as_array()
        .map(Vec::as_slice)
        .unwrap_or_default()
        .iter()
        .filter_map(|t| t.get("id").and_then(Value::as_str))
    {
        drift_core::Broker::publish(broker.as_ref(), id).await?;
    }

    let worker = Worker::new(TaskExecutor::new(engine), queue, concurrency.max(1));
    Ok(worker.drain().await)
}

pub async fn run_work(ctx: &Context, concurrency: usize) -> Result<()> {
    let handled = drain_pending(ctx, concurrency).await?;
    let failed = ctx
        .api()
        .dispatch("list_tasks", json!({ "status": "error" }))
        .await?
        .as_array()
        .map(Vec::len)
        .unwrap_or(0);

    if ctx.json {
        println!("{}", json!({ "handled": handled, "failed_total": failed }));
    } else {
        println!("Handled {} task deliveries", handled.to_string().green());
        if failed > 0 {
            println!(
                "{} failed tasks on record (see {})",
                failed.to_string().red(),
                "drift task list --status error".cyan()
            );
        }
    }
    Ok(())
}
