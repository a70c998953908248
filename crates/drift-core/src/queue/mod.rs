//! Task queues
//!
//! `enqueue` persists every task before scheduling it and never waits for
//! completion. [`LocalQueue`] runs tasks one at a time in-process;
//! [`BrokerQueue`] publishes task ids to a [`Broker`] that [`Worker`]s
//! consume with bounded concurrency.

mod broker;
mod local;
mod worker;

use async_trait::async_trait;
use drift_store::Store;

use crate::model::Task;
use crate::Result;

pub use broker::{Broker, BrokerQueue, ChannelBroker};
pub use local::LocalQueue;
pub use worker::Worker;

#[async_trait]
pub trait Queue: Send + Sync {
    /// Persist and schedule tasks, returning their ids in order.
    async fn enqueue(&self, tasks: Vec<Task>) -> Result<Vec<String>>;
}

/// Store each task, assigning ids to new ones.
pub(crate) async fn persist(store: &Store, tasks: Vec<Task>) -> Result<Vec<String>> {
    let mut ids = Vec::with_capacity(tasks.len());
    for mut task in tasks {
        let id = store.store_with(&mut task, false).await?;
        tracing::debug!(task_id = %id, kind = %task.kind, "Enqueued task");
        ids.push(id);
    }
    Ok(ids)
}
