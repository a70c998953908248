//! Broker consumers

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::{BrokerQueue, Queue};
use crate::task::TaskExecutor;

/// Consumes task ids from a broker and runs them with bounded concurrency.
///
/// Follow-ups and retries are published back through the queue.
#[derive(Clone)]
pub struct Worker {
    executor: TaskExecutor,
    queue: BrokerQueue,
    concurrency: usize,
}

impl Worker {
    pub fn new(executor: TaskExecutor, queue: BrokerQueue, concurrency: usize) -> Self {
        Self {
            executor,
            queue,
            concurrency: concurrency.max(1),
        }
    }

    /// Consume until the broker is closed, then wait for in-flight tasks.
    pub async fn run(&self) {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut in_flight = JoinSet::new();

        while let Some(id) = self.queue.broker().consume().await {
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            let worker = self.clone();
            in_flight.spawn(async move {
                let _permit = permit;
                worker.handle(id).await;
            });
            // Reap finished tasks so the set does not grow unbounded
            while in_flight.try_join_next().is_some() {}
        }

        while in_flight.join_next().await.is_some() {}
        tracing::debug!("Worker stopped");
    }

    /// Run until the broker is empty and nothing is in flight. Returns the
    /// number of deliveries handled.
    pub async fn drain(&self) -> usize {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut in_flight = JoinSet::new();
        let mut handled = 0;

        loop {
            while let Some(id) = self.queue.broker().try_consume() {
                let Ok(permit) = semaphore.clone().acquire_owned().await else {
                    return handled;
                };
                let worker = self.clone();
                in_flight.spawn(async move {
                    let _permit = permit;
                    worker.handle(id).await;
                });
                handled += 1;
            }
            if in_flight.join_next().await.is_none() {
                return handled;
            }
        }
    }

    async fn handle(&self, id: String) {
        match self.executor.run_id(&id).await {
            Ok(next) if !next.is_empty() => {
                if let Err(e) = self.queue.enqueue(next).await {
                    tracing::error!(task_id = %id, error = %e, "Failed to enqueue follow-up tasks");
                }
            }
            Ok(_) => {}
            Err(e) => tracing::error!(task_id = %id, error = %e, "Task could not run"),
        }
    }
}
