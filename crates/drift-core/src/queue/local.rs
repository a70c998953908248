//! Sequential in-process queue

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use drift_store::{Filter, Store};
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;

use super::{Queue, persist};
use crate::model::{Task, TaskStatus};
use crate::task::TaskExecutor;
use crate::Result;

/// Runs tasks strictly one after another on a background task.
///
/// Follow-ups and retries produced by a task are run before the next
/// externally enqueued task.
pub struct LocalQueue {
    store: Store,
    sender: mpsc::UnboundedSender<String>,
    pending: Arc<AtomicUsize>,
    idle: Arc<Notify>,
    handle: JoinHandle<()>,
}

impl LocalQueue {
    /// Start the processing loop. Must be called inside a tokio runtime.
    pub fn start(executor: TaskExecutor) -> Self {
        let store = executor.engine().store().clone();
        let (sender, receiver) = mpsc::unbounded_channel();
        let pending = Arc::new(AtomicUsize::new(0));
        let idle = Arc::new(Notify::new());

        let handle = tokio::spawn(process(
            executor,
            receiver,
            pending.clone(),
            idle.clone(),
        ));

        Self {
            store,
            sender,
            pending,
            idle,
            handle,
        }
    }

    /// Tasks enqueued but not yet finished.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Wait until every enqueued task, including derived ones, has run.
    pub async fn wait_idle(&self) {
        loop {
            let mut notified = std::pin::pin!(self.idle.notified());
            notified.as_mut().enable();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Schedule stored tasks still pending, oldest first.
    pub async fn resume_pending(&self) -> Result<usize> {
        let mut tasks: Vec<Task> = self
            .store
            .list(&[Filter::eq("status", TaskStatus::Pending.as_str())])
            .await?;
        tasks.sort_by_key(|t| t.created_at);
        let count = tasks.len();
        self.enqueue(tasks).await?;
        Ok(count)
    }

    /// Stop accepting tasks and wait for the loop to finish the backlog.
    pub async fn shutdown(self) {
        drop(self.sender);
        if let Err(e) = self.handle.await {
            tracing::error!(error = %e, "Queue loop panicked");
        }
    }

    fn schedule(&self, id: String) {
        self.pending.fetch_add(1, Ordering::SeqCst);
        if self.sender.send(id).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            tracing::error!("Queue loop has stopped, task left pending");
        }
    }
}

#[async_trait]
impl Queue for LocalQueue {
    async fn enqueue(&self, tasks: Vec<Task>) -> Result<Vec<String>> {
        let ids = persist(&self.store, tasks).await?;
        for id in &ids {
            self.schedule(id.clone());
        }
        Ok(ids)
    }
}

async fn process(
    executor: TaskExecutor,
    mut receiver: mpsc::UnboundedReceiver<String>,
    pending: Arc<AtomicUsize>,
    idle: Arc<Notify>,
) {
    let store = executor.engine().store().clone();
    while let Some(id) = receiver.recv().await {
        let mut backlog = VecDeque::from([id]);
        while let Some(id) = backlog.pop_front() {
            match executor.run_id(&id).await {
                Ok(next) if !next.is_empty() => match persist(&store, next).await {
                    Ok(ids) => {
                        pending.fetch_add(ids.len(), Ordering::SeqCst);
                        backlog.extend(ids);
                    }
                    Err(e) => tracing::error!(task_id = %id, error = %e, "Failed to enqueue follow-up tasks"),
                },
                Ok(_) => {}
                Err(e) => tracing::error!(task_id = %id, error = %e, "Task could not run"),
            }
            if pending.fetch_sub(1, Ordering::SeqCst) == 1 {
                idle.notify_waiters();
            }
        }
    }
}
