//! Task state machine

use std::sync::Arc;

use crate::engine::Engine;
use crate::model::{Task, TaskStatus};
use crate::Result;

use super::{Outcome, execute, load};

/// Runs task attempts against an [`Engine`].
#[derive(Clone)]
pub struct TaskExecutor {
    engine: Arc<Engine>,
}

impl TaskExecutor {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Run one attempt of a stored task.
    pub async fn run_id(&self, id: &str) -> Result<Vec<Task>> {
        let mut task: Task = self.engine.store().get(id).await?;
        self.run(&mut task).await
    }

    /// Run one attempt and persist its outcome.
    ///
    /// Returns the tasks to enqueue next: follow-ups of a success, or the
    /// derived retry of a retriable failure. A task that is no longer
    /// pending was already handled by another delivery and is skipped.
    pub async fn run(&self, task: &mut Task) -> Result<Vec<Task>> {
        let store = self.engine.store();
        if task.status != TaskStatus::Pending {
            tracing::debug!(task_id = ?task.id, status = %task.status, "Task already handled");
            return Ok(Vec::new());
        }

        task.start()?;
        let id = store.store_with(task, false).await?;
        tracing::debug!(task_id = %id, kind = %task.kind, retries = task.retries, "Running task");

        match self.attempt(task).await {
            Ok(outcome) => {
                task.succeed(outcome.result)?;
                store.store_with(task, false).await?;
                tracing::info!(
                    task_id = %id,
                    kind = %task.kind,
                    follow_ups = outcome.follow_ups.len(),
                    "Task succeeded"
                );
                Ok(outcome.follow_ups)
            }
            Err(e) => {
                task.fail(e.to_string())?;
                if let Err(store_error) = store.store_with(task, false).await {
                    tracing::error!(
                        task_id = %id,
                        error = %store_error,
                        "Could not record task failure"
                    );
                }

                if e.is_retriable()
                    && let Some(next) = task.next_attempt()
                {
                    tracing::warn!(
                        task_id = %id,
                        kind = %task.kind,
                        retries_left = next.retries,
                        error = %e,
                        "Task failed, retrying"
                    );
                    return Ok(vec![next]);
                }

                tracing::error!(task_id = %id, kind = %task.kind, error = %e, "Task failed");
                Ok(Vec::new())
            }
        }
    }

    async fn attempt(&self, task: &Task) -> Result<Outcome> {
        let loaded = load(&self.engine, task).await?;
        execute(&self.engine, loaded).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::model::TaskKind;
    use async_trait::async_trait;
    use drift_store::{Datastore, Filter, MemoryDatastore, Store};
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use std::path::PathBuf;

    /// Repositories are locked, and failed tasks cannot be written.
    struct LockedDatastore {
        inner: MemoryDatastore,
    }

    fn locked() -> drift_store::Error {
        drift_store::Error::LockFailed {
            path: PathBuf::from("locked"),
        }
    }

    #[async_trait]
    impl Datastore for LockedDatastore {
        async fn list(&self, kind: &str, filters: &[Filter]) -> drift_store::Result<Vec<Value>> {
            self.inner.list(kind, filters).await
        }

        async fn get(&self, kind: &str, id: &str) -> drift_store::Result<Value> {
            if kind == "Repository" {
                return Err(locked());
            }
            self.inner.get(kind, id).await
        }

        async fn put(&self, kind: &str, id: &str, record: Value) -> drift_store::Result<()> {
            if kind == "Task" && record["status"] == "error" {
                return Err(locked());
            }
            self.inner.put(kind, id, record).await
        }

        async fn delete(&self, kind: &str, id: &str) -> drift_store::Result<()> {
            self.inner.delete(kind, id).await
        }
    }

    fn executor() -> TaskExecutor {
        let engine = Engine::builder(EngineConfig {
            store_path: None,
            ..Default::default()
        })
        .store(Store::memory())
        .without_builtins()
        .build();
        TaskExecutor::new(Arc::new(engine))
    }

    #[tokio::test]
    async fn non_retriable_failure_ends_the_chain() {
        let executor = executor();
        let mut task = executor
            .engine()
            .new_task(TaskKind::CheckUpdates, json!({"repository": "missing"}));

        let next = executor.run(&mut task).await.unwrap();

        assert!(next.is_empty());
        assert_eq!(task.status, TaskStatus::Error);
        let stored: Task = executor
            .engine()
            .store()
            .get(task.id.as_deref().unwrap())
            .await
            .unwrap();
        assert_eq!(stored.status, TaskStatus::Error);
    }

    #[tokio::test]
    async fn handled_tasks_are_skipped() {
        let executor = executor();
        let mut task = executor
            .engine()
            .new_task(TaskKind::CheckUpdates, json!({"repository": "missing"}));
        executor.run(&mut task).await.unwrap();
        let updated_at = task.updated_at;

        let next = executor.run(&mut task).await.unwrap();
        assert!(next.is_empty());
        assert_eq!(task.updated_at, updated_at);
    }

    #[tokio::test]
    async fn malformed_payload_fails_without_retry() {
        let executor = executor();
        let mut task = executor
            .engine()
            .new_task(TaskKind::ApplyUpdate, json!({"nope": true}));

        let next = executor.run(&mut task).await.unwrap();
        assert!(next.is_empty());
        assert_eq!(task.status, TaskStatus::Error);
        assert!(task.result.unwrap()["error"]
            .as_str()
            .unwrap()
            .contains("Invalid task payload"));
    }

    #[tokio::test]
    async fn unrecorded_failure_still_yields_a_retry() {
        let store = Store::new(Arc::new(LockedDatastore {
            inner: MemoryDatastore::new(),
        }));
        let engine = Engine::builder(EngineConfig {
            store_path: None,
            ..Default::default()
        })
        .store(store)
        .without_builtins()
        .build();
        let executor = TaskExecutor::new(Arc::new(engine));
        let mut task = executor
            .engine()
            .new_task(TaskKind::CheckUpdates, json!({"repository": "hub"}));
        let retries = task.retries;

        let next = executor.run(&mut task).await.unwrap();

        assert_eq!(task.status, TaskStatus::Error);
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].previous_id, task.id);
        assert_eq!(next[0].retries, retries - 1);
    }
}
