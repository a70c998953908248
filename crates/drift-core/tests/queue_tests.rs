//! Retry chains and queue delivery

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use drift_core::model::{Dependency, Module, ModuleKind, Repository, RepositoryKind};
use drift_core::{
    BrokerQueue, ChannelBroker, CheckPlugin, Discovered, Engine, EngineConfig, Error,
    LocalQueue, Queue, Result, Task, TaskExecutor, TaskKind, TaskStatus, VersionInfo, Worker,
};
use drift_store::Store;
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::json;

/// A registry that is always unreachable.
#[derive(Default)]
struct Unreachable {
    scans: AtomicUsize,
}

#[async_trait]
impl CheckPlugin for Unreachable {
    fn repository_type(&self) -> RepositoryKind {
        RepositoryKind::Docker
    }

    fn module_type(&self) -> ModuleKind {
        ModuleKind::Docker
    }

    async fn matches(&self, _repository: &Repository, _module_name: &str) -> bool {
        true
    }

    async fn scan(&self, _repository: &Repository, _local_path: Option<&Path>) -> Result<Vec<Discovered>> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        Err(Error::client("registry unreachable"))
    }

    async fn check(&self, _repository: &Repository, _module: &Module) -> Result<VersionInfo> {
        Err(Error::client("registry unreachable"))
    }

    async fn dependencies(&self, _repository: &Repository, _module: &Module) -> Result<Vec<Dependency>> {
        Ok(Vec::new())
    }
}

async fn engine(retries: u32, plugin: Arc<Unreachable>) -> Arc<Engine> {
    let config = EngineConfig {
        store_path: None,
        task_retries: retries,
        ..Default::default()
    };
    let engine = Engine::builder(config)
        .store(Store::memory())
        .without_builtins()
        .check(plugin)
        .build();

    let mut hub = Repository::new("hub", RepositoryKind::Docker, "registry.example.com/acme");
    hub.save(engine.store()).await.unwrap();
    Arc::new(engine)
}

async fn all_tasks(engine: &Engine) -> Vec<Task> {
    let mut tasks: Vec<Task> = engine.store().list(&[]).await.unwrap();
    tasks.sort_by_key(|t| t.created_at);
    tasks
}

/// Follow `previous_id` links from the first attempt.
fn chain(tasks: &[Task]) -> Vec<&Task> {
    let mut ordered = Vec::new();
    let mut current = tasks.iter().find(|t| t.previous_id.is_none());
    while let Some(task) = current {
        ordered.push(task);
        current = tasks.iter().find(|t| t.previous_id == task.id);
    }
    ordered
}

#[rstest]
#[case(0, 1)]
#[case(2, 3)]
#[tokio::test]
async fn retriable_failures_derive_bounded_attempts(#[case] retries: u32, #[case] attempts: usize) {
    let plugin = Arc::new(Unreachable::default());
    let engine = engine(retries, plugin.clone()).await;
    let queue = LocalQueue::start(TaskExecutor::new(engine.clone()));

    queue
        .enqueue(vec![engine.new_task(TaskKind::CheckUpdates, json!({"repository": "hub"}))])
        .await
        .unwrap();
    queue.wait_idle().await;

    let tasks = all_tasks(&engine).await;
    assert_eq!(tasks.len(), attempts);
    assert_eq!(plugin.scans.load(Ordering::SeqCst), attempts);

    let chain = chain(&tasks);
    assert_eq!(chain.len(), attempts, "every attempt is linked to the previous one");
    assert!(chain.iter().all(|t| t.status == TaskStatus::Error));
    let retries_left: Vec<u32> = chain.iter().map(|t| t.retries).collect();
    let expected: Vec<u32> = (0..=retries).rev().collect();
    assert_eq!(retries_left, expected);
}

#[tokio::test]
async fn manual_retry_keeps_budget_and_links() {
    let plugin = Arc::new(Unreachable::default());
    let engine = engine(0, plugin).await;
    let executor = TaskExecutor::new(engine.clone());

    let mut task = engine.new_task(TaskKind::CheckUpdates, json!({"repository": "hub"}));
    assert!(executor.run(&mut task).await.unwrap().is_empty());
    assert_eq!(task.status, TaskStatus::Error);

    let retry = task.manual_retry();
    assert_eq!(retry.previous_id, task.id);
    assert_eq!(retry.retries, 0);
    assert_eq!(retry.status, TaskStatus::Pending);
}

#[tokio::test]
async fn workers_drain_the_broker_including_retries() {
    let plugin = Arc::new(Unreachable::default());
    let engine = engine(1, plugin.clone()).await;
    let broker = Arc::new(ChannelBroker::new());
    let queue = BrokerQueue::new(engine.store().clone(), broker.clone());
    let worker = Worker::new(TaskExecutor::new(engine.clone()), queue.clone(), 4);

    let tasks = (0..3)
        .map(|_| engine.new_task(TaskKind::CheckUpdates, json!({"repository": "hub"})))
        .collect();
    let ids = queue.enqueue(tasks).await.unwrap();
    assert_eq!(ids.len(), 3);
    assert_eq!(broker.len(), 3);

    let handled = worker.drain().await;

    assert_eq!(handled, 6);
    assert!(broker.is_empty());
    let tasks = all_tasks(&engine).await;
    assert_eq!(tasks.len(), 6);
    assert!(tasks.iter().all(|t| t.status == TaskStatus::Error));
}

#[tokio::test]
async fn redelivered_task_runs_once() {
    let plugin = Arc::new(Unreachable::default());
    let engine = engine(0, plugin.clone()).await;
    let broker = Arc::new(ChannelBroker::new());
    let queue = BrokerQueue::new(engine.store().clone(), broker.clone());
    let worker = Worker::new(TaskExecutor::new(engine.clone()), queue.clone(), 1);

    let ids = queue
        .enqueue(vec![engine.new_task(TaskKind::CheckUpdates, json!({"repository": "hub"}))])
        .await
        .unwrap();
    // At-least-once delivery: the same id arrives twice
    drift_core::Broker::publish(broker.as_ref(), &ids[0]).await.unwrap();

    assert_eq!(worker.drain().await, 2);
    assert_eq!(plugin.scans.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn resume_pending_schedules_stored_tasks() {
    let plugin = Arc::new(Unreachable::default());
    let engine = engine(0, plugin.clone()).await;

    let mut stranded = engine.new_task(TaskKind::CheckUpdates, json!({"repository": "hub"}));
    engine.store().store_with(&mut stranded, false).await.unwrap();

    let queue = LocalQueue::start(TaskExecutor::new(engine.clone()));
    assert_eq!(queue.resume_pending().await.unwrap(), 1);
    queue.wait_idle().await;

    let task: Task = engine
        .store()
        .get(stranded.id.as_deref().unwrap())
        .await
        .unwrap();
    assert_eq!(task.status, TaskStatus::Error);
    queue.shutdown().await;
}
