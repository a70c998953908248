//! End-to-end propagation: a chart release upstream becomes a pull request
//! on a real git fork.
//!
//! Requires the `git` executable; fixtures are built with `git2`.

use std::path::PathBuf;
use std::sync::Arc;

use drift_core::{
    Api, BrokerQueue, ChannelBroker, Engine, EngineConfig, LocalQueue, TaskExecutor, Worker,
};
use drift_test_utils::{FakeHost, HostCall, RecordingNotifier, Upstream, file_at};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tempfile::TempDir;

const CHARTS: &str = "https://charts.example.com";

const CHART: &str = "\
apiVersion: v2
name: web
version: 0.1.0
dependencies:
  - name: api
    version: 1.0.0
    repository: https://charts.example.com
";

const VALUES: &str = "replicas: 2\n";

struct World {
    root: TempDir,
    upstream: Upstream,
    _fork_dir: TempDir,
    fork_path: PathBuf,
    host: Arc<FakeHost>,
    notifier: Arc<RecordingNotifier>,
}

impl World {
    fn new() -> Self {
        let root = TempDir::new().unwrap();
        let upstream = Upstream::new("acme", "deploy");
        upstream.commit(
            &[("web/Chart.yaml", CHART), ("web/values.yaml", VALUES)],
            "Initial",
        );
        let (fork_dir, fork_path, fork_url) = Upstream::bare("drift-bot", "deploy");

        let world = Self {
            root,
            upstream,
            _fork_dir: fork_dir,
            fork_path,
            host: Arc::new(FakeHost::new("drift-bot", fork_url)),
            notifier: Arc::new(RecordingNotifier::new()),
        };
        world.publish(&["1.0.0"]);
        world
    }

    /// Replace the chart index of the `charts` repository.
    fn publish(&self, versions: &[&str]) {
        let dir = self.root.path().join("charts").join("charts.example.com");
        std::fs::create_dir_all(&dir).unwrap();
        let entries: String = versions
            .iter()
            .map(|v| format!("    - version: {}\n", v))
            .collect();
        std::fs::write(
            dir.join("index.yaml"),
            format!("apiVersion: v1\nentries:\n  api:\n{}", entries),
        )
        .unwrap();
    }

    fn config(&self) -> EngineConfig {
        EngineConfig {
            workdir: self.root.path().join("work"),
            store_path: Some(self.root.path().join("store")),
            chart_index_dir: Some(self.root.path().join("charts")),
            default_branch: self.upstream.branch(),
            task_retries: 0,
            ..Default::default()
        }
    }

    /// A fresh engine over the persistent store, as after a restart.
    fn engine(&self) -> Arc<Engine> {
        Arc::new(
            Engine::builder(self.config())
                .host(self.host.clone())
                .notifier(self.notifier.clone())
                .build(),
        )
    }

    fn api(&self) -> (Api, Arc<LocalQueue>) {
        let engine = self.engine();
        let queue = Arc::new(LocalQueue::start(TaskExecutor::new(engine.clone())));
        (Api::new(engine, queue.clone()), queue)
    }
}

async fn run(api: &Api, queue: &LocalQueue, action: &str, body: Value) -> Value {
    let task = api.dispatch(action, body).await.unwrap();
    queue.wait_idle().await;
    let task = api
        .dispatch("get_task", json!({ "id": task["id"] }))
        .await
        .unwrap();
    assert_eq!(task["status"], "success", "{}", task["result"]);
    task
}

async fn track(api: &Api, queue: &LocalQueue, world: &World) {
    run(
        api,
        queue,
        "add_repository",
        json!({"name": "charts", "type": "helm", "remote": CHARTS}),
    )
    .await;
    run(
        api,
        queue,
        "add_repository",
        json!({
            "name": "deploy",
            "type": "git",
            "remote": world.upstream.remote(),
            "notify": "#deploys",
        }),
    )
    .await;
}

#[tokio::test]
async fn chart_release_opens_pull_request_from_fork() {
    let world = World::new();
    let (api, queue) = world.api();
    track(&api, &queue, &world).await;

    let deploy = api
        .dispatch("get_repository", json!({"name": "deploy"}))
        .await
        .unwrap();
    assert_eq!(deploy["modules"][0]["name"], "web");
    assert_eq!(deploy["modules"][0]["dependencies"][0]["name"], "api");
    assert_eq!(deploy["modules"][0]["dependencies"][0]["version"], "1.0.0");

    world.publish(&["1.0.0", "1.1.0"]);
    let check = run(&api, &queue, "soft_update_repository", json!({"name": "charts"})).await;
    assert_eq!(check["result"]["updates"].as_array().unwrap().len(), 1);

    let branch = "drift/web/api-1.1.0";
    let chart = file_at(&world.fork_path, branch, "web/Chart.yaml").unwrap();
    assert!(chart.contains("version: 1.1.0"), "{}", chart);
    assert!(chart.contains("name: web\nversion: 0.1.0"), "chart version untouched: {}", chart);
    assert_eq!(
        file_at(&world.fork_path, branch, "web/values.yaml").as_deref(),
        Some(VALUES)
    );

    let prs = world.host.pull_requests();
    assert_eq!(prs.len(), 1);
    let HostCall::CreatePullRequest { owner, repo, head, base, .. } = &prs[0] else {
        panic!("unexpected call {:?}", prs[0]);
    };
    assert_eq!((owner.as_str(), repo.as_str()), ("acme", "deploy"));
    assert_eq!(head, &format!("drift-bot:{}", branch));
    assert_eq!(base, &world.upstream.branch());

    let tracked = api
        .dispatch("list_pull_requests", json!({"repository": "deploy"}))
        .await
        .unwrap();
    assert_eq!(tracked[0]["number"], 1);
    assert_eq!(tracked[0]["branch"], branch);
    assert_eq!(world.notifier.sent().len(), 1);
    assert_eq!(world.notifier.sent()[0].0, "#deploys");
}

#[tokio::test]
async fn state_survives_restart_and_unchanged_refresh_is_quiet() {
    let world = World::new();
    {
        let (api, queue) = world.api();
        track(&api, &queue, &world).await;
    }

    let (api, queue) = world.api();
    let repositories = api.dispatch("list_repositories", Value::Null).await.unwrap();
    let names: Vec<&str> = repositories
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|r| r["name"].as_str())
        .collect();
    assert_eq!(names, vec!["charts", "deploy"]);

    let check = run(&api, &queue, "soft_update_repository", json!({"name": "charts"})).await;
    assert_eq!(check["result"]["updates"], json!([]));
    assert!(world.host.pull_requests().is_empty());

    let updates = api.dispatch("list_updates", Value::Null).await.unwrap();
    assert_eq!(updates, json!([]));
}

#[tokio::test]
async fn broker_workers_process_queued_additions() {
    let world = World::new();
    let engine = world.engine();
    let broker = Arc::new(ChannelBroker::new());
    let queue = BrokerQueue::new(engine.store().clone(), broker);
    let api = Api::new(engine.clone(), Arc::new(queue.clone()));

    api.dispatch(
        "add_repository",
        json!({"name": "charts", "type": "helm", "remote": CHARTS}),
    )
    .await
    .unwrap();
    api.dispatch(
        "add_repository",
        json!({"name": "deploy", "type": "git", "remote": world.upstream.remote()}),
    )
    .await
    .unwrap();

    let worker = Worker::new(TaskExecutor::new(engine), queue, 2);
    assert_eq!(worker.drain().await, 2);

    let done = api
        .dispatch("list_tasks", json!({"status": "success"}))
        .await
        .unwrap();
    assert_eq!(done.as_array().unwrap().len(), 2);
}
