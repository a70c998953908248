//! Engine wiring: registries, collaborators and the datastore

use std::sync::Arc;
use std::time::Duration;

use drift_git::{GitCli, GitVcs, SourceControlHost, Vcs};
use drift_store::{Store, YamlDatastore};
use serde_json::Value;

use crate::check::{
    ChartIndexCheck, CheckPlugin, CheckRegistry, GitChartCheck, GitDockerfileCheck,
    RegistryImageCheck,
};
use crate::clients::{ChartIndexClient, FileChartIndex, RegistryClient};
use crate::config::EngineConfig;
use crate::diff::DiffEngine;
use crate::model::{Task, TaskKind};
use crate::mutate::{
    ChartDependencyMutation, ChartImageMutation, DockerfileMutation, MutationPlugin,
    MutationRegistry, Proposer,
};
use crate::notify::{LogNotifier, Notifier};

/// Everything a task needs to run.
pub struct Engine {
    store: Store,
    config: EngineConfig,
    diff: DiffEngine,
    mutations: MutationRegistry,
    host: Option<Arc<dyn SourceControlHost>>,
    notifier: Arc<dyn Notifier>,
}

impl Engine {
    pub fn builder(config: EngineConfig) -> EngineBuilder {
        EngineBuilder::new(config)
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn diff(&self) -> &DiffEngine {
        &self.diff
    }

    pub fn checks(&self) -> &CheckRegistry {
        self.diff.checks()
    }

    pub fn mutations(&self) -> &MutationRegistry {
        &self.mutations
    }

    pub fn host(&self) -> Option<&Arc<dyn SourceControlHost>> {
        self.host.as_ref()
    }

    pub fn notifier(&self) -> &dyn Notifier {
        self.notifier.as_ref()
    }

    /// A pending task with the configured retry budget.
    pub fn new_task(&self, kind: TaskKind, data: Value) -> Task {
        Task::new(kind, data, self.config.task_retries)
    }
}

/// Builds an [`Engine`]. Plugins added explicitly are registered ahead of
/// the built-in ones, so they win lookups for the same type pair.
pub struct EngineBuilder {
    config: EngineConfig,
    store: Option<Store>,
    vcs: Option<Arc<dyn Vcs>>,
    host: Option<Arc<dyn SourceControlHost>>,
    registry: Option<Arc<dyn RegistryClient>>,
    chart_index: Option<Arc<dyn ChartIndexClient>>,
    notifier: Option<Arc<dyn Notifier>>,
    checks: Vec<Arc<dyn CheckPlugin>>,
    mutations: Vec<Arc<dyn MutationPlugin>>,
    builtins: bool,
}

impl EngineBuilder {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            store: None,
            vcs: None,
            host: None,
            registry: None,
            chart_index: None,
            notifier: None,
            checks: Vec::new(),
            mutations: Vec::new(),
            builtins: true,
        }
    }

    pub fn store(mut self, store: Store) -> Self {
        self.store = Some(store);
        self
    }

    pub fn vcs(mut self, vcs: Arc<dyn Vcs>) -> Self {
        self.vcs = Some(vcs);
        self
    }

    pub fn host(mut self, host: Arc<dyn SourceControlHost>) -> Self {
        self.host = Some(host);
        self
    }

    pub fn registry(mut self, client: Arc<dyn RegistryClient>) -> Self {
        self.registry = Some(client);
        self
    }

    pub fn chart_index(mut self, client: Arc<dyn ChartIndexClient>) -> Self {
        self.chart_index = Some(client);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn check(mut self, plugin: Arc<dyn CheckPlugin>) -> Self {
        self.checks.push(plugin);
        self
    }

    pub fn mutation(mut self, plugin: Arc<dyn MutationPlugin>) -> Self {
        self.mutations.push(plugin);
        self
    }

    /// Skip the built-in plugins.
    pub fn without_builtins(mut self) -> Self {
        self.builtins = false;
        self
    }

    pub fn build(self) -> Engine {
        let config = self.config;
        let workspace = config.workspace();

        let store = self.store.unwrap_or_else(|| match &config.store_path {
            Some(path) => Store::new(Arc::new(YamlDatastore::new(path))),
            None => Store::memory(),
        });
        let vcs: Arc<dyn Vcs> = self.vcs.unwrap_or_else(|| {
            let cli = GitCli::default()
                .with_low_speed_timeout(Duration::from_secs(config.http_timeout_secs));
            Arc::new(GitVcs::new(cli))
        });

        let mut checks = CheckRegistry::new();
        for plugin in self.checks {
            checks.register(plugin);
        }
        let mut mutations = MutationRegistry::new();
        for plugin in self.mutations {
            mutations.register(plugin);
        }

        if self.builtins {
            checks.register(Arc::new(GitChartCheck::new(workspace.clone())));
            checks.register(Arc::new(GitDockerfileCheck::new(workspace.clone())));

            let chart_index = self.chart_index.unwrap_or_else(|| {
                let root = config
                    .chart_index_dir
                    .clone()
                    .unwrap_or_else(|| config.workdir.join("charts"));
                Arc::new(FileChartIndex::new(root))
            });
            checks.register(Arc::new(ChartIndexCheck::new(chart_index)));

            match self.registry {
                Some(client) => {
                    checks.register(Arc::new(RegistryImageCheck::new(client, config.tag_window())))
                }
                None => tracing::debug!("No registry client, docker repositories are not checked"),
            }

            let proposer = || Proposer::new(&config, vcs.clone(), self.host.clone());
            mutations.register(Arc::new(ChartDependencyMutation::new(proposer())));
            mutations.register(Arc::new(ChartImageMutation::new(proposer())));
            mutations.register(Arc::new(DockerfileMutation::new(proposer())));
        }

        let diff = DiffEngine::new(checks, vcs, &config);
        Engine {
            store,
            diff,
            mutations,
            host: self.host,
            notifier: self.notifier.unwrap_or_else(|| Arc::new(LogNotifier)),
            config,
        }
    }
}
