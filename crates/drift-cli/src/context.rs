//! Engine context shared by every command

use std::path::Path;
use std::sync::Arc;

use drift_core::{Api, BrokerQueue, ChannelBroker, Engine, EngineConfig, LocalQueue, Queue, TaskExecutor};

use crate::error::Result;

/// An engine, the queue its tasks go to and the action surface over both.
pub struct Context {
    engine: Arc<Engine>,
    local: Option<Arc<LocalQueue>>,
    api: Api,
    pub json: bool,
}

impl Context {
    /// Build an engine from the config file at `config_path`.
    ///
    /// With `detach`, enqueued tasks are only persisted as pending and are
    /// picked up by a later `drift work`. Otherwise they run in-process.
    pub fn open(config_path: &Path, detach: bool, json: bool) -> Result<Self> {
        let config = EngineConfig::load(config_path)?;
        tracing::debug!(
            config = %config_path.display(),
            workdir = %config.workdir.display(),
            "Loaded configuration"
        );
        Ok(Self::with_engine(Engine::builder(config).build(), detach, json))
    }

    pub fn with_engine(engine: Engine, detach: bool, json: bool) -> Self {
        let engine = Arc::new(engine);
        let (local, queue): (Option<Arc<LocalQueue>>, Arc<dyn Queue>) = if detach {
            let queue = BrokerQueue::new(engine.store().clone(), Arc::new(ChannelBroker::new()));
            (None, Arc::new(queue))
        } else {
            let queue = Arc::new(LocalQueue::start(TaskExecutor::new(engine.clone())));
            (Some(queue.clone()), queue)
        };

        Self {
            api: Api::new(engine.clone(), queue),
            engine,
            local,
            json,
        }
    }

    pub fn api(&self) -> &Api {
        &self.api
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Whether enqueued tasks run before the command returns.
    pub fn is_attached(&self) -> bool {
        self.local.is_some()
    }

    /// Wait for in-process tasks, including retries and follow-ups.
    pub async fn settle(&self) {
        if let Some(queue) = &self.local {
            queue.wait_idle().await;
        }
    }
}
