//! Broker-backed queue

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use drift_store::Store;
use tokio::sync::Notify;

use super::{Queue, persist};
use crate::model::Task;
use crate::Result;

/// Transport for task ids between producers and workers. Delivery is
/// at-least-once with no ordering across tasks.
#[async_trait]
pub trait Broker: Send + Sync {
    async fn publish(&self, task_id: &str) -> Result<()>;

    /// Wait for the next id. `None` once the broker is closed and empty.
    async fn consume(&self) -> Option<String>;

    /// Next id if one is immediately available.
    fn try_consume(&self) -> Option<String>;

    fn close(&self);
}

#[derive(Debug, Default)]
struct Channel {
    ids: VecDeque<String>,
    closed: bool,
}

/// In-memory broker.
#[derive(Debug, Default)]
pub struct ChannelBroker {
    channel: Mutex<Channel>,
    available: Notify,
}

impl ChannelBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.with_channel(|c| c.ids.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn with_channel<T>(&self, f: impl FnOnce(&mut Channel) -> T) -> T {
        let mut guard = self
            .channel
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }
}

#[async_trait]
impl Broker for ChannelBroker {
    async fn publish(&self, task_id: &str) -> Result<()> {
        self.with_channel(|c| c.ids.push_back(task_id.to_string()));
        self.available.notify_one();
        Ok(())
    }

    async fn consume(&self) -> Option<String> {
        loop {
            let mut notified = std::pin::pin!(self.available.notified());
            notified.as_mut().enable();

            let (next, closed) = self.with_channel(|c| (c.ids.pop_front(), c.closed));
            if next.is_some() || closed {
                return next;
            }
            notified.await;
        }
    }

    fn try_consume(&self) -> Option<String> {
        self.with_channel(|c| c.ids.pop_front())
    }

    fn close(&self) {
        self.with_channel(|c| c.closed = true);
        self.available.notify_waiters();
    }
}

/// Queue publishing task ids to a broker.
#[derive(Clone)]
pub struct BrokerQueue {
    store: Store,
    broker: Arc<dyn Broker>,
}

impl BrokerQueue {
    pub fn new(store: Store, broker: Arc<dyn Broker>) -> Self {
        Self { store, broker }
    }

    pub fn broker(&self) -> &Arc<dyn Broker> {
        &self.broker
    }
}

#[async_trait]
impl Queue for BrokerQueue {
    async fn enqueue(&self, tasks: Vec<Task>) -> Result<Vec<String>> {
        let ids = persist(&self.store, tasks).await?;
        for id in &ids {
            self.broker.publish(id).await?;
        }
        Ok(ids)
    }
}
