//! In-memory registry, chart index and notifier

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use drift_core::clients::ChartVersion;
use drift_core::{ChartIndex, ChartIndexClient, Error, Notifier, RegistryClient, Result, TagInfo};

/// Registry whose tags are set by the test.
#[derive(Default)]
pub struct FakeRegistry {
    images: Mutex<BTreeMap<(String, String), Vec<TagInfo>>>,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tag pushed `minutes_ago` minutes ago.
    pub fn push_tag(&self, remote: &str, image: &str, tag: &str, digest: &str, minutes_ago: i64) {
        let info = TagInfo {
            name: tag.to_string(),
            digest: digest.to_string(),
            updated_at: Utc::now() - Duration::minutes(minutes_ago),
        };
        let mut images = self.images.lock().unwrap_or_else(|p| p.into_inner());
        let tags = images
            .entry((remote.to_string(), image.to_string()))
            .or_default();
        tags.retain(|t| t.name != tag);
        tags.push(info);
    }
}

#[async_trait]
impl RegistryClient for FakeRegistry {
    async fn list_images(&self, remote: &str) -> Result<Vec<String>> {
        let images = self.images.lock().unwrap_or_else(|p| p.into_inner());
        Ok(images
            .keys()
            .filter(|(r, _)| r == remote)
            .map(|(_, image)| image.clone())
            .collect())
    }

    async fn list_tags(&self, remote: &str, image: &str) -> Result<Vec<TagInfo>> {
        let images = self.images.lock().unwrap_or_else(|p| p.into_inner());
        images
            .get(&(remote.to_string(), image.to_string()))
            .cloned()
            .ok_or_else(|| Error::client(format!("{}/{} not found", remote, image)))
    }
}

/// Chart index whose entries are set by the test.
#[derive(Default)]
pub struct FakeChartIndex {
    indexes: Mutex<HashMap<String, ChartIndex>>,
}

impl FakeChartIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `version` of `chart` in the index served for `remote`.
    pub fn publish(&self, remote: &str, chart: &str, version: &str) {
        let mut indexes = self.indexes.lock().unwrap_or_else(|p| p.into_inner());
        let entries = indexes
            .entry(remote.to_string())
            .or_default()
            .entries
            .entry(chart.to_string())
            .or_default();
        entries.push(ChartVersion {
            version: version.to_string(),
            dependencies: Vec::new(),
            created: Some(Utc::now()),
        });
    }
}

#[async_trait]
impl ChartIndexClient for FakeChartIndex {
    async fn fetch_index(&self, remote: &str) -> Result<ChartIndex> {
        let indexes = self.indexes.lock().unwrap_or_else(|p| p.into_inner());
        indexes
            .get(remote)
            .cloned()
            .ok_or_else(|| Error::client(format!("no index at {}", remote)))
    }
}

/// Notifier keeping every message.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(target, message)` pairs in delivery order.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, target: &str, message: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push((target.to_string(), message.to_string()));
        Ok(())
    }
}
