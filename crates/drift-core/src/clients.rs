//! Registry and chart index client contracts
//!
//! Only the calls the check plugins make are modelled. HTTP implementations
//! live outside this crate; [`FileChartIndex`] serves local mirrors.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A container tag with its content hash and last update time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagInfo {
    pub name: String,
    pub digest: String,
    pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Image names under a registry namespace (`registry.example.com/team`).
    async fn list_images(&self, remote: &str) -> Result<Vec<String>>;

    /// Every tag of `image` under `remote`, in any order.
    async fn list_tags(&self, remote: &str, image: &str) -> Result<Vec<TagInfo>>;
}

/// Contents of a Helm repository `index.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartIndex {
    #[serde(default, rename = "apiVersion")]
    pub api_version: Option<String>,
    #[serde(default)]
    pub entries: BTreeMap<String, Vec<ChartVersion>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartVersion {
    pub version: String,
    #[serde(default)]
    pub dependencies: Vec<drift_manifest::ChartDependency>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
}

impl ChartIndex {
    pub fn parse(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::client(format!("invalid index.yaml: {}", e)))
    }

    pub fn chart(&self, name: &str) -> Option<&[ChartVersion]> {
        self.entries.get(name).map(Vec::as_slice)
    }
}

#[async_trait]
pub trait ChartIndexClient: Send + Sync {
    async fn fetch_index(&self, remote: &str) -> Result<ChartIndex>;
}

/// Reads `index.yaml` files from disk.
///
/// `file://` remotes point straight at the repository directory. Any other
/// remote maps to `<root>/<slug>/index.yaml`, where the slug is the remote
/// without scheme with separators replaced by `_`.
#[derive(Debug, Clone)]
pub struct FileChartIndex {
    root: PathBuf,
}

impl FileChartIndex {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn index_path(&self, remote: &str) -> PathBuf {
        if let Some(path) = remote.strip_prefix("file://") {
            return Path::new(path).join("index.yaml");
        }
        let without_scheme = remote.split_once("://").map_or(remote, |(_, rest)| rest);
        let slug: String = without_scheme
            .trim_end_matches('/')
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
            .collect();
        self.root.join(slug).join("index.yaml")
    }
}

#[async_trait]
impl ChartIndexClient for FileChartIndex {
    async fn fetch_index(&self, remote: &str) -> Result<ChartIndex> {
        let path = self.index_path(remote);
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| Error::io(&path, e))?;
        ChartIndex::parse(&content)
    }
}
