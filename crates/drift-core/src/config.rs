//! Engine configuration
//!
//! Every field has a default, so an empty `drift.toml` is a valid
//! configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

fn default_workdir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("drift")
}

/// Engine settings loaded from `drift.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Root for git checkouts
    pub workdir: PathBuf,
    /// Root of the YAML datastore; `None` keeps everything in memory
    pub store_path: Option<PathBuf>,
    /// Retries granted to every new task
    pub task_retries: u32,
    /// Width of the container tag recency window
    pub tag_window_minutes: i64,
    /// Base branch when a repository declares none
    pub default_branch: String,
    /// Account owning the forks pull requests are opened from
    pub fork_owner: String,
    pub git_author_name: String,
    pub git_author_email: String,
    /// Local mirror of chart repository indexes
    pub chart_index_dir: Option<PathBuf>,
    pub http_timeout_secs: u64,
    pub commit_template: String,
    pub pr_title_template: String,
    pub pr_body_template: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let workdir = default_workdir();
        Self {
            store_path: Some(workdir.join("store")),
            workdir,
            task_retries: 3,
            tag_window_minutes: 60,
            default_branch: "master".to_string(),
            fork_owner: "drift-bot".to_string(),
            git_author_name: "Drift".to_string(),
            git_author_email: "drift@localhost".to_string(),
            chart_index_dir: None,
            http_timeout_secs: 5,
            commit_template: "Bump {{ src_module }} to {{ to_version }}".to_string(),
            pr_title_template: "Bump {{ src_module }} from {{ from_version }} to {{ to_version }}"
                .to_string(),
            pr_body_template: "Updates `{{ src_module }}` in `{{ dest_module }}` from \
                `{{ from_version }}` to `{{ to_version }}`.\n\nSource: {{ src_repository }}"
                .to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(content: &str, origin: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load a config file; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content, path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(Error::io(path, e)),
        }
    }

    pub fn workspace(&self) -> Workspace {
        Workspace::new(&self.workdir)
    }

    pub fn tag_window(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.tag_window_minutes)
    }

    /// Base branch for `repository_branch`, falling back to the default.
    pub fn base_branch<'a>(&'a self, repository_branch: Option<&'a str>) -> &'a str {
        repository_branch.unwrap_or(&self.default_branch)
    }
}

/// Layout of the working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Checkout directory of a git repository. Each name gets its own
    /// directory directly under `checkouts/`.
    pub fn checkout(&self, repository: &str) -> PathBuf {
        self.root
            .join("checkouts")
            .join(drift_store::encode_id(repository))
    }
}
