//! Recording VCS
//!
//! `sync` materialises a checkout from files held in memory, standing in for
//! a clone followed by a hard reset. Every other operation is recorded and
//! succeeds without touching git.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use drift_git::{Author, Error, Result, Vcs};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VcsCall {
    Sync { remote: String, branch: String },
    PrepareBranch { branch: String, base: String },
    Commit { message: String },
    Push { remote: String, branch: String },
}

#[derive(Default)]
struct State {
    /// Files per remote, relative to the checkout root
    remotes: BTreeMap<String, BTreeMap<String, String>>,
    calls: Vec<VcsCall>,
    commits: usize,
    /// Files found in the checkout at each commit
    committed: Vec<(PathBuf, BTreeMap<String, String>)>,
}

#[derive(Default)]
pub struct RecordingVcs {
    state: Mutex<State>,
}

impl RecordingVcs {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        let mut guard = self.state.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut guard)
    }

    /// Set the content of `path` in `remote`.
    pub fn set_file(&self, remote: &str, path: &str, content: &str) {
        self.with_state(|s| {
            s.remotes
                .entry(remote.to_string())
                .or_default()
                .insert(path.to_string(), content.to_string());
        });
    }

    pub fn with_file(self, remote: &str, path: &str, content: &str) -> Self {
        self.set_file(remote, path, content);
        self
    }

    pub fn calls(&self) -> Vec<VcsCall> {
        self.with_state(|s| s.calls.clone())
    }

    /// Calls other than `sync`: anything that creates branches, commits or
    /// pushes.
    pub fn writes(&self) -> Vec<VcsCall> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, VcsCall::Sync { .. }))
            .collect()
    }

    /// Content of `path` as it was in the checkout at the last commit.
    pub fn committed_file(&self, path: &str) -> Option<String> {
        self.with_state(|s| {
            s.committed
                .last()
                .and_then(|(_, files)| files.get(path).cloned())
        })
    }
}

fn snapshot(root: &Path, files: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    files
        .keys()
        .filter_map(|path| {
            std::fs::read_to_string(root.join(path))
                .ok()
                .map(|content| (path.clone(), content))
        })
        .collect()
}

#[async_trait]
impl Vcs for RecordingVcs {
    async fn sync(&self, remote: &str, branch: &str, checkout: &Path) -> Result<()> {
        let files = self.with_state(|s| {
            s.calls.push(VcsCall::Sync {
                remote: remote.to_string(),
                branch: branch.to_string(),
            });
            s.remotes.get(remote).cloned().unwrap_or_default()
        });

        for (path, content) in &files {
            let target = checkout.join(path);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(|e| Error::Spawn {
                    program: "mkdir".to_string(),
                    source: e,
                })?;
            }
            std::fs::write(&target, content).map_err(|e| Error::Spawn {
                program: "write".to_string(),
                source: e,
            })?;
        }
        std::fs::create_dir_all(checkout).map_err(|e| Error::Spawn {
            program: "mkdir".to_string(),
            source: e,
        })?;
        Ok(())
    }

    async fn prepare_branch(&self, _checkout: &Path, branch: &str, base: &str) -> Result<()> {
        self.with_state(|s| {
            s.calls.push(VcsCall::PrepareBranch {
                branch: branch.to_string(),
                base: base.to_string(),
            })
        });
        Ok(())
    }

    async fn commit(&self, checkout: &Path, message: &str, _author: &Author) -> Result<String> {
        Ok(self.with_state(|s| {
            s.calls.push(VcsCall::Commit {
                message: message.to_string(),
            });
            let known: BTreeMap<String, String> = s
                .remotes
                .values()
                .flat_map(|files| files.iter().map(|(k, v)| (k.clone(), v.clone())))
                .collect();
            let files = snapshot(checkout, &known);
            s.committed.push((checkout.to_path_buf(), files));
            s.commits += 1;
            format!("{:040x}", s.commits)
        }))
    }

    async fn push(&self, _checkout: &Path, remote: &str, branch: &str) -> Result<()> {
        self.with_state(|s| {
            s.calls.push(VcsCall::Push {
                remote: remote.to_string(),
                branch: branch.to_string(),
            })
        });
        Ok(())
    }
}
