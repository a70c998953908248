//! Recording source-control host

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use drift_git::{CommitInfo, Fork, PullRequestInfo, Result, SourceControlHost};

/// A call made against [`FakeHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    ListForks { owner: String, repo: String },
    CreateFork { owner: String, repo: String },
    CreatePullRequest {
        owner: String,
        repo: String,
        title: String,
        body: String,
        head: String,
        base: String,
    },
    ListCommits { owner: String, repo: String, number: u64 },
}

#[derive(Default)]
struct State {
    calls: Vec<HostCall>,
    forks: Vec<Fork>,
    commits: HashMap<u64, Vec<CommitInfo>>,
    next_number: u64,
}

/// In-memory host. Forks created through it are owned by `fork_owner` and
/// cloned from `fork_url`; pull requests are numbered from 1.
pub struct FakeHost {
    fork_owner: String,
    fork_url: String,
    state: Mutex<State>,
}

impl FakeHost {
    pub fn new(fork_owner: impl Into<String>, fork_url: impl Into<String>) -> Self {
        Self {
            fork_owner: fork_owner.into(),
            fork_url: fork_url.into(),
            state: Mutex::new(State {
                next_number: 1,
                ..Default::default()
            }),
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        let mut guard = self.state.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut guard)
    }

    /// Register an existing fork.
    pub fn with_fork(self, owner: &str, name: &str) -> Self {
        let fork = Fork {
            owner: owner.to_string(),
            name: name.to_string(),
            clone_url: self.fork_url.clone(),
        };
        self.with_state(|s| s.forks.push(fork));
        self
    }

    /// Set the commits `list_commits` reports for pull request `number`.
    pub fn set_commits(&self, number: u64, shas: &[&str]) {
        let commits = shas
            .iter()
            .map(|sha| CommitInfo {
                sha: sha.to_string(),
                message: String::new(),
            })
            .collect();
        self.with_state(|s| {
            s.commits.insert(number, commits);
        });
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.with_state(|s| s.calls.clone())
    }

    pub fn pull_requests(&self) -> Vec<HostCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, HostCall::CreatePullRequest { .. }))
            .collect()
    }

    pub fn forks_created(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, HostCall::CreateFork { .. }))
            .count()
    }
}

#[async_trait]
impl SourceControlHost for FakeHost {
    async fn list_forks(&self, owner: &str, repo: &str) -> Result<Vec<Fork>> {
        Ok(self.with_state(|s| {
            s.calls.push(HostCall::ListForks {
                owner: owner.to_string(),
                repo: repo.to_string(),
            });
            s.forks.iter().filter(|f| f.name == repo).cloned().collect()
        }))
    }

    async fn create_fork(&self, owner: &str, repo: &str) -> Result<Fork> {
        let fork = Fork {
            owner: self.fork_owner.clone(),
            name: repo.to_string(),
            clone_url: self.fork_url.clone(),
        };
        self.with_state(|s| {
            s.calls.push(HostCall::CreateFork {
                owner: owner.to_string(),
                repo: repo.to_string(),
            });
            s.forks.push(fork.clone());
        });
        Ok(fork)
    }

    async fn create_pull_request(
        &self,
        owner: &str,
        repo: &str,
        title: &str,
        body: &str,
        head: &str,
        base: &str,
    ) -> Result<PullRequestInfo> {
        Ok(self.with_state(|s| {
            s.calls.push(HostCall::CreatePullRequest {
                owner: owner.to_string(),
                repo: repo.to_string(),
                title: title.to_string(),
                body: body.to_string(),
                head: head.to_string(),
                base: base.to_string(),
            });
            let number = s.next_number;
            s.next_number += 1;
            PullRequestInfo {
                number,
                link: format!("https://git.example.com/{}/{}/pull/{}", owner, repo, number),
                title: title.to_string(),
            }
        }))
    }

    async fn list_commits(&self, owner: &str, repo: &str, number: u64) -> Result<Vec<CommitInfo>> {
        Ok(self.with_state(|s| {
            s.calls.push(HostCall::ListCommits {
                owner: owner.to_string(),
                repo: repo.to_string(),
                number,
            });
            s.commits.get(&number).cloned().unwrap_or_default()
        }))
    }
}
