//! Source-control host contract
//!
//! The engine only needs forks, pull requests and pull request commits from
//! the host. Concrete HTTP clients live outside this workspace.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A fork of a repository owned by the automation account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fork {
    pub owner: String,
    pub name: String,
    pub clone_url: String,
}

/// A pull request as returned by the host on creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestInfo {
    pub number: u64,
    pub link: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub sha: String,
    #[serde(default)]
    pub message: String,
}

#[async_trait]
pub trait SourceControlHost: Send + Sync {
    /// Forks of `owner/repo`.
    async fn list_forks(&self, owner: &str, repo: &str) -> Result<Vec<Fork>>;

    /// Fork `owner/repo` into the automation account.
    async fn create_fork(&self, owner: &str, repo: &str) -> Result<Fork>;

    /// Open a pull request on `owner/repo` from `head` (`fork_owner:branch`)
    /// into `base`.
    async fn create_pull_request(
        &self,
        owner: &str,
        repo: &str,
        title: &str,
        body: &str,
        head: &str,
        base: &str,
    ) -> Result<PullRequestInfo>;

    /// Commits currently on pull request `number`.
    async fn list_commits(&self, owner: &str, repo: &str, number: u64) -> Result<Vec<CommitInfo>>;
}

/// A parsed `host/owner/name` remote.
///
/// Accepts `https://host/owner/name(.git)`, `ssh://git@host/owner/name` and
/// scp-like `git@host:owner/name.git`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteUrl {
    pub host: String,
    pub owner: String,
    pub name: String,
}

impl RemoteUrl {
    /// Canonical `host/owner/name` form, lowercased, used to compare remotes
    /// spelled differently.
    pub fn canonical(&self) -> String {
        format!("{}/{}/{}", self.host, self.owner, self.name).to_lowercase()
    }
}

impl FromStr for RemoteUrl {
    type Err = Error;

    fn from_str(url: &str) -> Result<Self> {
        let invalid = || Error::InvalidRemote {
            url: url.to_string(),
        };

        let trimmed = url.trim().trim_end_matches('/');
        let rest = if let Some((_, rest)) = trimmed.split_once("://") {
            // Drop credentials
            rest.rsplit_once('@').map_or(rest, |(_, host)| host).to_string()
        } else if let Some((user_host, path)) = trimmed.split_once(':') {
            let host = user_host.rsplit_once('@').map_or(user_host, |(_, h)| h);
            format!("{}/{}", host, path)
        } else {
            return Err(invalid());
        };

        let mut parts = rest.split('/').filter(|p| !p.is_empty());
        let host = parts.next().ok_or_else(invalid)?;
        let segments: Vec<&str> = parts.collect();
        if segments.len() < 2 {
            return Err(invalid());
        }

        let name = segments[segments.len() - 1].trim_end_matches(".git");
        let owner = segments[..segments.len() - 1].join("/");
        if name.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            host: host.to_string(),
            owner,
            name: name.to_string(),
        })
    }
}

impl fmt::Display for RemoteUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "https://{}/{}/{}", self.host, self.owner, self.name)
    }
}

/// Normalize a remote for equality checks. Unparseable remotes (registry
/// hosts, plain URLs) compare by their trimmed lowercase text.
pub fn normalize_remote(remote: &str) -> String {
    match remote.parse::<RemoteUrl>() {
        Ok(url) => url.canonical(),
        Err(_) => remote
            .trim()
            .trim_end_matches('/')
            .trim_end_matches(".git")
            .to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("https://github.com/acme/charts.git")]
    #[case("https://github.com/acme/charts")]
    #[case("git@github.com:acme/charts.git")]
    #[case("ssh://git@github.com/acme/charts")]
    #[case("https://token@github.com/Acme/Charts/")]
    fn remote_spellings_normalize_equal(#[case] url: &str) {
        assert_eq!(normalize_remote(url), "github.com/acme/charts");
    }

    #[test]
    fn nested_owner_is_kept() {
        let url: RemoteUrl = "https://gitlab.com/group/sub/project.git".parse().unwrap();
        assert_eq!(url.owner, "group/sub");
        assert_eq!(url.name, "project");
    }

    #[rstest]
    #[case("charts")]
    #[case("https://github.com/only-owner")]
    fn invalid_remotes(#[case] url: &str) {
        assert!(url.parse::<RemoteUrl>().is_err());
    }

    #[test]
    fn unparseable_remote_falls_back_to_text() {
        assert_eq!(normalize_remote("Registry.Example.com"), "registry.example.com");
    }
}
