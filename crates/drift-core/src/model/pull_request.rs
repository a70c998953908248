//! Pull requests opened by mutations

use chrono::{DateTime, Utc};
use drift_store::Entity;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
    pub repository: String,
    pub number: u64,
    /// Commit SHAs known to be on the pull request
    #[serde(default)]
    pub commits: Vec<String>,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub branch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl PullRequest {
    pub fn identity(repository: &str, number: u64) -> String {
        format!("{}#{}", repository, number)
    }

    /// Record commits not seen before, returning the new ones in order.
    pub fn observe_commits<I>(&mut self, shas: I) -> Vec<String>
    where
        I: IntoIterator<Item = String>,
    {
        let mut added = Vec::new();
        for sha in shas {
            if !self.commits.contains(&sha) {
                self.commits.push(sha.clone());
                added.push(sha);
            }
        }
        if !added.is_empty() {
            self.updated_at = Utc::now();
        }
        added
    }
}

impl Entity for PullRequest {
    const KIND: &'static str = "PullRequest";

    fn id(&self) -> Option<String> {
        Some(Self::identity(&self.repository, self.number))
    }

    fn assign_id(&mut self, _id: String) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn observe_commits_only_adds_unknown_shas() {
        let mut pr = PullRequest {
            repository: "deploy".into(),
            number: 7,
            commits: vec!["a".into()],
            link: String::new(),
            title: String::new(),
            branch: String::new(),
            update_id: None,
            updated_at: Utc::now(),
        };

        let added = pr.observe_commits(["a".to_string(), "b".to_string()]);
        assert_eq!(added, vec!["b".to_string()]);
        assert_eq!(pr.commits, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(pr.id().as_deref(), Some("deploy#7"));
    }
}
