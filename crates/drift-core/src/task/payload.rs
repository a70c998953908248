//! Task payloads

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::model::{Repository, RepositoryKind, Task};
use crate::{Error, Result};

/// `add_repository` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddRepository {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: RepositoryKind,
    pub remote: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

impl AddRepository {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("repository name is empty".to_string()));
        }
        let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-');
        if !self.name.chars().all(allowed) || matches!(self.name.as_str(), "." | "..") {
            return Err(Error::Validation(format!(
                "repository name '{}' may only contain letters, digits, '.', '_' and '-'",
                self.name
            )));
        }
        if self.remote.trim().is_empty() {
            return Err(Error::Validation(format!(
                "repository '{}' has no remote",
                self.name
            )));
        }
        Ok(())
    }

    pub fn into_repository(self) -> Repository {
        let mut repository = Repository::new(self.name, self.kind, self.remote);
        repository.parent = self.parent;
        repository.notify = self.notify;
        repository.branch = self.branch;
        repository
    }
}

/// `check_updates` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckUpdates {
    pub repository: String,
}

/// `apply_update` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyUpdate {
    pub update: String,
}

/// Decode a task's `data`.
pub fn parse<T: DeserializeOwned>(task: &Task) -> Result<T> {
    serde_json::from_value(task.data.clone()).map_err(|e| Error::InvalidTask {
        message: format!("{} payload: {}", task.kind, e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TaskKind;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn add_repository_payload_decodes() {
        let task = Task::new(
            TaskKind::AddRepository,
            json!({"name": "deploy", "type": "git", "remote": "https://git.example.com/acme/deploy", "branch": "main"}),
            3,
        );
        let payload: AddRepository = parse(&task).unwrap();
        let repository = payload.into_repository();
        assert_eq!(repository.kind, RepositoryKind::Git);
        assert_eq!(repository.branch.as_deref(), Some("main"));
        assert!(repository.is_settled());
    }

    #[test]
    fn malformed_payload_is_invalid_task() {
        let task = Task::new(TaskKind::CheckUpdates, json!({"repo": "x"}), 3);
        let err = parse::<CheckUpdates>(&task).unwrap_err();
        assert!(matches!(err, Error::InvalidTask { .. }));
        assert!(!err.is_retriable());
    }

    #[rstest]
    #[case("", "https://x")]
    #[case("a/b", "https://x")]
    #[case("a#b", "https://x")]
    #[case("a b", "https://x")]
    #[case(".", "https://x")]
    #[case("..", "https://x")]
    #[case("..\\up", "https://x")]
    #[case("deploy", " ")]
    fn invalid_repositories_are_rejected(#[case] name: &str, #[case] remote: &str) {
        let payload = AddRepository {
            name: name.into(),
            kind: RepositoryKind::Git,
            remote: remote.into(),
            parent: None,
            notify: None,
            branch: None,
        };
        assert!(matches!(payload.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn dotted_and_dashed_names_are_accepted() {
        let payload = AddRepository {
            name: "acme-charts.v2_x".into(),
            kind: RepositoryKind::Helm,
            remote: "https://charts.example.com".into(),
            parent: None,
            notify: None,
            branch: None,
        };
        payload.validate().unwrap();
    }
}
