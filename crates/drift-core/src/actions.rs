//! Action entrypoints
//!
//! Every action takes and returns JSON so a transport (CLI, HTTP, webhook
//! receiver) only has to map names and status codes. Long-running work is
//! enqueued as a task and the task is returned.

use std::sync::Arc;

use drift_git::RemoteUrl;
use drift_store::{Entity, Filter};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::Error;
use crate::engine::Engine;
use crate::model::{PullRequest, Repository, Task, TaskKind, TaskStatus, Update};
use crate::notify::{notify_best_effort, templates};
use crate::queue::Queue;
use crate::task::AddRepository;

/// A failed action, carrying the status a transport should report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{status}: {message}")]
pub struct HttpError {
    pub status: u16,
    pub message: String,
}

impl HttpError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(409, message)
    }
}

impl From<Error> for HttpError {
    fn from(err: Error) -> Self {
        let status = match &err {
            e if e.is_not_found() => 404,
            Error::Validation(_)
            | Error::InvalidTask { .. }
            | Error::UnknownRepositoryType(_)
            | Error::UnknownModuleType(_) => 400,
            Error::HostUnavailable => 503,
            _ => 500,
        };
        Self::new(status, err.to_string())
    }
}

impl From<drift_store::Error> for HttpError {
    fn from(err: drift_store::Error) -> Self {
        Error::from(err).into()
    }
}

pub type ActionResult = std::result::Result<Value, HttpError>;

#[derive(Debug, Default, Deserialize)]
struct TaskQuery {
    #[serde(default)]
    status: Option<TaskStatus>,
    #[serde(default, rename = "type")]
    kind: Option<TaskKind>,
}

#[derive(Debug, Default, Deserialize)]
struct RepositoryQuery {
    #[serde(default)]
    repository: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PullRequestEvent {
    repository: String,
    number: u64,
}

fn args<T: DeserializeOwned>(body: Value) -> Result<T, HttpError> {
    let body = if body.is_null() { json!({}) } else { body };
    serde_json::from_value(body).map_err(|e| HttpError::bad_request(e.to_string()))
}

fn required<'a>(body: &'a Value, field: &str) -> Result<&'a str, HttpError> {
    body.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| HttpError::bad_request(format!("missing field '{}'", field)))
}

fn dump<E: Entity>(entity: &E) -> ActionResult {
    entity.dump().map_err(HttpError::from)
}

/// Entrypoints over an engine and the queue tasks are scheduled on.
#[derive(Clone)]
pub struct Api {
    engine: Arc<Engine>,
    queue: Arc<dyn Queue>,
}

impl Api {
    pub fn new(engine: Arc<Engine>, queue: Arc<dyn Queue>) -> Self {
        Self { engine, queue }
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Route an action name to its entrypoint.
    pub async fn dispatch(&self, action: &str, body: Value) -> ActionResult {
        tracing::debug!(action, "Dispatching action");
        match action {
            "get_repository" => self.get_repository(required(&body, "name")?).await,
            "list_repositories" => self.list_repositories().await,
            "add_repository" => self.add_repository(body).await,
            "soft_update_repository" => self.soft_update_repository(required(&body, "name")?).await,
            "delete_repository" => self.delete_repository(required(&body, "name")?).await,
            "get_task" => self.get_task(required(&body, "id")?).await,
            "list_tasks" => self.list_tasks(body).await,
            "retry_task" => self.retry_task(required(&body, "id")?).await,
            "list_updates" => self.list_updates(body).await,
            "list_pull_requests" => self.list_pull_requests(body).await,
            "pull_request_event" => self.pull_request_event(body).await,
            _ => Err(HttpError::not_found(format!("unknown action '{}'", action))),
        }
    }

    async fn repository(&self, name: &str) -> Result<Repository, HttpError> {
        let store = self.engine.store();
        let mut repository: Repository = store
            .find(name)
            .await?
            .ok_or_else(|| HttpError::not_found(format!("repository '{}' not found", name)))?;
        repository.settle(store).await?;
        Ok(repository)
    }

    async fn enqueue(&self, task: Task) -> ActionResult {
        let ids = self.queue.enqueue(vec![task]).await?;
        let id = ids
            .first()
            .ok_or_else(|| HttpError::new(500, "queue returned no task id"))?;
        let task: Task = self.engine.store().get(id).await?;
        dump(&task)
    }

    /// Repository with its modules.
    pub async fn get_repository(&self, name: &str) -> ActionResult {
        let repository = self.repository(name).await?;
        Ok(repository.describe()?)
    }

    pub async fn list_repositories(&self) -> ActionResult {
        let mut repositories: Vec<Repository> = self.engine.store().list(&[]).await?;
        repositories.sort_by(|a, b| a.name.cmp(&b.name));
        let dumps = repositories
            .iter()
            .map(dump)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::Array(dumps))
    }

    /// Validate and schedule an `add_repository` task.
    pub async fn add_repository(&self, body: Value) -> ActionResult {
        let payload: AddRepository = args(body)?;
        payload.validate()?;
        if self
            .engine
            .store()
            .find::<Repository>(&payload.name)
            .await?
            .is_some()
        {
            return Err(HttpError::conflict(format!(
                "repository '{}' already exists",
                payload.name
            )));
        }
        let data = serde_json::to_value(&payload).map_err(Error::from)?;
        tracing::info!(repository = %payload.name, "Scheduling repository addition");
        self.enqueue(self.engine.new_task(TaskKind::AddRepository, data))
            .await
    }

    /// Schedule a refresh that proposes updates for modules that moved.
    pub async fn soft_update_repository(&self, name: &str) -> ActionResult {
        self.repository(name).await?;
        self.enqueue(
            self.engine
                .new_task(TaskKind::CheckUpdates, json!({ "repository": name })),
        )
        .await
    }

    pub async fn delete_repository(&self, name: &str) -> ActionResult {
        let repository = self.repository(name).await?;
        repository.delete(self.engine.store()).await?;
        Ok(json!({ "deleted": name }))
    }

    pub async fn get_task(&self, id: &str) -> ActionResult {
        let task: Task = self
            .engine
            .store()
            .find(id)
            .await?
            .ok_or_else(|| HttpError::not_found(format!("task '{}' not found", id)))?;
        dump(&task)
    }

    /// Tasks, oldest first, optionally filtered by `status` and `type`.
    pub async fn list_tasks(&self, body: Value) -> ActionResult {
        let query: TaskQuery = args(body)?;
        let mut filters = Vec::new();
        if let Some(status) = query.status {
            filters.push(Filter::eq("status", status.as_str()));
        }
        if let Some(kind) = query.kind {
            filters.push(Filter::eq("type", kind.as_str()));
        }

        let mut tasks: Vec<Task> = self.engine.store().list(&filters).await?;
        tasks.sort_by_key(|t| t.created_at);
        let dumps = tasks.iter().map(dump).collect::<Result<Vec<_>, _>>()?;
        Ok(Value::Array(dumps))
    }

    /// Re-run a failed task as a new attempt linked to it.
    pub async fn retry_task(&self, id: &str) -> ActionResult {
        let task: Task = self
            .engine
            .store()
            .find(id)
            .await?
            .ok_or_else(|| HttpError::not_found(format!("task '{}' not found", id)))?;
        if task.status != TaskStatus::Error {
            return Err(HttpError::conflict(format!(
                "task '{}' is {}, only failed tasks can be retried",
                id, task.status
            )));
        }
        tracing::info!(task_id = %id, "Retrying task");
        self.enqueue(task.manual_retry()).await
    }

    /// Updates, optionally restricted to one destination repository.
    pub async fn list_updates(&self, body: Value) -> ActionResult {
        let query: RepositoryQuery = args(body)?;
        let filters: Vec<Filter> = query
            .repository
            .map(|name| Filter::eq("dest_repository", name))
            .into_iter()
            .collect();

        let mut updates: Vec<Update> = self.engine.store().list(&filters).await?;
        updates.sort_by_key(|u| u.created_at);
        let dumps = updates.iter().map(dump).collect::<Result<Vec<_>, _>>()?;
        Ok(Value::Array(dumps))
    }

    pub async fn list_pull_requests(&self, body: Value) -> ActionResult {
        let query: RepositoryQuery = args(body)?;
        let filters: Vec<Filter> = query
            .repository
            .map(|name| Filter::eq("repository", name))
            .into_iter()
            .collect();

        let mut pull_requests: Vec<PullRequest> = self.engine.store().list(&filters).await?;
        pull_requests.sort_by(|a, b| (&a.repository, a.number).cmp(&(&b.repository, b.number)));
        let dumps = pull_requests
            .iter()
            .map(dump)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::Array(dumps))
    }

    /// Record commits pushed to a pull request the engine opened.
    pub async fn pull_request_event(&self, body: Value) -> ActionResult {
        let event: PullRequestEvent = args(body)?;
        let store = self.engine.store();
        let id = PullRequest::identity(&event.repository, event.number);

        let mut pull_request: PullRequest = store
            .find(&id)
            .await?
            .ok_or_else(|| HttpError::not_found(format!("pull request '{}' not tracked", id)))?;
        let host = self.engine.host().ok_or(Error::HostUnavailable)?;
        let repository = self.repository(&event.repository).await?;
        let upstream: RemoteUrl = repository.remote.parse().map_err(Error::from)?;

        let commits = host
            .list_commits(&upstream.owner, &upstream.name, event.number)
            .await
            .map_err(Error::from)?;
        let added = pull_request.observe_commits(commits.into_iter().map(|c| c.sha));
        if !added.is_empty() {
            store.store(&mut pull_request).await?;
            tracing::info!(pull_request = %id, new_commits = added.len(), "Observed commits");
            notify_best_effort(
                self.engine.notifier(),
                repository.notify.as_deref(),
                templates::PULL_REQUEST_UPDATED,
                &json!({ "id": id, "commits": added.join(", ") }),
            )
            .await;
        }

        Ok(json!({ "id": id, "new_commits": added }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Error::Validation("bad".into()), 400)]
    #[case(Error::HostUnavailable, 503)]
    #[case(Error::mutation("no reference"), 500)]
    #[case(Error::Store(drift_store::Error::not_found("Task", "x")), 404)]
    fn errors_map_to_status(#[case] err: Error, #[case] status: u16) {
        assert_eq!(HttpError::from(err).status, status);
    }

    #[test]
    fn required_rejects_missing_and_empty() {
        let body = json!({"name": ""});
        assert_eq!(required(&body, "name").unwrap_err().status, 400);
        assert_eq!(required(&json!({}), "id").unwrap_err().status, 400);
        assert_eq!(required(&json!({"id": "t1"}), "id").unwrap(), "t1");
    }
}
