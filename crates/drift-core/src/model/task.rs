//! Units of asynchronous work

use std::fmt;

use chrono::{DateTime, Utc};
use drift_store::Entity;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    AddRepository,
    CheckUpdates,
    ApplyUpdate,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::AddRepository => "add_repository",
            TaskKind::CheckUpdates => "check_updates",
            TaskKind::ApplyUpdate => "apply_update",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state. Transitions only move forward:
/// `pending -> running -> success | error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Success,
    Error,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Success => "success",
            TaskStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Success | TaskStatus::Error)
    }

    fn can_become(&self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Pending, TaskStatus::Running)
                | (TaskStatus::Running, TaskStatus::Success)
                | (TaskStatus::Running, TaskStatus::Error)
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    #[serde(default)]
    pub data: Value,
    pub status: TaskStatus,
    #[serde(default)]
    pub result: Option<Value>,
    pub retries: u32,
    #[serde(default)]
    pub previous_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(kind: TaskKind, data: Value, retries: u32) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            kind,
            data,
            status: TaskStatus::Pending,
            result: None,
            retries,
            previous_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn transition(&mut self, next: TaskStatus) -> Result<()> {
        if !self.status.can_become(next) {
            return Err(Error::InvalidTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn start(&mut self) -> Result<()> {
        self.transition(TaskStatus::Running)
    }

    pub fn succeed(&mut self, result: Value) -> Result<()> {
        self.transition(TaskStatus::Success)?;
        self.result = Some(result);
        Ok(())
    }

    pub fn fail(&mut self, message: impl Into<String>) -> Result<()> {
        self.transition(TaskStatus::Error)?;
        self.result = Some(serde_json::json!({ "error": message.into() }));
        Ok(())
    }

    /// Next attempt after an automatic retry: a fresh task linked to this
    /// one with one retry fewer. `None` when no retries are left.
    pub fn next_attempt(&self) -> Option<Task> {
        let retries = self.retries.checked_sub(1)?;
        Some(self.derive(retries))
    }

    /// A manually requested attempt keeps the retry budget.
    pub fn manual_retry(&self) -> Task {
        self.derive(self.retries)
    }

    fn derive(&self, retries: u32) -> Task {
        let mut task = Task::new(self.kind, self.data.clone(), retries);
        task.previous_id = self.id.clone();
        task
    }
}

impl Entity for Task {
    const KIND: &'static str = "Task";

    fn id(&self) -> Option<String> {
        self.id.clone()
    }

    fn assign_id(&mut self, id: String) {
        self.id = Some(id);
    }
}
