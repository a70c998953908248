//! Entity model
//!
//! Every entity is plain serde data. `dump()` (from [`drift_store::Entity`])
//! is the single snapshot used both for persistence and for structural
//! diffing. Relations are identities resolved by `settle()`.

mod kind;
mod module;
mod pull_request;
mod repository;
mod task;
mod update;

pub use kind::{ModuleKind, RepositoryKind};
pub use module::{Dependency, Module};
pub use pull_request::PullRequest;
pub use repository::Repository;
pub use task::{Task, TaskKind, TaskStatus};
pub use update::Update;
