//! Version-drift detection and update propagation
//!
//! The engine tracks modules (Helm charts, container images) across
//! repositories, notices when a module's current version moves and opens
//! pull requests bumping every dependent manifest.
//!
//! # Architecture
//!
//! ```text
//!                 actions::Api
//!                      |
//!          queue (Local / Broker + Worker)
//!                      |
//!                task::TaskExecutor
//!                      |
//!      +---------------+----------------+
//!      |               |                |
//!  diff::DiffEngine  updates   mutate::MutationRegistry
//!      |                                |
//!  check::CheckRegistry          drift-git, drift-manifest
//!      |
//!  drift-store
//! ```
//!
//! Entities are only changed by replaying patches computed against their
//! `dump()`, so persisted snapshots and live objects never disagree.

pub mod actions;
pub mod check;
pub mod clients;
pub mod config;
pub mod diff;
pub mod engine;
pub mod error;
pub mod model;
pub mod mutate;
pub mod notify;
pub mod patch;
pub mod queue;
pub mod task;
pub mod template;
pub mod updates;

pub use actions::{Api, HttpError};
pub use check::{CheckPlugin, CheckRegistry, Discovered, VersionInfo};
pub use clients::{ChartIndex, ChartIndexClient, FileChartIndex, RegistryClient, TagInfo};
pub use config::{EngineConfig, Workspace};
pub use diff::{DiffEngine, ModulePatches, RefreshReport, StructuralPatch, Transition};
pub use engine::{Engine, EngineBuilder};
pub use error::{Error, Result};
pub use model::{
    Dependency, Module, ModuleKind, PullRequest, Repository, RepositoryKind, Task, TaskKind,
    TaskStatus, Update,
};
pub use mutate::{MutationPlugin, MutationRegistry, MutationResult};
pub use notify::{LogNotifier, Notifier};
pub use patch::PatchOp;
pub use queue::{Broker, BrokerQueue, ChannelBroker, LocalQueue, Queue, Worker};
pub use task::TaskExecutor;
