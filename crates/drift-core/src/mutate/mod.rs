//! Mutation plugins: propagate an update into a dependent manifest
//!
//! A plugin serves one `(destination repository type, source module type,
//! destination module type)` triple. It computes the manifest edit in
//! memory first, so a missing dependency reference fails before anything
//! is written, forked, branched or pushed. The shared fork, branch, commit,
//! push and pull request flow lives in [`Proposer`].

mod chart;
mod dockerfile;
mod proposal;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::model::{Module, ModuleKind, Repository, RepositoryKind, Update};
use crate::{Error, Result};

pub use chart::{ChartDependencyMutation, ChartImageMutation};
pub use dockerfile::DockerfileMutation;
pub use proposal::{FileEdit, Proposer, Templates};

/// Outcome of a successful mutation.
#[derive(Debug, Clone, Serialize)]
pub struct MutationResult {
    #[serde(skip)]
    pub update: Update,
    /// Pull request number
    pub pr: u64,
    /// Pull request identity (`repository#number`)
    pub id: String,
    pub link: String,
    pub title: String,
    pub branch: String,
    pub commit: String,
    /// Unified diff of every edited manifest
    #[serde(skip_serializing_if = "String::is_empty")]
    pub diff: String,
}

#[async_trait]
pub trait MutationPlugin: Send + Sync {
    fn dest_repository_type(&self) -> RepositoryKind;

    fn src_module_type(&self) -> ModuleKind;

    fn dest_module_type(&self) -> ModuleKind;

    /// Apply a settled update.
    async fn apply(&self, update: &Update) -> Result<MutationResult>;
}

/// The settled parts of an update a plugin works with.
pub struct Resolved<'a> {
    pub src: &'a Repository,
    pub dest: &'a Repository,
    pub src_module: &'a Module,
    pub dest_module: &'a Module,
}

/// Borrow the repositories and modules of a settled update.
pub fn resolve(update: &Update) -> Result<Resolved<'_>> {
    let (Some(src), Some(dest)) = (update.src(), update.dest()) else {
        return Err(Error::mutation("update is not settled"));
    };
    let src_module = src.module(&update.src_module).ok_or_else(|| Error::UnknownModule {
        repository: src.name.clone(),
        module: update.src_module.clone(),
    })?;
    let dest_module = dest.module(&update.dest_module).ok_or_else(|| Error::UnknownModule {
        repository: dest.name.clone(),
        module: update.dest_module.clone(),
    })?;
    Ok(Resolved {
        src,
        dest,
        src_module,
        dest_module,
    })
}

/// Path of a manifest next to `module`, relative to the repository root.
pub(crate) fn manifest_file(module: &Module, file: &str) -> String {
    match module.dir() {
        "" => file.to_string(),
        dir => format!("{}/{}", dir.trim_end_matches('/'), file),
    }
}

/// Ordered collection of mutation plugins.
#[derive(Default, Clone)]
pub struct MutationRegistry {
    plugins: Vec<Arc<dyn MutationPlugin>>,
}

impl MutationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, plugin: Arc<dyn MutationPlugin>) {
        self.plugins.push(plugin);
    }

    pub fn with(mut self, plugin: impl MutationPlugin + 'static) -> Self {
        self.register(Arc::new(plugin));
        self
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Plugin for an exact triple. The first registered wins.
    pub fn find(
        &self,
        dest_repository_type: RepositoryKind,
        src_module_type: ModuleKind,
        dest_module_type: ModuleKind,
    ) -> Option<Arc<dyn MutationPlugin>> {
        self.plugins
            .iter()
            .find(|p| {
                p.dest_repository_type() == dest_repository_type
                    && p.src_module_type() == src_module_type
                    && p.dest_module_type() == dest_module_type
            })
            .cloned()
    }

    /// Plugin for a settled update.
    pub fn find_for(&self, update: &Update) -> Result<Option<Arc<dyn MutationPlugin>>> {
        let resolved = resolve(update)?;
        Ok(self.find(
            resolved.dest.kind,
            resolved.src_module.kind,
            resolved.dest_module.kind,
        ))
    }
}
