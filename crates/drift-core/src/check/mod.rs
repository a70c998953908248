//! Check plugins: what changed upstream
//!
//! A check plugin serves one `(repository type, module type)` pair. It
//! discovers modules, reports their known versions and lists the
//! dependencies their manifests declare. Plugins are registered on an
//! explicit [`CheckRegistry`] that is handed to the diff engine.

mod chart_index;
mod git;
pub mod heuristic;
mod registry_image;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::{Dependency, Module, ModuleKind, Repository, RepositoryKind};
use crate::Result;

pub use chart_index::ChartIndexCheck;
pub use git::{GitChartCheck, GitDockerfileCheck};
pub use registry_image::RegistryImageCheck;

/// A module found by scanning a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discovered {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ModuleKind,
    #[serde(default)]
    pub path: Option<String>,
}

impl Discovered {
    pub fn new(name: impl Into<String>, kind: ModuleKind, path: Option<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            path,
        }
    }
}

/// Versions currently observed for a module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub versions: Vec<String>,
    pub current: Option<String>,
}

#[async_trait]
pub trait CheckPlugin: Send + Sync {
    fn repository_type(&self) -> RepositoryKind;

    fn module_type(&self) -> ModuleKind;

    /// Whether `module_name` looks like a module this plugin handles.
    async fn matches(&self, repository: &Repository, module_name: &str) -> bool;

    /// Whether a scanned module belongs to this plugin. Used when scanners
    /// of different module types report the same name.
    async fn claims(&self, repository: &Repository, discovered: &Discovered) -> bool {
        self.matches(repository, &discovered.name).await
    }

    /// Bulk discovery. `local_path` is the checkout for git repositories.
    async fn scan(
        &self,
        _repository: &Repository,
        _local_path: Option<&Path>,
    ) -> Result<Vec<Discovered>> {
        Ok(Vec::new())
    }

    async fn check(&self, repository: &Repository, module: &Module) -> Result<VersionInfo>;

    async fn dependencies(&self, repository: &Repository, module: &Module)
    -> Result<Vec<Dependency>>;
}

/// Ordered collection of check plugins.
#[derive(Default, Clone)]
pub struct CheckRegistry {
    plugins: Vec<Arc<dyn CheckPlugin>>,
}

impl CheckRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, plugin: Arc<dyn CheckPlugin>) {
        tracing::debug!(
            repository_type = %plugin.repository_type(),
            module_type = %plugin.module_type(),
            "Registered check plugin"
        );
        self.plugins.push(plugin);
    }

    pub fn with(mut self, plugin: impl CheckPlugin + 'static) -> Self {
        self.register(Arc::new(plugin));
        self
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Plugin for an exact type pair. The first registered wins.
    pub fn find(
        &self,
        repository_type: RepositoryKind,
        module_type: ModuleKind,
    ) -> Option<Arc<dyn CheckPlugin>> {
        self.plugins
            .iter()
            .find(|p| p.repository_type() == repository_type && p.module_type() == module_type)
            .cloned()
    }

    /// Plugins serving a repository type, in registration order.
    pub fn for_repository(&self, repository_type: RepositoryKind) -> Vec<Arc<dyn CheckPlugin>> {
        self.plugins
            .iter()
            .filter(|p| p.repository_type() == repository_type)
            .cloned()
            .collect()
    }

    /// First plugin for the repository's type whose predicate accepts
    /// `module_name`.
    pub async fn resolve(
        &self,
        repository: &Repository,
        module_name: &str,
    ) -> Option<Arc<dyn CheckPlugin>> {
        for plugin in self.for_repository(repository.kind) {
            if plugin.matches(repository, module_name).await {
                return Some(plugin);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stub {
        pair: (RepositoryKind, ModuleKind),
        accepts: &'static str,
    }

    #[async_trait]
    impl CheckPlugin for Stub {
        fn repository_type(&self) -> RepositoryKind {
            self.pair.0
        }

        fn module_type(&self) -> ModuleKind {
            self.pair.1
        }

        async fn matches(&self, _repository: &Repository, module_name: &str) -> bool {
            module_name.starts_with(self.accepts)
        }

        async fn check(&self, _r: &Repository, _m: &Module) -> Result<VersionInfo> {
            Ok(VersionInfo::default())
        }

        async fn dependencies(&self, _r: &Repository, _m: &Module) -> Result<Vec<Dependency>> {
            Ok(Vec::new())
        }
    }

    fn registry() -> CheckRegistry {
        CheckRegistry::new()
            .with(Stub {
                pair: (RepositoryKind::Git, ModuleKind::Helm),
                accepts: "chart",
            })
            .with(Stub {
                pair: (RepositoryKind::Git, ModuleKind::Docker),
                accepts: "",
            })
    }

    #[test]
    fn unregistered_pair_is_no_match() {
        let registry = registry();
        assert!(registry.find(RepositoryKind::Helm, ModuleKind::Docker).is_none());
        assert!(registry.find(RepositoryKind::Docker, ModuleKind::Docker).is_none());
        assert!(registry.find(RepositoryKind::Git, ModuleKind::Helm).is_some());
    }

    #[tokio::test]
    async fn resolve_takes_first_matching_predicate() {
        let registry = registry();
        let repo = Repository::new("src", RepositoryKind::Git, "https://git.example.com/a/b");

        let chart = registry.resolve(&repo, "chart-api").await.unwrap();
        assert_eq!(chart.module_type(), ModuleKind::Helm);

        let other = registry.resolve(&repo, "worker").await.unwrap();
        assert_eq!(other.module_type(), ModuleKind::Docker);

        let helm_repo = Repository::new("idx", RepositoryKind::Helm, "https://charts");
        assert!(registry.resolve(&helm_repo, "chart-api").await.is_none());
    }
}
