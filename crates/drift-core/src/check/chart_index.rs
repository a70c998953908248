//! Charts published in a Helm repository index

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;

use super::{CheckPlugin, Discovered, VersionInfo};
use crate::clients::{ChartIndexClient, ChartVersion};
use crate::model::{Dependency, Module, ModuleKind, Repository, RepositoryKind};
use crate::Result;

pub struct ChartIndexCheck {
    client: Arc<dyn ChartIndexClient>,
}

impl ChartIndexCheck {
    pub fn new(client: Arc<dyn ChartIndexClient>) -> Self {
        Self { client }
    }

    async fn versions(&self, repository: &Repository, chart: &str) -> Result<Vec<ChartVersion>> {
        let index = self.client.fetch_index(&repository.remote).await?;
        let mut versions = index.chart(chart).map(<[_]>::to_vec).unwrap_or_default();
        versions.sort_by(|a, b| compare_versions(&b.version, &a.version));
        Ok(versions)
    }
}

/// Semver ordering; unparseable versions sort below every valid one and keep
/// their relative order.
fn compare_versions(a: &str, b: &str) -> Ordering {
    let parse = |v: &str| semver::Version::parse(v.trim_start_matches('v')).ok();
    match (parse(a), parse(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

#[async_trait]
impl CheckPlugin for ChartIndexCheck {
    fn repository_type(&self) -> RepositoryKind {
        RepositoryKind::Helm
    }

    fn module_type(&self) -> ModuleKind {
        ModuleKind::Helm
    }

    async fn matches(&self, repository: &Repository, module_name: &str) -> bool {
        match self.client.fetch_index(&repository.remote).await {
            Ok(index) => index.chart(module_name).is_some(),
            Err(e) => {
                tracing::debug!(repository = %repository.name, error = %e, "Index unavailable");
                false
            }
        }
    }

    async fn scan(
        &self,
        repository: &Repository,
        _local_path: Option<&std::path::Path>,
    ) -> Result<Vec<Discovered>> {
        let index = self.client.fetch_index(&repository.remote).await?;
        Ok(index
            .entries
            .keys()
            .map(|name| Discovered::new(name.clone(), ModuleKind::Helm, None))
            .collect())
    }

    async fn check(&self, repository: &Repository, module: &Module) -> Result<VersionInfo> {
        let versions: Vec<String> = self
            .versions(repository, &module.name)
            .await?
            .into_iter()
            .map(|v| v.version)
            .collect();
        Ok(VersionInfo {
            current: versions.first().cloned(),
            versions,
        })
    }

    async fn dependencies(&self, repository: &Repository, module: &Module) -> Result<Vec<Dependency>> {
        let versions = self.versions(repository, &module.name).await?;
        let Some(current) = versions.into_iter().next() else {
            return Ok(Vec::new());
        };

        Ok(current
            .dependencies
            .into_iter()
            .map(|dep| {
                Dependency::new(
                    dep.name,
                    dep.version,
                    ModuleKind::Helm,
                    dep.repository.unwrap_or_default(),
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::ChartIndex;
    use pretty_assertions::assert_eq;

    struct StaticIndex(&'static str);

    #[async_trait]
    impl ChartIndexClient for StaticIndex {
        async fn fetch_index(&self, _remote: &str) -> Result<ChartIndex> {
            ChartIndex::parse(self.0)
        }
    }

    const INDEX: &str = "\
entries:
  api:
    - version: 1.2.0
    - version: 1.10.0
      dependencies:
        - name: db
          version: 3.0.0
          repository: https://charts.example.com
    - version: nightly
    - version: 1.9.0-rc.1
  db:
    - version: 3.0.0
";

    fn setup() -> (ChartIndexCheck, Repository, Module) {
        let check = ChartIndexCheck::new(Arc::new(StaticIndex(INDEX)));
        let repo = Repository::new("stable", RepositoryKind::Helm, "https://charts.example.com");
        let module = Module::new("stable", "api", ModuleKind::Helm);
        (check, repo, module)
    }

    #[tokio::test]
    async fn versions_sorted_semver_descending() {
        let (check, repo, module) = setup();
        let info = check.check(&repo, &module).await.unwrap();
        assert_eq!(info.versions, vec!["1.10.0", "1.9.0-rc.1", "1.2.0", "nightly"]);
        assert_eq!(info.current.as_deref(), Some("1.10.0"));
    }

    #[tokio::test]
    async fn dependencies_of_current_version() {
        let (check, repo, module) = setup();
        let deps = check.dependencies(&repo, &module).await.unwrap();
        assert_eq!(
            deps,
            vec![Dependency::new("db", Some("3.0.0".into()), ModuleKind::Helm, "https://charts.example.com")]
        );
    }

    #[tokio::test]
    async fn scan_lists_every_chart() {
        let (check, repo, _) = setup();
        let names: Vec<String> = check
            .scan(&repo, None)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["api", "db"]);
        assert!(check.matches(&repo, "db").await);
        assert!(!check.matches(&repo, "web").await);
    }
}
