//! Images published to a container registry namespace

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;

use super::heuristic::{recent_tags, select_current_tag};
use super::{CheckPlugin, Discovered, VersionInfo};
use crate::clients::RegistryClient;
use crate::model::{Dependency, Module, ModuleKind, Repository, RepositoryKind};
use crate::Result;

pub struct RegistryImageCheck {
    client: Arc<dyn RegistryClient>,
    window: Duration,
}

impl RegistryImageCheck {
    pub fn new(client: Arc<dyn RegistryClient>, window: Duration) -> Self {
        Self { client, window }
    }
}

#[async_trait]
impl CheckPlugin for RegistryImageCheck {
    fn repository_type(&self) -> RepositoryKind {
        RepositoryKind::Docker
    }

    fn module_type(&self) -> ModuleKind {
        ModuleKind::Docker
    }

    /// Any name may be an image in the namespace.
    async fn matches(&self, _repository: &Repository, _module_name: &str) -> bool {
        true
    }

    async fn scan(
        &self,
        repository: &Repository,
        _local_path: Option<&std::path::Path>,
    ) -> Result<Vec<Discovered>> {
        let mut images = self.client.list_images(&repository.remote).await?;
        images.sort();
        images.dedup();
        Ok(images
            .into_iter()
            .map(|name| Discovered::new(name, ModuleKind::Docker, None))
            .collect())
    }

    async fn check(&self, repository: &Repository, module: &Module) -> Result<VersionInfo> {
        let tags = self
            .client
            .list_tags(&repository.remote, &module.name)
            .await?;
        let recent = recent_tags(&tags, self.window);
        let current = select_current_tag(&recent);

        tracing::debug!(
            repository = %repository.name,
            module = %module.name,
            tags = tags.len(),
            recent = recent.len(),
            current = ?current,
            "Checked image tags"
        );

        Ok(VersionInfo {
            versions: recent.into_iter().map(|t| t.name).collect(),
            current,
        })
    }

    /// Registry images declare no dependencies.
    async fn dependencies(&self, _repository: &Repository, _module: &Module) -> Result<Vec<Dependency>> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::TagInfo;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    struct Tags;

    #[async_trait]
    impl RegistryClient for Tags {
        async fn list_images(&self, _remote: &str) -> Result<Vec<String>> {
            Ok(vec!["worker".into(), "api".into(), "api".into()])
        }

        async fn list_tags(&self, _remote: &str, _image: &str) -> Result<Vec<TagInfo>> {
            let at = |h| Utc.with_ymd_and_hms(2024, 1, 1, h, 0, 0).unwrap();
            Ok(vec![
                TagInfo { name: "1.0.0".into(), digest: "old".into(), updated_at: at(1) },
                TagInfo { name: "1.2.3".into(), digest: "h1".into(), updated_at: at(10) },
                TagInfo { name: "latest".into(), digest: "h1".into(), updated_at: at(10) },
            ])
        }
    }

    #[tokio::test]
    async fn check_uses_window_and_heuristic() {
        let check = RegistryImageCheck::new(Arc::new(Tags), Duration::hours(1));
        let repo = Repository::new("hub", RepositoryKind::Docker, "registry.example.com/team");
        let module = Module::new("hub", "api", ModuleKind::Docker);

        let info = check.check(&repo, &module).await.unwrap();
        assert_eq!(info.current.as_deref(), Some("1.2.3"));
        assert_eq!(info.versions.len(), 2);
        assert!(!info.versions.contains(&"1.0.0".to_string()));
    }

    #[tokio::test]
    async fn scan_deduplicates_images() {
        let check = RegistryImageCheck::new(Arc::new(Tags), Duration::hours(1));
        let repo = Repository::new("hub", RepositoryKind::Docker, "registry.example.com/team");
        let names: Vec<String> = check
            .scan(&repo, None)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["api", "worker"]);
    }
}
