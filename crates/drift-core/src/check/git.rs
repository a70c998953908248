//! Check plugins for git checkouts

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use drift_manifest::files;

use super::{CheckPlugin, Discovered, VersionInfo};
use crate::config::Workspace;
use crate::model::{Dependency, Module, ModuleKind, Repository, RepositoryKind};
use crate::{Error, Result};

/// Directories never scanned.
const SKIPPED_DIRS: &[&str] = &[".git", "node_modules", "vendor"];

/// Find every directory under `root` containing `file_name`, relative to
/// `root` and sorted. Directories of a chart named `charts` hold vendored
/// subcharts and are not descended into.
fn find_manifests(root: &Path, file_name: &str) -> Result<Vec<String>> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = std::fs::read_dir(&dir).map_err(|e| Error::io(&dir, e))?;
        let mut subdirs = Vec::new();
        let mut has_manifest = false;

        for entry in entries.flatten() {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();
            if path.is_dir() {
                if !SKIPPED_DIRS.contains(&name.as_str()) {
                    subdirs.push((name, path));
                }
            } else if name == file_name {
                has_manifest = true;
            }
        }

        if has_manifest {
            let relative = dir
                .strip_prefix(root)
                .unwrap_or(&dir)
                .to_string_lossy()
                .replace('\\', "/");
            found.push(relative);
        }
        let is_chart = dir.join(files::CHART).is_file();
        for (name, path) in subdirs {
            if is_chart && name == "charts" {
                continue;
            }
            pending.push(path);
        }
    }

    found.sort();
    Ok(found)
}

fn manifest_path(checkout: &Path, module: &Module, file_name: &str) -> PathBuf {
    let dir = module.dir();
    if dir.is_empty() {
        checkout.join(file_name)
    } else {
        checkout.join(dir).join(file_name)
    }
}

async fn read_optional(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// Helm charts kept in a git repository (`Chart.yaml` files).
#[derive(Debug, Clone)]
pub struct GitChartCheck {
    workspace: Workspace,
}

impl GitChartCheck {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl CheckPlugin for GitChartCheck {
    fn repository_type(&self) -> RepositoryKind {
        RepositoryKind::Git
    }

    fn module_type(&self) -> ModuleKind {
        ModuleKind::Helm
    }

    async fn matches(&self, repository: &Repository, module_name: &str) -> bool {
        let checkout = self.workspace.checkout(&repository.name);
        checkout.join(module_name).join(files::CHART).is_file()
            || repository
                .module(module_name)
                .is_some_and(|m| m.kind == ModuleKind::Helm)
    }

    async fn claims(&self, repository: &Repository, discovered: &Discovered) -> bool {
        let checkout = self.workspace.checkout(&repository.name);
        checkout
            .join(discovered.path.as_deref().unwrap_or_default())
            .join(files::CHART)
            .is_file()
            || self.matches(repository, &discovered.name).await
    }

    async fn scan(
        &self,
        repository: &Repository,
        local_path: Option<&Path>,
    ) -> Result<Vec<Discovered>> {
        let Some(root) = local_path else {
            return Ok(Vec::new());
        };

        let mut discovered = Vec::new();
        for dir in find_manifests(root, files::CHART)? {
            let chart_file = root.join(&dir).join(files::CHART);
            let content = tokio::fs::read_to_string(&chart_file)
                .await
                .map_err(|e| Error::io(&chart_file, e))?;
            let chart = drift_manifest::read_chart(&content)?;

            let fallback = dir.rsplit('/').next().filter(|s| !s.is_empty());
            let name = chart
                .name
                .as_deref()
                .or(fallback)
                .unwrap_or(repository.name.as_str());
            let path = (!dir.is_empty()).then(|| dir.clone());
            discovered.push(Discovered::new(name, ModuleKind::Helm, path));
        }
        Ok(discovered)
    }

    async fn check(&self, repository: &Repository, module: &Module) -> Result<VersionInfo> {
        let checkout = self.workspace.checkout(&repository.name);
        let path = manifest_path(&checkout, module, files::CHART);
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| Error::io(&path, e))?;
        let chart = drift_manifest::read_chart(&content)?;

        Ok(VersionInfo {
            versions: chart.version.iter().cloned().collect(),
            current: chart.version,
        })
    }

    async fn dependencies(&self, repository: &Repository, module: &Module) -> Result<Vec<Dependency>> {
        let checkout = self.workspace.checkout(&repository.name);
        let mut dependencies = Vec::new();

        // Helm 3 declares dependencies in Chart.yaml, Helm 2 in requirements.yaml
        let mut chart_deps = Vec::new();
        for file in [files::CHART, files::REQUIREMENTS] {
            if let Some(content) = read_optional(&manifest_path(&checkout, module, file)).await? {
                chart_deps = drift_manifest::read_chart(&content)?.dependencies;
                if !chart_deps.is_empty() {
                    break;
                }
            }
        }
        for dep in chart_deps {
            dependencies.push(Dependency::new(
                dep.name,
                dep.version,
                ModuleKind::Helm,
                dep.repository.unwrap_or_default(),
            ));
        }

        if let Some(content) = read_optional(&manifest_path(&checkout, module, files::VALUES)).await?
        {
            for image in drift_manifest::find_images(&content)? {
                dependencies.push(Dependency::from_image(&image));
            }
        }

        Ok(dependencies)
    }
}

/// Images built from Dockerfiles in a git repository.
#[derive(Debug, Clone)]
pub struct GitDockerfileCheck {
    workspace: Workspace,
}

impl GitDockerfileCheck {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl CheckPlugin for GitDockerfileCheck {
    fn repository_type(&self) -> RepositoryKind {
        RepositoryKind::Git
    }

    fn module_type(&self) -> ModuleKind {
        ModuleKind::Docker
    }

    async fn matches(&self, repository: &Repository, module_name: &str) -> bool {
        let checkout = self.workspace.checkout(&repository.name);
        checkout.join(module_name).join(files::DOCKERFILE).is_file()
            || (module_name == repository.name && checkout.join(files::DOCKERFILE).is_file())
    }

    async fn claims(&self, repository: &Repository, discovered: &Discovered) -> bool {
        let checkout = self.workspace.checkout(&repository.name);
        checkout
            .join(discovered.path.as_deref().unwrap_or_default())
            .join(files::DOCKERFILE)
            .is_file()
            || self.matches(repository, &discovered.name).await
    }

    async fn scan(
        &self,
        repository: &Repository,
        local_path: Option<&Path>,
    ) -> Result<Vec<Discovered>> {
        let Some(root) = local_path else {
            return Ok(Vec::new());
        };

        Ok(find_manifests(root, files::DOCKERFILE)?
            .into_iter()
            .map(|dir| {
                let name = dir
                    .rsplit('/')
                    .next()
                    .filter(|s| !s.is_empty())
                    .unwrap_or(&repository.name)
                    .to_string();
                let path = (!dir.is_empty()).then_some(dir);
                Discovered::new(name, ModuleKind::Docker, path)
            })
            .collect())
    }

    /// Images built from source carry no version of their own.
    async fn check(&self, _repository: &Repository, _module: &Module) -> Result<VersionInfo> {
        Ok(VersionInfo::default())
    }

    async fn dependencies(&self, repository: &Repository, module: &Module) -> Result<Vec<Dependency>> {
        let checkout = self.workspace.checkout(&repository.name);
        let path = manifest_path(&checkout, module, files::DOCKERFILE);
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| Error::io(&path, e))?;

        Ok(drift_manifest::find_base_images(&content)
            .iter()
            .map(Dependency::from_image)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn setup() -> (TempDir, Workspace, Repository) {
        let dir = TempDir::new().unwrap();
        let workspace = Workspace::new(dir.path());
        let repo = Repository::new("deploy", RepositoryKind::Git, "https://git.example.com/acme/deploy");
        let checkout = workspace.checkout("deploy");

        write(
            &checkout,
            "charts/api/Chart.yaml",
            "name: api\nversion: 0.4.0\ndependencies:\n  - name: db\n    version: 1.0.0\n    repository: https://charts.example.com\n",
        );
        write(
            &checkout,
            "charts/api/values.yaml",
            "image:\n  repository: registry.example.com/team/api\n  tag: 2.0.0\n",
        );
        write(&checkout, "charts/api/charts/db/Chart.yaml", "name: db\nversion: 1.0.0\n");
        write(&checkout, "services/worker/Dockerfile", "FROM registry.example.com/team/base:3 AS b\n");
        write(&checkout, ".git/Dockerfile", "FROM ignored\n");

        (dir, workspace, repo)
    }

    #[tokio::test]
    async fn chart_scan_skips_vendored_subcharts() {
        let (_dir, workspace, repo) = setup();
        let check = GitChartCheck::new(workspace.clone());

        let found = check
            .scan(&repo, Some(&workspace.checkout("deploy")))
            .await
            .unwrap();
        assert_eq!(
            found,
            vec![Discovered::new("api", ModuleKind::Helm, Some("charts/api".into()))]
        );
    }

    #[tokio::test]
    async fn chart_versions_and_dependencies() {
        let (_dir, workspace, repo) = setup();
        let check = GitChartCheck::new(workspace);
        let module = Module::new("deploy", "api", ModuleKind::Helm).with_path(Some("charts/api".into()));

        let info = check.check(&repo, &module).await.unwrap();
        assert_eq!(info.current.as_deref(), Some("0.4.0"));
        assert_eq!(info.versions, vec!["0.4.0".to_string()]);

        let deps = check.dependencies(&repo, &module).await.unwrap();
        assert_eq!(
            deps,
            vec![
                Dependency::new("db", Some("1.0.0".into()), ModuleKind::Helm, "https://charts.example.com"),
                Dependency::new(
                    "api",
                    Some("2.0.0".into()),
                    ModuleKind::Docker,
                    "registry.example.com/team"
                ),
            ]
        );
    }

    #[tokio::test]
    async fn dockerfile_scan_and_dependencies() {
        let (_dir, workspace, repo) = setup();
        let check = GitDockerfileCheck::new(workspace.clone());

        let found = check
            .scan(&repo, Some(&workspace.checkout("deploy")))
            .await
            .unwrap();
        assert_eq!(
            found,
            vec![Discovered::new("worker", ModuleKind::Docker, Some("services/worker".into()))]
        );

        let module = Module::new("deploy", "worker", ModuleKind::Docker)
            .with_path(Some("services/worker".into()));
        assert_eq!(check.check(&repo, &module).await.unwrap(), VersionInfo::default());
        let deps = check.dependencies(&repo, &module).await.unwrap();
        assert_eq!(deps[0].name, "base");
        assert_eq!(deps[0].version.as_deref(), Some("3"));
    }

    #[tokio::test]
    async fn matches_checks_the_checkout() {
        let (_dir, workspace, repo) = setup();
        let charts = GitChartCheck::new(workspace.clone());
        let docker = GitDockerfileCheck::new(workspace);

        assert!(charts.matches(&repo, "charts/api").await);
        assert!(!charts.matches(&repo, "services/worker").await);
        assert!(docker.matches(&repo, "services/worker").await);
    }
}
