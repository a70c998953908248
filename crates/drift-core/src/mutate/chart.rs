//! Helm chart mutations

use async_trait::async_trait;
use drift_manifest::{ChartDependency, ImageRef, files};

use super::{FileEdit, MutationPlugin, MutationResult, Proposer, manifest_file, resolve};
use crate::model::{Dependency, ModuleKind, RepositoryKind, Update};
use crate::{Error, Result};

/// Bumps a chart dependency version in `Chart.yaml`, or in
/// `requirements.yaml` for charts that still declare them there.
pub struct ChartDependencyMutation {
    proposer: Proposer,
}

impl ChartDependencyMutation {
    pub fn new(proposer: Proposer) -> Self {
        Self { proposer }
    }
}

#[async_trait]
impl MutationPlugin for ChartDependencyMutation {
    fn dest_repository_type(&self) -> RepositoryKind {
        RepositoryKind::Git
    }

    fn src_module_type(&self) -> ModuleKind {
        ModuleKind::Helm
    }

    fn dest_module_type(&self) -> ModuleKind {
        ModuleKind::Helm
    }

    async fn apply(&self, update: &Update) -> Result<MutationResult> {
        let resolved = resolve(update)?;
        let checkout = self.proposer.checkout(resolved.dest).await?;

        let matches = |dep: &ChartDependency| {
            Dependency::new(
                dep.name.clone(),
                dep.version.clone(),
                ModuleKind::Helm,
                dep.repository.clone().unwrap_or_default(),
            )
            .refers_to(resolved.src_module, &resolved.src.remote)
        };

        let mut edit = None;
        for file in [files::CHART, files::REQUIREMENTS] {
            let path = manifest_file(resolved.dest_module, file);
            let Some(content) = self.proposer.read(&checkout, &path).await? else {
                continue;
            };
            match drift_manifest::set_dependency_version(
                &content,
                &resolved.src_module.name,
                &matches,
                &update.to_version,
            ) {
                Ok(edited) => {
                    if edited.content == content {
                        return Err(Error::mutation(format!(
                            "{} already requires {} {}",
                            path, resolved.src_module.name, update.to_version
                        )));
                    }
                    edit = Some(FileEdit {
                        path,
                        content: edited.content,
                    });
                    break;
                }
                Err(drift_manifest::Error::ReferenceNotFound { .. }) => continue,
                Err(e) => return Err(Error::mutation(e.to_string())),
            }
        }

        let edit = edit.ok_or_else(|| {
            Error::mutation(format!(
                "module '{}' has no dependency on '{}'",
                resolved.dest_module.name, resolved.src_module.name
            ))
        })?;
        self.proposer
            .propose(update, &resolved, &checkout, vec![edit])
            .await
    }
}

/// Bumps an image tag in a chart's `values.yaml`.
pub struct ChartImageMutation {
    proposer: Proposer,
}

impl ChartImageMutation {
    pub fn new(proposer: Proposer) -> Self {
        Self { proposer }
    }
}

#[async_trait]
impl MutationPlugin for ChartImageMutation {
    fn dest_repository_type(&self) -> RepositoryKind {
        RepositoryKind::Git
    }

    fn src_module_type(&self) -> ModuleKind {
        ModuleKind::Docker
    }

    fn dest_module_type(&self) -> ModuleKind {
        ModuleKind::Helm
    }

    async fn apply(&self, update: &Update) -> Result<MutationResult> {
        let resolved = resolve(update)?;
        let checkout = self.proposer.checkout(resolved.dest).await?;

        let path = manifest_file(resolved.dest_module, files::VALUES);
        let content = self
            .proposer
            .read(&checkout, &path)
            .await?
            .ok_or_else(|| Error::mutation(format!("{} does not exist", path)))?;

        let edited = drift_manifest::set_image_tag(
            &content,
            &resolved.src_module.name,
            |image: &ImageRef| {
                Dependency::from_image(image).refers_to(resolved.src_module, &resolved.src.remote)
            },
            &update.to_version,
        )
        .map_err(|e| Error::mutation(e.to_string()))?;

        if edited.content == content {
            return Err(Error::mutation(format!(
                "{} already uses {}:{}",
                path, resolved.src_module.name, update.to_version
            )));
        }

        let edit = FileEdit {
            path,
            content: edited.content,
        };
        self.proposer
            .propose(update, &resolved, &checkout, vec![edit])
            .await
    }
}
