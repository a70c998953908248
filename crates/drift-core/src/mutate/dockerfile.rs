//! Dockerfile base image mutation

use async_trait::async_trait;
use drift_manifest::{ImageRef, files};

use super::{FileEdit, MutationPlugin, MutationResult, Proposer, manifest_file, resolve};
use crate::model::{Dependency, ModuleKind, RepositoryKind, Update};
use crate::{Error, Result};

/// Bumps the tag of a `FROM` image in a module's Dockerfile.
pub struct DockerfileMutation {
    proposer: Proposer,
}

impl DockerfileMutation {
    pub fn new(proposer: Proposer) -> Self {
        Self { proposer }
    }
}

#[async_trait]
impl MutationPlugin for DockerfileMutation {
    fn dest_repository_type(&self) -> RepositoryKind {
        RepositoryKind::Git
    }

    fn src_module_type(&self) -> ModuleKind {
        ModuleKind::Docker
    }

    fn dest_module_type(&self) -> ModuleKind {
        ModuleKind::Docker
    }

    async fn apply(&self, update: &Update) -> Result<MutationResult> {
        let resolved = resolve(update)?;
        let checkout = self.proposer.checkout(resolved.dest).await?;

        let path = manifest_file(resolved.dest_module, files::DOCKERFILE);
        let content = self
            .proposer
            .read(&checkout, &path)
            .await?
            .ok_or_else(|| Error::mutation(format!("{} does not exist", path)))?;

        let edited = drift_manifest::set_base_image_tag(
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
                "{} already builds from {}:{}",
                path, resolved.src_module.name, update.to_version
            )));
        }

        self.proposer
            .propose(
                update,
                &resolved,
                &checkout,
                vec![FileEdit {
                    path,
                    content: edited.content,
                }],
            )
            .await
    }
}
