//! Version-control seam used by the engine

use std::path::Path;

use async_trait::async_trait;

use crate::cli::GitCli;
use crate::local::{self, Author};
use crate::Result;

/// Operations the engine needs on a working checkout.
#[async_trait]
pub trait Vcs: Send + Sync {
    /// Make `checkout` an up-to-date copy of `branch` at `remote`. Clones when
    /// absent; otherwise fetches and discards local state.
    async fn sync(&self, remote: &str, branch: &str, checkout: &Path) -> Result<()>;

    /// Create or reset `branch` from `base` and check it out.
    async fn prepare_branch(&self, checkout: &Path, branch: &str, base: &str) -> Result<()>;

    /// Stage and commit every change, returning the commit SHA.
    async fn commit(&self, checkout: &Path, message: &str, author: &Author) -> Result<String>;

    /// Force-push HEAD to `branch` on `remote`.
    async fn push(&self, checkout: &Path, remote: &str, branch: &str) -> Result<()>;
}

/// [`Vcs`] backed by the git command line for network operations and git2
/// for everything local.
#[derive(Debug, Clone, Default)]
pub struct GitVcs {
    cli: GitCli,
}

impl GitVcs {
    pub fn new(cli: GitCli) -> Self {
        Self { cli }
    }
}

#[async_trait]
impl Vcs for GitVcs {
    async fn sync(&self, remote: &str, branch: &str, checkout: &Path) -> Result<()> {
        if checkout.join(".git").exists() {
            tracing::debug!(checkout = %checkout.display(), branch = %branch, "Fetching checkout");
            self.cli.fetch_and_reset(checkout, branch).await
        } else {
            tracing::info!(remote = %remote, checkout = %checkout.display(), "Cloning repository");
            self.cli.clone(remote, checkout, branch).await
        }
    }

    async fn prepare_branch(&self, checkout: &Path, branch: &str, base: &str) -> Result<()> {
        let (checkout, branch, base) = (
            checkout.to_path_buf(),
            branch.to_string(),
            base.to_string(),
        );
        tokio::task::spawn_blocking(move || local::reset_branch(&checkout, &branch, &base)).await?
    }

    async fn commit(&self, checkout: &Path, message: &str, author: &Author) -> Result<String> {
        let (checkout, message, author) =
            (checkout.to_path_buf(), message.to_string(), author.clone());
        tokio::task::spawn_blocking(move || local::commit_all(&checkout, &message, &author))
            .await?
    }

    async fn push(&self, checkout: &Path, remote: &str, branch: &str) -> Result<()> {
        tracing::info!(remote = %remote, branch = %branch, "Pushing branch");
        self.cli.push(checkout, remote, branch).await
    }
}
