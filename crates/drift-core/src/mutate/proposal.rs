//! Fork, branch, commit, push and pull request flow shared by mutations

use std::path::{Path, PathBuf};
use std::sync::Arc;

use drift_git::{Author, RemoteUrl, SourceControlHost, Vcs};

use super::{MutationResult, Resolved};
use crate::config::{EngineConfig, Workspace};
use crate::model::{PullRequest, Repository, Update};
use crate::template::render;
use crate::{Error, Result};

/// A rewritten manifest, relative to the checkout root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEdit {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct Templates {
    pub commit: String,
    pub title: String,
    pub body: String,
}

impl From<&EngineConfig> for Templates {
    fn from(config: &EngineConfig) -> Self {
        Self {
            commit: config.commit_template.clone(),
            title: config.pr_title_template.clone(),
            body: config.pr_body_template.clone(),
        }
    }
}

/// Turns computed manifest edits into a pull request.
pub struct Proposer {
    workspace: Workspace,
    vcs: Arc<dyn Vcs>,
    host: Option<Arc<dyn SourceControlHost>>,
    fork_owner: String,
    author: Author,
    config: EngineConfig,
    templates: Templates,
}

impl Proposer {
    pub fn new(
        config: &EngineConfig,
        vcs: Arc<dyn Vcs>,
        host: Option<Arc<dyn SourceControlHost>>,
    ) -> Self {
        Self {
            workspace: config.workspace(),
            vcs,
            host,
            fork_owner: config.fork_owner.clone(),
            author: Author::new(&config.git_author_name, &config.git_author_email),
            config: config.clone(),
            templates: Templates::from(config),
        }
    }

    fn host(&self) -> Result<&Arc<dyn SourceControlHost>> {
        self.host.as_ref().ok_or(Error::HostUnavailable)
    }

    fn base_branch<'a>(&'a self, dest: &'a Repository) -> &'a str {
        self.config.base_branch(dest.branch.as_deref())
    }

    /// Bring the destination checkout up to date and return its path.
    pub async fn checkout(&self, dest: &Repository) -> Result<PathBuf> {
        self.host()?;
        let checkout = self.workspace.checkout(&dest.name);
        self.vcs
            .sync(&dest.remote, self.base_branch(dest), &checkout)
            .await?;
        Ok(checkout)
    }

    /// Read a manifest from the checkout; `None` when it does not exist.
    pub async fn read(&self, checkout: &Path, relative: &str) -> Result<Option<String>> {
        let path = checkout.join(relative);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::io(&path, e)),
        }
    }

    pub async fn propose(
        &self,
        update: &Update,
        resolved: &Resolved<'_>,
        checkout: &Path,
        edits: Vec<FileEdit>,
    ) -> Result<MutationResult> {
        let host = self.host()?;
        let dest = resolved.dest;
        let upstream: RemoteUrl = dest.remote.parse()?;
        let base = self.base_branch(dest);

        let fork = match host
            .list_forks(&upstream.owner, &upstream.name)
            .await?
            .into_iter()
            .find(|f| f.owner.eq_ignore_ascii_case(&self.fork_owner))
        {
            Some(fork) => fork,
            None => {
                tracing::info!(repository = %dest.name, owner = %self.fork_owner, "Creating fork");
                host.create_fork(&upstream.owner, &upstream.name).await?
            }
        };

        let branch = drift_git::update_branch(
            &resolved.dest_module.name,
            &resolved.src_module.name,
            &update.to_version,
        )?;
        self.vcs.prepare_branch(checkout, &branch, base).await?;

        let mut diff = String::new();
        for edit in &edits {
            let previous = self.read(checkout, &edit.path).await?.unwrap_or_default();
            tracing::debug!(
                path = %edit.path,
                changed = drift_manifest::changed_lines(&previous, &edit.content),
                "Writing manifest"
            );
            diff.push_str(&drift_manifest::unified_diff(&edit.path, &previous, &edit.content));

            let path = checkout.join(&edit.path);
            tokio::fs::write(&path, &edit.content)
                .await
                .map_err(|e| Error::io(&path, e))?;
        }

        let context = update.context();
        let message = render(&self.templates.commit, &context);
        let commit = self.vcs.commit(checkout, &message, &self.author).await?;
        self.vcs.push(checkout, &fork.clone_url, &branch).await?;

        let title = render(&self.templates.title, &context);
        let body = render(&self.templates.body, &context);
        let head = format!("{}:{}", fork.owner, branch);
        let pr = host
            .create_pull_request(&upstream.owner, &upstream.name, &title, &body, &head, base)
            .await?;

        tracing::info!(
            repository = %dest.name,
            number = pr.number,
            branch = %branch,
            "Opened pull request"
        );

        Ok(MutationResult {
            update: update.clone(),
            pr: pr.number,
            id: PullRequest::identity(&dest.name, pr.number),
            link: pr.link,
            title: pr.title,
            branch,
            commit,
            diff,
        })
    }
}
