//! Local checkout operations through git2

use std::path::Path;

use git2::{BranchType, IndexAddOption, Repository, Signature};

use crate::{Error, Result};

/// Commit author identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub name: String,
    pub email: String,
}

impl Author {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

fn open(checkout: &Path) -> Result<Repository> {
    Repository::open(checkout).map_err(|_| Error::NotACheckout {
        path: checkout.to_path_buf(),
    })
}

/// Point `branch` at the tip of `base` and check it out, discarding any
/// previous state of `branch`.
pub fn reset_branch(checkout: &Path, branch: &str, base: &str) -> Result<()> {
    let repo = open(checkout)?;

    let base_commit = repo
        .find_branch(base, BranchType::Local)
        .map_err(|_| Error::BranchNotFound {
            name: base.to_string(),
        })?
        .get()
        .peel_to_commit()?;

    // git2 refuses to force-move the branch HEAD points to
    repo.set_head_detached(base_commit.id())?;
    repo.checkout_head(Some(git2::build::CheckoutBuilder::default().force()))?;

    let target = repo.branch(branch, &base_commit, true)?;
    let refname = target
        .get()
        .name()
        .map(str::to_string)
        .ok_or_else(|| Error::InvalidBranchName {
            name: branch.to_string(),
        })?;
    repo.set_head(&refname)?;
    repo.checkout_head(Some(git2::build::CheckoutBuilder::default().force()))?;

    tracing::debug!(branch = %branch, base = %base, "Reset branch");
    Ok(())
}

/// Stage every change in the working tree and commit it on HEAD.
///
/// Returns the new commit SHA. Fails with [`Error::NothingToCommit`] when the
/// staged tree equals HEAD's tree.
pub fn commit_all(checkout: &Path, message: &str, author: &Author) -> Result<String> {
    let repo = open(checkout)?;

    let mut index = repo.index()?;
    index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
    index.update_all(["*"].iter(), None)?;
    index.write()?;
    let tree_id = index.write_tree()?;

    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    if let Some(parent) = &parent
        && parent.tree_id() == tree_id
    {
        return Err(Error::NothingToCommit {
            path: checkout.to_path_buf(),
        });
    }

    let tree = repo.find_tree(tree_id)?;
    let signature = Signature::now(&author.name, &author.email)?;
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    let oid = repo.commit(
        Some("HEAD"),
        &signature,
        &signature,
        message,
        &tree,
        &parents,
    )?;

    Ok(oid.to_string())
}

/// SHA of the commit HEAD points at.
pub fn head_sha(checkout: &Path) -> Result<String> {
    let repo = open(checkout)?;
    let commit = repo.head()?.peel_to_commit()?;
    Ok(commit.id().to_string())
}

/// Current branch, or `None` when HEAD is detached.
pub fn current_branch(checkout: &Path) -> Result<Option<String>> {
    let repo = open(checkout)?;
    let head = repo.head()?;

    if head.is_branch() {
        Ok(head.shorthand().map(str::to_string))
    } else {
        Ok(None)
    }
}
