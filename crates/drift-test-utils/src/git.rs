//! Upstream git repositories for end-to-end tests.
//!
//! Everything goes through `git2`, so no `git` executable or global config
//! is needed to build fixtures. The engine's own sync and push still shell
//! out to `git`.

use std::fs;
use std::path::{Path, PathBuf};

use git2::{Repository, Signature};
use tempfile::TempDir;

/// `file://` URL of a local repository path.
pub fn file_url(path: &Path) -> String {
    format!("file://{}", path.display())
}

/// A non-bare repository at `<tmp>/<owner>/<name>`, usable as a clone
/// remote. The nested layout lets the URL parse as `owner/name`.
pub struct Upstream {
    _dir: TempDir,
    path: PathBuf,
    repo: Repository,
}

impl Upstream {
    /// # Panics
    /// Panics if the repository cannot be initialised.
    pub fn new(owner: &str, name: &str) -> Self {
        let dir = TempDir::new().unwrap_or_else(|e| panic!("Upstream::new: tempdir: {e}"));
        let path = dir.path().join(owner).join(name);
        fs::create_dir_all(&path).unwrap_or_else(|e| panic!("Upstream::new: mkdir: {e}"));
        let repo = Repository::init(&path)
            .unwrap_or_else(|e| panic!("Upstream::new: init failed: {e}"));
        Self {
            _dir: dir,
            path,
            repo,
        }
    }

    /// An empty bare repository at `<tmp>/<owner>/<name>.git`, for use as a
    /// push target. Returns the directory guard, the repository path and its
    /// URL.
    ///
    /// # Panics
    /// Panics if the repository cannot be initialised.
    pub fn bare(owner: &str, name: &str) -> (TempDir, PathBuf, String) {
        let dir = TempDir::new().unwrap_or_else(|e| panic!("Upstream::bare: tempdir: {e}"));
        let path = dir.path().join(owner).join(format!("{name}.git"));
        fs::create_dir_all(&path).unwrap_or_else(|e| panic!("Upstream::bare: mkdir: {e}"));
        Repository::init_bare(&path)
            .unwrap_or_else(|e| panic!("Upstream::bare: init failed: {e}"));
        let url = file_url(&path);
        (dir, path, url)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The repository as a clone URL.
    pub fn remote(&self) -> String {
        file_url(&self.path)
    }

    /// Write `files` and commit them on the current branch.
    ///
    /// # Panics
    /// Panics if any git or filesystem operation fails.
    pub fn commit(&self, files: &[(&str, &str)], message: &str) -> String {
        for (path, content) in files {
            let target = self.path().join(path);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .unwrap_or_else(|e| panic!("Upstream::commit: mkdir {}: {e}", parent.display()));
            }
            fs::write(&target, content)
                .unwrap_or_else(|e| panic!("Upstream::commit: write {path}: {e}"));
        }

        let mut index = self.repo.index().unwrap_or_else(|e| panic!("index: {e}"));
        index
            .add_all(["*"], git2::IndexAddOption::DEFAULT, None)
            .unwrap_or_else(|e| panic!("add_all: {e}"));
        index.write().unwrap_or_else(|e| panic!("index write: {e}"));
        let tree_id = index.write_tree().unwrap_or_else(|e| panic!("write_tree: {e}"));
        let tree = self.repo.find_tree(tree_id).unwrap_or_else(|e| panic!("find_tree: {e}"));

        let signature = Signature::now("Upstream", "upstream@example.com")
            .unwrap_or_else(|e| panic!("signature: {e}"));
        let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        let oid = self
            .repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
            .unwrap_or_else(|e| panic!("commit: {e}"));
        oid.to_string()
    }

    /// Name of the current branch.
    ///
    /// # Panics
    /// Panics before the first commit.
    pub fn branch(&self) -> String {
        self.repo
            .head()
            .ok()
            .and_then(|h| h.shorthand().map(str::to_string))
            .unwrap_or_else(|| panic!("Upstream::branch: no commit yet"))
    }
}

/// Content of `path` at the tip of `branch` in the repository at `repo`.
pub fn file_at(repo: &Path, branch: &str, path: &str) -> Option<String> {
    let repo = Repository::open(repo).ok()?;
    let reference = repo
        .find_branch(branch, git2::BranchType::Local)
        .ok()?
        .into_reference();
    let tree = reference.peel_to_tree().ok()?;
    let entry = tree.get_path(Path::new(path)).ok()?;
    let blob = entry.to_object(&repo).ok()?.peel_to_blob().ok()?;
    String::from_utf8(blob.content().to_vec()).ok()
}
