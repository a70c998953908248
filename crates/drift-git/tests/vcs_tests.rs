//! GitVcs against local repositories (requires the `git` executable)

use std::path::Path;

use drift_git::{Author, GitVcs, Vcs, local};
use git2::{BranchType, Repository};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn author() -> Author {
    Author::new("Drift Test", "drift@example.com")
}

fn write_and_commit(dir: &Path, file: &str, content: &str, message: &str) {
    std::fs::write(dir.join(file), content).unwrap();
    local::commit_all(dir, message, &author()).unwrap();
}

fn upstream() -> (TempDir, String) {
    let dir = TempDir::new().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    write_and_commit(dir.path(), "Chart.yaml", "version: 1.0.0\n", "Initial");
    let branch = repo.head().unwrap().shorthand().unwrap().to_string();
    (dir, branch)
}

#[tokio::test]
async fn sync_clones_then_fast_forwards_and_discards_local_edits() {
    let (source, branch) = upstream();
    let workdir = TempDir::new().unwrap();
    let checkout = workdir.path().join("charts");
    let remote = source.path().display().to_string();
    let vcs = GitVcs::default();

    vcs.sync(&remote, &branch, &checkout).await.unwrap();
    assert_eq!(
        std::fs::read_to_string(checkout.join("Chart.yaml")).unwrap(),
        "version: 1.0.0\n"
    );

    write_and_commit(source.path(), "Chart.yaml", "version: 1.1.0\n", "Bump");
    std::fs::write(checkout.join("Chart.yaml"), "garbage").unwrap();
    std::fs::write(checkout.join("untracked.txt"), "x").unwrap();

    vcs.sync(&remote, &branch, &checkout).await.unwrap();
    assert_eq!(
        std::fs::read_to_string(checkout.join("Chart.yaml")).unwrap(),
        "version: 1.1.0\n"
    );
    assert!(!checkout.join("untracked.txt").exists());
    assert_eq!(
        local::head_sha(&checkout).unwrap(),
        local::head_sha(source.path()).unwrap()
    );
}

#[tokio::test]
async fn branch_commit_push_round() {
    let (source, branch) = upstream();
    let workdir = TempDir::new().unwrap();
    let checkout = workdir.path().join("charts");
    let remote = source.path().display().to_string();
    let vcs = GitVcs::default();

    vcs.sync(&remote, &branch, &checkout).await.unwrap();
    vcs.prepare_branch(&checkout, "drift/charts/db-2.0.0", &branch)
        .await
        .unwrap();
    std::fs::write(checkout.join("Chart.yaml"), "version: 2.0.0\n").unwrap();
    let sha = vcs
        .commit(&checkout, "Bump db to 2.0.0", &author())
        .await
        .unwrap();
    vcs.push(&checkout, &remote, "drift/charts/db-2.0.0")
        .await
        .unwrap();

    let upstream_repo = Repository::open(source.path()).unwrap();
    let pushed = upstream_repo
        .find_branch("drift/charts/db-2.0.0", BranchType::Local)
        .unwrap()
        .get()
        .peel_to_commit()
        .unwrap();
    assert_eq!(pushed.id().to_string(), sha);
}

#[tokio::test]
async fn sync_from_missing_remote_fails() {
    let workdir = TempDir::new().unwrap();
    let vcs = GitVcs::default();

    let err = vcs
        .sync(
            &workdir.path().join("nope").display().to_string(),
            "master",
            &workdir.path().join("checkout"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, drift_git::Error::CommandFailed { .. }));
}
