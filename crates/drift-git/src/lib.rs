//! Git plumbing for Drift
//!
//! Network operations (clone, fetch, push) run the `git` executable through
//! tokio; local branch and commit handling uses git2. The [`Vcs`] and
//! [`SourceControlHost`] traits are the seams the engine depends on.

pub mod cli;
pub mod error;
pub mod host;
pub mod local;
pub mod naming;
pub mod vcs;

pub use cli::GitCli;
pub use error::{Error, Result};
pub use host::{CommitInfo, Fork, PullRequestInfo, RemoteUrl, SourceControlHost, normalize_remote};
pub use local::Author;
pub use naming::{sanitize_branch, update_branch};
pub use vcs::{GitVcs, Vcs};
