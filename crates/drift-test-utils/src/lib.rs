//! Shared test utilities for the Drift workspace.
//!
//! Dev-dependency only. Because it depends on `drift-core`, use it from
//! integration tests (`tests/`), not from `#[cfg(test)]` modules inside
//! `drift-core` itself.
//!
//! # Modules
//!
//! - [`git`] — upstream repositories built with `git2`
//! - [`host`] — recording source-control host
//! - [`vcs`] — recording VCS that materialises checkouts from memory
//! - [`clients`] — in-memory registry, chart index and notifier

pub mod clients;
pub mod git;
pub mod host;
pub mod vcs;

pub use clients::{FakeChartIndex, FakeRegistry, RecordingNotifier};
pub use git::{Upstream, file_at, file_url};
pub use host::{FakeHost, HostCall};
pub use vcs::{RecordingVcs, VcsCall};
