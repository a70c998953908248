//! Network-facing git operations through the `git` executable
//!
//! Clone, fetch and push go through the command line so the user's
//! credential helpers and SSH configuration apply unchanged.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::process::Command;

use crate::{Error, Result};

/// Handle on a `git` executable.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
    low_speed_timeout: Option<Duration>,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new("git")
    }
}

impl GitCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            low_speed_timeout: None,
        }
    }

    /// Abort HTTP transfers that stay below one byte per second for
    /// `timeout`.
    pub fn with_low_speed_timeout(mut self, timeout: Duration) -> Self {
        self.low_speed_timeout = Some(timeout);
        self
    }

    fn command(&self, dir: &Path, args: &[&str]) -> Command {
        let mut command = Command::new(&self.program);
        command
            .current_dir(dir)
            .args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .kill_on_drop(true);
        if let Some(timeout) = self.low_speed_timeout {
            command
                .env("GIT_HTTP_LOW_SPEED_LIMIT", "1")
                .env("GIT_HTTP_LOW_SPEED_TIME", timeout.as_secs().max(1).to_string());
        }
        command
    }

    /// Run git with `args` inside `dir` and return stdout.
    ///
    /// A non-zero exit maps to [`Error::CommandFailed`]; an empty stdout from
    /// a successful run is returned as an empty string.
    pub async fn run(&self, dir: &Path, args: &[&str]) -> Result<String> {
        tracing::debug!(dir = %dir.display(), args = ?args, "Running git");

        let output = self
            .command(dir, args)
            .output()
            .await
            .map_err(|source| Error::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let code = output.status.code().unwrap_or(-1);
            Err(Error::CommandFailed { code, stderr })
        }
    }

    /// Clone `remote` into `dest`, checking out `branch`.
    pub async fn clone(&self, remote: &str, dest: &Path, branch: &str) -> Result<()> {
        let parent = dest.parent().unwrap_or_else(|| Path::new("."));
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| Error::Spawn {
                program: format!("mkdir {}", parent.display()),
                source,
            })?;

        let dest_arg = dest.display().to_string();
        self.run(
            parent,
            &["clone", "--quiet", "--branch", branch, remote, &dest_arg],
        )
        .await?;
        Ok(())
    }

    /// Fetch `branch` from origin and force the local branch onto it,
    /// discarding local edits.
    pub async fn fetch_and_reset(&self, checkout: &Path, branch: &str) -> Result<()> {
        self.run(checkout, &["fetch", "--quiet", "origin", branch])
            .await?;
        self.run(
            checkout,
            &["checkout", "--quiet", "--force", "-B", branch, "FETCH_HEAD"],
        )
        .await?;
        self.run(checkout, &["clean", "--quiet", "-fd"]).await?;
        Ok(())
    }

    /// Force-push the checked-out HEAD to `branch` on `remote_url`.
    pub async fn push(&self, checkout: &Path, remote_url: &str, branch: &str) -> Result<()> {
        let refspec = format!("HEAD:refs/heads/{}", branch);
        self.run(checkout, &["push", "--quiet", "--force", remote_url, &refspec])
            .await?;
        Ok(())
    }
}
