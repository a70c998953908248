//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Drift - track upstream versions and propose updates downstream
#[derive(Parser, Debug)]
#[command(name = "drift")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Engine configuration file
    #[arg(short, long, global = true, env = "DRIFT_CONFIG", default_value = "drift.toml")]
    pub config: PathBuf,

    /// Print raw JSON instead of a summary
    #[arg(long, global = true)]
    pub json: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Manage tracked repositories
    Repo {
        #[command(subcommand)]
        action: RepoAction,
    },

    /// Inspect and retry tasks
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },

    /// List generated updates
    Updates {
        /// Only updates targeting this repository
        #[arg(short, long)]
        repository: Option<String>,
    },

    /// List pull requests opened by the engine
    Pulls {
        /// Only pull requests on this repository
        #[arg(short, long)]
        repository: Option<String>,
    },

    /// Run every pending task until the queue is empty
    Work {
        /// Tasks processed concurrently
        #[arg(long, default_value_t = 1)]
        concurrency: usize,
    },
}

/// Repository actions
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum RepoAction {
    /// Track a new repository
    ///
    /// Examples:
    ///   drift repo add charts helm https://charts.example.com
    ///   drift repo add deploy git https://git.example.com/acme/deploy --branch main
    Add {
        /// Unique repository name
        name: String,

        /// Repository type (git, helm or docker)
        #[arg(value_name = "TYPE")]
        kind: String,

        /// Remote URL or registry namespace
        remote: String,

        /// Repository this one is derived from
        #[arg(long)]
        parent: Option<String>,

        /// Notification target for pull request events
        #[arg(long)]
        notify: Option<String>,

        /// Base branch for pull requests (git only)
        #[arg(long)]
        branch: Option<String>,

        /// Only queue the task; run it later with `drift work`
        #[arg(long)]
        detach: bool,
    },

    /// List tracked repositories
    List,

    /// Show a repository and its modules
    Show {
        name: String,
    },

    /// Refresh a repository and propose updates for modules that moved
    Update {
        name: String,

        /// Only queue the task; run it later with `drift work`
        #[arg(long)]
        detach: bool,
    },

    /// Stop tracking a repository
    Delete {
        name: String,
    },
}

/// Task actions
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum TaskAction {
    /// Show a single task
    Show {
        id: String,
    },

    /// List tasks, oldest first
    List {
        /// pending, running, success or error
        #[arg(short, long)]
        status: Option<String>,

        /// add_repository, check_updates or apply_update
        #[arg(short = 't', long = "type")]
        kind: Option<String>,
    },

    /// Retry a failed task
    Retry {
        id: String,

        /// Only queue the task; run it later with `drift work`
        #[arg(long)]
        detach: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_repo_add() {
        let cli = Cli::parse_from([
            "drift",
            "repo",
            "add",
            "deploy",
            "git",
            "https://git.example.com/acme/deploy",
            "--branch",
            "main",
        ]);
        assert_eq!(
            cli.command,
            Some(Commands::Repo {
                action: RepoAction::Add {
                    name: "deploy".into(),
                    kind: "git".into(),
                    remote: "https://git.example.com/acme/deploy".into(),
                    parent: None,
                    notify: None,
                    branch: Some("main".into()),
                    detach: false,
                }
            })
        );
        assert_eq!(cli.config, PathBuf::from("drift.toml"));
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let cli = Cli::parse_from(["drift", "task", "list", "--status", "error", "--json", "-v"]);
        assert!(cli.json);
        assert!(cli.verbose);
        assert_eq!(
            cli.command,
            Some(Commands::Task {
                action: TaskAction::List {
                    status: Some("error".into()),
                    kind: None,
                }
            })
        );
    }
}
