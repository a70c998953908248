//! Drift CLI
//!
//! Tracks upstream repositories and proposes version bumps downstream.

mod cli;
mod commands;
mod context;
mod error;
mod output;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, RepoAction, TaskAction};
use commands::repo::AddArgs;
use context::Context;
use error::Result;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "drift=debug" } else { "drift=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .try_init();
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    tracing::debug!("Verbose mode enabled");

    let Some(command) = cli.command else {
        println!("{} version drift tracker", "drift".green().bold());
        println!();
        println!("Run {} for available commands.", "drift --help".cyan());
        return Ok(());
    };

    let detach = matches!(
        command,
        Commands::Repo {
            action: RepoAction::Add { detach: true, .. } | RepoAction::Update { detach: true, .. }
        } | Commands::Task {
            action: TaskAction::Retry { detach: true, .. }
        } | Commands::Work { .. }
    );
    let ctx = Context::open(&cli.config, detach, cli.json)?;
    execute_command(&ctx, command).await
}

async fn execute_command(ctx: &Context, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Repo { action } => match action {
            RepoAction::Add {
                name,
                kind,
                remote,
                parent,
                notify,
                branch,
                ..
            } => {
                let args = AddArgs {
                    name: &name,
                    kind: &kind,
                    remote: &remote,
                    parent: parent.as_deref(),
                    notify: notify.as_deref(),
                    branch: branch.as_deref(),
                };
                commands::run_repo_add(ctx, args).await
            }
            RepoAction::List => commands::run_repo_list(ctx).await,
            RepoAction::Show { name } => commands::run_repo_show(ctx, &name).await,
            RepoAction::Update { name, .. } => commands::run_repo_update(ctx, &name).await,
            RepoAction::Delete { name } => commands::run_repo_delete(ctx, &name).await,
        },
        Commands::Task { action } => match action {
            TaskAction::Show { id } => commands::run_task_show(ctx, &id).await,
            TaskAction::List { status, kind } => {
                commands::run_task_list(ctx, status.as_deref(), kind.as_deref()).await
            }
            TaskAction::Retry { id, .. } => commands::run_task_retry(ctx, &id).await,
        },
        Commands::Updates { repository } => commands::run_updates(ctx, repository.as_deref()).await,
        Commands::Pulls { repository } => commands::run_pulls(ctx, repository.as_deref()).await,
        Commands::Work { concurrency } => commands::run_work(ctx, concurrency).await,
    }
}
