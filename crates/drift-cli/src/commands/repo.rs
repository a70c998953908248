//! Repository commands

use colored::Colorize;
use serde_json::{Value, json};

use crate::context::Context;
use crate::error::Result;
use crate::output;

use super::task::report;

/// Arguments of `drift repo add`
#[derive(Debug, Clone, Default)]
pub struct AddArgs<'a> {
    pub name: &'a str,
    pub kind: &'a str,
    pub remote: &'a str,
    pub parent: Option<&'a str>,
    pub notify: Option<&'a str>,
    pub branch: Option<&'a str>,
}

impl AddArgs<'_> {
    fn body(&self) -> Value {
        let mut body = json!({
            "name": self.name,
            "type": self.kind,
            "remote": self.remote,
        });
        for (field, value) in [("parent", self.parent), ("notify", self.notify), ("branch", self.branch)] {
            if let Some(value) = value {
                body[field] = json!(value);
            }
        }
        body
    }
}

pub async fn run_repo_add(ctx: &Context, args: AddArgs<'_>) -> Result<()> {
    let task = ctx.api().dispatch("add_repository", args.body()).await?;
    report(ctx, task).await?;
    if ctx.is_attached() && !ctx.json {
        run_repo_show(ctx, args.name).await?;
    }
    Ok(())
}

pub async fn run_repo_list(ctx: &Context) -> Result<()> {
    let repositories = ctx.api().dispatch("list_repositories", Value::Null).await?;
    if ctx.json {
        output::print_json(&repositories);
    } else {
        output::print_repositories(&repositories);
    }
    Ok(())
}

pub async fn run_repo_show(ctx: &Context, name: &str) -> Result<()> {
    let repository = ctx
        .api()
        .dispatch("get_repository", json!({ "name": name }))
        .await?;
    if ctx.json {
        output::print_json(&repository);
    } else {
        output::print_repository(&repository);
    }
    Ok(())
}

pub async fn run_repo_update(ctx: &Context, name: &str) -> Result<()> {
    let task = ctx
        .api()
        .dispatch("soft_update_repository", json!({ "name": name }))
        .await?;
    report(ctx, task).await
}

pub async fn run_repo_delete(ctx: &Context, name: &str) -> Result<()> {
    let deleted = ctx
        .api()
        .dispatch("delete_repository", json!({ "name": name }))
        .await?;
    if ctx.json {
        output::print_json(&deleted);
    } else {
        println!("{} {}", "Deleted".red(), name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn add_body_omits_unset_options() {
        let args = AddArgs {
            name: "deploy",
            kind: "git",
            remote: "https://git.example.com/acme/deploy",
            branch: Some("main"),
            ..Default::default()
        };
        assert_eq!(
            args.body(),
            json!({
                "name": "deploy",
                "type": "git",
                "remote": "https://git.example.com/acme/deploy",
                "branch": "main",
            })
        );
    }
}
