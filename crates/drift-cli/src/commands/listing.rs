//! Update and pull request listings

use serde_json::json;

use crate::context::Context;
use crate::error::Result;
use crate::output;

pub async fn run_updates(ctx: &Context, repository: Option<&str>) -> Result<()> {
    let updates = ctx
        .api()
        .dispatch("list_updates", json!({ "repository": repository }))
        .await?;
    if ctx.json {
        output::print_json(&updates);
    } else {
        output::print_updates(&updates);
    }
    Ok(())
}

pub async fn run_pulls(ctx: &Context, repository: Option<&str>) -> Result<()> {
    let pull_requests = ctx
        .api()
        .dispatch("list_pull_requests", json!({ "repository": repository }))
        .await?;
    if ctx.json {
        output::print_json(&pull_requests);
    } else {
        output::print_pull_requests(&pull_requests);
    }
    Ok(())
}
