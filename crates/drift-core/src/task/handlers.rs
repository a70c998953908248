//! Per-type task handlers

use drift_store::Entity;
use serde_json::{Value, json};

use super::payload::{self, AddRepository, ApplyUpdate, CheckUpdates};
use super::{Loaded, Outcome};
use crate::engine::Engine;
use crate::model::{PullRequest, Repository, Task, TaskKind, Update};
use crate::notify::{notify_best_effort, templates};
use crate::updates::generate_updates;
use crate::Result;

/// Resolve a task's identities into settled entities.
pub async fn load(engine: &Engine, task: &Task) -> Result<Loaded> {
    let store = engine.store();
    match task.kind {
        TaskKind::AddRepository => {
            let payload: AddRepository = payload::parse(task)?;
            payload.validate()?;
            // A retried attempt picks up whatever the previous one stored
            let repository = match store.find::<Repository>(&payload.name).await? {
                Some(mut existing) => {
                    existing.settle(store).await?;
                    existing
                }
                None => payload.into_repository(),
            };
            Ok(Loaded::AddRepository(repository))
        }
        TaskKind::CheckUpdates => {
            let payload: CheckUpdates = payload::parse(task)?;
            let mut repository: Repository = store.get(&payload.repository).await?;
            repository.settle(store).await?;
            Ok(Loaded::CheckUpdates(repository))
        }
        TaskKind::ApplyUpdate => {
            let payload: ApplyUpdate = payload::parse(task)?;
            let mut update: Update = store.get(&payload.update).await?;
            update.settle(store).await?;
            Ok(Loaded::ApplyUpdate(Box::new(update)))
        }
    }
}

pub async fn execute(engine: &Engine, loaded: Loaded) -> Result<Outcome> {
    match loaded {
        Loaded::AddRepository(repository) => add_repository(engine, repository).await,
        Loaded::CheckUpdates(repository) => check_updates(engine, repository).await,
        Loaded::ApplyUpdate(update) => apply_update(engine, *update).await,
    }
}

async fn add_repository(engine: &Engine, mut repository: Repository) -> Result<Outcome> {
    engine.diff().refresh(&mut repository).await?;
    repository.save(engine.store()).await?;
    tracing::info!(
        repository = %repository.name,
        modules = repository.modules.len(),
        "Added repository"
    );
    Ok(Outcome::done(repository.describe()?))
}

/// Soft update: only modules whose `current` moved in this cycle produce
/// updates.
async fn check_updates(engine: &Engine, mut repository: Repository) -> Result<Outcome> {
    let report = engine.diff().refresh(&mut repository).await?;
    repository.save(engine.store()).await?;

    let updates = generate_updates(engine.store(), &repository, &report.transitions).await?;
    let ids: Vec<String> = updates.iter().filter_map(|u| u.id.clone()).collect();
    let follow_ups = ids
        .iter()
        .map(|id| engine.new_task(TaskKind::ApplyUpdate, json!({ "update": id })))
        .collect();

    Ok(Outcome {
        result: json!({
            "repository": repository.name,
            "report": report,
            "updates": ids,
        }),
        follow_ups,
    })
}

async fn apply_update(engine: &Engine, update: Update) -> Result<Outcome> {
    let Some(plugin) = engine.mutations().find_for(&update)? else {
        let reason = format!(
            "no mutation plugin for {} -> {}",
            update.src_module, update.dest_module
        );
        tracing::warn!(update = ?update.id, %reason, "Skipping update");
        return Ok(Outcome::done(json!({
            "update": update.id,
            "skipped": true,
            "reason": reason,
        })));
    };

    let applied = plugin.apply(&update).await?;

    let mut pull_request = PullRequest {
        repository: update.dest_repository.clone(),
        number: applied.pr,
        commits: vec![applied.commit.clone()],
        link: applied.link.clone(),
        title: applied.title.clone(),
        branch: applied.branch.clone(),
        update_id: update.id.clone(),
        updated_at: chrono::Utc::now(),
    };
    engine.store().store(&mut pull_request).await?;

    let mut result = serde_json::to_value(&applied)?;
    result["update"] = json!(update.id);

    let mut env = update.context();
    merge(&mut env, &result);
    let target = update.dest().and_then(|d| d.notify.as_deref());
    notify_best_effort(engine.notifier(), target, templates::PULL_REQUEST_OPENED, &env).await;

    Ok(Outcome::done(result))
}

fn merge(into: &mut Value, from: &Value) {
    if let (Some(into), Some(from)) = (into.as_object_mut(), from.as_object()) {
        for (key, value) in from {
            into.insert(key.clone(), value.clone());
        }
    }
}
