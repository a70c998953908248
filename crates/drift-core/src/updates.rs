//! Cross-repository update generation

use drift_store::Store;

use crate::diff::Transition;
use crate::model::{Module, Repository, Update};
use crate::Result;

/// Updates for every stored module that depends on a module of
/// `repository` whose `current` moved in this cycle.
///
/// Dependents already at the new version are skipped. Drift that predates
/// the cycle is never looked at.
pub async fn generate_updates(
    store: &Store,
    repository: &Repository,
    transitions: &[Transition],
) -> Result<Vec<Update>> {
    if transitions.is_empty() {
        return Ok(Vec::new());
    }

    let modules: Vec<Module> = store.list(&[]).await?;
    let mut updates = Vec::new();

    for transition in transitions {
        let Some(source) = repository.module(&transition.module) else {
            continue;
        };
        for dependent in &modules {
            if dependent.repository == repository.name && dependent.name == source.name {
                continue;
            }
            let Some(reference) = dependent
                .dependencies
                .iter()
                .find(|d| d.refers_to(source, &repository.remote))
            else {
                continue;
            };
            if reference.version.as_deref() == Some(transition.to.as_str()) {
                continue;
            }

            let mut update = Update::new(
                (repository.name.as_str(), source.name.as_str()),
                (dependent.repository.as_str(), dependent.name.as_str()),
                reference.version.clone(),
                transition.to.clone(),
            );
            store.store_with(&mut update, false).await?;
            tracing::info!(
                src = %Module::identity(&repository.name, &source.name),
                dest = %Module::identity(&dependent.repository, &dependent.name),
                to_version = %transition.to,
                "Generated update"
            );
            updates.push(update);
        }
    }

    Ok(updates)
}
