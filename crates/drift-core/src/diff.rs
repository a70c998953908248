//! Repository and module diff engine
//!
//! Every step recomputes the desired state from upstream and expresses the
//! difference as a patch. Entities are only ever mutated by replaying those
//! patches, so a refresh that observes nothing new changes nothing.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use drift_git::Vcs;
use drift_store::Entity;
use serde::{Deserialize, Serialize};

use crate::check::{CheckPlugin, CheckRegistry, Discovered};
use crate::config::{EngineConfig, Workspace};
use crate::model::{Module, ModuleKind, Repository, RepositoryKind};
use crate::patch::{self, PatchOp};
use crate::{Error, Result};

/// A change to a repository's module set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum StructuralPatch {
    Create {
        name: String,
        module_type: ModuleKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        module_path: Option<String>,
    },
    Delete {
        name: String,
    },
}

impl StructuralPatch {
    pub fn name(&self) -> &str {
        match self {
            StructuralPatch::Create { name, .. } | StructuralPatch::Delete { name } => name,
        }
    }
}

/// Patch list for one module. An empty list means no change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModulePatches {
    pub name: String,
    pub patches: Vec<PatchOp>,
}

impl ModulePatches {
    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }
}

/// A change of a module's `current` version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub module: String,
    pub from: Option<String>,
    pub to: String,
}

/// What one refresh cycle changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefreshReport {
    pub created: Vec<String>,
    pub deleted: Vec<String>,
    /// Modules whose versions or dependencies were patched
    pub patched: Vec<String>,
    pub transitions: Vec<Transition>,
}

impl RefreshReport {
    pub fn is_unchanged(&self) -> bool {
        self.created.is_empty()
            && self.deleted.is_empty()
            && self.patched.is_empty()
            && self.transitions.is_empty()
    }
}

/// Computes and applies repository and module patches.
#[derive(Clone)]
pub struct DiffEngine {
    checks: CheckRegistry,
    vcs: Arc<dyn Vcs>,
    workspace: Workspace,
    config: EngineConfig,
}

impl DiffEngine {
    pub fn new(
        checks: CheckRegistry,
        vcs: Arc<dyn Vcs>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            checks,
            vcs,
            workspace: config.workspace(),
            config: config.clone(),
        }
    }

    pub fn checks(&self) -> &CheckRegistry {
        &self.checks
    }

    /// Compare discovered modules with the repository's module set.
    ///
    /// A name discovered by scanners of different module types goes to the
    /// first plugin that claims its scanned path, or to the first registered
    /// scanner when none does. A module whose type changed upstream is left
    /// alone.
    pub async fn diff_modules(&self, repository: &Repository) -> Result<Vec<StructuralPatch>> {
        let local_path = (repository.kind == RepositoryKind::Git)
            .then(|| self.workspace.checkout(&repository.name))
            .filter(|path| path.is_dir());

        let mut discovered: BTreeMap<String, Vec<Discovered>> = BTreeMap::new();
        for plugin in self.checks.for_repository(repository.kind) {
            for found in plugin.scan(repository, local_path.as_deref()).await? {
                let candidates = discovered.entry(found.name.clone()).or_default();
                if !candidates.iter().any(|c| c.kind == found.kind) {
                    candidates.push(found);
                }
            }
        }

        let mut patches: Vec<StructuralPatch> = repository
            .modules
            .iter()
            .filter(|m| !discovered.contains_key(&m.name))
            .map(|m| StructuralPatch::Delete {
                name: m.name.clone(),
            })
            .collect();

        for (name, mut candidates) in discovered {
            if repository.module(&name).is_some() {
                continue;
            }
            let found = if candidates.len() == 1 {
                candidates.remove(0)
            } else {
                let index = self.claimed(repository, &candidates).await.unwrap_or_else(|| {
                    tracing::warn!(
                        repository = %repository.name,
                        module = %name,
                        module_type = %candidates[0].kind,
                        "Ambiguous module type, using first registered"
                    );
                    0
                });
                candidates.swap_remove(index)
            };
            patches.push(StructuralPatch::Create {
                name: found.name,
                module_type: found.kind,
                module_path: found.path,
            });
        }

        Ok(patches)
    }

    /// Index of the first candidate, in registration order, claimed by the
    /// plugin serving its module type.
    async fn claimed(&self, repository: &Repository, candidates: &[Discovered]) -> Option<usize> {
        for (index, candidate) in candidates.iter().enumerate() {
            if let Some(plugin) = self.checks.find(repository.kind, candidate.kind)
                && plugin.claims(repository, candidate).await
            {
                return Some(index);
            }
        }
        None
    }

    /// Per-module patches bringing `versions` and `current` up to date.
    pub async fn diff_versions(&self, repository: &Repository) -> Result<Vec<ModulePatches>> {
        let mut result = Vec::new();
        for module in &repository.modules {
            let Some(plugin) = self.plugin_for(repository, module) else {
                continue;
            };
            let info = plugin.check(repository, module).await?;

            let mut desired = module.clone();
            desired.versions = info.versions;
            desired.current = info.current;

            result.push(ModulePatches {
                name: module.name.clone(),
                patches: patch::diff(&module.dump()?, &desired.dump()?),
            });
        }
        Ok(result)
    }

    /// Per-module patches replacing `dependencies` as a single value.
    pub async fn diff_dependencies(&self, repository: &Repository) -> Result<Vec<ModulePatches>> {
        let mut result = Vec::new();
        for module in &repository.modules {
            let Some(plugin) = self.plugin_for(repository, module) else {
                continue;
            };
            let dependencies = plugin.dependencies(repository, module).await?;

            let current = module.dump()?;
            let desired = serde_json::to_value(&dependencies)?;
            let patches = match current.get("dependencies") {
                Some(existing) if *existing == desired => Vec::new(),
                Some(_) => vec![PatchOp::Replace {
                    path: "/dependencies".to_string(),
                    value: desired,
                }],
                None => vec![PatchOp::Add {
                    path: "/dependencies".to_string(),
                    value: desired,
                }],
            };
            result.push(ModulePatches {
                name: module.name.clone(),
                patches,
            });
        }
        Ok(result)
    }

    fn plugin_for(&self, repository: &Repository, module: &Module) -> Option<Arc<dyn CheckPlugin>> {
        let plugin = self.checks.find(repository.kind, module.kind);
        if plugin.is_none() {
            tracing::warn!(
                repository = %repository.name,
                module = %module.name,
                repository_type = %repository.kind,
                module_type = %module.kind,
                "No check plugin, skipping module"
            );
        }
        plugin
    }

    /// Structure, then versions, then dependencies; each step sees the
    /// result of the previous one. Git repositories are synchronised first.
    pub async fn refresh(&self, repository: &mut Repository) -> Result<RefreshReport> {
        if repository.kind == RepositoryKind::Git {
            let checkout = self.workspace.checkout(&repository.name);
            let branch = self.config.base_branch(repository.branch.as_deref());
            self.vcs.sync(&repository.remote, branch, &checkout).await?;
        }

        let mut report = RefreshReport::default();
        let before: HashMap<String, Option<String>> = repository
            .modules
            .iter()
            .map(|m| (m.name.clone(), m.current.clone()))
            .collect();

        let structure = self.diff_modules(repository).await?;
        for change in &structure {
            match change {
                StructuralPatch::Create { name, .. } => report.created.push(name.clone()),
                StructuralPatch::Delete { name } => report.deleted.push(name.clone()),
            }
        }
        apply_patches(repository, &structure);

        let versions = self.diff_versions(repository).await?;
        apply_module_patches(repository, &versions)?;
        let dependencies = self.diff_dependencies(repository).await?;
        apply_module_patches(repository, &dependencies)?;

        for changed in versions.iter().chain(&dependencies).filter(|p| !p.is_empty()) {
            if !report.patched.contains(&changed.name) {
                report.patched.push(changed.name.clone());
            }
        }

        for module in &repository.modules {
            let from = before.get(&module.name).cloned().flatten();
            if let Some(to) = &module.current
                && from.as_ref() != Some(to)
            {
                report.transitions.push(Transition {
                    module: module.name.clone(),
                    from,
                    to: to.clone(),
                });
            }
        }

        tracing::info!(
            repository = %repository.name,
            created = report.created.len(),
            deleted = report.deleted.len(),
            patched = report.patched.len(),
            transitions = report.transitions.len(),
            "Refreshed repository"
        );
        Ok(report)
    }
}

/// Replay structural patches. Creating an existing module or deleting an
/// absent one is a no-op.
pub fn apply_patches(repository: &mut Repository, patches: &[StructuralPatch]) {
    for change in patches {
        match change {
            StructuralPatch::Create {
                name,
                module_type,
                module_path,
            } => {
                if repository.module(name).is_some() {
                    continue;
                }
                let module = Module::new(repository.name.clone(), name.clone(), *module_type)
                    .with_path(module_path.clone());
                tracing::debug!(repository = %repository.name, module = %name, "Creating module");
                repository.add_module(module);
            }
            StructuralPatch::Delete { name } => {
                if repository.remove_module(name).is_some() {
                    tracing::debug!(repository = %repository.name, module = %name, "Deleting module");
                }
            }
        }
    }
}

/// Replay module patches through `dump()` and reload.
///
/// A patch naming a module the repository does not have means the diff and
/// the repository diverged; that is fatal.
pub fn apply_module_patches(repository: &mut Repository, updates: &[ModulePatches]) -> Result<()> {
    for update in updates {
        let repository_name = repository.name.clone();
        let module = repository
            .module_mut(&update.name)
            .ok_or_else(|| Error::UnknownModule {
                repository: repository_name,
                module: update.name.clone(),
            })?;
        if update.is_empty() {
            continue;
        }
        let mut snapshot = module.dump()?;
        patch::apply(&mut snapshot, &update.patches)?;
        *module = Module::load(snapshot)?;
    }
    Ok(())
}
