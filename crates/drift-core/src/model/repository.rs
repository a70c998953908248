//! Repositories and their owned modules

use async_trait::async_trait;
use drift_store::{Entity, Filter, Store};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Module, RepositoryKind};
use crate::Result;

/// A tracked source of artifacts.
///
/// Modules are stored in their own collection and loaded by `settle()`.
/// A repository built in memory starts settled; one loaded from the store
/// does not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: RepositoryKind,
    pub remote: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify: Option<String>,
    /// Base branch pull requests target (git only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip)]
    pub modules: Vec<Module>,
    /// Names of modules removed since the last save
    #[serde(skip)]
    removed: Vec<String>,
    #[serde(skip)]
    settled: bool,
}

impl Repository {
    pub fn new(name: impl Into<String>, kind: RepositoryKind, remote: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            remote: remote.into(),
            parent: None,
            notify: None,
            branch: None,
            modules: Vec::new(),
            removed: Vec::new(),
            settled: true,
        }
    }

    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.name == name)
    }

    pub fn module_mut(&mut self, name: &str) -> Option<&mut Module> {
        self.modules.iter_mut().find(|m| m.name == name)
    }

    pub fn add_module(&mut self, module: Module) {
        self.removed.retain(|n| n != &module.name);
        self.modules.push(module);
    }

    /// Remove a module by name, remembering it so `save()` deletes the record.
    pub fn remove_module(&mut self, name: &str) -> Option<Module> {
        let index = self.modules.iter().position(|m| m.name == name)?;
        self.removed.push(name.to_string());
        Some(self.modules.remove(index))
    }

    pub fn is_settled(&self) -> bool {
        self.settled
    }

    /// Persist the repository, every owned module and the removal of modules
    /// dropped since the last save.
    pub async fn save(&mut self, store: &Store) -> Result<()> {
        store.store(self).await?;
        for module in &mut self.modules {
            store.store(module).await?;
        }
        for name in self.removed.drain(..) {
            store
                .delete_by_id::<Module>(&Module::identity(&self.name, &name))
                .await?;
        }
        tracing::debug!(repository = %self.name, modules = self.modules.len(), "Saved repository");
        Ok(())
    }

    /// Delete the repository together with its modules.
    pub async fn delete(mut self, store: &Store) -> Result<()> {
        self.settle(store).await?;
        for module in &self.modules {
            store.delete(module).await?;
        }
        store.delete(&self).await?;
        tracing::info!(repository = %self.name, "Deleted repository");
        Ok(())
    }

    /// Plain dump including modules, for display.
    pub fn describe(&self) -> Result<Value> {
        let mut value = self.dump()?;
        value["modules"] = serde_json::to_value(&self.modules)?;
        Ok(value)
    }
}

#[async_trait]
impl Entity for Repository {
    const KIND: &'static str = "Repository";

    fn id(&self) -> Option<String> {
        Some(self.name.clone())
    }

    fn assign_id(&mut self, _id: String) {}

    /// Tagged factory: the stored `type` selects the repository kind.
    fn load(record: Value) -> drift_store::Result<Self> {
        let kind = record
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default();
        kind.parse::<RepositoryKind>()
            .map_err(|e| drift_store::Error::decode(Self::KIND, e.to_string()))?;
        serde_json::from_value(record)
            .map_err(|e| drift_store::Error::decode(Self::KIND, e.to_string()))
    }

    async fn settle(&mut self, store: &Store) -> drift_store::Result<()> {
        if self.settled {
            return Ok(());
        }
        let mut modules: Vec<Module> = store
            .list(&[Filter::eq("repository", self.name.as_str())])
            .await?;
        modules.sort_by(|a, b| a.name.cmp(&b.name));
        self.modules = modules;
        self.settled = true;
        Ok(())
    }
}
