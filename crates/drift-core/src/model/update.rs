//! Pending version bumps

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use drift_store::{Entity, Store};
use serde::{Deserialize, Serialize};

use super::{Module, Repository};

/// A version change of `src_module` to propagate into `dest_module`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Update {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub src_repository: String,
    pub src_module: String,
    pub dest_repository: String,
    pub dest_module: String,
    #[serde(default)]
    pub from_version: Option<String>,
    pub to_version: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    src: Option<Repository>,
    #[serde(skip)]
    dest: Option<Repository>,
}

impl Update {
    pub fn new(
        src: (&str, &str),
        dest: (&str, &str),
        from_version: Option<String>,
        to_version: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            src_repository: src.0.to_string(),
            src_module: src.1.to_string(),
            dest_repository: dest.0.to_string(),
            dest_module: dest.1.to_string(),
            from_version,
            to_version: to_version.into(),
            created_at: Utc::now(),
            src: None,
            dest: None,
        }
    }

    /// Source repository, available once settled.
    pub fn src(&self) -> Option<&Repository> {
        self.src.as_ref()
    }

    /// Destination repository, available once settled.
    pub fn dest(&self) -> Option<&Repository> {
        self.dest.as_ref()
    }

    pub fn src_module_ref(&self) -> Option<&Module> {
        self.src.as_ref()?.module(&self.src_module)
    }

    pub fn dest_module_ref(&self) -> Option<&Module> {
        self.dest.as_ref()?.module(&self.dest_module)
    }

    /// Attach already-loaded repositories instead of settling from a store.
    pub fn with_repositories(mut self, src: Repository, dest: Repository) -> Self {
        self.src = Some(src);
        self.dest = Some(dest);
        self
    }

    /// Template context describing this update.
    pub fn context(&self) -> serde_json::Value {
        serde_json::json!({
            "src_repository": self.src_repository,
            "src_module": self.src_module,
            "dest_repository": self.dest_repository,
            "dest_module": self.dest_module,
            "from_version": self.from_version.as_deref().unwrap_or("unknown"),
            "to_version": self.to_version,
        })
    }
}

#[async_trait]
impl Entity for Update {
    const KIND: &'static str = "Update";

    fn id(&self) -> Option<String> {
        self.id.clone()
    }

    fn assign_id(&mut self, id: String) {
        self.id = Some(id);
    }

    async fn settle(&mut self, store: &Store) -> drift_store::Result<()> {
        if self.src.is_none() {
            let mut src: Repository = store.get(&self.src_repository).await?;
            src.settle(store).await?;
            self.src = Some(src);
        }
        if self.dest.is_none() {
            let mut dest: Repository = store.get(&self.dest_repository).await?;
            dest.settle(store).await?;
            self.dest = Some(dest);
        }
        Ok(())
    }
}
