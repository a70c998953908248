//! Typed access to a [`Datastore`] backend

use std::sync::Arc;

use crate::datastore::{Datastore, validate_kind};
use crate::entity::Entity;
use crate::filter::Filter;
use crate::memory::MemoryDatastore;
use crate::Result;

/// Cheaply cloneable handle over a shared backend.
#[derive(Clone)]
pub struct Store {
    backend: Arc<dyn Datastore>,
}

impl Store {
    pub fn new(backend: Arc<dyn Datastore>) -> Self {
        Self { backend }
    }

    /// A store backed by a fresh in-memory datastore.
    pub fn memory() -> Self {
        Self::new(Arc::new(MemoryDatastore::new()))
    }

    pub fn backend(&self) -> &Arc<dyn Datastore> {
        &self.backend
    }

    pub async fn list<E: Entity>(&self, filters: &[Filter]) -> Result<Vec<E>> {
        validate_kind(E::KIND)?;
        self.backend
            .list(E::KIND, filters)
            .await?
            .into_iter()
            .map(E::load)
            .collect()
    }

    /// Fetch an entity. Fails with `NotFound` when absent.
    pub async fn get<E: Entity>(&self, id: &str) -> Result<E> {
        validate_kind(E::KIND)?;
        let record = self.backend.get(E::KIND, id).await?;
        E::load(record)
    }

    /// Fetch an entity, mapping `NotFound` to `None`.
    pub async fn find<E: Entity>(&self, id: &str) -> Result<Option<E>> {
        match self.get(id).await {
            Ok(entity) => Ok(Some(entity)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Settle and persist an entity, returning its identity.
    pub async fn store<E: Entity>(&self, entity: &mut E) -> Result<String> {
        self.store_with(entity, true).await
    }

    /// Persist an entity, optionally skipping the settle step.
    ///
    /// A settled entity is never serialized half-loaded. When the entity has
    /// no identity one is generated and written back before serializing.
    pub async fn store_with<E: Entity>(&self, entity: &mut E, settle: bool) -> Result<String> {
        validate_kind(E::KIND)?;
        if settle {
            entity.settle(self).await?;
        }

        let id = match entity.id() {
            Some(id) => id,
            None => {
                let id = self.backend.generate_id();
                entity.assign_id(id.clone());
                id
            }
        };

        let record = entity.dump()?;
        self.backend.put(E::KIND, &id, record).await?;
        tracing::trace!(kind = E::KIND, id = %id, "Stored entity");
        Ok(id)
    }

    /// Delete an entity. Entities without identity were never stored.
    pub async fn delete<E: Entity>(&self, entity: &E) -> Result<()> {
        match entity.id() {
            Some(id) => self.delete_by_id::<E>(&id).await,
            None => Ok(()),
        }
    }

    pub async fn delete_by_id<E: Entity>(&self, id: &str) -> Result<()> {
        validate_kind(E::KIND)?;
        self.backend.delete(E::KIND, id).await
    }
}
