//! Entity contract consumed by the datastore

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{Error, Result, Store};

/// A persistable domain object.
///
/// `dump()` is the single plain-data snapshot used both for persistence and
/// for structural diffing, so entities never keep state that matters outside
/// of it (lazily resolved relations are rebuilt by `settle()`).
#[async_trait]
pub trait Entity: Serialize + DeserializeOwned + Send + Sync {
    /// Collection name.
    const KIND: &'static str;

    /// Stable identity, or `None` to request a generated one.
    fn id(&self) -> Option<String>;

    /// Record the identity assigned by the datastore.
    fn assign_id(&mut self, id: String);

    fn dump(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Rebuild an entity from a stored record.
    fn load(record: Value) -> Result<Self> {
        serde_json::from_value(record).map_err(|e| Error::decode(Self::KIND, e.to_string()))
    }

    /// Resolve lazily loaded relations. Must be a no-op when already settled.
    async fn settle(&mut self, _store: &Store) -> Result<()> {
        Ok(())
    }
}
