//! Backend contract
//!
//! Backends deal in plain records: a kind (one logical collection per entity
//! type), an identity and a JSON-equivalent document. Typed access lives in
//! [`crate::Store`].

use async_trait::async_trait;
use serde_json::Value;

use crate::filter::Filter;
use crate::{Error, Result};

/// Persistence contract implemented by every backend.
///
/// Implementations must make `get` and `put` atomic per record; nothing else
/// is assumed about concurrent access.
#[async_trait]
pub trait Datastore: Send + Sync {
    /// List every record of `kind` matching all `filters`.
    async fn list(&self, kind: &str, filters: &[Filter]) -> Result<Vec<Value>>;

    /// Fetch one record. Fails with [`Error::NotFound`] when absent.
    async fn get(&self, kind: &str, id: &str) -> Result<Value>;

    /// Insert or replace a record.
    async fn put(&self, kind: &str, id: &str, record: Value) -> Result<()>;

    /// Remove a record. Removing an absent record is not an error.
    async fn delete(&self, kind: &str, id: &str) -> Result<()>;

    /// Produce a fresh identity for an entity that declares none.
    fn generate_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Reject kinds that cannot name a collection.
pub fn validate_kind(kind: &str) -> Result<()> {
    let valid = !kind.is_empty()
        && kind
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidKind {
            kind: kind.to_string(),
        })
    }
}
