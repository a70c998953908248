//! In-process backend

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::datastore::Datastore;
use crate::filter::{Filter, matches_all};
use crate::{Error, Result};

type Collection = BTreeMap<String, Value>;

/// Datastore keeping every record in memory.
///
/// Records are returned in identity order. The lock is only held for the
/// duration of a map operation, never across an await.
#[derive(Debug, Default)]
pub struct MemoryDatastore {
    collections: Mutex<HashMap<String, Collection>>,
}

impl MemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_collections<T>(&self, f: impl FnOnce(&mut HashMap<String, Collection>) -> T) -> T {
        let mut guard = self
            .collections
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }
}

#[async_trait]
impl Datastore for MemoryDatastore {
    async fn list(&self, kind: &str, filters: &[Filter]) -> Result<Vec<Value>> {
        Ok(self.with_collections(|collections| {
            collections
                .get(kind)
                .map(|records| {
                    records
                        .values()
                        .filter(|record| matches_all(record, filters))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default()
        }))
    }

    async fn get(&self, kind: &str, id: &str) -> Result<Value> {
        self.with_collections(|collections| {
            collections
                .get(kind)
                .and_then(|records| records.get(id))
                .cloned()
                .ok_or_else(|| Error::not_found(kind, id))
        })
    }

    async fn put(&self, kind: &str, id: &str, record: Value) -> Result<()> {
        self.with_collections(|collections| {
            collections
                .entry(kind.to_string())
                .or_default()
                .insert(id.to_string(), record);
        });
        Ok(())
    }

    async fn delete(&self, kind: &str, id: &str) -> Result<()> {
        self.with_collections(|collections| {
            if let Some(records) = collections.get_mut(kind) {
                records.remove(id);
            }
        });
        Ok(())
    }
}
