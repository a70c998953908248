//! Tests for typed store access across both backends

use std::sync::Arc;

use async_trait::async_trait;
use drift_store::{
    Datastore, Entity, Error, Filter, MemoryDatastore, Op, Result, Store, YamlDatastore,
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Note {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    topic: String,
    weight: u32,
    #[serde(skip)]
    settled: bool,
}

impl Note {
    fn new(topic: &str, weight: u32) -> Self {
        Self {
            id: None,
            topic: topic.to_string(),
            weight,
            settled: false,
        }
    }
}

#[async_trait]
impl Entity for Note {
    const KIND: &'static str = "Note";

    fn id(&self) -> Option<String> {
        self.id.clone()
    }

    fn assign_id(&mut self, id: String) {
        self.id = Some(id);
    }

    async fn settle(&mut self, _store: &Store) -> Result<()> {
        self.settled = true;
        Ok(())
    }
}

enum Backend {
    Memory,
    Yaml,
}

fn make_store(backend: Backend) -> (Store, Option<TempDir>) {
    match backend {
        Backend::Memory => (Store::new(Arc::new(MemoryDatastore::new())), None),
        Backend::Yaml => {
            let dir = TempDir::new().unwrap();
            let store = Store::new(Arc::new(YamlDatastore::new(dir.path())));
            (store, Some(dir))
        }
    }
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::yaml(Backend::Yaml)]
#[tokio::test]
async fn store_generates_identity_and_round_trips(#[case] backend: Backend) {
    let (store, _dir) = make_store(backend);

    let mut note = Note::new("drift", 3);
    let id = store.store(&mut note).await.unwrap();

    assert_eq!(note.id.as_deref(), Some(id.as_str()));
    assert!(note.settled, "store() must settle before serializing");

    let loaded: Note = store.get(&id).await.unwrap();
    assert_eq!(loaded.topic, "drift");
    assert_eq!(loaded.weight, 3);
    assert_eq!(loaded.id, Some(id));
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::yaml(Backend::Yaml)]
#[tokio::test]
async fn get_missing_is_not_found(#[case] backend: Backend) {
    let (store, _dir) = make_store(backend);

    let err = store.get::<Note>("nope").await.unwrap_err();
    assert!(err.is_not_found());
    assert!(store.find::<Note>("nope").await.unwrap().is_none());
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::yaml(Backend::Yaml)]
#[tokio::test]
async fn list_applies_filter_conjunction(#[case] backend: Backend) {
    let (store, _dir) = make_store(backend);

    for (topic, weight) in [("a", 1), ("a", 5), ("b", 5)] {
        store.store(&mut Note::new(topic, weight)).await.unwrap();
    }

    let heavy_a: Vec<Note> = store
        .list(&[Filter::eq("topic", "a"), Filter::new("weight", Op::Gte, 2)])
        .await
        .unwrap();
    assert_eq!(heavy_a.len(), 1);
    assert_eq!(heavy_a[0].weight, 5);

    let all: Vec<Note> = store.list(&[]).await.unwrap();
    assert_eq!(all.len(), 3);
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::yaml(Backend::Yaml)]
#[tokio::test]
async fn delete_removes_record_and_is_idempotent(#[case] backend: Backend) {
    let (store, _dir) = make_store(backend);

    let mut note = Note::new("gone", 1);
    let id = store.store(&mut note).await.unwrap();

    store.delete(&note).await.unwrap();
    assert!(store.find::<Note>(&id).await.unwrap().is_none());
    store.delete(&note).await.unwrap();
}

#[tokio::test]
async fn store_without_settle_skips_relation_loading() {
    let store = Store::memory();
    let mut note = Note::new("raw", 0);

    store.store_with(&mut note, false).await.unwrap();
    assert!(!note.settled);
}

#[tokio::test]
async fn store_keeps_declared_identity() {
    let store = Store::memory();
    let mut note = Note::new("fixed", 0);
    note.id = Some("fixed-id".to_string());

    let id = store.store(&mut note).await.unwrap();
    assert_eq!(id, "fixed-id");

    // Storing again replaces rather than duplicates
    note.weight = 9;
    store.store(&mut note).await.unwrap();
    let all: Vec<Note> = store.list(&[]).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].weight, 9);
}

#[tokio::test]
async fn yaml_records_survive_a_new_backend_instance() {
    let dir = TempDir::new().unwrap();
    let first = YamlDatastore::new(dir.path());
    first
        .put("Note", "charts/api", serde_json::json!({"topic": "x", "weight": 1}))
        .await
        .unwrap();

    let second = YamlDatastore::new(dir.path());
    let record = second.get("Note", "charts/api").await.unwrap();
    assert_eq!(record["topic"], "x");
}

#[tokio::test]
async fn undecodable_record_is_a_decode_error() {
    let store = Store::memory();
    store
        .backend()
        .put("Note", "bad", serde_json::json!({"topic": 5}))
        .await
        .unwrap();

    let err = store.get::<Note>("bad").await.unwrap_err();
    assert!(matches!(err, Error::Decode { .. }));
}
