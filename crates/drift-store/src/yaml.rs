//! Filesystem backend: one directory per kind, one YAML document per record
//!
//! Writes go to a temporary file in the same directory and are renamed into
//! place while holding an exclusive advisory lock, so readers never observe a
//! partially written record. Reads take a shared lock.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs2::FileExt;
use serde_json::Value;

use crate::datastore::{Datastore, validate_kind};
use crate::filter::{Filter, matches_all};
use crate::{Error, Result};

const EXTENSION: &str = "yaml";

/// Datastore persisting records as YAML files under a root directory.
#[derive(Debug, Clone)]
pub struct YamlDatastore {
    root: PathBuf,
}

impl YamlDatastore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collection_dir(&self, kind: &str) -> Result<PathBuf> {
        validate_kind(kind)?;
        Ok(self.root.join(kind))
    }

    fn record_path(&self, kind: &str, id: &str) -> Result<PathBuf> {
        Ok(self
            .collection_dir(kind)?
            .join(format!("{}.{}", encode_id(id), EXTENSION)))
    }
}

#[async_trait]
impl Datastore for YamlDatastore {
    async fn list(&self, kind: &str, filters: &[Filter]) -> Result<Vec<Value>> {
        let dir = self.collection_dir(kind)?;
        let filters = filters.to_vec();
        tokio::task::spawn_blocking(move || -> Result<Vec<Value>> {
            if !dir.is_dir() {
                return Ok(Vec::new());
            }

            let mut paths: Vec<PathBuf> = fs::read_dir(&dir)
                .map_err(|e| Error::io(&dir, e))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| path.extension().is_some_and(|ext| ext == EXTENSION))
                .collect();
            paths.sort();

            let mut records = Vec::with_capacity(paths.len());
            for path in paths {
                let record = read_record(&path)?;
                if matches_all(&record, &filters) {
                    records.push(record);
                }
            }
            Ok(records)
        })
        .await?
    }

    async fn get(&self, kind: &str, id: &str) -> Result<Value> {
        let path = self.record_path(kind, id)?;
        let (kind, id) = (kind.to_string(), id.to_string());
        tokio::task::spawn_blocking(move || -> Result<Value> {
            if !path.exists() {
                return Err(Error::not_found(kind, id));
            }
            read_record(&path)
        })
        .await?
    }

    async fn put(&self, kind: &str, id: &str, record: Value) -> Result<()> {
        let path = self.record_path(kind, id)?;
        let content = serde_yaml::to_string(&record)?;
        tokio::task::spawn_blocking(move || write_atomic(&path, content.as_bytes())).await?
    }

    async fn delete(&self, kind: &str, id: &str) -> Result<()> {
        let path = self.record_path(kind, id)?;
        tokio::task::spawn_blocking(move || -> Result<()> {
            match fs::remove_file(&path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(Error::io(&path, e)),
            }
        })
        .await?
    }
}

fn read_record(path: &Path) -> Result<Value> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    file.lock_shared().map_err(|_| Error::LockFailed {
        path: path.to_path_buf(),
    })?;

    // Read through the locked handle
    let mut content = String::new();
    (&file)
        .read_to_string(&mut content)
        .map_err(|e| Error::io(path, e))?;
    Ok(serde_yaml::from_str(&content)?)
}

fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    // Unique per write: concurrent puts of one record must not share a temp file
    let temp_name = format!(
        ".{}.{}.tmp",
        path.file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        uuid::Uuid::new_v4().simple()
    );
    let temp_path = path.with_file_name(temp_name);

    let mut temp_file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp_path)
        .map_err(|e| Error::io(&temp_path, e))?;

    let written = fill(&mut temp_file, &temp_path, content)
        .and_then(|()| fs::rename(&temp_path, path).map_err(|e| Error::io(path, e)));
    if written.is_err() {
        let _ = fs::remove_file(&temp_path);
    }

    // Lock released when temp_file is dropped
    written
}

fn fill(file: &mut File, temp_path: &Path, content: &[u8]) -> Result<()> {
    file.lock_exclusive().map_err(|_| Error::LockFailed {
        path: temp_path.to_path_buf(),
    })?;
    file.write_all(content).map_err(|e| Error::io(temp_path, e))?;
    file.sync_all().map_err(|e| Error::io(temp_path, e))
}

/// Map an identity to a file stem. Module ids contain `/`, pull request ids
/// contain `#`; anything outside `[A-Za-z0-9._-]` is percent-encoded.
/// Encode a non-empty id as a single file name. Distinct ids never share a name and
/// the result is never `.` or `..`.
pub fn encode_id(id: &str) -> String {
    let mut encoded = String::with_capacity(id.len());
    for byte in id.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' => encoded.push(byte as char),
            b'.' if !encoded.is_empty() => encoded.push('.'),
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}
