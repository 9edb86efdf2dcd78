//! Keyed record store with optimistic concurrency and JSON file backing.
//!
//! Every record carries a version token. Unconditional writes (`put`)
//! bump it; conditional writes (`compare_and_swap`) commit only if the
//! stored token still matches the one the caller read, so two actors
//! racing on the same record cannot both win.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File};
use std::hash::Hash;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("record {id} not found")]
    Missing { id: String },

    #[error("version conflict on record {id}")]
    VersionConflict { id: String },
}

/// A record together with its optimistic concurrency token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Versioned<V> {
    pub version: u64,
    #[serde(flatten)]
    pub record: V,
}

/// Concurrent map from id to versioned record, optionally persisted as a
/// single JSON object keyed by id.
pub struct JsonStore<K, V> {
    path: Option<PathBuf>,
    map: DashMap<K, Versioned<V>>,
    write_lock: Mutex<()>,
}

impl<K, V> JsonStore<K, V>
where
    K: Eq + Hash + Clone + Serialize + DeserializeOwned,
    V: Clone + Serialize + DeserializeOwned,
{
    /// Open a file-backed store, creating the parent directory if needed.
    /// A missing file is an empty store; an unreadable or corrupt file is
    /// logged and treated as empty rather than failing the actor.
    pub fn open(path: PathBuf) -> Result<Self, StoreError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let map = if path.exists() {
            match load_records(&path) {
                Ok(records) => records.into_iter().collect(),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "store file unreadable, starting empty");
                    DashMap::new()
                }
            }
        } else {
            DashMap::new()
        };

        Ok(Self {
            path: Some(path),
            map,
            write_lock: Mutex::new(()),
        })
    }

    /// A store with no file backing.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            map: DashMap::new(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn get<Q>(&self, key: &Q) -> Option<Versioned<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.get(key).map(|entry| entry.value().clone())
    }

    /// Snapshot of every record, without version tokens.
    pub fn snapshot(&self) -> HashMap<K, V> {
        self.map
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().record.clone()))
            .collect()
    }

    /// Unconditional upsert. The stored version is bumped so concurrent
    /// conditional writers observe the overwrite.
    pub fn put(&self, key: K, record: V) -> Result<Versioned<V>, StoreError> {
        use dashmap::mapref::entry::Entry;

        let committed = match self.map.entry(key) {
            Entry::Occupied(mut occupied) => {
                let slot = occupied.get_mut();
                slot.version += 1;
                slot.record = record;
                slot.clone()
            }
            Entry::Vacant(vacant) => vacant.insert(Versioned { version: 1, record }).clone(),
        };

        self.persist()?;
        Ok(committed)
    }

    /// Commit `record` only if the stored version still equals
    /// `expected_version`. The check and the write happen under the entry
    /// guard, so racing claimants serialize here.
    pub fn compare_and_swap<Q>(
        &self,
        key: &Q,
        expected_version: u64,
        record: V,
    ) -> Result<Versioned<V>, StoreError>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + fmt::Display + ?Sized,
    {
        let committed = {
            let mut entry = self.map.get_mut(key).ok_or_else(|| StoreError::Missing {
                id: key.to_string(),
            })?;

            if entry.version != expected_version {
                return Err(StoreError::VersionConflict {
                    id: key.to_string(),
                });
            }

            entry.version += 1;
            entry.record = record;
            entry.clone()
        };

        self.persist()?;
        Ok(committed)
    }

    /// Drop every record. The only deletion path.
    pub fn clear_all(&self) -> Result<(), StoreError> {
        self.map.clear();
        self.persist()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn persist(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        // Snapshot under the lock so a slow writer cannot flush a stale
        // view over a newer one.
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let records: HashMap<K, Versioned<V>> = self
            .map
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, &records)?;
        Ok(())
    }
}

fn load_records<K, V>(path: &Path) -> Result<HashMap<K, Versioned<V>>, StoreError>
where
    K: Eq + Hash + DeserializeOwned,
    V: DeserializeOwned,
{
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    Ok(serde_json::from_reader(reader)?)
}
