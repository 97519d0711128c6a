//! MemoryStore - HashMap-backed store for development and testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde_json::Value;

use super::{document_key, Document, Store, StoreError};

/// In-memory store backed by a HashMap, keyed by the stringified key value.
///
/// Documents saved without a key value receive a fresh numeric one from a
/// monotonic counter. Clone-friendly via Arc: clones share storage and the
/// key counter.
#[derive(Clone)]
pub struct MemoryStore {
    records: Arc<RwLock<HashMap<String, Document>>>,
    next_key: Arc<AtomicU64>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        MemoryStore {
            records: Arc::new(RwLock::new(HashMap::new())),
            next_key: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Replace the backing data with `docs`, keyed by each document's `key`
    /// entry. Documents lacking one are assigned a fresh key first.
    pub fn load(&self, key: &str, docs: Vec<Document>) -> Result<(), StoreError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| StoreError::LockPoisoned("load"))?;

        records.clear();
        for mut doc in docs {
            let id = match present_key(&doc, key) {
                Some(value) => document_key(value),
                None => {
                    let assigned = self.assign_key(&mut doc, key);
                    document_key(&assigned)
                }
            };
            records.insert(id, doc);
        }
        Ok(())
    }

    fn assign_key(&self, doc: &mut Document, key: &str) -> Value {
        let assigned = Value::from(self.next_key.fetch_add(1, Ordering::SeqCst));
        doc.insert(key.to_string(), assigned.clone());
        assigned
    }
}

/// A key entry counts as present when it is neither missing, null, nor the
/// empty string.
fn present_key<'a>(doc: &'a Document, key: &str) -> Option<&'a Value> {
    match doc.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) if text.is_empty() => None,
        Some(value) => Some(value),
    }
}

impl Store for MemoryStore {
    fn find(&self, id: &Value) -> Result<Document, StoreError> {
        let records = self
            .records
            .read()
            .map_err(|_| StoreError::LockPoisoned("find"))?;

        let key = document_key(id);
        records
            .get(&key)
            .cloned()
            .ok_or(StoreError::NotFound { id: key })
    }

    fn all(&self) -> Result<Vec<Document>, StoreError> {
        let records = self
            .records
            .read()
            .map_err(|_| StoreError::LockPoisoned("all"))?;

        Ok(records.values().cloned().collect())
    }

    fn query(
        &self,
        args: &Value,
        filter: &dyn Fn(&Document, &Value) -> bool,
    ) -> Result<Vec<Document>, StoreError> {
        let records = self
            .records
            .read()
            .map_err(|_| StoreError::LockPoisoned("query"))?;

        Ok(records
            .values()
            .filter(|doc| filter(doc, args))
            .cloned()
            .collect())
    }

    fn save(&self, key: &str, mut doc: Document) -> Result<Document, StoreError> {
        if present_key(&doc, key).is_none() {
            self.assign_key(&mut doc, key);
        }
        let id = document_key(&doc[key]);

        let mut records = self
            .records
            .write()
            .map_err(|_| StoreError::LockPoisoned("save"))?;

        records.insert(id, doc.clone());
        Ok(doc)
    }

    fn delete(&self, id: &Value) -> Result<Document, StoreError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| StoreError::LockPoisoned("delete"))?;

        let key = document_key(id);
        records.remove(&key).ok_or(StoreError::NotFound { id: key })
    }
}
