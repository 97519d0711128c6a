//! NullStore - the do-nothing store backing types defined without one.

use serde_json::Value;

use super::{document_key, Document, Store, StoreError};

/// Store that persists nothing. `save` echoes the document unchanged (no key
/// assignment), `delete` accepts everything, lookups come back empty.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullStore;

impl NullStore {
    pub fn new() -> Self {
        NullStore
    }
}

impl Store for NullStore {
    fn find(&self, id: &Value) -> Result<Document, StoreError> {
        Err(StoreError::NotFound {
            id: document_key(id),
        })
    }

    fn all(&self) -> Result<Vec<Document>, StoreError> {
        Ok(Vec::new())
    }

    fn query(
        &self,
        _args: &Value,
        _filter: &dyn Fn(&Document, &Value) -> bool,
    ) -> Result<Vec<Document>, StoreError> {
        Ok(Vec::new())
    }

    fn save(&self, _key: &str, doc: Document) -> Result<Document, StoreError> {
        Ok(doc)
    }

    fn delete(&self, _id: &Value) -> Result<Document, StoreError> {
        Ok(Document::new())
    }
}
