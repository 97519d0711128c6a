//! Persistence collaborators.
//!
//! A model type delegates `find`/`all`/`query`/`save`/`delete`/`fetch` to a
//! [`Store`]. Stores traffic in documents (JSON maps), not live instances;
//! the type wraps returned documents back into instances. Two stores ship
//! with the crate: [`MemoryStore`] for development and testing, and
//! [`NullStore`], the default for types defined without one. Anything else
//! (a REST backend, a Riak bucket) is an external collaborator implementing
//! the same trait.

mod memory;
mod null;

use std::fmt;

use serde_json::Value;

/// The wire and storage shape of a record.
pub type Document = serde_json::Map<String, Value>;

/// Contract every persistence collaborator satisfies.
pub trait Store: Send + Sync {
    /// Find a single document by its key value.
    fn find(&self, id: &Value) -> Result<Document, StoreError>;

    /// Every document in the store.
    fn all(&self) -> Result<Vec<Document>, StoreError>;

    /// Every document passing `filter`. `args` is handed through to the
    /// filter as its second argument.
    fn query(
        &self,
        args: &Value,
        filter: &dyn Fn(&Document, &Value) -> bool,
    ) -> Result<Vec<Document>, StoreError>;

    /// Persist a document. `key` names the primary-key entry; when the
    /// document lacks one the store assigns it. Returns the saved document.
    fn save(&self, key: &str, doc: Document) -> Result<Document, StoreError>;

    /// Remove a document by its key value. Returns the removed document.
    fn delete(&self, id: &Value) -> Result<Document, StoreError>;

    /// Bulk-load the store's backing data. Optional; a no-op by default.
    fn fetch(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Canonical storage key for a key value: strings as-is, everything else as
/// its JSON text.
pub(crate) fn document_key(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    NotFound { id: String },
    Storage(String),
    LockPoisoned(&'static str),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound { id } => write!(f, "document not found: {}", id),
            StoreError::Storage(message) => write!(f, "storage error: {}", message),
            StoreError::LockPoisoned(operation) => {
                write!(f, "store lock poisoned during {}", operation)
            }
        }
    }
}

impl std::error::Error for StoreError {}

pub use memory::MemoryStore;
pub use null::NullStore;
