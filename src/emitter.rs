//! Event surface for model types and instances.
//!
//! Every model type and every instance owns a [`ModelEmitter`]. Payloads are
//! JSON strings; the typed structs below describe each event's shape and can
//! be recovered in a listener with [`parse_event`].
//!
//! ## Example
//!
//! ```ignore
//! user.on("change", |data| {
//!     if let Some(change) = fieldstone::parse_event::<ChangeEvent>(&data) {
//!         println!("{} changed to {}", change.field, change.new);
//!     }
//! });
//! ```

use std::sync::Mutex;

use event_emitter_rs::EventEmitter;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::Document;

/// Thread-safe wrapper around the event emitter so registration and emission
/// work from shared references.
pub struct ModelEmitter {
    inner: Mutex<EventEmitter>,
}

impl ModelEmitter {
    pub fn new() -> Self {
        ModelEmitter {
            inner: Mutex::new(EventEmitter::new()),
        }
    }

    /// Register a listener for an event. The listener receives the event's
    /// JSON payload as a `String`.
    pub fn on<F>(&self, event: &str, listener: F)
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        self.lock().on(event, listener);
    }

    /// Emit an event with a raw payload. Listeners run off the emitting call
    /// path, after the current operation has completed.
    pub fn emit(&self, event: &str, payload: String) {
        self.lock().emit(event, payload);
    }

    /// Emit an event with a typed payload, serialized to JSON.
    pub fn emit_event<T: Serialize>(&self, event: &str, payload: &T) {
        let data = serde_json::to_string(payload).expect("failed to serialize event payload");
        self.emit(event, data);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, EventEmitter> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for ModelEmitter {
    fn default() -> Self {
        ModelEmitter::new()
    }
}

/// Decode an event payload produced by [`ModelEmitter::emit_event`].
pub fn parse_event<T: DeserializeOwned>(data: &str) -> Option<T> {
    serde_json::from_str(data).ok()
}

/// Instance-level `change` payload. An unset old or new value appears as
/// `null`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub field: String,
    pub old: Value,
    pub new: Value,
}

/// Instance-level `change:<field>` payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldChangeEvent {
    pub old: Value,
    pub new: Value,
}

/// Type-level `change` payload: the instance's apparent id leads.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TypeChangeEvent {
    pub id: Value,
    pub field: String,
    pub old: Value,
    pub new: Value,
}

/// Type-level `change:<field>` payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TypeFieldChangeEvent {
    pub id: Value,
    pub old: Value,
    pub new: Value,
}

/// Payload of the lifecycle events (`new`, `save`, `delete`): the instance's
/// apparent id and its serialized record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordEvent {
    pub id: Value,
    pub record: Document,
}
