use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::emitter::{
    ChangeEvent, FieldChangeEvent, ModelEmitter, RecordEvent, TypeChangeEvent, TypeFieldChangeEvent,
};
use crate::error::SaveError;
use crate::field::FieldDefault;
use crate::model::ModelType;
use crate::store::{Document, StoreError};
use crate::validate::{Done, ValidationError};

static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

/// A single record of a model type.
///
/// Reads fall through the instance's override map to the type's defaults
/// (and up the inheritance chain). Writes run the field's transform, detect
/// effective-value changes, and notify instance observers then type
/// observers. The instance carries a process-unique client id that stands in
/// for the primary key until a store assigns one.
pub struct ModelInstance {
    model: ModelType,
    values: HashMap<String, Value>,
    errors: HashMap<String, Vec<String>>,
    client_id: String,
    initialized: bool,
    events: ModelEmitter,
}

impl ModelInstance {
    pub(crate) fn new(model: ModelType, data: Document) -> Self {
        let mut instance = ModelInstance {
            model,
            values: HashMap::new(),
            errors: HashMap::new(),
            client_id: format!("cid{}", NEXT_CLIENT_ID.fetch_add(1, Ordering::SeqCst)),
            initialized: false,
            events: ModelEmitter::new(),
        };

        // Apply caller data over defaults field by field; fields the data
        // does not cover get their factory defaults materialized now.
        for name in instance.model.all_field_names() {
            match data.get(&name) {
                Some(value) => instance.set_value(&name, Some(value.clone())),
                None => instance.materialize(&name),
            }
        }

        let model = instance.model.clone();
        if let Some(init) = model.init_fn() {
            init(&mut instance);
        }
        instance.initialized = true;

        let payload = RecordEvent {
            id: instance.id(),
            record: instance.to_json(),
        };
        model.emit_chain("new", &payload);

        instance
    }

    pub fn model(&self) -> &ModelType {
        &self.model
    }

    /// The process-unique identifier assigned at construction. Never
    /// persisted, never reused.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// The field's effective value: instance override, else type default
    /// (factories pre-materialized), else a virtual property, else absent.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.values.get(name) {
            return Some(value.clone());
        }
        match self.model.field_spec(name) {
            Some(field) => match field.default() {
                FieldDefault::Unset => None,
                FieldDefault::Literal(value) => Some(value.clone()),
                FieldDefault::Factory(factory) => Some(factory()),
            },
            None => self.model.virtual_spec(name).map(|getter| getter(self)),
        }
    }

    /// Write a field. `None` clears the instance override, reverting reads
    /// to the type default (a factory default is re-invoked immediately).
    /// Other values pass through the field's `set` transform before storage.
    /// Writes to undeclared names are ignored.
    ///
    /// A write whose effective value differs from the previous one emits
    /// `change` and `change:<field>` on the instance and mirrors both on the
    /// type, unless the instance is still under construction.
    pub fn set_value(&mut self, name: &str, value: Option<Value>) {
        let model = self.model.clone();
        let field = match model.field_spec(name) {
            Some(field) => field,
            None => return,
        };

        let old = self.get(name);
        match value {
            None => {
                self.values.remove(name);
                if let FieldDefault::Factory(factory) = field.default() {
                    self.values.insert(name.to_string(), factory());
                }
            }
            Some(value) => {
                let stored = field.apply_transform(value);
                self.values.insert(name.to_string(), stored);
            }
        }
        let new = self.get(name);

        if self.initialized && old != new {
            self.emit_change(name, old, new);
        }
    }

    /// Sugar for [`set_value`](Self::set_value) with a present value.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        self.set_value(name, Some(value.into()));
    }

    /// Sugar for [`set_value`](Self::set_value) with the absence sentinel.
    pub fn unset(&mut self, name: &str) {
        self.set_value(name, None);
    }

    fn materialize(&mut self, name: &str) {
        let model = self.model.clone();
        if let Some(field) = model.field_spec(name) {
            if let FieldDefault::Factory(factory) = field.default() {
                self.values.insert(name.to_string(), factory());
            }
        }
    }

    fn emit_change(&self, field: &str, old: Option<Value>, new: Option<Value>) {
        let old = old.unwrap_or(Value::Null);
        let new = new.unwrap_or(Value::Null);

        self.events.emit_event(
            "change",
            &ChangeEvent {
                field: field.to_string(),
                old: old.clone(),
                new: new.clone(),
            },
        );
        self.events.emit_event(
            &format!("change:{}", field),
            &FieldChangeEvent {
                old: old.clone(),
                new: new.clone(),
            },
        );

        let id = self.id();
        self.model.emit_chain(
            "change",
            &TypeChangeEvent {
                id: id.clone(),
                field: field.to_string(),
                old: old.clone(),
                new: new.clone(),
            },
        );
        self.model
            .emit_chain(&format!("change:{}", field), &TypeFieldChangeEvent { id, old, new });
    }

    /// The apparent identifier: the primary-key field's effective value, or
    /// the client id while that is absent (or no primary key is configured).
    pub fn id(&self) -> Value {
        match self.model.primary_key().and_then(|pk| self.get(pk)) {
            Some(value) => value,
            None => Value::String(self.client_id.clone()),
        }
    }

    /// Write through to the primary-key field. A no-op on types without one.
    pub fn set_id(&mut self, value: impl Into<Value>) {
        if let Some(pk) = self.model.primary_key().map(str::to_string) {
            self.set(&pk, value.into());
        }
    }

    /// True while the primary-key field's effective value is absent, i.e.
    /// the instance is identified by its client id only.
    pub fn is_new(&self) -> bool {
        match self.model.primary_key() {
            Some(pk) => self.get(pk).is_none(),
            None => true,
        }
    }

    /// Serialize every declared non-hidden field to its effective value.
    /// Absent values appear as `null`; the primary-key entry is present even
    /// while it resolves to the temporary client id.
    pub fn to_json(&self) -> Document {
        let mut doc = Document::new();
        for (name, field) in self.model.field_entries() {
            if field.is_hidden() {
                continue;
            }
            doc.insert(name.to_string(), self.get(name).unwrap_or(Value::Null));
        }
        if let Some(pk) = self.model.primary_key() {
            doc.insert(pk.to_string(), self.id());
        }
        doc
    }

    /// Validate, then persist through the type's store. A new instance's
    /// outgoing document is stripped of its primary-key entry so the store
    /// assigns one; the assigned value is written back into the instance.
    /// Emits `save` on the instance and its type on success.
    pub fn save(&mut self) -> Result<(), SaveError> {
        self.validate().map_err(SaveError::Validation)?;

        let model = self.model.clone();
        let key = model.storage_key();
        let mut doc = self.to_json();
        if self.is_new() {
            doc.remove(key);
        }

        let saved = model.store().save(key, doc).map_err(SaveError::Store)?;
        if let Some(assigned) = saved.get(key) {
            if self.get(key).as_ref() != Some(assigned) {
                self.set_value(key, Some(assigned.clone()));
            }
        }

        let payload = RecordEvent {
            id: self.id(),
            record: self.to_json(),
        };
        self.events.emit_event("save", &payload);
        model.emit_chain("save", &payload);
        Ok(())
    }

    /// Remove the record from the type's store. Emits `delete` on the
    /// instance and its type on success.
    pub fn delete(&mut self) -> Result<(), StoreError> {
        let model = self.model.clone();
        model.store().delete(&self.id())?;

        let payload = RecordEvent {
            id: self.id(),
            record: self.to_json(),
        };
        self.events.emit_event("delete", &payload);
        model.emit_chain("delete", &payload);
        Ok(())
    }

    /// Run every validator in sequence, rebuilding the error map.
    ///
    /// `if`/`unless` guards are evaluated first and skip the check outright.
    /// Each check receives the field's effective value and a one-shot
    /// [`Done`] token; the pipeline blocks on the token before moving to the
    /// next validator, so a check completing on another thread still yields
    /// a deterministic error map. A check that drops its token unconsumed
    /// aborts the run with [`ValidationError::Abandoned`].
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        self.errors.clear();

        let model = self.model.clone();
        let mut failed = false;

        for validator in model.validator_sequence() {
            let value = self.get(validator.field());
            if validator.skipped_by_guards(self, value.as_ref()) {
                continue;
            }

            let (done, outcome) = Done::channel();
            validator.invoke(self, value.as_ref(), done);
            match outcome.recv() {
                Ok(Some(message)) => {
                    self.add_error(validator.field(), message);
                    failed = true;
                }
                Ok(None) => {}
                Err(_) => {
                    return Err(ValidationError::Abandoned {
                        field: validator.field().to_string(),
                    })
                }
            }
        }

        if failed {
            Err(ValidationError::Invalid)
        } else {
            Ok(())
        }
    }

    /// Validation failures by field, in the order they were recorded.
    pub fn errors(&self) -> &HashMap<String, Vec<String>> {
        &self.errors
    }

    /// Append a message to a field's error list, creating it if absent.
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.entry(field.into()).or_default().push(message.into());
    }

    /// Register an instance-level event listener.
    pub fn on<F>(&self, event: &str, listener: F)
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        self.events.on(event, listener);
    }

    pub fn events(&self) -> &ModelEmitter {
        &self.events
    }
}

impl Serialize for ModelInstance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl fmt::Debug for ModelInstance {
    /// Bounded preview: the apparent id and up to five fields.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} id={}", self.model.name(), self.id())?;

        let pk = self.model.primary_key();
        let fields: Vec<&str> = self
            .model
            .field_entries()
            .into_iter()
            .filter(|(name, field)| !field.is_hidden() && Some(*name) != pk)
            .map(|(name, _)| name)
            .collect();

        for name in fields.iter().take(5) {
            write!(f, " {}={}", name, self.get(name).unwrap_or(Value::Null))?;
        }
        if fields.len() > 5 {
            f.write_str(" ..")?;
        }
        f.write_str(">")
    }
}
