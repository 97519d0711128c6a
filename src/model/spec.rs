use std::sync::Arc;

use serde_json::Value;

use crate::field::Field;
use crate::model::ModelInstance;
use crate::store::Store;
use crate::validate::Validator;

/// Read-only computed property, derived from the instance's fields.
pub type VirtualFn = Arc<dyn Fn(&ModelInstance) -> Value + Send + Sync>;

/// Hook run on every new instance after its data is applied, before change
/// events are armed.
pub type InitFn = Arc<dyn Fn(&mut ModelInstance) + Send + Sync>;

/// Specification a model type is built from: fields, virtual properties,
/// validators, an optional primary key, an optional store, and an optional
/// initialize hook.
///
/// ## Example
///
/// ```ignore
/// let user = ModelType::define(
///     ModelSpec::new("User")
///         .store(MemoryStore::new())
///         .primary_key("id")
///         .field("username", Field::unset())
///         .field("first", "John")
///         .field("last", "Doe")
///         .virtual_field("name", |instance| {
///             let part = |field| match instance.get(field) {
///                 Some(Value::String(text)) => text,
///                 _ => String::new(),
///             };
///             Value::from(format!("{} {}", part("first"), part("last")).trim())
///         })
///         .validator(required("username")),
/// );
/// ```
pub struct ModelSpec {
    pub(crate) name: String,
    pub(crate) primary_key: Option<String>,
    pub(crate) store: Option<Arc<dyn Store>>,
    pub(crate) fields: Vec<(String, Field)>,
    pub(crate) virtuals: Vec<(String, VirtualFn)>,
    pub(crate) validation: Vec<Validator>,
    pub(crate) init: Option<InitFn>,
}

impl ModelSpec {
    pub fn new(name: impl Into<String>) -> Self {
        ModelSpec {
            name: name.into(),
            primary_key: None,
            store: None,
            fields: Vec::new(),
            virtuals: Vec::new(),
            validation: Vec::new(),
            init: None,
        }
    }

    /// Name the primary-key field. Without one the type identifies instances
    /// by client id only and every instance stays "new".
    pub fn primary_key(mut self, field: impl Into<String>) -> Self {
        self.primary_key = Some(field.into());
        self
    }

    /// Give the type its own store.
    pub fn store<S: Store + 'static>(mut self, store: S) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    /// Share an existing store with this type.
    pub fn shared_store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    /// Declare a field. Anything convertible into a [`Field`] works: a
    /// literal value declares a literal default.
    pub fn field(mut self, name: impl Into<String>, field: impl Into<Field>) -> Self {
        self.fields.push((name.into(), field.into()));
        self
    }

    /// Declare a read-only computed property, excluded from serialization.
    pub fn virtual_field<F>(mut self, name: impl Into<String>, getter: F) -> Self
    where
        F: Fn(&ModelInstance) -> Value + Send + Sync + 'static,
    {
        self.virtuals.push((name.into(), Arc::new(getter)));
        self
    }

    /// Register a validator. Registration order is preserved within a field.
    pub fn validator(mut self, validator: Validator) -> Self {
        self.validation.push(validator);
        self
    }

    /// Attach the initialize hook.
    pub fn initialize<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut ModelInstance) + Send + Sync + 'static,
    {
        self.init = Some(Arc::new(hook));
        self
    }
}
