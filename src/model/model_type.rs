use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::emitter::ModelEmitter;
use crate::error::SaveError;
use crate::field::Field;
use crate::model::spec::{InitFn, ModelSpec, VirtualFn};
use crate::model::ModelInstance;
use crate::store::{Document, NullStore, Store, StoreError};
use crate::validate::Validator;

/// The record behind a model type: field specifications, virtual properties,
/// validators, an optional primary key, a store, and a type-level event
/// surface. Immutable after definition apart from the emitter.
struct TypeRecord {
    name: String,
    parent: Option<ModelType>,
    primary_key: Option<String>,
    store: Arc<dyn Store>,
    fields: Vec<(String, Field)>,
    virtuals: Vec<(String, VirtualFn)>,
    validators: Vec<Validator>,
    init: Option<InitFn>,
    events: ModelEmitter,
}

/// A named model type. Cheap to clone; clones share the underlying type
/// record.
///
/// Types form a single-inheritance chain through an explicit parent pointer.
/// Field and virtual lookups walk the chain leaf-first (subtypes shadow),
/// while listings run root-first (ancestor declarations come first).
/// Type-level events propagate up the chain, so handlers registered on a
/// parent type also observe subtype instances.
#[derive(Clone)]
pub struct ModelType {
    record: Arc<TypeRecord>,
}

impl ModelType {
    /// Define a root model type.
    ///
    /// Panics when the configured primary-key field declares a default:
    /// a primary key is assigned by the caller or the store, never
    /// defaulted.
    pub fn define(spec: ModelSpec) -> Self {
        Self::build(None, spec)
    }

    /// Define a subtype. The child layers its field specifications over the
    /// parent's, inherits its primary-key name unless overridden, and gets
    /// its own store (share one explicitly via
    /// [`ModelSpec::shared_store`]).
    pub fn extend(&self, spec: ModelSpec) -> Self {
        Self::build(Some(self.clone()), spec)
    }

    fn build(parent: Option<ModelType>, spec: ModelSpec) -> Self {
        let ModelSpec {
            name,
            primary_key,
            store,
            mut fields,
            virtuals,
            validation,
            init,
        } = spec;

        let primary_key =
            primary_key.or_else(|| parent.as_ref().and_then(|p| p.primary_key().map(str::to_string)));

        if let Some(pk) = &primary_key {
            match fields.iter().find(|(field, _)| field == pk) {
                Some((_, field)) if !field.has_unset_default() => {
                    panic!("primary key \"{}\" must not declare a default value", pk)
                }
                Some(_) => {}
                None => {
                    let inherited = parent
                        .as_ref()
                        .map_or(false, |p| p.field_spec(pk).is_some());
                    if !inherited {
                        fields.push((pk.clone(), Field::unset()));
                    }
                }
            }
        }

        // Confirmation validators declare their hidden comparison slot.
        for validator in &validation {
            if let Some(slot) = validator.confirms() {
                let declared = fields.iter().any(|(field, _)| field == slot)
                    || parent
                        .as_ref()
                        .map_or(false, |p| p.field_spec(slot).is_some());
                if !declared {
                    fields.push((slot.to_string(), Field::unset().hidden()));
                }
            }
        }

        ModelType {
            record: Arc::new(TypeRecord {
                name,
                parent,
                primary_key,
                store: store.unwrap_or_else(|| Arc::new(NullStore)),
                fields,
                virtuals,
                validators: validation,
                init,
                events: ModelEmitter::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }

    pub fn parent(&self) -> Option<&ModelType> {
        self.record.parent.as_ref()
    }

    pub fn primary_key(&self) -> Option<&str> {
        self.record.primary_key.as_deref()
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.record.store
    }

    /// The key entry name used when talking to the store.
    pub(crate) fn storage_key(&self) -> &str {
        self.record.primary_key.as_deref().unwrap_or("id")
    }

    /// Declared non-hidden field names, ancestors first.
    pub fn field_names(&self) -> Vec<String> {
        self.field_entries()
            .into_iter()
            .filter(|(_, field)| !field.is_hidden())
            .map(|(name, _)| name.to_string())
            .collect()
    }

    /// Every declared field name, hidden slots included.
    pub(crate) fn all_field_names(&self) -> Vec<String> {
        self.field_entries()
            .into_iter()
            .map(|(name, _)| name.to_string())
            .collect()
    }

    /// Declared fields in chain order: ancestors first, shadowed entries
    /// resolved to the leaf-most specification at their original position.
    pub(crate) fn field_entries(&self) -> Vec<(&str, &Field)> {
        let mut entries: Vec<(&str, &Field)> = Vec::new();
        for kind in self.chain() {
            for (name, field) in &kind.record.fields {
                match entries.iter_mut().find(|(entry, _)| *entry == name.as_str()) {
                    Some(entry) => entry.1 = field,
                    None => entries.push((name, field)),
                }
            }
        }
        entries
    }

    /// Leaf-first field lookup: a subtype's declaration shadows its
    /// ancestor's without mutating it.
    pub(crate) fn field_spec(&self, name: &str) -> Option<&Field> {
        let mut current = Some(self);
        while let Some(kind) = current {
            if let Some((_, field)) = kind.record.fields.iter().find(|(field, _)| field == name) {
                return Some(field);
            }
            current = kind.record.parent.as_ref();
        }
        None
    }

    pub(crate) fn virtual_spec(&self, name: &str) -> Option<&VirtualFn> {
        let mut current = Some(self);
        while let Some(kind) = current {
            if let Some((_, getter)) = kind.record.virtuals.iter().find(|(entry, _)| entry == name)
            {
                return Some(getter);
            }
            current = kind.record.parent.as_ref();
        }
        None
    }

    /// Leaf-most initialize hook in the chain.
    pub(crate) fn init_fn(&self) -> Option<&InitFn> {
        let mut current = Some(self);
        while let Some(kind) = current {
            if let Some(init) = &kind.record.init {
                return Some(init);
            }
            current = kind.record.parent.as_ref();
        }
        None
    }

    /// The inheritance chain, root first.
    fn chain(&self) -> Vec<&ModelType> {
        let mut chain = Vec::new();
        let mut current = Some(self);
        while let Some(kind) = current {
            chain.push(kind);
            current = kind.record.parent.as_ref();
        }
        chain.reverse();
        chain
    }

    /// All validators flattened into execution order: field declaration
    /// order, ties broken by registration order within a field (ancestors
    /// before subtypes), validators on undeclared fields last.
    pub(crate) fn validator_sequence(&self) -> Vec<&Validator> {
        let chain = self.chain();
        let names = self.all_field_names();
        let mut sequence = Vec::new();

        for name in &names {
            for kind in &chain {
                for validator in &kind.record.validators {
                    if validator.field() == name.as_str() {
                        sequence.push(validator);
                    }
                }
            }
        }
        for kind in &chain {
            for validator in &kind.record.validators {
                if !names.iter().any(|name| name == validator.field()) {
                    sequence.push(validator);
                }
            }
        }
        sequence
    }

    /// Construct an instance of this type from caller data. Declared fields
    /// present in `data` are written through the setter path with change
    /// events suppressed; factory defaults of the rest are materialized.
    /// Emits a type-level `new` event once the instance is complete.
    pub fn create(&self, data: Document) -> ModelInstance {
        ModelInstance::new(self.clone(), data)
    }

    /// Find a record by primary-key value and wrap it in an instance.
    pub fn find(&self, id: impl Into<Value>) -> Result<ModelInstance, StoreError> {
        let doc = self.record.store.find(&id.into())?;
        Ok(self.create(doc))
    }

    /// Every record in the store, as instances.
    pub fn all(&self) -> Result<Vec<ModelInstance>, StoreError> {
        let docs = self.record.store.all()?;
        Ok(docs.into_iter().map(|doc| self.create(doc)).collect())
    }

    /// Every record passing `filter`, as instances. `args` is handed through
    /// to the filter as its second argument.
    pub fn query<F>(&self, args: Value, filter: F) -> Result<Vec<ModelInstance>, StoreError>
    where
        F: Fn(&Document, &Value) -> bool,
    {
        let docs = self.record.store.query(&args, &filter)?;
        Ok(docs.into_iter().map(|doc| self.create(doc)).collect())
    }

    /// Validate and persist an instance. Equivalent to
    /// [`ModelInstance::save`].
    pub fn save(&self, instance: &mut ModelInstance) -> Result<(), SaveError> {
        instance.save()
    }

    /// Find a record by primary-key value and delete it, so both the
    /// instance- and type-level `delete` events fire. Returns the deleted
    /// instance.
    pub fn delete(&self, id: impl Into<Value>) -> Result<ModelInstance, StoreError> {
        let mut instance = self.find(id)?;
        instance.delete()?;
        Ok(instance)
    }

    /// Bulk-load the store's backing data, emitting a type-level `fetch`
    /// event on success.
    pub fn fetch(&self) -> Result<(), StoreError> {
        self.record.store.fetch()?;
        self.record.events.emit("fetch", String::from("{}"));
        Ok(())
    }

    /// Register a type-level event listener.
    pub fn on<F>(&self, event: &str, listener: F)
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        self.record.events.on(event, listener);
    }

    pub fn events(&self) -> &ModelEmitter {
        &self.record.events
    }

    /// Emit a type-level event here and on every ancestor.
    pub(crate) fn emit_chain<T: Serialize>(&self, event: &str, payload: &T) {
        let mut current = Some(self);
        while let Some(kind) = current {
            kind.record.events.emit_event(event, payload);
            current = kind.record.parent.as_ref();
        }
    }
}

impl fmt::Debug for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelType")
            .field("name", &self.record.name)
            .field("parent", &self.record.parent.as_ref().map(|p| p.name()))
            .field("primary_key", &self.record.primary_key)
            .field("fields", &self.all_field_names())
            .finish()
    }
}
