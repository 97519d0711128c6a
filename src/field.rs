use std::fmt;
use std::sync::Arc;

use serde_json::Value;

/// Zero-argument closure producing a field's default value on demand.
pub type FactoryFn = Arc<dyn Fn() -> Value + Send + Sync>;

/// Pure transform applied to every incoming value before storage.
pub type TransformFn = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// The default a field falls back to when an instance holds no override.
#[derive(Clone)]
pub enum FieldDefault {
    /// No default: reads resolve to the absence sentinel (`None`).
    Unset,
    /// A literal value, returned by reference to the type on every read.
    Literal(Value),
    /// A factory, invoked and memoized into the instance.
    Factory(FactoryFn),
}

/// Declaration of a single named data slot on a model type.
///
/// A field carries a default, an optional `set` transform applied to every
/// write, and a hidden flag. Hidden fields behave like regular fields for
/// reads, writes, and validation, but are excluded from `to_json` output;
/// confirmation slots declared by `confirmation_of` validators are hidden.
#[derive(Clone)]
pub struct Field {
    default: FieldDefault,
    transform: Option<TransformFn>,
    hidden: bool,
}

impl Field {
    /// A field with no default.
    pub fn unset() -> Self {
        Field {
            default: FieldDefault::Unset,
            transform: None,
            hidden: false,
        }
    }

    /// A field defaulting to a literal value.
    pub fn literal(value: impl Into<Value>) -> Self {
        Field {
            default: FieldDefault::Literal(value.into()),
            transform: None,
            hidden: false,
        }
    }

    /// A field whose default is produced by a factory. The factory runs once
    /// per instance (at construction, and again after an unset-write).
    pub fn factory<F>(factory: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        Field {
            default: FieldDefault::Factory(Arc::new(factory)),
            transform: None,
            hidden: false,
        }
    }

    /// Attach a `set` transform, applied to every incoming value before it
    /// is stored as an override.
    pub fn set<F>(mut self, transform: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(transform));
        self
    }

    /// Exclude this field from `to_json` output and the declared-field
    /// listing. It still participates in get/set and validation.
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn default(&self) -> &FieldDefault {
        &self.default
    }

    pub(crate) fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub(crate) fn has_unset_default(&self) -> bool {
        matches!(self.default, FieldDefault::Unset)
    }

    pub(crate) fn apply_transform(&self, value: Value) -> Value {
        match &self.transform {
            Some(transform) => transform(value),
            None => value,
        }
    }
}

impl From<Value> for Field {
    fn from(value: Value) -> Self {
        Field::literal(value)
    }
}

impl From<&str> for Field {
    fn from(value: &str) -> Self {
        Field::literal(value)
    }
}

impl From<String> for Field {
    fn from(value: String) -> Self {
        Field::literal(value)
    }
}

impl From<i64> for Field {
    fn from(value: i64) -> Self {
        Field::literal(value)
    }
}

impl From<f64> for Field {
    fn from(value: f64) -> Self {
        Field::literal(value)
    }
}

impl From<bool> for Field {
    fn from(value: bool) -> Self {
        Field::literal(value)
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let default = match &self.default {
            FieldDefault::Unset => "unset".to_string(),
            FieldDefault::Literal(value) => value.to_string(),
            FieldDefault::Factory(_) => "<factory>".to_string(),
        };
        f.debug_struct("Field")
            .field("default", &default)
            .field("transform", &self.transform.is_some())
            .field("hidden", &self.hidden)
            .finish()
    }
}
