//! Per-field validation.
//!
//! A [`Validator`] names a field, carries a check function, and optionally
//! `if`/`unless` guards. Checks are asynchronous in the callback sense: they
//! receive a one-shot [`Done`] token and must eventually consume it, either
//! on the calling thread or from another one. The pipeline
//! ([`ModelInstance::validate`](crate::ModelInstance::validate)) runs
//! validators strictly in sequence, blocking on each token before moving on.
//!
//! ## Example
//!
//! ```ignore
//! use fieldstone::{required, Validator};
//!
//! let spec = ModelSpec::new("User")
//!     .validator(required("username"))
//!     .validator(
//!         Validator::new("age", |_instance, value, done| {
//!             match value.and_then(|v| v.as_i64()) {
//!                 Some(n) if n >= 21 => done.pass(),
//!                 _ => done.fail("\"age\" is under the limit"),
//!             }
//!         })
//!         .unless(|instance, _value| instance.get("exempt").is_some()),
//!     );
//! ```

mod builtin;

use std::fmt;
use std::sync::mpsc;
use std::sync::Arc;

use serde_json::Value;

use crate::model::ModelInstance;

pub use builtin::{
    confirmation_of, exclusion_of, format_of, inclusion_of, length_of, required, Format, Length,
    MatcherFn, TokenizerFn,
};

/// Guard predicate, given the instance and the field's effective value.
pub type GuardFn = Arc<dyn Fn(&ModelInstance, Option<&Value>) -> bool + Send + Sync>;

/// Check function. Must eventually consume its [`Done`] token exactly once.
pub type CheckFn = Arc<dyn Fn(&ModelInstance, Option<&Value>, Done) + Send + Sync>;

/// One-shot completion token for a check function.
///
/// Consuming the token by move makes double completion unrepresentable. The
/// token may be sent to another thread and consumed there; the pipeline
/// blocks until it is. Dropping it without consuming it surfaces as
/// [`ValidationError::Abandoned`].
pub struct Done {
    tx: mpsc::Sender<Option<String>>,
}

impl Done {
    pub(crate) fn channel() -> (Done, mpsc::Receiver<Option<String>>) {
        let (tx, rx) = mpsc::channel();
        (Done { tx }, rx)
    }

    /// The value is acceptable.
    pub fn pass(self) {
        let _ = self.tx.send(None);
    }

    /// The value failed; `message` is appended to the field's error list.
    pub fn fail(self, message: impl Into<String>) {
        let _ = self.tx.send(Some(message.into()));
    }
}

/// A declarative per-field check.
#[derive(Clone)]
pub struct Validator {
    field: String,
    check: CheckFn,
    if_guard: Option<GuardFn>,
    unless_guard: Option<GuardFn>,
    confirms: Option<String>,
}

impl Validator {
    pub fn new<F>(field: impl Into<String>, check: F) -> Self
    where
        F: Fn(&ModelInstance, Option<&Value>, Done) + Send + Sync + 'static,
    {
        Validator {
            field: field.into(),
            check: Arc::new(check),
            if_guard: None,
            unless_guard: None,
            confirms: None,
        }
    }

    /// Run this validator only when the guard returns true.
    pub fn when<F>(mut self, guard: F) -> Self
    where
        F: Fn(&ModelInstance, Option<&Value>) -> bool + Send + Sync + 'static,
    {
        self.if_guard = Some(Arc::new(guard));
        self
    }

    /// Skip this validator when the guard returns true.
    pub fn unless<F>(mut self, guard: F) -> Self
    where
        F: Fn(&ModelInstance, Option<&Value>) -> bool + Send + Sync + 'static,
    {
        self.unless_guard = Some(Arc::new(guard));
        self
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// The hidden confirmation slot this validator compares against, if any.
    pub(crate) fn confirms(&self) -> Option<&str> {
        self.confirms.as_deref()
    }

    pub(crate) fn with_confirms(mut self, slot: String) -> Self {
        self.confirms = Some(slot);
        self
    }

    pub(crate) fn skipped_by_guards(
        &self,
        instance: &ModelInstance,
        value: Option<&Value>,
    ) -> bool {
        if let Some(guard) = &self.if_guard {
            if !guard(instance, value) {
                return true;
            }
        }
        if let Some(guard) = &self.unless_guard {
            if guard(instance, value) {
                return true;
            }
        }
        false
    }

    pub(crate) fn invoke(&self, instance: &ModelInstance, value: Option<&Value>, done: Done) {
        (self.check)(instance, value, done);
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("field", &self.field)
            .field("if_guard", &self.if_guard.is_some())
            .field("unless_guard", &self.unless_guard.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// One or more validators failed; detail lives in the instance's error
    /// map.
    Invalid,
    /// A check function dropped its completion token without consuming it.
    Abandoned { field: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Invalid => write!(f, "validation failed"),
            ValidationError::Abandoned { field } => {
                write!(f, "validator for {} never completed", field)
            }
        }
    }
}

impl std::error::Error for ValidationError {}
