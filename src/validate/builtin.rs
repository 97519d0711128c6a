//! Built-in validator factories.
//!
//! Each factory returns a [`Validator`] ready to be registered on a model
//! spec. Misconfiguration (impossible length bounds, a format check with no
//! pattern) panics at definition time, before any instance exists.

use std::sync::Arc;

use serde_json::Value;

use super::Validator;

/// Measures the length of a coerced value, overriding `chars().count()`.
pub type TokenizerFn = Arc<dyn Fn(&str) -> usize + Send + Sync>;

/// Pattern predicate for [`format_of`].
pub type MatcherFn = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Fails when the value is absent, null, or the empty string.
pub fn required(field: impl Into<String>) -> Validator {
    let name = field.into();
    let message = format!("\"{}\" can't be blank", name);
    Validator::new(name, move |_instance, value, done| match value {
        None | Some(Value::Null) => done.fail(message.clone()),
        Some(Value::String(text)) if text.is_empty() => done.fail(message.clone()),
        Some(_) => done.pass(),
    })
}

/// Options for [`length_of`].
#[derive(Clone, Default)]
pub struct Length {
    pub min: usize,
    pub max: Option<usize>,
    pub allow_unset: bool,
    pub allow_null: bool,
    pub message: Option<String>,
    pub too_short: Option<String>,
    pub too_long: Option<String>,
    pub tokenizer: Option<TokenizerFn>,
}

/// Coerces the value to text and checks its length against `[min, max]`.
///
/// Panics at definition time when `min` is zero and no `max` is given: such
/// a validator could never fail.
pub fn length_of(field: impl Into<String>, options: Length) -> Validator {
    let name = field.into();
    let Length {
        min,
        max,
        allow_unset,
        allow_null,
        message,
        too_short,
        too_long,
        tokenizer,
    } = options;
    if min == 0 && max.is_none() {
        panic!("length_of for \"{}\" requires a min or max bound", name);
    }

    let message = message.unwrap_or_else(|| format!("\"{}\" is the wrong length", name));
    let too_short = too_short.unwrap_or_else(|| message.clone());
    let too_long = too_long.unwrap_or_else(|| message.clone());

    Validator::new(name, move |_instance, value, done| {
        let text = match value {
            None if allow_unset => return done.pass(),
            Some(Value::Null) if allow_null => return done.pass(),
            None | Some(Value::Null) => String::new(),
            Some(other) => text_of(other),
        };

        let length = match &tokenizer {
            Some(tokenizer) => tokenizer(&text),
            None => text.chars().count(),
        };

        if length < min {
            done.fail(too_short.clone());
        } else if max.map_or(false, |max| length > max) {
            done.fail(too_long.clone());
        } else {
            done.pass();
        }
    })
}

/// Options for [`format_of`]: a match-required pattern (`with`), a
/// match-forbidden pattern (`without`), or both.
#[derive(Clone, Default)]
pub struct Format {
    pub with: Option<MatcherFn>,
    pub without: Option<MatcherFn>,
    pub allow_unset: bool,
    pub allow_null: bool,
    pub message: Option<String>,
}

impl Format {
    /// Require the value to match `pattern`.
    pub fn matching<F>(pattern: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Format {
            with: Some(Arc::new(pattern)),
            ..Format::default()
        }
    }

    /// Forbid the value from matching `pattern`.
    pub fn rejecting<F>(pattern: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Format {
            without: Some(Arc::new(pattern)),
            ..Format::default()
        }
    }

    /// Additionally forbid `pattern`.
    pub fn and_rejecting<F>(mut self, pattern: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.without = Some(Arc::new(pattern));
        self
    }

    pub fn allow_unset(mut self) -> Self {
        self.allow_unset = true;
        self
    }

    pub fn allow_null(mut self) -> Self {
        self.allow_null = true;
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Coerces the value to text and checks it against the configured patterns.
/// Both patterns are evaluated independently; either violation fails.
///
/// Panics at definition time when neither pattern is given.
pub fn format_of(field: impl Into<String>, options: Format) -> Validator {
    let name = field.into();
    if options.with.is_none() && options.without.is_none() {
        panic!(
            "format_of for \"{}\" requires a `with` or `without` pattern",
            name
        );
    }

    let Format {
        with,
        without,
        allow_unset,
        allow_null,
        message,
    } = options;
    let message = message.unwrap_or_else(|| format!("\"{}\" is invalid", name));

    Validator::new(name, move |_instance, value, done| {
        let text = match value {
            None if allow_unset => return done.pass(),
            Some(Value::Null) if allow_null => return done.pass(),
            None | Some(Value::Null) => String::new(),
            Some(other) => text_of(other),
        };

        let mut failed = with.as_ref().map_or(false, |pattern| !pattern(&text));
        if without.as_ref().map_or(false, |pattern| pattern(&text)) {
            failed = true;
        }

        if failed {
            done.fail(message.clone());
        } else {
            done.pass();
        }
    })
}

/// Fails unless the value is a member of `values`.
pub fn inclusion_of(field: impl Into<String>, values: Vec<Value>) -> Validator {
    let name = field.into();
    let message = format!("\"{}\" is not included in the list", name);
    Validator::new(name, move |_instance, value, done| {
        match value {
            Some(value) if values.contains(value) => done.pass(),
            _ => done.fail(message.clone()),
        }
    })
}

/// Fails when the value is a member of `values`.
pub fn exclusion_of(field: impl Into<String>, values: Vec<Value>) -> Validator {
    let name = field.into();
    let message = format!("\"{}\" is reserved", name);
    Validator::new(name, move |_instance, value, done| {
        match value {
            Some(value) if values.contains(value) => done.fail(message.clone()),
            _ => done.pass(),
        }
    })
}

/// Fails unless the field equals its `<field>Confirmation` slot. Registering
/// this validator declares the confirmation slot as a hidden field.
pub fn confirmation_of(field: impl Into<String>) -> Validator {
    let name = field.into();
    let slot = format!("{}Confirmation", name);
    let message = format!("\"{}\" doesn't match confirmation", name);
    let confirmation = slot.clone();

    Validator::new(name, move |instance, value, done| {
        if value.cloned() == instance.get(&confirmation) {
            done.pass();
        } else {
            done.fail(message.clone());
        }
    })
    .with_confirms(slot)
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
