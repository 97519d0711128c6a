mod emitter;
mod error;
mod field;
mod model;
mod store;
mod validate;

pub use emitter::{
    parse_event, ChangeEvent, FieldChangeEvent, ModelEmitter, RecordEvent, TypeChangeEvent,
    TypeFieldChangeEvent,
};
pub use error::SaveError;
pub use field::{Field, FieldDefault};
pub use model::{InitFn, ModelInstance, ModelSpec, ModelType, VirtualFn};
pub use store::{Document, MemoryStore, NullStore, Store, StoreError};
pub use validate::{
    confirmation_of, exclusion_of, format_of, inclusion_of, length_of, required, Done, Format,
    Length, MatcherFn, TokenizerFn, ValidationError, Validator,
};

// Re-export the EventEmitter from the event_emitter_rs crate
pub use event_emitter_rs::EventEmitter;

// Re-export the value type models traffic in
pub use serde_json::Value;
