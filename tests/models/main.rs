use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use fieldstone::{
    Document, Field, MemoryStore, ModelSpec, ModelType, NullStore, Store, StoreError, Value,
};
use serde_json::json;

fn doc(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected an object"),
    }
}

/// A user type mirroring a typical signup model: an incrementing id factory,
/// a couple of literal defaults, a coercing setter, and a computed name.
fn user_type(store: MemoryStore) -> ModelType {
    let counter = Arc::new(AtomicI64::new(0));
    ModelType::define(
        ModelSpec::new("User")
            .store(store)
            .primary_key("id")
            .field("username", Field::unset())
            .field(
                "age",
                Field::literal(1).set(|value| {
                    let parsed = match &value {
                        Value::Number(n) => n.as_i64(),
                        Value::String(text) => text.parse().ok(),
                        _ => None,
                    };
                    Value::from(parsed.unwrap_or(30))
                }),
            )
            .field("first", "John")
            .field("last", "Doe")
            .field(
                "dateCreated",
                Field::factory(move || Value::from(counter.fetch_add(1, Ordering::SeqCst))),
            )
            .virtual_field("name", |instance| {
                let part = |field: &str| match instance.get(field) {
                    Some(Value::String(text)) => text,
                    _ => String::new(),
                };
                Value::from(format!("{} {}", part("first"), part("last")).trim().to_string())
            }),
    )
}

#[test]
fn literal_defaults_resolve_before_any_write() {
    let user = user_type(MemoryStore::new()).create(Document::new());

    assert_eq!(user.get("username"), None);
    assert_eq!(user.get("first"), Some(json!("John")));
    assert_eq!(user.get("last"), Some(json!("Doe")));
    assert_eq!(user.get("age"), Some(json!(1)));
    assert_eq!(user.get("name"), Some(json!("John Doe")));
}

#[test]
fn overrides_shadow_and_unset_reverts() {
    let mut user = user_type(MemoryStore::new()).create(Document::new());

    user.set("first", "Rad");
    assert_eq!(user.get("first"), Some(json!("Rad")));
    assert_eq!(user.get("name"), Some(json!("Rad Doe")));

    user.unset("first");
    assert_eq!(user.get("first"), Some(json!("John")));
    assert_eq!(user.get("name"), Some(json!("John Doe")));
}

#[test]
fn factory_defaults_run_once_per_instance_until_reset() {
    let kind = user_type(MemoryStore::new());

    let one = kind.create(Document::new());
    let two = kind.create(Document::new());
    let first = one.get("dateCreated").unwrap().as_i64().unwrap();
    let second = two.get("dateCreated").unwrap().as_i64().unwrap();
    assert!(second > first);

    // Repeated reads do not re-run the factory.
    assert_eq!(one.get("dateCreated").unwrap().as_i64().unwrap(), first);

    // Unset-write re-invokes it: the next read sees a fresh, greater value.
    let mut one = one;
    one.unset("dateCreated");
    let reset = one.get("dateCreated").unwrap().as_i64().unwrap();
    assert!(reset > second);
}

#[test]
fn factories_materialize_even_when_other_data_is_supplied() {
    let kind = user_type(MemoryStore::new());
    let before = kind.create(Document::new()).get("dateCreated").unwrap();
    let with_data = kind.create(doc(json!({ "first": "Rad" })));

    assert_eq!(with_data.get("first"), Some(json!("Rad")));
    assert!(with_data.get("dateCreated").unwrap().as_i64() > before.as_i64());
}

#[test]
fn setter_transform_coerces_incoming_values() {
    let mut user = user_type(MemoryStore::new()).create(Document::new());

    user.set("age", 10);
    assert_eq!(user.get("age"), Some(json!(10)));

    user.set("age", "42");
    assert_eq!(user.get("age"), Some(json!(42)));

    user.set("age", json!({ "not": "a number" }));
    assert_eq!(user.get("age"), Some(json!(30)));
}

#[test]
fn subtypes_layer_fields_over_ancestors() {
    let base = user_type(MemoryStore::new());
    let hero = base.extend(ModelSpec::new("Hero").field("power", "i can fly"));

    let mut instance = hero.create(Document::new());
    assert_eq!(instance.get("first"), Some(json!("John")));
    assert_eq!(instance.get("name"), Some(json!("John Doe")));
    assert_eq!(instance.get("power"), Some(json!("i can fly")));

    instance.set("power", "i cannot fly");
    assert_eq!(instance.get("power"), Some(json!("i cannot fly")));

    // Subclass the subclass.
    let aquatic = hero.extend(ModelSpec::new("AquaticHero").field("weakness", "i cannot swim"));
    let mut deep = aquatic.create(doc(json!({ "power": "punch hard", "weakness": "pizza" })));

    assert_eq!(deep.get("power"), Some(json!("punch hard")));
    assert_eq!(deep.get("weakness"), Some(json!("pizza")));

    deep.unset("power");
    deep.unset("weakness");
    assert_eq!(deep.get("power"), Some(json!("i can fly")));
    assert_eq!(deep.get("weakness"), Some(json!("i cannot swim")));

    // The ancestor type was never mutated.
    assert_eq!(
        base.create(Document::new()).get("power"),
        None
    );
}

#[test]
fn to_json_spans_the_whole_chain() {
    let base = user_type(MemoryStore::new());
    let hero = base.extend(ModelSpec::new("Hero").field("power", "i can fly"));
    let instance = hero.create(Document::new());

    let json = instance.to_json();
    let mut keys: Vec<&String> = json.keys().collect();
    keys.sort();
    assert_eq!(
        keys,
        vec!["age", "dateCreated", "first", "id", "last", "power", "username"]
    );
    // Virtuals never serialize.
    assert!(!json.contains_key("name"));
}

#[test]
fn class_level_database_methods() {
    let kind = user_type(MemoryStore::new());

    let mut one = kind.create(doc(json!({ "username": "userone" })));
    let mut two = kind.create(doc(json!({ "username": "usertwo" })));
    one.save().unwrap();
    kind.save(&mut two).unwrap();

    let all = kind.all().unwrap();
    assert_eq!(all.len(), 2);

    let found = kind.find(one.id()).unwrap();
    assert_eq!(found.get("username"), Some(json!("userone")));
    assert!(!found.is_new());

    let matching = kind
        .query(json!({}), |doc, _args| {
            doc["username"]
                .as_str()
                .map_or(false, |name| name.starts_with("user"))
        })
        .unwrap();
    assert_eq!(matching.len(), 2);

    let matching = kind
        .query(json!({ "username": "userone" }), |doc, args| {
            doc["username"] == args["username"]
        })
        .unwrap();
    assert_eq!(matching.len(), 1);

    let deleted = kind.delete(one.id()).unwrap();
    assert_eq!(deleted.get("username"), Some(json!("userone")));
    assert_eq!(kind.all().unwrap().len(), 1);
}

#[test]
fn instance_level_database_methods() {
    let kind = user_type(MemoryStore::new());

    let mut user = kind.create(doc(json!({ "username": "userthree" })));
    assert!(user.is_new());
    let client_id = user.id();

    user.save().unwrap();
    assert!(!user.is_new());
    assert_ne!(user.id(), client_id);

    let id = user.id();
    let mut found = kind.find(id.clone()).unwrap();
    assert_eq!(found.get("username"), Some(json!("userthree")));

    found.delete().unwrap();
    match kind.find(id) {
        Err(StoreError::NotFound { .. }) => {}
        other => panic!("expected not found, got {:?}", other.map(|i| format!("{:?}", i))),
    }
}

#[test]
fn store_errors_pass_through_untouched() {
    let kind = user_type(MemoryStore::new());
    let mut user = kind.create(Document::new());
    assert!(matches!(user.delete(), Err(StoreError::NotFound { .. })));
}

#[test]
fn custom_primary_key() {
    let kind = ModelType::define(
        ModelSpec::new("User")
            .store(MemoryStore::new())
            .primary_key("username")
            .field("name", "John"),
    );

    let mut user = kind.create(doc(json!({ "username": "dandean" })));
    assert!(!user.is_new());
    assert_eq!(user.id(), json!("dandean"));

    user.save().unwrap();
    let found = kind.find("dandean").unwrap();
    assert_eq!(found.get("username"), Some(json!("dandean")));

    // Writing through `id` targets the primary-key field.
    let mut found = found;
    found.set_id("radical");
    assert_eq!(found.get("username"), Some(json!("radical")));
}

#[test]
fn types_without_a_primary_key_stay_new() {
    let kind = ModelType::define(
        ModelSpec::new("Note")
            .store(MemoryStore::new())
            .field("body", Field::unset()),
    );

    let mut note = kind.create(doc(json!({ "body": "first" })));
    assert!(note.is_new());

    note.save().unwrap();
    assert!(note.is_new());
    note.save().unwrap();

    // Each save was assigned a fresh store key.
    assert_eq!(kind.all().unwrap().len(), 2);
}

#[test]
fn default_store_is_null_and_independent() {
    let kind = ModelType::define(ModelSpec::new("User").primary_key("id"));

    let mut user = kind.create(Document::new());
    user.save().unwrap();

    // Nothing was persisted and no key was assigned.
    assert!(user.is_new());
    assert!(kind.all().unwrap().is_empty());
}

#[test]
fn shared_stores_are_explicit() {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());

    let people = ModelType::define(
        ModelSpec::new("Person")
            .shared_store(Arc::clone(&store))
            .primary_key("id")
            .field("username", Field::unset()),
    );
    let robots = ModelType::define(
        ModelSpec::new("Robot")
            .shared_store(Arc::clone(&store))
            .primary_key("id")
            .field("username", Field::unset()),
    );

    people
        .create(doc(json!({ "username": "ada" })))
        .save()
        .unwrap();
    assert_eq!(robots.all().unwrap().len(), 1);

    // A subtype does NOT inherit its parent's store.
    let subtype = people.extend(ModelSpec::new("Employee"));
    assert!(subtype.all().unwrap().is_empty());
}

#[test]
fn initialize_hook_runs_after_data_application() {
    let kind = ModelType::define(
        ModelSpec::new("User")
            .store(NullStore::new())
            .primary_key("id")
            .field("username", Field::unset())
            .field("greeting", Field::unset())
            .initialize(|instance| {
                let username = instance
                    .get("username")
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_else(|| "anonymous".to_string());
                instance.set("greeting", format!("hello, {}", username));
            }),
    );

    let user = kind.create(doc(json!({ "username": "rad" })));
    assert_eq!(user.get("greeting"), Some(json!("hello, rad")));

    let anon = kind.create(Document::new());
    assert_eq!(anon.get("greeting"), Some(json!("hello, anonymous")));
}

#[test]
fn loaded_data_is_findable() {
    let store = MemoryStore::new();
    store
        .load(
            "id",
            vec![doc(json!({
                "id": 50,
                "username": "rad",
                "first": "Rad",
                "last": "Radical"
            }))],
        )
        .unwrap();

    let kind = user_type(store);
    assert!(kind.fetch().is_ok());

    let found = kind.find(50).unwrap();
    assert_eq!(found.get("username"), Some(json!("rad")));
    assert_eq!(found.get("name"), Some(json!("Rad Radical")));
}
