//! Integration tests for Shapestore

use serde::Serialize;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};
use shapestore::{
    ConstructError, Constructible, FileStorage, ListenerKey, MemoryStorage, PrimitiveTag, Schema,
    SchemaNode, Store, StoreConfig, StoreError, StoreOptions, Value,
};

#[test]
fn rejected_then_accepted_write() {
    let schema = Schema::new()
        .field("name", PrimitiveTag::String)
        .field("age", PrimitiveTag::Number);
    let store = Store::new("user", StoreConfig::new(schema));

    let seen = Arc::new(Mutex::new(Vec::new()));
    let _sub = store.subscribe_all({
        let seen = seen.clone();
        move |new, old, field| {
            seen.lock()
                .unwrap()
                .push((new.clone(), old.clone(), field.to_string()));
        }
    });

    assert!(store.set("age", "old").is_err());
    assert_eq!(store.get("age"), Some(Value::from(0)));

    store.set("age", 30).unwrap();
    assert_eq!(store.get("age"), Some(Value::from(30)));
    assert_eq!(
        *seen.lock().unwrap(),
        vec![(Value::from(30), Value::from(0), "age".to_string())]
    );
}

#[test]
fn nested_candidate_is_stored_unpruned() {
    let schema = Schema::new().field(
        "profile",
        SchemaNode::nested([("city", PrimitiveTag::String)]),
    );
    let store = Store::new("profile", StoreConfig::new(schema));

    let candidate = Value::object([("city", Value::from("NYC")), ("extra", Value::from(1))]);
    store.set("profile", candidate.clone()).unwrap();
    assert_eq!(store.get("profile"), Some(candidate));
}

#[test]
fn deposit_action() {
    let schema = Schema::new().field("balance", PrimitiveTag::Number);
    let store = Store::new(
        "account",
        StoreConfig::new(schema).action("deposit", |ctx, args| {
            let balance = ctx.get_as::<f64>("balance").unwrap_or(0.0);
            let amount = args.first().and_then(Value::as_f64).unwrap_or(0.0);
            let _ = ctx.set("balance", balance + amount);
            Value::Null
        }),
    );

    store.actions().call("deposit", &[Value::from(5)]).unwrap();
    store.actions().call("deposit", &[Value::from(5)]).unwrap();
    assert_eq!(store.get("balance"), Some(Value::from(10)));
}

#[test]
fn store_subscription() {
    let schema = Schema::new().field("count", PrimitiveTag::Number);
    let store = Store::new("counter", StoreConfig::new(schema));
    let counter = Arc::new(AtomicUsize::new(0));
    let counter_clone = counter.clone();

    let sub = store.subscribe("count", move |_, _, _| {
        counter_clone.fetch_add(1, Ordering::SeqCst);
    });

    assert_eq!(counter.load(Ordering::SeqCst), 0);

    store.update("count", |n| *n = Value::from(n.as_f64().unwrap_or(0.0) + 1.0)).unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    store.update("count", |n| *n = Value::from(n.as_f64().unwrap_or(0.0) + 1.0)).unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 2);

    sub.unsubscribe();
    store.set("count", 10).unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert_eq!(store.listener_count(&ListenerKey::field("count")), 0);
}

#[test]
fn clones_share_state() {
    let schema = Schema::new().field("count", PrimitiveTag::Number);
    let store = Store::new("shared", StoreConfig::new(schema));
    let other = store.clone();

    other.set("count", 7).unwrap();
    assert_eq!(store.get("count"), Some(Value::from(7)));
}

#[test]
fn schema_and_options_from_json() {
    let schema = Schema::from_json(r#"{ "title": "string", "done": "boolean", "tags": "array" }"#)
        .unwrap();
    let options = StoreOptions::from_json(r#"{ "isPersist": true }"#).unwrap();
    let storage = Arc::new(MemoryStorage::new());

    let store = Store::new(
        "todo",
        StoreConfig::new(schema)
            .options(options)
            .storage(storage.clone()),
    );
    assert!(store.is_persistent());

    let outcome = store.set_many([
        ("title", Value::from("write tests")),
        ("done", Value::from(true)),
        ("tags", Value::array(["rust"])),
    ]);
    assert!(outcome.is_complete());
    assert_eq!(storage.len(), 1);
}

#[derive(Serialize)]
struct Cursor {
    line: u32,
}

impl Constructible for Cursor {
    fn construct() -> Result<Self, ConstructError> {
        Ok(Cursor { line: 1 })
    }
}

#[derive(Serialize)]
struct Socket;

impl Constructible for Socket {
    fn construct() -> Result<Self, ConstructError> {
        Err(ConstructError::new::<Self>("requires an address"))
    }
}

#[test]
fn constructible_defaults() {
    let schema = Schema::new()
        .field("cursor", SchemaNode::constructible::<Cursor>())
        .field("socket", SchemaNode::constructible::<Socket>());
    let store = Store::new("editor", StoreConfig::new(schema));

    assert_eq!(store.instance::<Cursor>("cursor").map(|c| c.line), Some(1));
    assert_eq!(store.get("socket"), Some(Value::Null));
    assert_eq!(store.reset_field("socket"), Ok(()));
}

#[test]
fn file_backed_store_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let schema = || {
        Schema::new()
            .field("theme", PrimitiveTag::String)
            .field(
                "window",
                SchemaNode::nested([("width", PrimitiveTag::Number), ("height", PrimitiveTag::Number)]),
            )
    };
    let open = || {
        let storage = FileStorage::open(dir.path()).unwrap();
        Store::new(
            "settings",
            StoreConfig::new(schema())
                .persist(true)
                .storage(Arc::new(storage)),
        )
    };

    let store = open();
    store.set("theme", "dark").unwrap();
    store
        .set(
            "window",
            Value::object([("width", Value::from(800)), ("height", Value::from(600))]),
        )
        .unwrap();

    let reopened = open();
    assert_eq!(reopened.get_data(), store.get_data());
    assert!(FileStorage::open(dir.path())
        .unwrap()
        .path_for("settings")
        .exists());
}

#[test]
fn same_name_stores_share_the_blob() {
    let storage = Arc::new(MemoryStorage::new());
    let config = || {
        StoreConfig::new(Schema::new().field("n", PrimitiveTag::Number))
            .persist(true)
            .storage(storage.clone())
    };

    let a = Store::new("shared", config());
    let b = Store::new("shared", config());
    a.set("n", 1).unwrap();
    b.set("n", 2).unwrap();

    let c = Store::new("shared", config());
    assert_eq!(c.get("n"), Some(Value::from(2)));
    assert_eq!(a.get("n"), Some(Value::from(1)));
}

#[test]
fn errors_describe_the_rejection() {
    let store = Store::new(
        "user",
        StoreConfig::new(Schema::new().field("age", PrimitiveTag::Number)),
    );
    let err = store.set("age", true).unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid type for \"age\": expected number, got boolean"
    );
    assert!(matches!(
        store.set("nickname", "x"),
        Err(StoreError::UnknownField { .. })
    ));
}
