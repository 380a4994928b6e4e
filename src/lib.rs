//! # Shapestore
//!
//! Schema-typed, observable data containers for Rust.
//!
//! A store is built from a declarative [`Schema`]. Each declared field starts
//! at a synthesized default and can only change through the store's
//! accessor API, which:
//!
//! - validates the new value against the field's [`SchemaNode`],
//! - notifies per-field and wildcard listeners with `(new, old, field)`,
//! - mirrors the full state into an injected [`Storage`] when persistence is on.
//!
//! Rejected writes never panic. They return a [`StoreError`] and leave the
//! store untouched. Actions bundle multi-step mutations behind a restricted
//! [`ActionContext`].
//!
//! ```
//! use shapestore::{PrimitiveTag, Schema, Store, StoreConfig, Value};
//! use std::sync::{Arc, Mutex};
//!
//! let schema = Schema::new()
//!     .field("name", PrimitiveTag::String)
//!     .field("age", PrimitiveTag::Number);
//! let store = Store::new("user", StoreConfig::new(schema));
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let _sub = store.subscribe_all({
//!     let seen = Arc::clone(&seen);
//!     move |new, old, field| seen.lock().unwrap().push((new.clone(), old.clone(), field.to_string()))
//! });
//!
//! store.set("age", 30).unwrap();
//! assert_eq!(
//!     seen.lock().unwrap()[0],
//!     (Value::from(30), Value::from(0), "age".to_string())
//! );
//! ```

pub mod error;
pub mod persist;
pub mod schema;
pub mod store;
pub mod subscribe;
pub mod value;

// Re-export main types for convenience
pub use error::{ConstructError, PersistError, StoreError};
pub use persist::{FileStorage, MemoryStorage, Storage};
pub use schema::{synthesize, validate, Constructible, PrimitiveTag, Schema, SchemaNode, TypeRef};
pub use store::{ActionContext, Actions, BulkOutcome, Store, StoreConfig, StoreOptions};
pub use subscribe::{ListenerKey, Subscription, SubscriptionGuard};
pub use value::{FromValue, Instance, Value};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_works() {
        // Basic smoke test
        let store = Store::new(
            "smoke",
            StoreConfig::new(Schema::new().field("count", PrimitiveTag::Number)),
        );
        assert_eq!(store.get("count"), Some(Value::from(0)));
        store.set("count", 42).unwrap();
        assert_eq!(store.get_as::<i64>("count"), Some(42));
    }
}
