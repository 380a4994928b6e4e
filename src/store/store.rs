use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::{debug, trace, warn};

use super::actions::Actions;
use super::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::persist::PersistenceBridge;
use crate::schema::{synthesize, validate, Schema};
use crate::subscribe::{Listener, ListenerKey, ListenerRegistry, Subscription};
use crate::value::{FromValue, Value};

/// Result of a multi-field write.
///
/// Each field is written on its own; a rejection does not stop later fields
/// and nothing already applied is rolled back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkOutcome {
    /// Fields written, in the order they were applied.
    pub applied: Vec<String>,
    /// Rejected writes, each naming its field.
    pub rejected: Vec<StoreError>,
}

impl BulkOutcome {
    pub fn is_complete(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Shared state behind every handle to one store.
pub(crate) struct Core {
    name: String,
    schema: Schema,
    data: RwLock<BTreeMap<String, Value>>,
    listeners: Arc<Mutex<ListenerRegistry>>,
    bridge: PersistenceBridge,
    depth: AtomicUsize,
    max_depth: usize,
}

// Counts fan-outs in progress; released even if a listener unwinds.
struct DepthGuard<'a>(&'a AtomicUsize);

impl<'a> DepthGuard<'a> {
    fn enter(depth: &'a AtomicUsize) -> Self {
        depth.fetch_add(1, Ordering::SeqCst);
        Self(depth)
    }
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Core {
    pub(crate) fn get(&self, field: &str) -> Option<Value> {
        self.with(field, Value::clone)
    }

    pub(crate) fn with<R>(&self, field: &str, f: impl FnOnce(&Value) -> R) -> Option<R> {
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        data.get(field).map(f)
    }

    pub(crate) fn data(&self) -> BTreeMap<String, Value> {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The single path by which a field value changes.
    pub(crate) fn write(&self, field: &str, value: Value) -> Result<()> {
        let Some(node) = self.schema.get(field) else {
            warn!(store = %self.name, field, "property is not defined in schema");
            return Err(StoreError::unknown_field(field));
        };

        if !validate(node, &value) {
            warn!(
                store = %self.name,
                field,
                expected = %node,
                found = value.kind_name(),
                "invalid type for field"
            );
            return Err(StoreError::SchemaViolation {
                field: field.to_owned(),
                expected: node.to_string(),
                found: value.kind_name().to_owned(),
            });
        }

        if self.depth.load(Ordering::SeqCst) > self.max_depth {
            warn!(
                store = %self.name,
                field,
                limit = self.max_depth,
                "nested write rejected, notification depth limit reached"
            );
            return Err(StoreError::ReentrancyLimit {
                field: field.to_owned(),
                limit: self.max_depth,
            });
        }

        let old = {
            let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
            data.insert(field.to_owned(), value.clone())
                .unwrap_or_default()
        };

        let _depth = DepthGuard::enter(&self.depth);
        self.notify(field, &value, &old);
        self.persist();
        Ok(())
    }

    pub(crate) fn write_many<K, I>(&self, updates: I) -> BulkOutcome
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let mut outcome = BulkOutcome::default();
        for (field, value) in updates {
            let field = field.as_ref();
            match self.write(field, value) {
                Ok(()) => outcome.applied.push(field.to_owned()),
                Err(err) => outcome.rejected.push(err),
            }
        }
        outcome
    }

    pub(crate) fn reset_field(&self, field: &str) -> Result<()> {
        let Some(node) = self.schema.get(field) else {
            debug!(store = %self.name, field, "reset of undeclared field ignored");
            return Err(StoreError::unknown_field(field));
        };
        self.write(field, synthesize(node))
    }

    pub(crate) fn reset_all(&self) -> BulkOutcome {
        self.write_many(
            self.schema
                .iter()
                .map(|(field, node)| (field, synthesize(node))),
        )
    }

    // Listeners run against a snapshot with no lock held, so they may
    // subscribe, unsubscribe or write back into this store. A panicking
    // listener is logged and the rest still run.
    fn notify(&self, field: &str, new: &Value, old: &Value) {
        let listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot(field);

        trace!(store = %self.name, field, listeners = listeners.len(), "notify");

        for listener in listeners {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| listener(new, old, field)));
            if outcome.is_err() {
                warn!(store = %self.name, field, "listener panicked during notification");
            }
        }
    }

    fn persist(&self) {
        if self.bridge.is_active() {
            self.bridge.save(&self.data());
        }
    }

    fn subscribe(&self, key: ListenerKey, listener: Listener) -> Subscription {
        let id = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .add(key.clone(), listener);
        Subscription::new(&self.listeners, key, id)
    }
}

/// A schema-typed, observable data container.
///
/// Every field declared in the schema starts at its synthesized default.
/// Writes are validated against the schema, and accepted writes notify
/// listeners synchronously and then persist when persistence is on.
/// Rejected writes never panic and never change state.
///
/// Handles are cheap to clone and share the same state.
///
/// # Examples
///
/// ```
/// use shapestore::{PrimitiveTag, Schema, Store, StoreConfig, Value};
///
/// let schema = Schema::new()
///     .field("name", PrimitiveTag::String)
///     .field("age", PrimitiveTag::Number);
/// let store = Store::new("user", StoreConfig::new(schema));
///
/// assert!(store.set("age", "old").is_err());
/// assert_eq!(store.get("age"), Some(Value::from(0)));
///
/// store.set("age", 30).unwrap();
/// assert_eq!(store.get_as::<i64>("age"), Some(30));
/// ```
pub struct Store {
    core: Arc<Core>,
    actions: Arc<Actions>,
}

impl Store {
    /// Build a store: synthesize defaults, overlay any persisted state, and
    /// bind the declared actions.
    pub fn new(name: impl Into<String>, config: StoreConfig) -> Self {
        let name = name.into();
        let StoreConfig {
            schema,
            actions,
            options,
            storage,
        } = config;

        let data = schema
            .iter()
            .map(|(field, node)| (field.to_owned(), synthesize(node)))
            .collect();
        let bridge = PersistenceBridge::new(&name, options.persist, storage);

        let core = Arc::new(Core {
            name,
            schema,
            data: RwLock::new(data),
            listeners: Arc::new(Mutex::new(ListenerRegistry::new())),
            bridge,
            depth: AtomicUsize::new(0),
            max_depth: options.max_notify_depth,
        });

        if let Some(saved) = core.bridge.load() {
            let outcome = core.write_many(saved);
            debug!(
                store = %core.name,
                restored = outcome.applied.len(),
                rejected = outcome.rejected.len(),
                "restored persisted state"
            );
        }

        let actions = Actions::bind(Arc::clone(&core), actions);
        debug!(
            store = %core.name,
            fields = core.schema.len(),
            actions = actions.len(),
            persist = core.bridge.is_active(),
            "store created"
        );

        Self {
            core,
            actions: Arc::new(actions),
        }
    }

    /// The store's name, which is also its persistence key.
    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// Current value of a field, or `None` if the schema doesn't declare it.
    pub fn get(&self, field: &str) -> Option<Value> {
        self.core.get(field)
    }

    /// Current value converted to a concrete type. `None` if the field is
    /// undeclared or holds a different variant.
    pub fn get_as<T: FromValue>(&self, field: &str) -> Option<T> {
        self.core.with(field, T::from_value).flatten()
    }

    /// Shared handle to a constructible field's instance.
    pub fn instance<T: Send + Sync + 'static>(&self, field: &str) -> Option<Arc<T>> {
        self.core
            .with(field, |value| value.as_instance().and_then(|i| i.downcast::<T>()))
            .flatten()
    }

    /// Read a field without cloning it.
    ///
    /// The store stays read-locked while `f` runs; writing to it from inside
    /// `f` deadlocks.
    pub fn with<R>(&self, field: &str, f: impl FnOnce(&Value) -> R) -> Option<R> {
        self.core.with(field, f)
    }

    /// Validate and write one field.
    pub fn set(&self, field: &str, value: impl Into<Value>) -> Result<()> {
        self.core.write(field, value.into())
    }

    /// Write several fields in iteration order.
    pub fn set_many<K, I>(&self, updates: I) -> BulkOutcome
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, Value)>,
    {
        self.core.write_many(updates)
    }

    /// Modify a copy of a field's value and write it back through validation.
    pub fn update<F>(&self, field: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut Value),
    {
        let mut value = self
            .core
            .get(field)
            .ok_or_else(|| StoreError::unknown_field(field))?;
        f(&mut value);
        self.core.write(field, value)
    }

    /// Copy of every field's current value.
    pub fn get_data(&self) -> BTreeMap<String, Value> {
        self.core.data()
    }

    /// Write every field's default back through the normal write path.
    pub fn reset(&self) -> BulkOutcome {
        self.core.reset_all()
    }

    pub fn reset_field(&self, field: &str) -> Result<()> {
        self.core.reset_field(field)
    }

    pub fn get_schema(&self) -> Schema {
        self.core.schema.clone()
    }

    /// Listen for changes to one field.
    pub fn subscribe<F>(&self, field: &str, callback: F) -> Subscription
    where
        F: Fn(&Value, &Value, &str) + Send + Sync + 'static,
    {
        self.core
            .subscribe(ListenerKey::field(field), Arc::new(callback))
    }

    /// Listen for changes to every field.
    pub fn subscribe_all<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Value, &Value, &str) + Send + Sync + 'static,
    {
        self.core.subscribe(ListenerKey::Wildcard, Arc::new(callback))
    }

    pub fn listener_count(&self, key: &ListenerKey) -> usize {
        self.core
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len(key)
    }

    pub fn actions(&self) -> &Actions {
        &self.actions
    }

    /// Whether writes are being mirrored into storage.
    pub fn is_persistent(&self) -> bool {
        self.core.bridge.is_active()
    }

    /// Remove this store's persisted blob. In-memory state is untouched.
    pub fn clear_persisted(&self) {
        self.core.bridge.clear();
    }
}

impl Clone for Store {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
            actions: Arc::clone(&self.actions),
        }
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.core.name)
            .field("data", &self.core.data())
            .field("actions", &self.actions)
            .finish()
    }
}
