use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::actions::{ActionContext, ActionFn};
use crate::persist::Storage;
use crate::schema::Schema;
use crate::value::Value;

/// Nesting limit for writes issued from inside listeners.
pub const DEFAULT_MAX_NOTIFY_DEPTH: usize = 32;

/// Serializable store options.
///
/// Accepts both camelCase and snake_case keys:
///
/// ```
/// use shapestore::StoreOptions;
///
/// let options = StoreOptions::from_json(r#"{ "isPersist": true }"#).unwrap();
/// assert!(options.persist);
/// assert_eq!(options.max_notify_depth, 32);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    #[serde(alias = "isPersist")]
    pub persist: bool,
    #[serde(alias = "maxNotifyDepth")]
    pub max_notify_depth: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            persist: false,
            max_notify_depth: DEFAULT_MAX_NOTIFY_DEPTH,
        }
    }
}

impl StoreOptions {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Everything a [`Store`](super::Store) is built from.
///
/// # Examples
///
/// ```
/// use shapestore::{PrimitiveTag, Schema, Store, StoreConfig, Value};
///
/// let config = StoreConfig::new(Schema::new().field("balance", PrimitiveTag::Number))
///     .action("deposit", |ctx, args| {
///         let balance = ctx.get_as::<f64>("balance").unwrap_or(0.0);
///         let amount = args.first().and_then(Value::as_f64).unwrap_or(0.0);
///         let _ = ctx.set("balance", balance + amount);
///         Value::Null
///     });
///
/// let store = Store::new("account", config);
/// store.actions().call("deposit", &[Value::from(5)]).unwrap();
/// assert_eq!(store.get_as::<f64>("balance"), Some(5.0));
/// ```
pub struct StoreConfig {
    pub(crate) schema: Schema,
    pub(crate) actions: BTreeMap<String, ActionFn>,
    pub(crate) options: StoreOptions,
    pub(crate) storage: Option<Arc<dyn Storage>>,
}

impl StoreConfig {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            actions: BTreeMap::new(),
            options: StoreOptions::default(),
            storage: None,
        }
    }

    /// Declare an action. Declaring the same name twice keeps the last one.
    pub fn action<F>(mut self, name: impl Into<String>, action: F) -> Self
    where
        F: Fn(&ActionContext, &[Value]) -> Value + Send + Sync + 'static,
    {
        self.actions.insert(name.into(), Arc::new(action));
        self
    }

    /// Enable or disable mirroring into the attached storage.
    pub fn persist(mut self, enabled: bool) -> Self {
        self.options.persist = enabled;
        self
    }

    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn max_notify_depth(mut self, depth: usize) -> Self {
        self.options.max_notify_depth = depth;
        self
    }

    pub fn options(mut self, options: StoreOptions) -> Self {
        self.options = options;
        self
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("schema", &self.schema)
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .field("options", &self.options)
            .field("storage", &self.storage.is_some())
            .finish()
    }
}
