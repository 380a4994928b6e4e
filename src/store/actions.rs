use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::store::{BulkOutcome, Core};
use crate::error::{Result, StoreError};
use crate::value::{FromValue, Value};

/// A declared action body.
pub type ActionFn = Arc<dyn Fn(&ActionContext, &[Value]) -> Value + Send + Sync>;

/// The restricted view of a store handed to action bodies.
///
/// Writes made here go through the same validation, notification and
/// persistence path as writes made on the store itself.
#[derive(Clone)]
pub struct ActionContext {
    core: Arc<Core>,
}

impl ActionContext {
    pub fn get(&self, field: &str) -> Option<Value> {
        self.core.get(field)
    }

    pub fn get_as<T: FromValue>(&self, field: &str) -> Option<T> {
        self.core.with(field, T::from_value).flatten()
    }

    pub fn set(&self, field: &str, value: impl Into<Value>) -> Result<()> {
        self.core.write(field, value.into())
    }

    pub fn set_many<K, I>(&self, updates: I) -> BulkOutcome
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, Value)>,
    {
        self.core.write_many(updates)
    }

    pub fn get_data(&self) -> BTreeMap<String, Value> {
        self.core.data()
    }

    pub fn reset(&self) -> BulkOutcome {
        self.core.reset_all()
    }

    pub fn reset_field(&self, field: &str) -> Result<()> {
        self.core.reset_field(field)
    }
}

/// The store's declared actions, each bound to one shared [`ActionContext`].
pub struct Actions {
    context: ActionContext,
    table: BTreeMap<String, ActionFn>,
}

impl Actions {
    pub(crate) fn bind(core: Arc<Core>, table: BTreeMap<String, ActionFn>) -> Self {
        Self {
            context: ActionContext { core },
            table,
        }
    }

    /// Invoke an action by name and return whatever its body returns.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value> {
        self.get(name)
            .map(|action| action.call(args))
            .ok_or_else(|| StoreError::UnknownAction {
                name: name.to_owned(),
            })
    }

    pub fn get(&self, name: &str) -> Option<BoundAction<'_>> {
        self.table.get(name).map(|body| BoundAction {
            context: &self.context,
            body,
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl fmt::Debug for Actions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.table.keys()).finish()
    }
}

/// One action ready to be called with its context already applied.
pub struct BoundAction<'a> {
    context: &'a ActionContext,
    body: &'a ActionFn,
}

impl BoundAction<'_> {
    pub fn call(&self, args: &[Value]) -> Value {
        (self.body)(self.context, args)
    }
}
