use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use crate::value::Value;

/// Observer callback: `(new_value, old_value, field)`.
pub type Listener = Arc<dyn Fn(&Value, &Value, &str) + Send + Sync>;

/// Which notifications a listener is registered for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ListenerKey {
    Field(String),
    Wildcard,
}

impl ListenerKey {
    pub fn field(name: impl Into<String>) -> Self {
        ListenerKey::Field(name.into())
    }
}

struct Entry {
    id: u64,
    listener: Listener,
}

/// Per-key listener lists, each kept in insertion order.
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: u64,
    listeners: HashMap<ListenerKey, Vec<Entry>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener and return its registration id.
    pub fn add(&mut self, key: ListenerKey, listener: Listener) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.listeners
            .entry(key)
            .or_default()
            .push(Entry { id, listener });
        id
    }

    /// Remove one registration. Drops the key once its list is empty.
    pub fn remove(&mut self, key: &ListenerKey, id: u64) -> bool {
        let Some(entries) = self.listeners.get_mut(key) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        let removed = entries.len() != before;
        if entries.is_empty() {
            self.listeners.remove(key);
        }
        removed
    }

    /// Listeners to call for a change to `field`: field-specific ones first,
    /// then wildcard ones. The returned list is detached from the registry.
    pub fn snapshot(&self, field: &str) -> Vec<Listener> {
        let specific = self.listeners.get(&ListenerKey::field(field));
        let wildcard = self.listeners.get(&ListenerKey::Wildcard);
        specific
            .into_iter()
            .chain(wildcard)
            .flatten()
            .map(|entry| Arc::clone(&entry.listener))
            .collect()
    }

    pub fn len(&self, key: &ListenerKey) -> usize {
        self.listeners.get(key).map_or(0, Vec::len)
    }

    pub fn contains_key(&self, key: &ListenerKey) -> bool {
        self.listeners.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

/// Handle for one registration made by `subscribe`.
///
/// Dropping it does nothing; the listener stays registered until
/// [`unsubscribe`](Subscription::unsubscribe) is called. Use
/// [`into_guard`](Subscription::into_guard) for drop-based cleanup.
#[must_use = "dropping a Subscription keeps the listener registered forever"]
pub struct Subscription {
    registry: Weak<Mutex<ListenerRegistry>>,
    key: ListenerKey,
    id: u64,
    active: AtomicBool,
}

impl Subscription {
    pub(crate) fn new(registry: &Arc<Mutex<ListenerRegistry>>, key: ListenerKey, id: u64) -> Self {
        Self {
            registry: Arc::downgrade(registry),
            key,
            id,
            active: AtomicBool::new(true),
        }
    }

    pub fn key(&self) -> &ListenerKey {
        &self.key
    }

    /// Remove the registration. Calls after the first are no-ops.
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&self.key, self.id);
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Convert into a guard that unsubscribes when dropped.
    pub fn into_guard(self) -> SubscriptionGuard {
        SubscriptionGuard { subscription: self }
    }
}

/// RAII guard for a [`Subscription`].
pub struct SubscriptionGuard {
    subscription: Subscription,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.subscription.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting(counter: &Arc<AtomicUsize>) -> Listener {
        let counter = Arc::clone(counter);
        Arc::new(move |_: &Value, _: &Value, _: &str| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn snapshot_orders_field_before_wildcard() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ListenerRegistry::new();

        for (key, tag) in [
            (ListenerKey::Wildcard, "wild-1"),
            (ListenerKey::field("age"), "age-1"),
            (ListenerKey::field("age"), "age-2"),
            (ListenerKey::field("name"), "name-1"),
            (ListenerKey::Wildcard, "wild-2"),
        ] {
            let log = Arc::clone(&log);
            registry.add(
                key,
                Arc::new(move |_: &Value, _: &Value, _: &str| log.lock().unwrap().push(tag)),
            );
        }

        for listener in registry.snapshot("age") {
            listener(&Value::Null, &Value::Null, "age");
        }
        assert_eq!(
            *log.lock().unwrap(),
            vec!["age-1", "age-2", "wild-1", "wild-2"]
        );
    }

    #[test]
    fn same_listener_under_two_keys_fires_twice() {
        let counter = Arc::new(AtomicUsize::new(0));
        let listener = counting(&counter);
        let mut registry = ListenerRegistry::new();
        registry.add(ListenerKey::field("age"), Arc::clone(&listener));
        registry.add(ListenerKey::Wildcard, listener);

        for listener in registry.snapshot("age") {
            listener(&Value::Null, &Value::Null, "age");
        }
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn remove_drops_empty_keys() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut registry = ListenerRegistry::new();
        let key = ListenerKey::field("age");
        let first = registry.add(key.clone(), counting(&counter));
        let second = registry.add(key.clone(), counting(&counter));

        assert!(registry.remove(&key, first));
        assert_eq!(registry.len(&key), 1);
        assert!(!registry.remove(&key, first));
        assert!(registry.remove(&key, second));
        assert!(!registry.contains_key(&key));
        assert!(registry.is_empty());
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let counter = Arc::new(AtomicUsize::new(0));
        let registry = Arc::new(Mutex::new(ListenerRegistry::new()));
        let key = ListenerKey::field("age");
        let id = registry.lock().unwrap().add(key.clone(), counting(&counter));
        let other = registry.lock().unwrap().add(key.clone(), counting(&counter));

        let subscription = Subscription::new(&registry, key.clone(), id);
        subscription.unsubscribe();
        subscription.unsubscribe();
        assert!(!subscription.is_active());
        assert_eq!(registry.lock().unwrap().len(&key), 1);

        let guard = Subscription::new(&registry, key.clone(), other).into_guard();
        drop(guard);
        assert_eq!(registry.lock().unwrap().len(&key), 0);
    }
}
