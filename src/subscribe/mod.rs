//! Change subscriptions.
//!
//! Listeners are registered per field or under the wildcard key and receive
//! `(new_value, old_value, field)` for every accepted write.

mod registry;

pub use registry::{Listener, ListenerKey, ListenerRegistry, Subscription, SubscriptionGuard};
