//! Schema-typed stores.
//!
//! A [`Store`] owns one value per schema field and is the only way to change
//! them: every write is validated, then fanned out to listeners, then
//! persisted. Actions get the same surface through an [`ActionContext`].

mod actions;
mod config;
mod store;

pub use actions::{ActionContext, ActionFn, Actions, BoundAction};
pub use config::{StoreConfig, StoreOptions, DEFAULT_MAX_NOTIFY_DEPTH};
pub use store::{BulkOutcome, Store};
