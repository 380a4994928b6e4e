//! Dynamically-typed values held by store fields.
//!
//! A [`Value`] is the runtime representation of one field. The schema decides
//! which variants a field may hold; the store checks that on every write.

mod convert;
mod value;

pub use convert::FromValue;
pub use value::{Instance, Value};
