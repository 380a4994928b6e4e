//! Declarative store shapes.
//!
//! A [`Schema`] maps field names to [`SchemaNode`]s. The default synthesizer
//! and the validator are plain structural recursion over that tree.

mod defaults;
mod node;
mod validate;

pub use defaults::synthesize;
pub use node::{Constructible, PrimitiveTag, Schema, SchemaNode, TypeRef};
pub use validate::validate;
