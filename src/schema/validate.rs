use super::node::{PrimitiveTag, SchemaNode};
use crate::value::Value;

/// Decide whether `candidate` fits `node`.
///
/// No coercion is applied. Constructible fields are nullable. Nested
/// descriptors check only the keys the candidate actually has: missing keys
/// are skipped and keys the descriptor doesn't declare are ignored.
pub fn validate(node: &SchemaNode, candidate: &Value) -> bool {
    match node {
        SchemaNode::Primitive(tag) => matches_primitive(*tag, candidate),
        SchemaNode::Constructible(type_ref) => match candidate {
            Value::Null => true,
            Value::Instance(instance) => type_ref.is_instance(instance),
            _ => false,
        },
        SchemaNode::Nested(fields) => match candidate {
            Value::Object(map) => fields.iter().all(|(name, child)| {
                map.get(name).map_or(true, |value| validate(child, value))
            }),
            _ => false,
        },
        SchemaNode::Unrecognized(_) => true,
    }
}

fn matches_primitive(tag: PrimitiveTag, candidate: &Value) -> bool {
    matches!(
        (tag, candidate),
        (PrimitiveTag::String, Value::String(_))
            | (PrimitiveTag::Number, Value::Number(_))
            | (PrimitiveTag::Boolean, Value::Bool(_))
            | (PrimitiveTag::Array, Value::Array(_))
            | (PrimitiveTag::Object, Value::Object(_))
    )
}
