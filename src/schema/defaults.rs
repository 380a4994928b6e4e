use tracing::warn;

use super::node::{PrimitiveTag, SchemaNode};
use crate::value::Value;

/// Produce the initial value for a descriptor node.
///
/// Constructible types are built through their zero-argument constructor;
/// a failure there is logged and the field falls back to `Value::Null`.
pub fn synthesize(node: &SchemaNode) -> Value {
    match node {
        SchemaNode::Primitive(tag) => primitive_default(*tag),
        SchemaNode::Constructible(type_ref) => match type_ref.construct() {
            Ok(instance) => Value::Instance(instance),
            Err(err) => {
                warn!(type_name = type_ref.type_name(), error = %err, "default construction failed, using null");
                Value::Null
            }
        },
        SchemaNode::Nested(fields) => Value::Object(
            fields
                .iter()
                .map(|(name, child)| (name.clone(), synthesize(child)))
                .collect(),
        ),
        SchemaNode::Unrecognized(_) => Value::Null,
    }
}

fn primitive_default(tag: PrimitiveTag) -> Value {
    match tag {
        PrimitiveTag::String => Value::String(String::new()),
        PrimitiveTag::Number => Value::Number(0.0),
        PrimitiveTag::Boolean => Value::Bool(false),
        PrimitiveTag::Array => Value::Array(Vec::new()),
        PrimitiveTag::Object => Value::Object(Default::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConstructError;
    use crate::schema::Constructible;
    use serde::Serialize;
    use tracing_test::traced_test;

    #[derive(Serialize, Debug)]
    struct Counter {
        hits: u32,
    }

    impl Constructible for Counter {
        fn construct() -> Result<Self, ConstructError> {
            Ok(Counter { hits: 7 })
        }
    }

    #[derive(Serialize)]
    struct Broken;

    impl Constructible for Broken {
        fn construct() -> Result<Self, ConstructError> {
            Err(ConstructError::new::<Self>("needs arguments"))
        }
    }

    #[test]
    fn primitive_zero_values() {
        assert_eq!(synthesize(&PrimitiveTag::String.into()), Value::from(""));
        assert_eq!(synthesize(&PrimitiveTag::Number.into()), Value::Number(0.0));
        assert_eq!(synthesize(&PrimitiveTag::Boolean.into()), Value::Bool(false));
        assert_eq!(synthesize(&PrimitiveTag::Array.into()), Value::Array(vec![]));
        assert_eq!(
            synthesize(&PrimitiveTag::Object.into()),
            Value::Object(Default::default())
        );
        assert_eq!(synthesize(&SchemaNode::from_tag("date")), Value::Null);
    }

    #[test]
    fn constructible_is_built() {
        let value = synthesize(&SchemaNode::constructible::<Counter>());
        let instance = value.as_instance().unwrap();
        assert_eq!(instance.downcast_ref::<Counter>().map(|c| c.hits), Some(7));
    }

    #[test]
    #[traced_test]
    fn failed_construction_falls_back_to_null() {
        assert_eq!(synthesize(&SchemaNode::constructible::<Broken>()), Value::Null);
        assert!(logs_contain("default construction failed"));
    }

    #[test]
    fn nested_defaults_recurse() {
        let node = SchemaNode::nested([
            ("city", SchemaNode::from(PrimitiveTag::String)),
            (
                "geo",
                SchemaNode::nested([
                    ("lat", PrimitiveTag::Number),
                    ("lng", PrimitiveTag::Number),
                ]),
            ),
        ]);

        assert_eq!(
            synthesize(&node),
            Value::object([
                ("city", Value::from("")),
                (
                    "geo",
                    Value::object([("lat", Value::from(0)), ("lng", Value::from(0))]),
                ),
            ])
        );
    }
}
