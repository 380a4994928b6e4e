use serde::{Deserialize, Deserializer, Serialize};
use std::any::TypeId;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ConstructError;
use crate::value::Instance;

/// One of the fixed primitive field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveTag {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

impl PrimitiveTag {
    /// Parse a tag name, ignoring ASCII case.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "string" => Some(Self::String),
            "number" => Some(Self::Number),
            "boolean" => Some(Self::Boolean),
            "array" => Some(Self::Array),
            "object" => Some(Self::Object),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

impl FromStr for PrimitiveTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unrecognized primitive tag \"{s}\""))
    }
}

impl fmt::Display for PrimitiveTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user type that can appear as a schema field.
///
/// `construct` plays the role of a zero-argument constructor: it builds the
/// field's default. Returning an error is allowed; the field then starts
/// out as `Value::Null`.
///
/// # Examples
///
/// ```
/// use serde::Serialize;
/// use shapestore::{ConstructError, Constructible};
///
/// #[derive(Serialize)]
/// struct Clock {
///     ticks: u64,
/// }
///
/// impl Constructible for Clock {
///     fn construct() -> Result<Self, ConstructError> {
///         Ok(Clock { ticks: 0 })
///     }
/// }
/// ```
pub trait Constructible: Serialize + Send + Sync + Sized + 'static {
    fn construct() -> Result<Self, ConstructError>;
}

/// Reference to a [`Constructible`] type: its identity plus its factory.
#[derive(Clone)]
pub struct TypeRef {
    type_id: TypeId,
    type_name: &'static str,
    factory: fn() -> Result<Instance, ConstructError>,
}

impl TypeRef {
    pub fn of<T: Constructible>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            factory: construct_instance::<T>,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Run the type's zero-argument constructor.
    pub fn construct(&self) -> Result<Instance, ConstructError> {
        (self.factory)()
    }

    /// Whether `instance` was built from this exact type.
    pub fn is_instance(&self, instance: &Instance) -> bool {
        instance.type_id() == self.type_id
    }
}

fn construct_instance<T: Constructible>() -> Result<Instance, ConstructError> {
    T::construct().map(Instance::new)
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeRef").field(&self.type_name).finish()
    }
}

/// One descriptor unit within a [`Schema`].
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    Primitive(PrimitiveTag),
    Constructible(TypeRef),
    Nested(BTreeMap<String, SchemaNode>),
    /// A tag string that names no primitive. Defaults to null, accepts anything.
    Unrecognized(String),
}

impl SchemaNode {
    pub fn constructible<T: Constructible>() -> Self {
        SchemaNode::Constructible(TypeRef::of::<T>())
    }

    /// Build a nested object descriptor.
    pub fn nested<K, N, I>(fields: I) -> Self
    where
        K: Into<String>,
        N: Into<SchemaNode>,
        I: IntoIterator<Item = (K, N)>,
    {
        SchemaNode::Nested(
            fields
                .into_iter()
                .map(|(k, n)| (k.into(), n.into()))
                .collect(),
        )
    }

    /// Interpret a tag string; unknown tags are kept as `Unrecognized`.
    pub fn from_tag(tag: &str) -> Self {
        PrimitiveTag::parse(tag)
            .map(SchemaNode::Primitive)
            .unwrap_or_else(|| SchemaNode::Unrecognized(tag.to_owned()))
    }

    fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::String(tag) => Self::from_tag(&tag),
            serde_json::Value::Object(map) => SchemaNode::Nested(
                map.into_iter()
                    .map(|(k, v)| (k, SchemaNode::from_json(v)))
                    .collect(),
            ),
            other => SchemaNode::Unrecognized(other.to_string()),
        }
    }
}

impl From<PrimitiveTag> for SchemaNode {
    fn from(tag: PrimitiveTag) -> Self {
        SchemaNode::Primitive(tag)
    }
}

impl From<TypeRef> for SchemaNode {
    fn from(type_ref: TypeRef) -> Self {
        SchemaNode::Constructible(type_ref)
    }
}

impl From<&str> for SchemaNode {
    fn from(tag: &str) -> Self {
        SchemaNode::from_tag(tag)
    }
}

impl fmt::Display for SchemaNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaNode::Primitive(tag) => write!(f, "{tag}"),
            SchemaNode::Constructible(type_ref) => f.write_str(type_ref.type_name()),
            SchemaNode::Unrecognized(tag) => write!(f, "{tag}"),
            SchemaNode::Nested(fields) => {
                f.write_str("{")?;
                for (i, (name, node)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, " {name}: {node}")?;
                }
                f.write_str(" }")
            }
        }
    }
}

impl<'de> Deserialize<'de> for SchemaNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(SchemaNode::from_json)
    }
}

/// Mapping from top-level field name to its descriptor.
///
/// The field set is fixed once a store is built from it.
///
/// # Examples
///
/// ```
/// use shapestore::{PrimitiveTag, Schema, SchemaNode};
///
/// let schema = Schema::new()
///     .field("name", PrimitiveTag::String)
///     .field("profile", SchemaNode::nested([("city", PrimitiveTag::String)]));
/// assert_eq!(schema.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    fields: BTreeMap<String, SchemaNode>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a field.
    pub fn field(mut self, name: impl Into<String>, node: impl Into<SchemaNode>) -> Self {
        self.fields.insert(name.into(), node.into());
        self
    }

    /// Parse a schema from a JSON object of tag strings and nested objects.
    ///
    /// Constructible fields have no JSON form; add them with [`Schema::field`].
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn get(&self, name: &str) -> Option<&SchemaNode> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SchemaNode)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, N: Into<SchemaNode>> FromIterator<(K, N)> for Schema {
    fn from_iter<I: IntoIterator<Item = (K, N)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, n)| (k.into(), n.into()))
                .collect(),
        }
    }
}
