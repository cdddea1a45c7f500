//! Declared record types and their association with mapping nodes.
//!
//! A [`Schema`] enumerates permitted field names, each field's declared
//! [`FieldType`] and an optional default. Schemas are bound to mapping nodes
//! explicitly (the node carries an `Arc<Schema>`), so no runtime patching is
//! involved and type information travels with the tree through merge and
//! resolution.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::MainspringError;
use crate::node::{ConfigNode, MappingNode};
use crate::MainspringResult;

/// Declared type of a schema field.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldType {
    /// Null only.
    Null,
    /// Boolean.
    Bool,
    /// Signed integer.
    Int,
    /// Floating-point number.
    Float,
    /// String.
    Str,
    /// Homogeneous sequence of the element type.
    Sequence(Box<FieldType>),
    /// Nested record described by a schema.
    Record(Arc<Schema>),
    /// One of several types. `Null` members express optionality.
    Union(Vec<FieldType>),
    /// No constraint.
    Any,
}

impl FieldType {
    /// Strip `Null` from a union. If exactly one concrete member remains,
    /// that member is "the" type; otherwise the remaining union is reported
    /// as-is. Non-union types pass through unchanged.
    #[must_use]
    pub fn unwrap_optional(&self) -> FieldType {
        match self {
            Self::Union(members) => {
                let mut remaining: Vec<FieldType> = members
                    .iter()
                    .filter(|m| !matches!(m, Self::Null))
                    .cloned()
                    .collect();
                match remaining.len() {
                    0 => Self::Null,
                    1 => remaining.remove(0),
                    _ => Self::Union(remaining),
                }
            }
            other => other.clone(),
        }
    }

    /// The record schema this type declares, if stripping optionality
    /// leaves exactly one record.
    #[must_use]
    pub fn record(&self) -> Option<Arc<Schema>> {
        match self.unwrap_optional() {
            Self::Record(s) => Some(s),
            _ => None,
        }
    }
}

/// A single declared field: its type and optional default value.
#[derive(Clone, Debug)]
pub struct FieldSpec {
    ty: FieldType,
    default: Option<ConfigNode>,
}

impl FieldSpec {
    /// Declared type of the field.
    #[must_use]
    pub const fn ty(&self) -> &FieldType {
        &self.ty
    }

    /// Default value of the field, if one was declared.
    #[must_use]
    pub const fn default(&self) -> Option<&ConfigNode> {
        self.default.as_ref()
    }
}

/// A declared record type: permitted field names, their types and defaults.
#[derive(Debug)]
pub struct Schema {
    name: String,
    open: bool,
    fields: IndexMap<String, FieldSpec>,
}

impl Schema {
    /// Start building a schema named `name`.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            open: false,
            fields: IndexMap::new(),
        }
    }

    /// Name of the record type.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether undeclared keys are permitted when merging into a mapping
    /// bound to this schema.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.open
    }

    /// The declared field named `key`.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&FieldSpec> {
        self.fields.get(key)
    }

    /// Declared field names, in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }
}

// Schemas compare by name; the registry enforces one definition per name.
impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// Builder for [`Schema`].
pub struct SchemaBuilder {
    name: String,
    open: bool,
    fields: IndexMap<String, FieldSpec>,
}

impl SchemaBuilder {
    /// Declare a field with no default. During instantiation it becomes a
    /// missing marker.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.fields.insert(name.into(), FieldSpec { ty, default: None });
        self
    }

    /// Declare a field with a default value. String defaults that look like
    /// `${...}` become interpolation markers during instantiation, so pass
    /// defaults through [`ConfigNode::from_text`] semantics by converting
    /// with `ConfigNode::from` or [`crate::from_value`].
    #[must_use]
    pub fn field_with_default(
        mut self,
        name: impl Into<String>,
        ty: FieldType,
        default: ConfigNode,
    ) -> Self {
        self.fields.insert(
            name.into(),
            FieldSpec {
                ty,
                default: Some(default),
            },
        );
        self
    }

    /// Permit keys the schema does not declare.
    #[must_use]
    pub const fn open(mut self) -> Self {
        self.open = true;
        self
    }

    /// Finish the schema.
    #[must_use]
    pub fn build(self) -> Arc<Schema> {
        Arc::new(Schema {
            name: self.name,
            open: self.open,
            fields: self.fields,
        })
    }
}

/// Instantiate a mapping node from `schema`, using field defaults.
///
/// Fields with no default become missing markers; record-typed fields whose
/// default is absent are also left missing (the merge engine seeds them on
/// demand).
#[must_use]
pub fn from_schema(schema: &Arc<Schema>) -> ConfigNode {
    let mut node = MappingNode::with_schema(Arc::clone(schema));
    for (name, spec) in &schema.fields {
        let value = match spec.default() {
            Some(default) => {
                let mut v = default.clone();
                // A record-typed default built without a binding picks up
                // its declared schema here.
                if let (Some(record), Some(m)) = (spec.ty().record(), v.as_mapping_mut()) {
                    if m.schema().is_none() {
                        m.bind_schema(record);
                    }
                }
                v
            }
            None => ConfigNode::Missing,
        };
        node.insert(name.clone(), value);
    }
    ConfigNode::Mapping(node)
}

/// Declared type of `key` within `node`.
///
/// Prefers the concrete schema bound to the value at `key` (when the value
/// is itself a bound mapping) over the field's declared annotation, which
/// may be a union. Returns `None` when no schema information is available;
/// callers must treat that as "no special handling", never as a failure.
#[must_use]
pub fn declared_type(node: &MappingNode, key: &str) -> Option<FieldType> {
    if let Some(ConfigNode::Mapping(m)) = node.get(key) {
        if let Some(bound) = m.schema() {
            return Some(FieldType::Record(Arc::clone(bound)));
        }
    }
    node.schema()
        .and_then(|s| s.field(key))
        .map(|f| f.ty().unwrap_optional())
}

/// Process-scoped registry of named schemas.
///
/// Construct fresh instances in tests; nothing here is global.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    entries: HashMap<String, Arc<Schema>>,
}

impl SchemaRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `schema` under its own name.
    ///
    /// # Errors
    ///
    /// Returns [`MainspringError::InvalidInput`] if the name is taken.
    pub fn register(&mut self, schema: Arc<Schema>) -> MainspringResult<()> {
        let name = schema.name().to_owned();
        if self.entries.contains_key(&name) {
            return Err(Arc::new(MainspringError::invalid_input(format!(
                "schema `{name}` is already registered"
            ))));
        }
        self.entries.insert(name, schema);
        Ok(())
    }

    /// Look up a schema by name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&Arc<Schema>> {
        self.entries.get(name)
    }
}
