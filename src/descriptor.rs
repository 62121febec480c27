//! Raw schema descriptors, the unresolved input to a registry build
//!
//! A descriptor is plain data deserialized from a generic mapping tree
//! (YAML in practice). The only logic here is shape validation: the
//! structural checks that must hold before resolution even starts.
//! Unknown keys are ignored for forward compatibility.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::model::ModelError;

/// Accept either a single scalar or a sequence of scalars for `extends`.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(name) => vec![name],
        OneOrMany::Many(names) => names,
    })
}

/// Back-property requested by an entity-reference property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReverseDescriptor {
    /// Name of the property to synthesize on the range schema
    pub name: String,

    /// Label for the synthesized property; defaults to its name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Hidden flag for the synthesized property; defaults to the forward
    /// property's hidden flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
}

/// Edge representation of a schema for property-graph projection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeDescriptor {
    /// Property holding the edge source
    pub source: String,

    /// Property holding the edge target
    pub target: String,

    /// Properties contributing to the edge caption
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub caption: Vec<String>,

    /// Edge label; defaults to the schema label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Directed edge; defaults to true
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directed: Option<bool>,
}

/// A single property as authored
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyDescriptor {
    /// Display label; defaults to the property name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Name into the property type registry; absent means plain text
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,

    /// Excluded from default presentation, not from storage
    pub hidden: bool,

    /// Shortcut marking this property as a caption candidate
    pub caption: bool,

    /// Target schema; only valid on entity-reference properties
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,

    /// Back-property to synthesize on the range schema
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reverse: Option<ReverseDescriptor>,
}

/// A raw schema definition, keyed by name in a [`DescriptorSet`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaDescriptor {
    /// Display label; defaults to the schema name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Plural label; defaults to the label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plural: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Parent schemas in declared precedence order; accepts a single
    /// name or a list
    #[serde(
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub extends: Vec<String>,

    /// Not instantiated directly, only through descendants
    #[serde(rename = "abstract", skip_serializing_if = "Option::is_none")]
    pub abstract_: Option<bool>,

    /// Instances are derived by the system rather than authored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated: Option<bool>,

    /// Instances are eligible for cross-record matching
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matchable: Option<bool>,

    /// Properties prioritized for default display, in order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub featured: Vec<String>,

    /// Advisory list of properties an authored instance should carry
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    /// Caption candidates in priority order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub caption: Vec<String>,

    /// Edge projection of this schema
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge: Option<EdgeDescriptor>,

    /// Property definitions by name
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, PropertyDescriptor>,
}

/// Leading ASCII letter, then letters, digits or underscores.
pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl SchemaDescriptor {
    /// Structural checks that must pass before resolution begins.
    pub fn check_shape(&self, schema: &str) -> Result<(), ModelError> {
        let malformed = |message: String| ModelError::MalformedDescriptor {
            schema: schema.to_string(),
            message,
        };

        if !is_identifier(schema) {
            return Err(malformed(format!(
                "schema name '{}' is not a valid identifier",
                schema
            )));
        }
        for (name, property) in &self.properties {
            if !is_identifier(name) {
                return Err(malformed(format!(
                    "property name '{}' is not a valid identifier",
                    name
                )));
            }
            if let Some(reverse) = &property.reverse {
                if !is_identifier(&reverse.name) {
                    return Err(malformed(format!(
                        "reverse name '{}' on property '{}' is not a valid identifier",
                        reverse.name, name
                    )));
                }
            }
        }
        if let Some(edge) = &self.edge {
            if edge.source.is_empty() || edge.target.is_empty() {
                return Err(malformed(
                    "edge declaration must name both a source and a target property".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// The full batch of raw definitions for one registry build
///
/// Definitions are supplied as a whole batch because inheritance
/// resolution needs the entire extends graph to be visible; forward
/// references between descriptors are fine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DescriptorSet {
    schemas: BTreeMap<String, SchemaDescriptor>,
}

impl DescriptorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a definition. A name already present is rejected; use
    /// [`DescriptorSet::replace`] to overwrite deliberately.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        descriptor: SchemaDescriptor,
    ) -> Result<(), ModelError> {
        let name = name.into();
        if self.schemas.contains_key(&name) {
            return Err(ModelError::DuplicateSchema { schema: name });
        }
        self.schemas.insert(name, descriptor);
        Ok(())
    }

    /// Add or overwrite a definition.
    pub fn replace(&mut self, name: impl Into<String>, descriptor: SchemaDescriptor) {
        self.schemas.insert(name.into(), descriptor);
    }

    /// Fold another batch into this one. Duplicate names are rejected.
    pub fn merge(&mut self, other: DescriptorSet) -> Result<(), ModelError> {
        for (name, descriptor) in other.schemas {
            self.insert(name, descriptor)?;
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&SchemaDescriptor> {
        self.schemas.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SchemaDescriptor)> {
        self.schemas.iter()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
