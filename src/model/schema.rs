//! Resolved schemas

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::model::property::Property;

/// Resolved edge projection of a schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeSpec {
    /// Property holding the edge source
    pub source: String,

    /// Property holding the edge target
    pub target: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub caption: Vec<String>,

    pub label: String,

    pub directed: bool,
}

/// A fully resolved, frozen schema
///
/// Constructed only by the build pipeline; after the registry is
/// published all access is by shared reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schema {
    pub name: String,
    pub label: String,
    pub plural: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Direct parents, declared order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extends: Vec<String>,

    /// Ancestor chain, self first, most specific to least specific
    pub linearization: Vec<String>,

    /// Self plus every ancestor
    pub ancestors: BTreeSet<String>,

    /// Every schema that inherits from this one, directly or not
    pub descendants: BTreeSet<String>,

    #[serde(rename = "abstract")]
    pub abstract_: bool,
    pub generated: bool,
    pub matchable: bool,

    /// Merged display lists, own entries first
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub featured: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub caption: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge: Option<EdgeSpec>,

    /// Merged property map: own, inherited and generated
    pub properties: BTreeMap<String, Property>,

    /// Names declared by this schema itself
    pub own: BTreeSet<String>,

    /// Names of generated reverse properties visible on this schema
    pub generated_names: BTreeSet<String>,
}

impl Schema {
    /// Is this schema equal to, or a descendant of, `ancestor`?
    pub fn is_a(&self, ancestor: &str) -> bool {
        self.ancestors.contains(ancestor)
    }

    /// Look up a property in the merged map.
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    /// Entity-reference properties in the merged map.
    pub fn references(&self) -> impl Iterator<Item = &Property> {
        self.properties.values().filter(|p| p.is_entity())
    }

    /// Edge source property, when this schema is edge-declared.
    pub fn edge_source(&self) -> Option<&Property> {
        self.edge
            .as_ref()
            .and_then(|edge| self.properties.get(&edge.source))
    }

    /// Edge target property, when this schema is edge-declared.
    pub fn edge_target(&self) -> Option<&Property> {
        self.edge
            .as_ref()
            .and_then(|edge| self.properties.get(&edge.target))
    }
}
