//! The frozen schema registry
//!
//! [`Model::resolve`] runs the whole build pipeline on a descriptor
//! batch and either yields a frozen registry or fails with the first
//! violated rule; no partially resolved state is ever observable. A
//! rebuild produces a new value, nothing is mutated in place, and the
//! frozen value is safe to share across threads without locking.

use std::collections::{BTreeMap, BTreeSet};

use crate::descriptor::DescriptorSet;
use crate::loader;
use crate::model::error::ModelError;
use crate::model::property::Property;
use crate::model::resolver;
use crate::model::reverse;
use crate::model::schema::Schema;
use crate::types::TypeRegistry;

/// Frozen registry of resolved schemas
#[derive(Debug)]
pub struct Model {
    schemas: BTreeMap<String, Schema>,
    types: TypeRegistry,
    /// Range schema name to the schemas referencing it
    referencing: BTreeMap<String, BTreeSet<String>>,
}

impl Model {
    /// Resolve a full descriptor batch into a frozen registry.
    pub fn resolve(set: DescriptorSet, types: TypeRegistry) -> Result<Self, ModelError> {
        let mut schemas = resolver::resolve_all(&set, &types)?;
        reverse::generate_reverses(&mut schemas)?;
        check_listed_properties(&schemas)?;
        let referencing = build_reference_index(&schemas);
        Ok(Self {
            schemas,
            types,
            referencing,
        })
    }

    /// Resolve with the built-in property types.
    pub fn from_descriptors(set: DescriptorSet) -> Result<Self, ModelError> {
        Self::resolve(set, TypeRegistry::builtin())
    }

    /// The definition corpus shipped with the crate, resolved with the
    /// built-in property types.
    pub fn embedded() -> Result<Self, loader::LoadError> {
        let set = loader::embedded_set()?;
        Ok(Self::from_descriptors(set)?)
    }

    pub fn get(&self, name: &str) -> Result<&Schema, ModelError> {
        self.schemas
            .get(name)
            .ok_or_else(|| ModelError::not_found(name))
    }

    pub fn schema(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name)
    }

    /// Is `name` equal to, or a descendant of, `ancestor`?
    pub fn is_a(&self, name: &str, ancestor: &str) -> bool {
        self.schemas
            .get(name)
            .is_some_and(|schema| schema.is_a(ancestor))
    }

    /// Merged property map of a schema: own, inherited and generated.
    pub fn properties_of(&self, name: &str) -> Result<&BTreeMap<String, Property>, ModelError> {
        Ok(&self.get(name)?.properties)
    }

    /// Schemas whose declared properties reference `name` as a range.
    pub fn schemas_referencing(&self, name: &str) -> BTreeSet<&str> {
        self.referencing
            .get(name)
            .map(|names| names.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn schemas(&self) -> impl Iterator<Item = &Schema> {
        self.schemas.values()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Schema names an instance of `name` may be matched against: the
    /// schema itself, its ancestors and its descendants, filtered to
    /// matchable ones. Empty when the schema itself is not matchable.
    pub fn matchable_set(&self, name: &str) -> Result<BTreeSet<&str>, ModelError> {
        let schema = self.get(name)?;
        let mut result = BTreeSet::new();
        if !schema.matchable {
            return Ok(result);
        }
        for candidate in schema.ancestors.iter().chain(schema.descendants.iter()) {
            if let Some(other) = self.schemas.get(candidate) {
                if other.matchable {
                    result.insert(other.name.as_str());
                }
            }
        }
        Ok(result)
    }
}

/// Merged featured/caption/required entries and edge endpoints must all
/// name existing properties. Runs after reverse generation so a schema
/// may deliberately feature a generated property.
fn check_listed_properties(schemas: &BTreeMap<String, Schema>) -> Result<(), ModelError> {
    for (name, schema) in schemas {
        let lists: [(&Vec<String>, &'static str); 3] = [
            (&schema.featured, "featured"),
            (&schema.caption, "caption"),
            (&schema.required, "required"),
        ];
        for (list, context) in lists {
            for property in list {
                if !schema.properties.contains_key(property) {
                    return Err(ModelError::UnknownProperty {
                        schema: name.clone(),
                        property: property.clone(),
                        context,
                    });
                }
            }
        }
        if let Some(edge) = &schema.edge {
            let endpoints: [(&String, &'static str); 2] = [
                (&edge.source, "edge source"),
                (&edge.target, "edge target"),
            ];
            for (endpoint, context) in endpoints {
                match schema.properties.get(endpoint) {
                    Some(property) if property.is_entity() => {}
                    _ => {
                        return Err(ModelError::UnknownProperty {
                            schema: name.clone(),
                            property: endpoint.clone(),
                            context,
                        })
                    }
                }
            }
            for property in &edge.caption {
                if !schema.properties.contains_key(property) {
                    return Err(ModelError::UnknownProperty {
                        schema: name.clone(),
                        property: property.clone(),
                        context: "edge caption",
                    });
                }
            }
        }
    }
    Ok(())
}

/// Exact range name to the schemas declaring a reference with it.
/// Generated reverses are mirrors, not references, and stay out.
fn build_reference_index(
    schemas: &BTreeMap<String, Schema>,
) -> BTreeMap<String, BTreeSet<String>> {
    let mut index: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for (name, schema) in schemas {
        for property in schema.properties.values() {
            if property.generated {
                continue;
            }
            if let Some(range) = &property.range {
                index
                    .entry(range.clone())
                    .or_default()
                    .insert(name.clone());
            }
        }
    }
    index
}
