//! Entity instances and instance-time value checking
//!
//! Schema defects abort a registry build; messy values do not. Checking
//! an entity classifies its values and collects issues, it never fails:
//! callers decide whether to store, warn or reject.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{Model, ModelError};
use crate::types::{InvalidReason, Validity};

/// An instance of a resolved schema
///
/// All properties are multi-valued; values are kept as raw text and
/// classified on demand.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub schema: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Vec<String>>,
}

impl Entity {
    pub fn new(id: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            schema: schema.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Append a value to a property.
    pub fn add(&mut self, property: &str, value: impl Into<String>) {
        self.properties
            .entry(property.to_string())
            .or_default()
            .push(value.into());
    }

    /// All values of a property.
    pub fn values(&self, property: &str) -> &[String] {
        self.properties
            .get(property)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// First non-empty value of a property.
    pub fn first(&self, property: &str) -> Option<&str> {
        self.values(property)
            .iter()
            .map(String::as_str)
            .find(|value| !value.trim().is_empty())
    }
}

/// A raw value and what its type contract made of it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckedValue {
    pub normalized: String,
    pub validity: Validity,
}

/// What kind of problem an entity check found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueKind {
    /// Value failed its type contract
    Invalid(InvalidReason),
    /// Property is not defined on the schema
    UnknownProperty,
    /// Advisory required property carries no value
    MissingRequired,
}

/// One problem found while checking an entity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueIssue {
    pub property: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub kind: IssueKind,
}

impl Model {
    /// Check one raw value against a property's type contract, returning
    /// the normalized form alongside its validity. Fails only when the
    /// schema or property does not exist, which is caller error rather
    /// than dirty data.
    pub fn check_value(
        &self,
        schema: &str,
        property: &str,
        raw: &str,
    ) -> Result<CheckedValue, ModelError> {
        let resolved = self.get(schema)?;
        let Some(prop) = resolved.property(property) else {
            return Err(ModelError::UnknownProperty {
                schema: schema.to_string(),
                property: property.to_string(),
                context: "value check",
            });
        };
        let Some(property_type) = self.types().get(&prop.type_name) else {
            return Err(ModelError::UnknownPropertyType {
                schema: schema.to_string(),
                property: property.to_string(),
                type_name: prop.type_name.clone(),
            });
        };
        Ok(CheckedValue {
            normalized: property_type.normalize(raw),
            validity: property_type.validate(raw),
        })
    }

    /// Check every value of an entity, collecting issues. Entity
    /// references are not range-checked here since the referenced
    /// entity's schema is unknown; use [`Model::check_entity_with`].
    pub fn check_entity(&self, entity: &Entity) -> Result<Vec<ValueIssue>, ModelError> {
        self.check_entity_with(entity, |_| None)
    }

    /// Check an entity, resolving referenced entity ids to their schema
    /// names through `lookup` so entity references can be range-checked.
    /// A `None` from `lookup` skips the range check for that value.
    pub fn check_entity_with<F>(
        &self,
        entity: &Entity,
        lookup: F,
    ) -> Result<Vec<ValueIssue>, ModelError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let schema = self.get(&entity.schema)?;
        let mut issues = Vec::new();

        for (name, values) in &entity.properties {
            let Some(prop) = schema.property(name) else {
                issues.push(ValueIssue {
                    property: name.clone(),
                    value: None,
                    kind: IssueKind::UnknownProperty,
                });
                continue;
            };
            let Some(property_type) = self.types().get(&prop.type_name) else {
                continue;
            };
            for raw in values {
                let validity = match &prop.range {
                    Some(range) => match lookup(raw) {
                        Some(actual) if !self.is_a(&actual, range) => {
                            Validity::Invalid(InvalidReason::RangeMismatch)
                        }
                        _ => property_type.validate(raw),
                    },
                    None => property_type.validate(raw),
                };
                if let Validity::Invalid(reason) = validity {
                    issues.push(ValueIssue {
                        property: name.clone(),
                        value: Some(raw.clone()),
                        kind: IssueKind::Invalid(reason),
                    });
                }
            }
        }

        for required in &schema.required {
            if entity.first(required).is_none() {
                issues.push(ValueIssue {
                    property: required.clone(),
                    value: None,
                    kind: IssueKind::MissingRequired,
                });
            }
        }

        Ok(issues)
    }
}
