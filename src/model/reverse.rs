//! Reverse relation generation
//!
//! Runs only after every schema has been individually merged, so that
//! inherited entity references are already visible and each declared
//! reverse is generated exactly once, from its declaring schema rather
//! than from every subclass that inherits the forward property.

use std::collections::BTreeMap;

use crate::model::error::ModelError;
use crate::model::property::{Property, ReverseSpec};
use crate::model::schema::Schema;
use crate::types::ENTITY_TYPE;

/// Synthesize back-properties for every declared entity reference that
/// carries a reverse spec. Deterministic: pairs are processed in
/// lexicographic (schema, property) order, so rebuilding from the same
/// definitions yields identical generated properties.
pub(crate) fn generate_reverses(
    schemas: &mut BTreeMap<String, Schema>,
) -> Result<(), ModelError> {
    let mut pending: Vec<(String, String)> = Vec::new();
    for (name, schema) in schemas.iter() {
        for (prop_name, property) in &schema.properties {
            if property.defined_on == *name
                && !property.generated
                && property.range.is_some()
                && property.reverse.is_some()
            {
                pending.push((name.clone(), prop_name.clone()));
            }
        }
    }

    for (schema_name, prop_name) in pending {
        let Some(schema) = schemas.get(&schema_name) else {
            continue;
        };
        let Some(property) = schema.properties.get(&prop_name) else {
            continue;
        };
        let Some(range) = property.range.clone() else {
            continue;
        };
        let Some(spec) = property.reverse.clone() else {
            continue;
        };
        let forward_hidden = property.hidden;

        // the generated property lands on the target and every one of
        // its descendants, so the collision check covers them all
        let Some(target) = schemas.get(&range) else {
            return Err(ModelError::UnknownRangeSchema {
                schema: schema_name,
                property: prop_name,
                range,
            });
        };
        let mut affected: Vec<String> = vec![range.clone()];
        affected.extend(target.descendants.iter().cloned());

        for name in &affected {
            if let Some(candidate) = schemas.get(name) {
                if candidate.properties.contains_key(&spec.name) {
                    return Err(ModelError::ReverseCollision {
                        target: name.clone(),
                        name: spec.name.clone(),
                        origin: format!("{}:{}", schema_name, prop_name),
                    });
                }
            }
        }

        let generated = Property {
            name: spec.name.clone(),
            qname: format!("{}:{}", range, spec.name),
            defined_on: range.clone(),
            label: spec.label.clone().unwrap_or_else(|| spec.name.clone()),
            description: None,
            type_name: ENTITY_TYPE.to_string(),
            hidden: spec.hidden.unwrap_or(forward_hidden),
            caption: false,
            range: Some(schema_name.clone()),
            reverse: Some(ReverseSpec {
                name: prop_name.clone(),
                label: None,
                hidden: None,
            }),
            generated: true,
        };
        for name in &affected {
            if let Some(candidate) = schemas.get_mut(name) {
                candidate.generated_names.insert(spec.name.clone());
                candidate
                    .properties
                    .insert(spec.name.clone(), generated.clone());
            }
        }
    }
    Ok(())
}
