//! Inheritance resolution: cycle detection, linearization and merging
//!
//! Works on the whole batch at once; a schema cannot be resolved in
//! isolation because merging needs the full extends graph. The extends
//! relation is an explicit DAG over schema names; precedence comes from
//! a deterministic depth-first, left-to-right linearization, never from
//! any language-level inheritance mechanism.

use std::collections::{BTreeMap, BTreeSet};

use crate::descriptor::{DescriptorSet, PropertyDescriptor, SchemaDescriptor};
use crate::model::error::ModelError;
use crate::model::property::{Property, ReverseSpec};
use crate::model::schema::{EdgeSpec, Schema};
use crate::types::{TypeRegistry, DEFAULT_TYPE};

/// Resolve every schema in the batch. Shape, reference and type checks
/// run first, then the cycle check, then linearization and merging.
pub(crate) fn resolve_all(
    set: &DescriptorSet,
    types: &TypeRegistry,
) -> Result<BTreeMap<String, Schema>, ModelError> {
    for (name, descriptor) in set.iter() {
        descriptor.check_shape(name)?;
        check_references(name, descriptor, set, types)?;
    }
    check_cycles(set)?;

    let linearizations = linearize_all(set);
    let mut schemas = BTreeMap::new();
    for (name, descriptor) in set.iter() {
        let schema = merge(name, descriptor, set, &linearizations)?;
        schemas.insert(name.clone(), schema);
    }

    // descendant closure, inverse of the ancestor sets
    let mut descendants: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for (name, schema) in &schemas {
        for ancestor in &schema.ancestors {
            if ancestor != name {
                descendants
                    .entry(ancestor.clone())
                    .or_default()
                    .insert(name.clone());
            }
        }
    }
    for (name, subs) in descendants {
        if let Some(schema) = schemas.get_mut(&name) {
            schema.descendants = subs;
        }
    }

    Ok(schemas)
}

/// Every extends target, property type and range must resolve within
/// this batch before anything else happens.
fn check_references(
    name: &str,
    descriptor: &SchemaDescriptor,
    set: &DescriptorSet,
    types: &TypeRegistry,
) -> Result<(), ModelError> {
    for parent in &descriptor.extends {
        if !set.contains(parent) {
            return Err(ModelError::SchemaNotFound {
                name: parent.clone(),
                referenced_by: Some(name.to_string()),
            });
        }
    }
    for (prop_name, property) in &descriptor.properties {
        let type_name = property.type_name.as_deref().unwrap_or(DEFAULT_TYPE);
        let Some(property_type) = types.get(type_name) else {
            return Err(ModelError::UnknownPropertyType {
                schema: name.to_string(),
                property: prop_name.clone(),
                type_name: type_name.to_string(),
            });
        };
        if property_type.is_entity() {
            let Some(range) = &property.range else {
                return Err(ModelError::MalformedDescriptor {
                    schema: name.to_string(),
                    message: format!("entity property '{}' declares no range", prop_name),
                });
            };
            if !set.contains(range) {
                return Err(ModelError::UnknownRangeSchema {
                    schema: name.to_string(),
                    property: prop_name.clone(),
                    range: range.clone(),
                });
            }
        } else {
            if property.range.is_some() {
                return Err(ModelError::MalformedDescriptor {
                    schema: name.to_string(),
                    message: format!(
                        "property '{}' of type '{}' declares a range",
                        prop_name, type_name
                    ),
                });
            }
            if property.reverse.is_some() {
                return Err(ModelError::MalformedDescriptor {
                    schema: name.to_string(),
                    message: format!(
                        "property '{}' of type '{}' declares a reverse",
                        prop_name, type_name
                    ),
                });
            }
        }
    }
    Ok(())
}

/// Depth-first cycle check over the extends relation.
fn check_cycles(set: &DescriptorSet) -> Result<(), ModelError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        New,
        Active,
        Done,
    }

    fn visit<'a>(
        name: &'a str,
        set: &'a DescriptorSet,
        marks: &mut BTreeMap<&'a str, Mark>,
        stack: &mut Vec<&'a str>,
    ) -> Result<(), ModelError> {
        match marks.get(name).copied().unwrap_or(Mark::New) {
            Mark::Done => return Ok(()),
            Mark::Active => {
                let start = stack.iter().position(|n| *n == name).unwrap_or(0);
                let mut path: Vec<String> =
                    stack[start..].iter().map(|n| n.to_string()).collect();
                path.push(name.to_string());
                return Err(ModelError::CyclicInheritance { path });
            }
            Mark::New => {}
        }
        marks.insert(name, Mark::Active);
        stack.push(name);
        if let Some(descriptor) = set.get(name) {
            for parent in &descriptor.extends {
                visit(parent, set, marks, stack)?;
            }
        }
        stack.pop();
        marks.insert(name, Mark::Done);
        Ok(())
    }

    let mut marks = BTreeMap::new();
    let mut stack = Vec::new();
    for (name, _) in set.iter() {
        visit(name, set, &mut marks, &mut stack)?;
    }
    Ok(())
}

fn linearize_all(set: &DescriptorSet) -> BTreeMap<String, Vec<String>> {
    let mut done = BTreeMap::new();
    for (name, _) in set.iter() {
        linearize(name, set, &mut done);
    }
    done
}

/// Depth-first, left-to-right ancestor chain with repeated ancestors
/// deduplicated to their first (most specific) occurrence. Self comes
/// first; recursion is safe after the cycle check.
fn linearize(
    name: &str,
    set: &DescriptorSet,
    done: &mut BTreeMap<String, Vec<String>>,
) -> Vec<String> {
    if let Some(chain) = done.get(name) {
        return chain.clone();
    }
    let mut chain = vec![name.to_string()];
    let mut seen: BTreeSet<String> = chain.iter().cloned().collect();
    if let Some(descriptor) = set.get(name) {
        for parent in &descriptor.extends {
            for ancestor in linearize(parent, set, done) {
                if seen.insert(ancestor.clone()) {
                    chain.push(ancestor);
                }
            }
        }
    }
    done.insert(name.to_string(), chain.clone());
    chain
}

/// Neither declarer inherits from the other.
fn unrelated(a: &str, b: &str, linearizations: &BTreeMap<String, Vec<String>>) -> bool {
    if a == b {
        return false;
    }
    let a_sees_b = linearizations
        .get(a)
        .is_some_and(|chain| chain.iter().any(|n| n == b));
    let b_sees_a = linearizations
        .get(b)
        .is_some_and(|chain| chain.iter().any(|n| n == a));
    !a_sees_b && !b_sees_a
}

/// Merge one schema along its linearization.
fn merge(
    name: &str,
    descriptor: &SchemaDescriptor,
    set: &DescriptorSet,
    linearizations: &BTreeMap<String, Vec<String>>,
) -> Result<Schema, ModelError> {
    let chain: &[String] = linearizations.get(name).map(Vec::as_slice).unwrap_or(&[]);

    // flags: most specific declaration wins, root default false
    let abstract_ = merge_flag(chain, set, |d| d.abstract_);
    let generated = merge_flag(chain, set, |d| d.generated);
    let matchable = merge_flag(chain, set, |d| d.matchable);

    // lists: most-specific-first concatenation, first occurrence kept,
    // so own declarations can pull inherited entries to the front
    let featured = merge_list(chain, set, |d| &d.featured);
    let required = merge_list(chain, set, |d| &d.required);
    let caption = merge_list(chain, set, |d| &d.caption);

    // properties: walk from least specific to most specific so each
    // later declaration fully replaces the earlier one; own properties
    // are applied last and always win
    let mut properties: BTreeMap<String, Property> = BTreeMap::new();
    for ancestor in chain.iter().rev() {
        let Some(ancestor_descriptor) = set.get(ancestor) else {
            continue;
        };
        for (prop_name, prop_descriptor) in &ancestor_descriptor.properties {
            if let Some(existing) = properties.get(prop_name) {
                let new_type = prop_descriptor
                    .type_name
                    .as_deref()
                    .unwrap_or(DEFAULT_TYPE);
                if unrelated(&existing.defined_on, ancestor, linearizations)
                    && existing.type_name != new_type
                {
                    return Err(ModelError::PropertyConflict {
                        schema: name.to_string(),
                        property: prop_name.clone(),
                        first: format!("{}:{}", existing.defined_on, prop_name),
                        first_type: existing.type_name.clone(),
                        second: format!("{}:{}", ancestor, prop_name),
                        second_type: new_type.to_string(),
                    });
                }
            }
            properties.insert(
                prop_name.clone(),
                resolve_property(ancestor, prop_name, prop_descriptor),
            );
        }
    }

    let label = descriptor
        .label
        .clone()
        .unwrap_or_else(|| name.to_string());
    let plural = descriptor.plural.clone().unwrap_or_else(|| label.clone());
    let edge = descriptor.edge.as_ref().map(|edge| EdgeSpec {
        source: edge.source.clone(),
        target: edge.target.clone(),
        caption: edge.caption.clone(),
        label: edge.label.clone().unwrap_or_else(|| label.clone()),
        directed: edge.directed.unwrap_or(true),
    });

    Ok(Schema {
        name: name.to_string(),
        label,
        plural,
        description: descriptor.description.clone(),
        extends: descriptor.extends.clone(),
        linearization: chain.to_vec(),
        ancestors: chain.iter().cloned().collect(),
        descendants: BTreeSet::new(),
        abstract_,
        generated,
        matchable,
        featured,
        required,
        caption,
        edge,
        properties,
        own: descriptor.properties.keys().cloned().collect(),
        generated_names: BTreeSet::new(),
    })
}

fn merge_flag<F>(chain: &[String], set: &DescriptorSet, pick: F) -> bool
where
    F: Fn(&SchemaDescriptor) -> Option<bool>,
{
    for ancestor in chain {
        if let Some(declared) = set.get(ancestor).and_then(&pick) {
            return declared;
        }
    }
    false
}

fn merge_list<'a, F>(chain: &[String], set: &'a DescriptorSet, pick: F) -> Vec<String>
where
    F: Fn(&'a SchemaDescriptor) -> &'a Vec<String>,
{
    let mut merged: Vec<String> = Vec::new();
    for ancestor in chain {
        if let Some(descriptor) = set.get(ancestor) {
            for entry in pick(descriptor) {
                if !merged.contains(entry) {
                    merged.push(entry.clone());
                }
            }
        }
    }
    merged
}

fn resolve_property(schema: &str, name: &str, descriptor: &PropertyDescriptor) -> Property {
    Property {
        name: name.to_string(),
        qname: format!("{}:{}", schema, name),
        defined_on: schema.to_string(),
        label: descriptor
            .label
            .clone()
            .unwrap_or_else(|| name.to_string()),
        description: descriptor.description.clone(),
        type_name: descriptor
            .type_name
            .clone()
            .unwrap_or_else(|| DEFAULT_TYPE.to_string()),
        hidden: descriptor.hidden,
        caption: descriptor.caption,
        range: descriptor.range.clone(),
        reverse: descriptor.reverse.as_ref().map(|reverse| ReverseSpec {
            name: reverse.name.clone(),
            label: reverse.label.clone(),
            hidden: reverse.hidden,
        }),
        generated: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader;

    fn descriptors(yaml: &str) -> DescriptorSet {
        loader::from_str(yaml, "test.yaml").unwrap()
    }

    fn resolve(yaml: &str) -> BTreeMap<String, Schema> {
        resolve_all(&descriptors(yaml), &TypeRegistry::builtin()).unwrap()
    }

    #[test]
    fn test_linearization_is_depth_first_left_to_right() {
        let schemas = resolve(
            r#"
Thing: {}
Document:
  extends: Thing
Folder:
  extends: Document
PlainText:
  extends: Document
Email:
  extends: [Folder, PlainText]
"#,
        );
        assert_eq!(
            schemas["Email"].linearization,
            vec!["Email", "Folder", "Document", "Thing", "PlainText"]
        );
    }

    #[test]
    fn test_own_properties_win() {
        let schemas = resolve(
            r#"
Thing:
  properties:
    name:
      label: Name
Person:
  extends: Thing
  properties:
    name:
      label: Full name
"#,
        );
        let name = &schemas["Person"].properties["name"];
        assert_eq!(name.label, "Full name");
        assert_eq!(name.defined_on, "Person");
        assert_eq!(name.qname, "Person:name");
    }

    #[test]
    fn test_unrelated_declarers_same_type_take_left_branch() {
        let schemas = resolve(
            r#"
Left:
  properties:
    note:
      label: Left note
Right:
  properties:
    note:
      label: Right note
Both:
  extends: [Left, Right]
"#,
        );
        // Left is more specific in the linearization of Both
        assert_eq!(schemas["Both"].properties["note"].label, "Left note");
    }

    #[test]
    fn test_unrelated_declarers_different_types_conflict() {
        let err = resolve_all(
            &descriptors(
                r#"
Left:
  properties:
    amount:
      type: number
Right:
  properties:
    amount:
      type: identifier
Both:
  extends: [Left, Right]
"#,
            ),
            &TypeRegistry::builtin(),
        )
        .unwrap_err();
        match err {
            ModelError::PropertyConflict {
                schema, property, ..
            } => {
                assert_eq!(schema, "Both");
                assert_eq!(property, "amount");
            }
            other => panic!("expected PropertyConflict, got {other:?}"),
        }
    }

    #[test]
    fn test_related_declarers_may_change_type() {
        let schemas = resolve(
            r#"
Base:
  properties:
    code:
      type: string
Refined:
  extends: Base
  properties:
    code:
      type: identifier
User:
  extends: Refined
"#,
        );
        assert_eq!(schemas["User"].properties["code"].type_name, "identifier");
    }

    #[test]
    fn test_flags_most_specific_wins() {
        let schemas = resolve(
            r#"
Thing:
  abstract: true
  matchable: true
Person:
  extends: Thing
  abstract: false
Employee:
  extends: Person
"#,
        );
        assert!(!schemas["Employee"].abstract_);
        assert!(schemas["Employee"].matchable);
        assert!(!schemas["Employee"].generated);
    }

    #[test]
    fn test_list_merge_puts_own_entries_first() {
        let schemas = resolve(
            r#"
Thing:
  featured: [name, summary]
  properties:
    name: {}
    summary: {}
Person:
  extends: Thing
  featured: [summary, birthDate]
  properties:
    birthDate:
      type: date
"#,
        );
        assert_eq!(
            schemas["Person"].featured,
            vec!["summary", "birthDate", "name"]
        );
    }

    #[test]
    fn test_cycle_is_rejected() {
        let err = resolve_all(
            &descriptors("A:\n  extends: B\nB:\n  extends: A\n"),
            &TypeRegistry::builtin(),
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::CyclicInheritance { .. }));
    }

    #[test]
    fn test_unknown_parent_is_rejected() {
        let err = resolve_all(
            &descriptors("A:\n  extends: Missing\n"),
            &TypeRegistry::builtin(),
        )
        .unwrap_err();
        match err {
            ModelError::SchemaNotFound {
                name,
                referenced_by,
            } => {
                assert_eq!(name, "Missing");
                assert_eq!(referenced_by.as_deref(), Some("A"));
            }
            other => panic!("expected SchemaNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let err = resolve_all(
            &descriptors("A:\n  properties:\n    x:\n      type: hologram\n"),
            &TypeRegistry::builtin(),
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::UnknownPropertyType { .. }));
    }

    #[test]
    fn test_entity_property_requires_range() {
        let err = resolve_all(
            &descriptors("A:\n  properties:\n    other:\n      type: entity\n"),
            &TypeRegistry::builtin(),
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::MalformedDescriptor { .. }));
    }

    #[test]
    fn test_range_on_scalar_property_is_rejected() {
        let err = resolve_all(
            &descriptors(
                "A: {}\nB:\n  properties:\n    x:\n      type: string\n      range: A\n",
            ),
            &TypeRegistry::builtin(),
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::MalformedDescriptor { .. }));
    }

    #[test]
    fn test_descendant_closure() {
        let schemas = resolve(
            r#"
Thing: {}
LegalEntity:
  extends: Thing
Person:
  extends: LegalEntity
"#,
        );
        let thing: Vec<_> = schemas["Thing"].descendants.iter().cloned().collect();
        assert_eq!(thing, vec!["LegalEntity", "Person"]);
        assert!(schemas["Person"].descendants.is_empty());
        assert!(schemas["Person"].is_a("Thing"));
        assert!(schemas["Person"].is_a("Person"));
        assert!(!schemas["Thing"].is_a("Person"));
    }
}
