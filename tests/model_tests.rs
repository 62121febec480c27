//! Integration tests for the schema registry
//!
//! These exercise the full pipeline end to end: loading definition
//! batches, resolving inheritance, generating reverse relations and
//! querying the frozen registry.

use std::fs;

use modelkit::entity::Entity;
use modelkit::loader;
use modelkit::model::{Model, ModelError};
use modelkit::types::{InvalidReason, TypeRegistry, Validity};
use tempfile::tempdir;

fn embedded() -> Model {
    Model::embedded().unwrap()
}

fn resolve(yaml: &str) -> Result<Model, ModelError> {
    let set = loader::from_str(yaml, "inline.yaml").unwrap();
    Model::from_descriptors(set)
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn test_resolving_twice_yields_identical_schemas() {
    let first = embedded();
    let second = embedded();
    assert_eq!(first.len(), second.len());
    for schema in first.schemas() {
        let other = second.get(&schema.name).unwrap();
        assert_eq!(schema, other);
    }
}

// ============================================================================
// Multi-parent inheritance
// ============================================================================

#[test]
fn test_email_merges_all_three_parents() {
    let model = embedded();
    let email = model.get("Email").unwrap();

    assert_eq!(
        email.linearization,
        vec![
            "Email",
            "Folder",
            "Document",
            "Thing",
            "PlainText",
            "HyperText"
        ]
    );

    // one copy of every non-conflicting parent property
    for inherited in [
        "name",       // Thing
        "title",      // Document
        "parent",     // Document, via Folder
        "bodyText",   // PlainText
        "bodyHtml",   // HyperText
    ] {
        assert!(
            email.properties.contains_key(inherited),
            "missing inherited property {inherited}"
        );
    }

    // own declarations win over anything inherited
    let subject = email.property("subject").unwrap();
    assert_eq!(subject.defined_on, "Email");
    assert_eq!(subject.qname, "Email:subject");
}

#[test]
fn test_inheritance_closure() {
    let model = embedded();
    let document = model.get("Document").unwrap();
    let email_properties = model.properties_of("Email").unwrap();
    for name in document.properties.keys() {
        assert!(
            email_properties.contains_key(name),
            "Email lost inherited property {name}"
        );
    }
}

#[test]
fn test_is_a_across_the_corpus() {
    let model = embedded();
    assert!(model.is_a("Email", "Document"));
    assert!(model.is_a("Email", "Thing"));
    assert!(model.is_a("Company", "LegalEntity"));
    assert!(!model.is_a("Company", "Document"));
    assert!(model.is_a("Thing", "Thing"));
}

// ============================================================================
// Reverse relations
// ============================================================================

#[test]
fn test_reverse_symmetry() {
    let model = embedded();

    // Document.parent -> Folder yields Folder.children
    let children = model.get("Folder").unwrap().property("children").unwrap();
    assert!(children.generated);
    assert_eq!(children.range.as_deref(), Some("Document"));
    assert_eq!(
        children.reverse.as_ref().map(|r| r.name.as_str()),
        Some("parent")
    );

    // and the generated property is visible on descendants of the target
    assert!(model
        .properties_of("Email")
        .unwrap()
        .contains_key("children"));

    // BankAccount.owner -> LegalEntity yields bankAccounts on the whole tree
    for holder in ["LegalEntity", "Person", "Organization", "Company"] {
        let schema = model.get(holder).unwrap();
        assert!(schema.properties.contains_key("bankAccounts"));
        assert!(schema.generated_names.contains("bankAccounts"));
    }
}

#[test]
fn test_reverse_absent_without_a_spec() {
    let model = resolve(
        r#"
Target:
  properties:
    name: {}
Source:
  properties:
    link:
      type: entity
      range: Target
"#,
    )
    .unwrap();
    // no reverse spec, no generated property
    let target = model.get("Target").unwrap();
    assert_eq!(target.properties.len(), 1);
    assert!(target.generated_names.is_empty());
}

#[test]
fn test_reverse_collision_fails_the_build() {
    let err = resolve(
        r#"
Target:
  properties:
    holdings: {}
Source:
  properties:
    held:
      type: entity
      range: Target
      reverse:
        name: holdings
"#,
    )
    .unwrap_err();
    match err {
        ModelError::ReverseCollision {
            target,
            name,
            origin,
        } => {
            assert_eq!(target, "Target");
            assert_eq!(name, "holdings");
            assert_eq!(origin, "Source:held");
        }
        other => panic!("expected ReverseCollision, got {other:?}"),
    }
}

// ============================================================================
// Cycles and conflicts
// ============================================================================

#[test]
fn test_cycle_produces_no_registry() {
    let err = resolve("A:\n  extends: B\nB:\n  extends: A\n").unwrap_err();
    assert!(matches!(err, ModelError::CyclicInheritance { .. }));
}

#[test]
fn test_sibling_type_conflict_fails_the_build() {
    let err = resolve(
        r#"
Left:
  properties:
    stamp:
      type: date
Right:
  properties:
    stamp:
      type: number
Child:
  extends: [Left, Right]
"#,
    )
    .unwrap_err();
    assert!(matches!(err, ModelError::PropertyConflict { .. }));
}

// ============================================================================
// Value checking
// ============================================================================

#[test]
fn test_iban_values_are_classified_not_rejected() {
    let model = embedded();

    let good = model
        .check_value("BankAccount", "iban", "DE44500105175407324931")
        .unwrap();
    assert_eq!(good.validity, Validity::Valid);

    let bad = model.check_value("BankAccount", "iban", "DE00123").unwrap();
    assert_eq!(bad.validity, Validity::Invalid(InvalidReason::BadFormat));
    // the invalid value is retained in normalized form
    assert_eq!(bad.normalized, "DE00123");
}

#[test]
fn test_dirty_entity_is_stored_with_issues() {
    let model = embedded();
    let mut account = Entity::new("acc-1", "BankAccount");
    account.add("iban", "DE00123");
    account.add("name", "Slush fund");

    let issues = model.check_entity(&account).unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].property, "iban");
    // the entity itself still carries the flagged value
    assert_eq!(account.first("iban"), Some("DE00123"));
}

// ============================================================================
// Presentation
// ============================================================================

#[test]
fn test_email_caption_priority() {
    let model = embedded();
    let email = model.get("Email").unwrap();
    assert_eq!(
        email.caption,
        vec!["subject", "threadTopic", "title", "name", "fileName"]
    );

    let mut message = Entity::new("msg-1", "Email");
    message.add("subject", "");
    message.add("threadTopic", "Board minutes");
    assert_eq!(email.caption(&message), Some("Board minutes"));
}

#[test]
fn test_featured_values_follow_merged_order() {
    let model = embedded();
    let email = model.get("Email").unwrap();

    let mut message = Entity::new("msg-2", "Email");
    message.add("sender", "treasury@example.com");
    message.add("title", "fwd.eml");

    let names: Vec<&str> = email
        .featured_values(&message)
        .iter()
        .map(|(property, _)| property.name.as_str())
        .collect();
    assert_eq!(names, vec!["sender", "title"]);
}

// ============================================================================
// Registry queries
// ============================================================================

#[test]
fn test_schemas_referencing() {
    let model = embedded();
    let referencing = model.schemas_referencing("LegalEntity");
    assert!(referencing.contains("BankAccount"));
    assert!(referencing.contains("Payment"));
    assert!(!referencing.contains("Document"));
}

#[test]
fn test_unknown_schema_lookup_fails() {
    let model = embedded();
    assert!(matches!(
        model.get("Submarine").unwrap_err(),
        ModelError::SchemaNotFound { .. }
    ));
    assert!(matches!(
        model.properties_of("Submarine").unwrap_err(),
        ModelError::SchemaNotFound { .. }
    ));
}

#[test]
fn test_matchable_metadata() {
    let model = embedded();
    // Email opts out of matching
    assert!(!model.get("Email").unwrap().matchable);
    let matchable = model.matchable_set("Company").unwrap();
    assert!(matchable.contains("LegalEntity"));
    assert!(matchable.contains("Organization"));
    assert!(!matchable.contains("Thing"));
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_load_dir_end_to_end() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("base.yaml"),
        "Thing:\n  properties:\n    name: {}\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("people.yaml"),
        "Person:\n  extends: Thing\n  properties:\n    birthDate:\n      type: date\n",
    )
    .unwrap();

    let set = loader::load_dir(dir.path()).unwrap();
    let model = Model::resolve(set, TypeRegistry::builtin()).unwrap();
    assert!(model.is_a("Person", "Thing"));
    assert!(model
        .properties_of("Person")
        .unwrap()
        .contains_key("name"));
}

#[test]
fn test_custom_type_registry_is_honored() {
    let set = loader::from_str(
        "Sample:\n  properties:\n    payload:\n      type: blob\n",
        "inline.yaml",
    )
    .unwrap();

    // unknown with the builtin registry
    let err = Model::resolve(set.clone(), TypeRegistry::builtin()).unwrap_err();
    assert!(matches!(err, ModelError::UnknownPropertyType { .. }));

    // fine once the type is registered
    use modelkit::types::{PropertyType, TypeContract};
    struct BlobType;
    impl TypeContract for BlobType {}

    let mut types = TypeRegistry::builtin();
    types.register(PropertyType::scalar("blob", "Blob", BlobType));
    let model = Model::resolve(set, types).unwrap();
    assert!(model
        .properties_of("Sample")
        .unwrap()
        .contains_key("payload"));
}
