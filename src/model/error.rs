//! Build-time errors for registry construction
//!
//! Any of these aborts the whole build. They signal defects in the
//! definitions, not transient conditions, so nothing is retried; the
//! variants carry enough context to point an operator at the offending
//! schema and property.

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum ModelError {
    /// Structural violation in a raw descriptor, before any resolution
    #[error("malformed descriptor '{schema}': {message}")]
    #[diagnostic(code(modelkit::model::malformed))]
    MalformedDescriptor { schema: String, message: String },

    #[error("schema '{schema}' is already defined")]
    #[diagnostic(code(modelkit::model::duplicate))]
    DuplicateSchema { schema: String },

    #[error("cyclic inheritance: {}", .path.join(" -> "))]
    #[diagnostic(code(modelkit::model::cycle))]
    CyclicInheritance { path: Vec<String> },

    /// Two unrelated ancestors declare the same property with different
    /// types, so no override order exists between them
    #[error("conflicting declarations for property '{property}' on '{schema}': '{first}' is typed '{first_type}' but '{second}' is typed '{second_type}'")]
    #[diagnostic(code(modelkit::model::conflict))]
    PropertyConflict {
        schema: String,
        property: String,
        first: String,
        first_type: String,
        second: String,
        second_type: String,
    },

    #[error("unknown property type '{type_name}' on '{schema}.{property}'")]
    #[diagnostic(code(modelkit::model::unknown_type))]
    UnknownPropertyType {
        schema: String,
        property: String,
        type_name: String,
    },

    #[error("unknown range schema '{range}' on '{schema}.{property}'")]
    #[diagnostic(code(modelkit::model::unknown_range))]
    UnknownRangeSchema {
        schema: String,
        property: String,
        range: String,
    },

    /// A synthesized reverse property would shadow an existing property
    /// on the range schema or one of its descendants
    #[error("reverse property '{target}.{name}' requested by '{origin}' collides with an existing property")]
    #[diagnostic(code(modelkit::model::reverse_collision))]
    ReverseCollision {
        target: String,
        name: String,
        origin: String,
    },

    #[error("schema not found: '{name}'{}", .referenced_by.as_ref().map(|by| format!(" (referenced by '{}')", by)).unwrap_or_default())]
    #[diagnostic(code(modelkit::model::not_found))]
    SchemaNotFound {
        name: String,
        referenced_by: Option<String>,
    },

    /// A featured/caption/required entry or edge endpoint names a
    /// property that does not exist in the merged map
    #[error("'{schema}' names unknown property '{property}' as {context}")]
    #[diagnostic(code(modelkit::model::unknown_property))]
    UnknownProperty {
        schema: String,
        property: String,
        context: &'static str,
    },
}

impl ModelError {
    pub(crate) fn not_found(name: impl Into<String>) -> Self {
        ModelError::SchemaNotFound {
            name: name.into(),
            referenced_by: None,
        }
    }
}
