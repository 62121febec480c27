//! Resolved property definitions

use serde::Serialize;

/// Counterpart naming for a pair of entity-reference properties
///
/// On a declared property this describes the back-property to synthesize
/// on the range schema; on a generated property it names the forward
/// property it mirrors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReverseSpec {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
}

/// A fully resolved property on a resolved schema
///
/// Values are multi-valued throughout the model; a generated reverse in
/// particular collects every entity of the defining schema that points
/// at a given instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Property {
    /// Property name, unique within the schema's merged map
    pub name: String,

    /// Qualified name, `<declaring schema>:<name>`
    pub qname: String,

    /// Schema that declared this property (self or an ancestor)
    pub defined_on: String,

    pub label: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Name into the type registry
    #[serde(rename = "type")]
    pub type_name: String,

    /// Excluded from default presentation, not from storage
    pub hidden: bool,

    /// Caption candidate
    pub caption: bool,

    /// Target schema; present exactly on entity-reference properties
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,

    /// Counterpart property on the range schema
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reverse: Option<ReverseSpec>,

    /// Synthesized reverse relation rather than declared
    pub generated: bool,
}

impl Property {
    /// Entity reference rather than scalar value.
    pub fn is_entity(&self) -> bool {
        self.range.is_some()
    }
}
