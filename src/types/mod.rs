//! Pluggable property value types
//!
//! Every property names a type in a [`TypeRegistry`], a table of
//! validation and normalization contracts keyed by type name. Adding a
//! type is a registration call, not a subclass. Validation is lenient:
//! values that fail a contract are classified, never discarded, because
//! upstream data is expected to be messy.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;
use url::Url;

mod iban;

/// Name of the default plain-text type
pub const DEFAULT_TYPE: &str = "string";

/// Name of the entity-reference type
pub const ENTITY_TYPE: &str = "entity";

/// Why a value failed its type contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InvalidReason {
    BadFormat,
    BadChecksum,
    NotANumber,
    BadDate,
    BadUrl,
    RangeMismatch,
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            InvalidReason::BadFormat => "bad-format",
            InvalidReason::BadChecksum => "bad-checksum",
            InvalidReason::NotANumber => "not-a-number",
            InvalidReason::BadDate => "bad-date",
            InvalidReason::BadUrl => "bad-url",
            InvalidReason::RangeMismatch => "range-mismatch",
        };
        write!(f, "{}", reason)
    }
}

/// Outcome of checking one raw value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Validity {
    Valid,
    Invalid(InvalidReason),
}

impl Validity {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validity::Valid)
    }
}

/// Validation and normalization contract for one value type
///
/// Both operations are total: `validate` classifies, `normalize` always
/// produces a value, even for input that failed validation.
pub trait TypeContract: Send + Sync {
    /// Classify a raw value against this type's grammar.
    fn validate(&self, raw: &str) -> Validity {
        let _ = raw;
        Validity::Valid
    }

    /// Produce the canonical form of a raw value.
    fn normalize(&self, raw: &str) -> String {
        raw.trim().to_string()
    }
}

/// Plain text, the default type. Anything goes.
struct StringType;

impl TypeContract for StringType {}

/// Free-form token used to identify things. No uniqueness implied.
struct IdentifierType;

impl TypeContract for IdentifierType {}

/// Decimal numbers
struct NumberType;

impl TypeContract for NumberType {
    fn validate(&self, raw: &str) -> Validity {
        match raw.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => Validity::Valid,
            _ => Validity::Invalid(InvalidReason::NotANumber),
        }
    }
}

/// Opaque structured payload, passed through unexamined.
struct JsonType;

impl TypeContract for JsonType {
    fn normalize(&self, raw: &str) -> String {
        raw.to_string()
    }
}

/// ISO-8601 calendar dates, full or truncated to year or year-month
struct DateType;

impl TypeContract for DateType {
    fn validate(&self, raw: &str) -> Validity {
        let text = raw.trim();
        let valid = match text.len() {
            4 => text.chars().all(|c| c.is_ascii_digit()),
            7 => NaiveDate::parse_from_str(&format!("{}-01", text), "%Y-%m-%d").is_ok(),
            10 => NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok(),
            _ => false,
        };
        if valid {
            Validity::Valid
        } else {
            Validity::Invalid(InvalidReason::BadDate)
        }
    }
}

/// Absolute URLs
struct UrlType;

impl TypeContract for UrlType {
    fn validate(&self, raw: &str) -> Validity {
        if Url::parse(raw.trim()).is_ok() {
            Validity::Valid
        } else {
            Validity::Invalid(InvalidReason::BadUrl)
        }
    }

    fn normalize(&self, raw: &str) -> String {
        match Url::parse(raw.trim()) {
            Ok(parsed) => parsed.to_string(),
            Err(_) => raw.trim().to_string(),
        }
    }
}

/// Reference to another entity by identifier. The range check happens
/// against the resolved registry, where the referenced entity's schema
/// is known; here only the reference itself is checked.
struct EntityType;

impl TypeContract for EntityType {
    fn validate(&self, raw: &str) -> Validity {
        if raw.trim().is_empty() {
            Validity::Invalid(InvalidReason::BadFormat)
        } else {
            Validity::Valid
        }
    }
}

/// A named value type and its contract
pub struct PropertyType {
    name: String,
    label: String,
    /// Entity reference rather than scalar value
    entity: bool,
    /// Useful as a cross-record match key
    matchable: bool,
    contract: Box<dyn TypeContract>,
}

impl PropertyType {
    /// A scalar value type.
    pub fn scalar(name: &str, label: &str, contract: impl TypeContract + 'static) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            entity: false,
            matchable: false,
            contract: Box::new(contract),
        }
    }

    /// An entity-reference type. Reference types are always matchable.
    pub fn reference(name: &str, label: &str, contract: impl TypeContract + 'static) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            entity: true,
            matchable: true,
            contract: Box::new(contract),
        }
    }

    /// Mark this type as a useful cross-record match key.
    pub fn matchable(mut self) -> Self {
        self.matchable = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_entity(&self) -> bool {
        self.entity
    }

    pub fn is_matchable(&self) -> bool {
        self.matchable
    }

    pub fn validate(&self, raw: &str) -> Validity {
        self.contract.validate(raw)
    }

    pub fn normalize(&self, raw: &str) -> String {
        self.contract.normalize(raw)
    }
}

impl fmt::Debug for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyType")
            .field("name", &self.name)
            .field("entity", &self.entity)
            .field("matchable", &self.matchable)
            .finish()
    }
}

/// Name-keyed table of property value types
#[derive(Debug)]
pub struct TypeRegistry {
    types: BTreeMap<String, PropertyType>,
}

impl TypeRegistry {
    /// A registry with no types at all.
    pub fn empty() -> Self {
        Self {
            types: BTreeMap::new(),
        }
    }

    /// A registry holding the built-in types.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(PropertyType::scalar(DEFAULT_TYPE, "Text", StringType));
        registry.register(PropertyType::scalar("identifier", "Identifier", IdentifierType).matchable());
        registry.register(PropertyType::scalar("number", "Number", NumberType));
        registry.register(PropertyType::scalar("json", "Nested data", JsonType));
        registry.register(PropertyType::scalar("date", "Date", DateType));
        registry.register(PropertyType::scalar("url", "URL", UrlType).matchable());
        registry.register(PropertyType::scalar("iban", "IBAN", iban::IbanType).matchable());
        registry.register(PropertyType::reference(ENTITY_TYPE, "Entity", EntityType));
        registry
    }

    /// Add a type, replacing any previous registration under its name.
    pub fn register(&mut self, property_type: PropertyType) {
        self.types
            .insert(property_type.name.clone(), property_type);
    }

    pub fn get(&self, name: &str) -> Option<&PropertyType> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
