//! Dynamic values produced and consumed by type definitions.

use serde::{Deserialize, Serialize};

use crate::definition::TypeDefinition;
use crate::error::{DsdlError, Result};

/// One decoded (or to-be-encoded) field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Bool(bool),
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    /// Enumeration option or mapped-table entry.
    Name(String),
    Bytes(Vec<u8>),
    String(String),
    Array(Vec<Value>),
    /// Set flag names, in declaration order.
    Flags(Vec<String>),
    Composite(Composite),
    Union(UnionValue),
}

impl Value {
    /// Short kind label used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Unsigned(_) => "unsigned",
            Value::Signed(_) => "signed",
            Value::Float(_) => "float",
            Value::Name(_) => "name",
            Value::Bytes(_) => "bytes",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Flags(_) => "flags",
            Value::Composite(_) => "composite",
            Value::Union(_) => "union",
        }
    }

    pub fn as_composite(&self) -> Option<&Composite> {
        match self {
            Value::Composite(composite) => Some(composite),
            _ => None,
        }
    }

    pub fn as_union(&self) -> Option<&UnionValue> {
        match self {
            Value::Union(union) => Some(union),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Unsigned(v) => Some(*v),
            Value::Signed(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Signed(v) => Some(*v),
            Value::Unsigned(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Name(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<u8> for Value {
    fn from(value: u8) -> Self {
        Value::Unsigned(u64::from(value))
    }
}

impl From<u16> for Value {
    fn from(value: u16) -> Self {
        Value::Unsigned(u64::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Unsigned(u64::from(value))
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::Unsigned(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Signed(i64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Signed(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(f64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(value)
    }
}

impl From<Composite> for Value {
    fn from(value: Composite) -> Self {
        Value::Composite(value)
    }
}

impl From<UnionValue> for Value {
    fn from(value: UnionValue) -> Self {
        Value::Union(value)
    }
}

/// Field values of a structure, kept in insertion order.
///
/// Lookup is by name; wire order always comes from the definition, never
/// from the order of entries here, so equality ignores entry order too.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Composite {
    fields: Vec<(String, Value)>,
}

impl Composite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set a field, replacing any existing value of the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl PartialEq for Composite {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(name, value)| other.get(name) == Some(value))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Composite {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut composite = Composite::new();
        for (name, value) in iter {
            composite.insert(name, value);
        }
        composite
    }
}

/// A union value: exactly one populated field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnionValue {
    field: String,
    value: Box<Value>,
}

impl UnionValue {
    pub fn new(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: Box::new(value.into()),
        }
    }

    /// Pick the union member from a set of candidate values.
    ///
    /// The first field, in declaration order, with a value present in
    /// `candidates` wins. Fails with [`DsdlError::EmptyUnion`] when none is.
    pub fn select(definition: &TypeDefinition, candidates: &Composite) -> Result<Self> {
        definition
            .fields()
            .iter()
            .find_map(|(name, _)| candidates.get(name).map(|v| Self::new(name.as_str(), v.clone())))
            .ok_or(DsdlError::EmptyUnion)
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_parts(self) -> (String, Value) {
        (self.field, *self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Field;

    #[test]
    fn composite_insert_replaces_in_place() {
        let mut c = Composite::new().with("a", 1u8).with("b", true);
        c.insert("a", 7u8);
        let names: Vec<&str> = c.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(c.get("a"), Some(&Value::Unsigned(7)));
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn select_prefers_first_declared_field() {
        let def = TypeDefinition::union()
            .field("first", Field::uint(8))
            .field("second", Field::boolean());
        // Candidate order is irrelevant; declaration order decides.
        let candidates = Composite::new().with("second", true).with("first", 3u8);
        let selected = UnionValue::select(&def, &candidates).unwrap();
        assert_eq!(selected.field(), "first");
        assert_eq!(selected.value(), &Value::Unsigned(3));
    }

    #[test]
    fn select_without_candidates_is_empty_union() {
        let def = TypeDefinition::union().field("only", Field::uint(8));
        let err = UnionValue::select(&def, &Composite::new().with("other", 1u8)).unwrap_err();
        assert!(matches!(err, DsdlError::EmptyUnion));
    }

    #[test]
    fn numeric_accessors_check_range() {
        assert_eq!(Value::Signed(-1).as_u64(), None);
        assert_eq!(Value::Signed(5).as_u64(), Some(5));
        assert_eq!(Value::Unsigned(u64::MAX).as_i64(), None);
        assert_eq!(Value::from("x").as_str(), Some("x"));
    }

    #[test]
    fn serializes_to_json() {
        let value = Value::Composite(Composite::new().with("uptime_sec", 5u32));
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"{"composite":[["uptime_sec",{"unsigned":5}]]}"#);
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }
}
