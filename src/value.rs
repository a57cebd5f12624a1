//! Tagged JSON value tree.
//!
//! Numbers keep the width they were parsed (or produced) with, so the
//! engines can apply widening rules instead of guessing from an `f64`.
//! Object keys keep insertion order.
pub mod text;

use std::fmt;

use bigdecimal::BigDecimal;
use indexmap::IndexMap;
use ordered_float::OrderedFloat;

pub type JsonObject = IndexMap<String, JsonValue>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JsonValue {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(OrderedFloat<f32>),
    Double(OrderedFloat<f64>),
    Decimal(BigDecimal),
    String(String),
    Array(Vec<JsonValue>),
    Object(JsonObject),
}

/// Kind tag of a [`JsonValue`], used in diagnostics and hook lookups.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JsonKind {
    Null,
    Bool,
    Int,
    Long,
    Float,
    Double,
    Decimal,
    String,
    Array,
    Object,
}

impl JsonKind {
    pub fn name(self) -> &'static str {
        match self {
            JsonKind::Null => "null",
            JsonKind::Bool => "boolean",
            JsonKind::Int => "int",
            JsonKind::Long => "long",
            JsonKind::Float => "float",
            JsonKind::Double => "double",
            JsonKind::Decimal => "decimal",
            JsonKind::String => "string",
            JsonKind::Array => "array",
            JsonKind::Object => "object",
        }
    }

    pub fn is_number(self) -> bool {
        matches!(
            self,
            JsonKind::Int | JsonKind::Long | JsonKind::Float | JsonKind::Double | JsonKind::Decimal
        )
    }
}

impl fmt::Display for JsonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

impl JsonValue {
    pub fn kind(&self) -> JsonKind {
        match self {
            JsonValue::Null => JsonKind::Null,
            JsonValue::Bool(_) => JsonKind::Bool,
            JsonValue::Int(_) => JsonKind::Int,
            JsonValue::Long(_) => JsonKind::Long,
            JsonValue::Float(_) => JsonKind::Float,
            JsonValue::Double(_) => JsonKind::Double,
            JsonValue::Decimal(_) => JsonKind::Decimal,
            JsonValue::String(_) => JsonKind::String,
            JsonValue::Array(_) => JsonKind::Array,
            JsonValue::Object(_) => JsonKind::Object,
        }
    }

    pub fn is_null(&self) -> bool { matches!(self, JsonValue::Null) }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            JsonValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[JsonValue]> {
        match self {
            JsonValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&JsonObject> {
        match self {
            JsonValue::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Object member lookup; `None` for absent keys and for non-objects.
    pub fn get(&self, key: &str) -> Option<&JsonValue> { self.as_object()?.get(key) }

    /// Array element lookup; `None` when out of range or not an array.
    pub fn at(&self, index: usize) -> Option<&JsonValue> { self.as_array()?.get(index) }

    /// Element or member count; scalars report 0.
    pub fn len(&self) -> usize {
        match self {
            JsonValue::Array(items) => items.len(),
            JsonValue::Object(map) => map.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Build an object from `(key, value)` pairs, keeping their order.
    pub fn object<K, I>(entries: I) -> JsonValue
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, JsonValue)>,
    {
        JsonValue::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Compact JSON text.
    pub fn to_json_string(&self) -> String {
        let mut out = String::new();
        text::write_value(&mut out, self);
        out
    }
}

impl fmt::Display for JsonValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.to_json_string()) }
}

// ------------------------------- From impls ------------------------------- //

impl From<bool> for JsonValue {
    fn from(v: bool) -> Self { JsonValue::Bool(v) }
}

impl From<i32> for JsonValue {
    fn from(v: i32) -> Self { JsonValue::Int(v) }
}

impl From<i64> for JsonValue {
    fn from(v: i64) -> Self { JsonValue::Long(v) }
}

impl From<f32> for JsonValue {
    fn from(v: f32) -> Self { JsonValue::Float(OrderedFloat(v)) }
}

impl From<f64> for JsonValue {
    fn from(v: f64) -> Self { JsonValue::Double(OrderedFloat(v)) }
}

impl From<BigDecimal> for JsonValue {
    fn from(v: BigDecimal) -> Self { JsonValue::Decimal(v) }
}

impl From<String> for JsonValue {
    fn from(v: String) -> Self { JsonValue::String(v) }
}

impl From<&str> for JsonValue {
    fn from(v: &str) -> Self { JsonValue::String(v.to_owned()) }
}

impl From<Vec<JsonValue>> for JsonValue {
    fn from(v: Vec<JsonValue>) -> Self { JsonValue::Array(v) }
}

impl From<JsonObject> for JsonValue {
    fn from(v: JsonObject) -> Self { JsonValue::Object(v) }
}

impl<T: Into<JsonValue>> From<Option<T>> for JsonValue {
    fn from(v: Option<T>) -> Self { v.map_or(JsonValue::Null, Into::into) }
}
