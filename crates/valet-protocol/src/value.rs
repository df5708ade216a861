//! The closed tagged union carried in request arguments and response data.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};

/// Dynamic value exchanged over the wire.
///
/// `Value` covers exactly the JSON data model: null, booleans, integers,
/// floats, strings, ordered sequences, and string-keyed mappings. It is the
/// only type crossing the wire boundary; capability backends receive and
/// return it.
///
/// Numbers that fit `i64` decode as [`Value::Int`]; every other finite JSON
/// number decodes as [`Value::Float`]. Foreign values outside the union (for
/// example a JSON integer above `i64::MAX`) convert to their string
/// description rather than failing — lossy, but never silently dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent or explicitly null data.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed 64-bit integer.
    Int(i64),
    /// Double-precision float.
    Float(f64),
    /// UTF-8 string.
    Str(String),
    /// Ordered sequence of values.
    List(Vec<Value>),
    /// Mapping from string keys to values, with stable (sorted) key order.
    Map(BTreeMap<String, Value>),
}

/// Discriminant of a [`Value`], used in validation error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueTag {
    /// Tag of [`Value::Null`].
    Null,
    /// Tag of [`Value::Bool`].
    Bool,
    /// Tag of [`Value::Int`].
    Int,
    /// Tag of [`Value::Float`].
    Float,
    /// Tag of [`Value::Str`].
    Str,
    /// Tag of [`Value::List`].
    List,
    /// Tag of [`Value::Map`].
    Map,
}

impl ValueTag {
    /// Canonical lower-case name of the tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "string",
            Self::List => "list",
            Self::Map => "map",
        }
    }
}

impl fmt::Display for ValueTag {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl Value {
    /// Returns the tag identifying this value's variant.
    #[must_use]
    pub const fn tag(&self) -> ValueTag {
        match self {
            Self::Null => ValueTag::Null,
            Self::Bool(_) => ValueTag::Bool,
            Self::Int(_) => ValueTag::Int,
            Self::Float(_) => ValueTag::Float,
            Self::Str(_) => ValueTag::Str,
            Self::List(_) => ValueTag::List,
            Self::Map(_) => ValueTag::Map,
        }
    }

    /// Builds a string value.
    #[must_use]
    pub fn str(value: impl Into<String>) -> Self {
        Self::Str(value.into())
    }

    /// Builds a map value from key/value pairs.
    #[must_use]
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Self)>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value))
                .collect(),
        )
    }

    /// Builds a list value.
    #[must_use]
    pub fn list<I: IntoIterator<Item = Self>>(items: I) -> Self {
        Self::List(items.into_iter().collect())
    }

    /// Returns the inner string when the value is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the inner integer when the value is an integer.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the inner boolean when the value is a boolean.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the inner list when the value is a list.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the inner map when the value is a map.
    #[must_use]
    pub const fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Returns true for [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::Null
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(entries: BTreeMap<String, Value>) -> Self {
        Self::Map(entries)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    /// Converts a foreign JSON value, applying the documented lossy fallback:
    /// numbers representable neither as `i64` nor as a finite `f64` become
    /// their string description.
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(flag) => Self::Bool(flag),
            serde_json::Value::Number(number) => convert_number(&number),
            serde_json::Value::String(text) => Self::Str(text),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(entries) => Self::Map(
                entries
                    .into_iter()
                    .map(|(key, entry)| (key, Self::from(entry)))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(flag) => Self::Bool(flag),
            Value::Int(number) => Self::from(number),
            Value::Float(number) => {
                serde_json::Number::from_f64(number).map_or(Self::Null, Self::Number)
            }
            Value::Str(text) => Self::String(text),
            Value::List(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            Value::Map(entries) => Self::Object(
                entries
                    .into_iter()
                    .map(|(key, entry)| (key, Self::from(entry)))
                    .collect(),
            ),
        }
    }
}

fn convert_number(number: &serde_json::Number) -> Value {
    if let Some(int) = number.as_i64() {
        Value::Int(int)
    } else if let Some(float) = number.as_f64() {
        Value::Float(float)
    } else {
        // Arbitrary-precision or out-of-range numbers fall back to text.
        Value::Str(number.to_string())
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(flag) => serializer.serialize_bool(*flag),
            Self::Int(number) => serializer.serialize_i64(*number),
            Self::Float(number) => serializer.serialize_f64(*number),
            Self::Str(text) => serializer.serialize_str(text),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, entry) in entries {
                    map.serialize_entry(key, entry)?;
                }
                map.end()
            }
        }
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a JSON value (null, bool, int, float, string, list, or map)")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        deserializer.deserialize_any(Self)
    }

    fn visit_bool<E: de::Error>(self, value: bool) -> Result<Value, E> {
        Ok(Value::Bool(value))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Value, E> {
        Ok(Value::Int(value))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Value, E> {
        Ok(i64::try_from(value).map_or_else(|_| Value::Str(value.to_string()), Value::Int))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Value, E> {
        Ok(Value::Float(value))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Value, E> {
        Ok(Value::Str(value.to_owned()))
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<Value, E> {
        Ok(Value::Str(value))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut access: A) -> Result<Value, A::Error> {
        let mut items = Vec::new();
        while let Some(item) = access.next_element()? {
            items.push(item);
        }
        Ok(Value::List(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Value, A::Error> {
        let mut entries = BTreeMap::new();
        while let Some((key, entry)) = access.next_entry::<String, Value>()? {
            entries.insert(key, entry);
        }
        Ok(Value::Map(entries))
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(value: &Value) -> Value {
        let encoded = serde_json::to_string(value).expect("encode");
        serde_json::from_str(&encoded).expect("decode")
    }

    #[test]
    fn round_trip_preserves_value_and_tag() {
        let samples = [
            Value::Null,
            Value::Bool(true),
            Value::Int(-42),
            Value::Float(1.5),
            Value::str("héllo"),
            Value::list([Value::Int(1), Value::str("two"), Value::Null]),
            Value::map([
                ("nested", Value::map([("deep", Value::Bool(false))])),
                ("list", Value::list([Value::Float(0.25)])),
            ]),
        ];
        for sample in samples {
            let decoded = round_trip(&sample);
            assert_eq!(decoded, sample);
            assert_eq!(decoded.tag(), sample.tag());
        }
    }

    #[test]
    fn integers_and_floats_keep_distinct_tags() {
        let int: Value = serde_json::from_str("7").expect("decode int");
        let float: Value = serde_json::from_str("7.0").expect("decode float");
        assert_eq!(int.tag(), ValueTag::Int);
        assert_eq!(float.tag(), ValueTag::Float);
    }

    #[test]
    fn oversized_integer_falls_back_to_string() {
        let decoded: Value = serde_json::from_str("18446744073709551615").expect("decode");
        assert_eq!(decoded, Value::str("18446744073709551615"));
    }

    #[test]
    fn foreign_json_value_converts_losslessly_for_representable_data() {
        let json: serde_json::Value =
            serde_json::json!({"name": "Ada", "phones": ["555", "556"], "age": 36});
        let value = Value::from(json.clone());
        assert_eq!(serde_json::Value::from(value), json);
    }

    #[test]
    fn map_keys_serialize_in_sorted_order() {
        let value = Value::map([("zeta", Value::Int(1)), ("alpha", Value::Int(2))]);
        let encoded = serde_json::to_string(&value).expect("encode");
        assert_eq!(encoded, r#"{"alpha":2,"zeta":1}"#);
    }

    #[test]
    fn rejects_input_matching_no_tag() {
        let result: Result<Value, _> = serde_json::from_str("not json");
        assert!(result.is_err());
    }

    #[test]
    fn accessors_match_variants() {
        assert_eq!(Value::str("x").as_str(), Some("x"));
        assert_eq!(Value::Int(3).as_int(), Some(3));
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert!(Value::Null.is_null());
        assert_eq!(Value::str("x").as_int(), None);
    }
}
