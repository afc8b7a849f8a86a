// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::cmp::Ordering;
use core::fmt;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::error::UnknownKeyError;
use crate::number::Number;
use crate::timerange::TimeRange;

/// Runtime type names reported by built-in values.
///
/// The comparison and operator registries are keyed by these names. Each
/// value lists its own name first, followed by its ancestors.
pub mod types {
    pub const BOOL: &str = "bool";
    pub const INT: &str = "int";
    pub const FLOAT: &str = "float";
    pub const NUMBER: &str = "number";
    pub const STRING: &str = "string";
    pub const DATE: &str = "date";
    pub const CALENDAR: &str = "calendar";
    pub const TIME_RANGE: &str = "timerange";
    pub const ARRAY: &str = "array";
    pub const COLLECTION: &str = "collection";
    pub const OBJECT: &str = "object";
}

/// Host-defined value types.
///
/// `type_names` lists the type and its ancestors, most specific first.
pub trait CustomValue: fmt::Debug + fmt::Display + Send + Sync {
    fn type_names(&self) -> &[&'static str];

    fn equals(&self, other: &Value) -> bool;

    fn compare(&self, _other: &Value) -> Option<Ordering> {
        None
    }

    fn value_for_key(&self, key: &str) -> Result<Value, UnknownKeyError> {
        Err(UnknownKeyError::new(key, self.type_names().first().copied().unwrap_or("custom")))
    }
}

#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(Arc<str>),
    Date(DateTime<Utc>),
    /// Zone-carrying timestamp; compared by instant.
    Calendar(DateTime<FixedOffset>),
    Range(TimeRange),
    Array(Arc<Vec<Value>>),
    Object(Arc<BTreeMap<String, Value>>),
    Custom(Arc<dyn CustomValue>),
}

impl Value {
    pub fn new_array() -> Value {
        Value::Array(Arc::new(Vec::new()))
    }

    pub fn new_object() -> Value {
        Value::Object(Arc::new(BTreeMap::new()))
    }

    pub fn from_map<K, V, I>(entries: I) -> Value
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Value::Object(Arc::new(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        ))
    }

    pub fn type_names(&self) -> &[&'static str] {
        use types::*;
        match self {
            Value::Null => &[],
            Value::Bool(_) => &[BOOL],
            Value::Number(Number::Int(_)) => &[INT, NUMBER],
            Value::Number(Number::Float(_)) => &[FLOAT, NUMBER],
            Value::String(_) => &[STRING],
            Value::Date(_) => &[DATE],
            Value::Calendar(_) => &[CALENDAR],
            Value::Range(_) => &[TIME_RANGE],
            Value::Array(_) => &[ARRAY, COLLECTION],
            Value::Object(_) => &[OBJECT],
            Value::Custom(c) => c.type_names(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_names().first().copied().unwrap_or("null")
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<&Number> {
        match self {
            Value::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_number().and_then(Number::as_i64)
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_number().map(Number::as_f64)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Instant of a date, calendar or integer (epoch milliseconds) value.
    pub fn timestamp_millis(&self) -> Option<i64> {
        match self {
            Value::Date(d) => Some(d.timestamp_millis()),
            Value::Calendar(c) => Some(c.timestamp_millis()),
            Value::Number(Number::Int(ms)) => Some(*ms),
            _ => None,
        }
    }

    /// Date and calendar values as a UTC instant. Zone offsets are dropped.
    pub fn as_utc(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Date(d) => Some(*d),
            Value::Calendar(c) => Some(c.with_timezone(&Utc)),
            _ => None,
        }
    }

    /// Text used by pattern matching and string coercion.
    pub fn to_text(&self) -> String {
        match self {
            Value::String(s) => s.to_string(),
            v => v.to_string(),
        }
    }

    /// Generic truthiness.
    ///
    /// Strings `""`, `" "`, `"NO"`, `"false"` and `"0"` are false, as are zero
    /// numbers, empty collections and `Null`.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => !n.is_zero(),
            Value::String(s) => !matches!(s.as_ref(), "" | " " | "NO" | "false" | "0"),
            Value::Array(a) => !a.is_empty(),
            Value::Object(o) => !o.is_empty(),
            Value::Range(r) => !r.is_empty(),
            _ => true,
        }
    }

    /// Ordering between comparable values, `None` otherwise.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Range(a), Value::Range(b)) => Some(a.cmp(b)),
            (Value::Custom(c), other) => c.compare(other),
            (other, Value::Custom(c)) => c.compare(other).map(Ordering::reverse),
            (a, b) => match (a.as_utc(), b.as_utc()) {
                (Some(a), Some(b)) => Some(a.cmp(&b)),
                _ => None,
            },
        }
    }

    /// Looks up a single key on this value.
    ///
    /// `self` is the value itself. Objects answer `Null` for missing keys.
    /// Arrays answer `count` and map any other key over their elements.
    pub fn value_for_key(&self, key: &str) -> Result<Value, UnknownKeyError> {
        if key == "self" {
            return Ok(self.clone());
        }
        match self {
            Value::Object(o) => Ok(o.get(key).cloned().unwrap_or_default()),
            Value::Array(a) if key == "count" || key == "@count" => Ok(Value::from(a.len())),
            Value::Array(a) => {
                let mapped = a
                    .iter()
                    .map(|v| v.value_for_key(key))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::from(mapped))
            }
            Value::String(s) if key == "length" => Ok(Value::from(s.chars().count())),
            Value::Custom(c) => c.value_for_key(key),
            Value::Null => Ok(Value::Null),
            v => Err(UnknownKeyError::new(key, v.type_name())),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Calendar(a), Value::Calendar(b)) => a == b,
            (Value::Range(a), Value::Range(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Custom(c), other) | (other, Value::Custom(c)) => c.equals(other),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => f.write_str(s),
            Value::Date(d) => f.write_str(&d.to_rfc3339()),
            Value::Calendar(c) => f.write_str(&c.to_rfc3339()),
            Value::Range(r) => write!(f, "{r}"),
            Value::Array(a) => {
                f.write_str("[")?;
                for (idx, v) in a.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("]")
            }
            Value::Object(o) => {
                f.write_str("{")?;
                for (idx, (k, v)) in o.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
            Value::Custom(c) => write!(f, "{c}"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => n.serialize(serializer),
            Value::String(s) => serializer.serialize_str(s),
            Value::Date(d) => serializer.serialize_str(&d.to_rfc3339()),
            Value::Calendar(c) => serializer.serialize_str(&c.to_rfc3339()),
            Value::Range(r) => r.serialize(serializer),
            Value::Array(a) => {
                let mut seq = serializer.serialize_seq(Some(a.len()))?;
                for v in a.iter() {
                    seq.serialize_element(v)?;
                }
                seq.end()
            }
            Value::Object(o) => {
                let mut map = serializer.serialize_map(Some(o.len()))?;
                for (k, v) in o.iter() {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            Value::Custom(c) => serializer.serialize_str(&c.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let json = serde_json::Value::deserialize(deserializer)?;
        Ok(Value::from(json))
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
                (Some(i), _, _) => Value::from(i),
                (None, Some(u), _) => Value::Number(Number::from(u)),
                (None, None, Some(f)) => Value::from(f),
                _ => Value::Null,
            },
            serde_json::Value::String(s) => Value::String(s.into()),
            serde_json::Value::Array(a) => {
                Value::from(a.into_iter().map(Value::from).collect::<Vec<_>>())
            }
            serde_json::Value::Object(o) => Value::from_map(o),
        }
    }
}

impl From<&serde_json::Value> for Value {
    fn from(json: &serde_json::Value) -> Self {
        Value::from(json.clone())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! number_into_value {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(n: $t) -> Self {
                    Value::Number(Number::from(n))
                }
            }
        )*
    };
}

number_into_value!(i32, i64, u32, u64, usize, f32, f64);

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s.into())
    }
}

impl From<Arc<str>> for Value {
    fn from(s: Arc<str>) -> Self {
        Value::String(s)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Value::Date(d)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(d: DateTime<FixedOffset>) -> Self {
        Value::Calendar(d)
    }
}

impl From<TimeRange> for Value {
    fn from(r: TimeRange) -> Self {
        Value::Range(r)
    }
}

impl From<Vec<Value>> for Value {
    fn from(a: Vec<Value>) -> Self {
        Value::Array(Arc::new(a))
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(o: BTreeMap<String, Value>) -> Self {
        Value::Object(Arc::new(o))
    }
}

impl From<HashMap<String, Value>> for Value {
    fn from(o: HashMap<String, Value>) -> Self {
        Value::Object(Arc::new(o.into_iter().collect()))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<Arc<dyn CustomValue>> for Value {
    fn from(c: Arc<dyn CustomValue>) -> Self {
        Value::Custom(c)
    }
}
