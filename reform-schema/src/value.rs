//! Dynamic values flowing through a schema.
//!
//! A single [`Value`] enum represents both sides of a conversion: the
//! untyped *cstruct* (mostly strings coming from a submitted form) and
//! the typed *appstruct* produced by deserialization.
//!
//! The "field absent" sentinel is the [`Value::Null`] variant. It is
//! distinct from [`Value::None`] (an application level "no value") and
//! from every real data value, including `0` and `""`.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Serialize, Serializer};

use crate::types::object::GlobalRef;
use crate::types::temporal::{format_datetime, format_naive_datetime, format_time};

/// String keyed mapping of values, used for mapping cstructs and appstructs.
pub type ValueMap = BTreeMap<String, Value>;

/// A dynamically typed value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// The `null` sentinel: the value is absent from its source structure.
    #[default]
    Null,
    /// Application level "no value".
    None,
    /// Boolean value.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Exact decimal number.
    Decimal(Decimal),
    /// Unicode string.
    Str(String),
    /// Encoded byte string.
    Bytes(Vec<u8>),
    /// Calendar date.
    Date(NaiveDate),
    /// Timezone aware date and time.
    DateTime(DateTime<FixedOffset>),
    /// Date and time without timezone.
    NaiveDateTime(NaiveDateTime),
    /// Time of day.
    Time(NaiveTime),
    /// Variable length sequence.
    List(Vec<Value>),
    /// Fixed length sequence.
    Tuple(Vec<Value>),
    /// Unordered collection of distinct values.
    Set(ValueSet),
    /// String keyed mapping.
    Map(ValueMap),
    /// Reference to a registered global object.
    Object(GlobalRef),
}

impl Value {
    /// Build a string value.
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    /// Build a mapping value from key/value pairs.
    pub fn map<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Value::Map(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Build a list value.
    pub fn list<V: Into<Value>>(items: impl IntoIterator<Item = V>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }

    /// Build a tuple value.
    pub fn tuple<V: Into<Value>>(items: impl IntoIterator<Item = V>) -> Self {
        Value::Tuple(items.into_iter().map(Into::into).collect())
    }

    /// Returns true for the `null` sentinel only.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true for `null`, `None` and the empty string.
    ///
    /// Serializers treat these three as "nothing to render".
    pub fn is_absent(&self) -> bool {
        match self {
            Value::Null | Value::None => true,
            Value::Str(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Truth value: `null`, `None`, zero, and empty strings or containers are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null | Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Decimal(d) => !d.is_zero(),
            Value::Str(s) => !s.is_empty(),
            Value::Bytes(b) => !b.is_empty(),
            Value::List(items) | Value::Tuple(items) => !items.is_empty(),
            Value::Set(set) => !set.is_empty(),
            Value::Map(map) => !map.is_empty(),
            Value::Date(_)
            | Value::DateTime(_)
            | Value::NaiveDateTime(_)
            | Value::Time(_)
            | Value::Object(_) => true,
        }
    }

    /// Returns true when the value is a number equal to zero (including `false`).
    pub fn is_zero_number(&self) -> bool {
        match self {
            Value::Bool(b) => !*b,
            Value::Int(i) => *i == 0,
            Value::Float(f) => *f == 0.0,
            Value::Decimal(d) => d.is_zero(),
            _ => false,
        }
    }

    /// Short name of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Decimal(_) => "decimal",
            Value::Str(_) => "str",
            Value::Bytes(_) => "bytes",
            Value::Date(_) => "date",
            Value::DateTime(_) => "datetime",
            Value::NaiveDateTime(_) => "naive_datetime",
            Value::Time(_) => "time",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Set(_) => "set",
            Value::Map(_) => "map",
            Value::Object(_) => "object",
        }
    }

    /// Borrow the string content of a `Str` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the entries of a `Map` value.
    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Borrow the items of a `List` or `Tuple` value.
    pub fn as_slice(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) | Value::Tuple(items) => Some(items),
            _ => None,
        }
    }

    /// Integer content of an `Int` value.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Boolean content of a `Bool` value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Number of items for strings (in characters), bytes and containers.
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::Str(s) => Some(s.chars().count()),
            Value::Bytes(b) => Some(b.len()),
            Value::List(items) | Value::Tuple(items) => Some(items.len()),
            Value::Set(set) => Some(set.len()),
            Value::Map(map) => Some(map.len()),
            _ => None,
        }
    }

    /// Returns true if [`Value::len`] is `Some(0)`.
    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// Items of any iterable value; mappings yield their keys.
    pub(crate) fn iter_items(&self) -> Option<Vec<Value>> {
        match self {
            Value::List(items) | Value::Tuple(items) => Some(items.clone()),
            Value::Set(set) => Some(set.iter().cloned().collect()),
            Value::Map(map) => Some(map.keys().cloned().map(Value::Str).collect()),
            _ => None,
        }
    }

    /// Order two values of compatible kinds.
    ///
    /// Numbers compare across `Int`, `Float` and `Decimal`; strings, dates,
    /// datetimes and times compare within their own kind. Anything else is
    /// incomparable and yields `None`.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        use Value::*;
        match (self, other) {
            (Int(a), Int(b)) => Some(a.cmp(b)),
            (Decimal(a), Decimal(b)) => Some(a.cmp(b)),
            (Decimal(a), Int(b)) => Some(a.cmp(&rust_decimal::Decimal::from(*b))),
            (Int(a), Decimal(b)) => Some(rust_decimal::Decimal::from(*a).cmp(b)),
            (Bool(a), Bool(b)) => Some(a.cmp(b)),
            (Str(a), Str(b)) => Some(a.cmp(b)),
            (Bytes(a), Bytes(b)) => Some(a.cmp(b)),
            (Date(a), Date(b)) => Some(a.cmp(b)),
            (DateTime(a), DateTime(b)) => Some(a.cmp(b)),
            (NaiveDateTime(a), NaiveDateTime(b)) => Some(a.cmp(b)),
            (Time(a), Time(b)) => Some(a.cmp(b)),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => Option::None,
            },
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Decimal(d) => d.to_f64(),
            _ => None,
        }
    }

    /// Convert into a JSON value. Temporal values become ISO 8601 strings.
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Quoted form used inside container renderings.
    fn repr(&self) -> String {
        match self {
            Value::Str(s) => format!("'{}'", s),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "<null>"),
            Value::None => write!(f, "None"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Str(s) => write!(f, "{}", s),
            Value::Bytes(b) => write!(f, "{}", String::from_utf8_lossy(b)),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::DateTime(dt) => write!(f, "{}", format_datetime(dt)),
            Value::NaiveDateTime(dt) => write!(f, "{}", format_naive_datetime(dt)),
            Value::Time(t) => write!(f, "{}", format_time(t, true)),
            Value::List(items) => {
                let parts: Vec<_> = items.iter().map(Value::repr).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Value::Tuple(items) => {
                let parts: Vec<_> = items.iter().map(Value::repr).collect();
                if parts.len() == 1 {
                    write!(f, "({},)", parts[0])
                } else {
                    write!(f, "({})", parts.join(", "))
                }
            }
            Value::Set(set) => {
                let parts: Vec<_> = set.iter().map(Value::repr).collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
            Value::Map(map) => {
                let parts: Vec<_> = map
                    .iter()
                    .map(|(k, v)| format!("'{}': {}", k, v.repr()))
                    .collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
            Value::Object(obj) => write!(f, "{}", obj.path()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null | Value::None => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::Decimal(d) => Serialize::serialize(d, serializer),
            Value::Str(s) => serializer.serialize_str(s),
            Value::Bytes(b) => serializer.serialize_str(&String::from_utf8_lossy(b)),
            Value::Date(_)
            | Value::DateTime(_)
            | Value::NaiveDateTime(_)
            | Value::Time(_)
            | Value::Object(_) => serializer.collect_str(self),
            Value::List(items) | Value::Tuple(items) => serializer.collect_seq(items),
            Value::Set(set) => serializer.collect_seq(set.iter()),
            Value::Map(map) => serializer.collect_map(map),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::None,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v.into())
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i32 => Int,
    i64 => Int,
    u32 => Int,
    f64 => Float,
    Decimal => Decimal,
    String => Str,
    &str => Str,
    NaiveDate => Date,
    DateTime<FixedOffset> => DateTime,
    NaiveDateTime => NaiveDateTime,
    NaiveTime => Time,
    Vec<Value> => List,
    ValueMap => Map,
    ValueSet => Set,
    GlobalRef => Object,
}

/// Insertion ordered collection of distinct values.
///
/// Equality ignores order.
#[derive(Debug, Clone, Default)]
pub struct ValueSet(Vec<Value>);

impl ValueSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value; returns false if an equal value was already present.
    pub fn insert(&mut self, value: Value) -> bool {
        if self.0.contains(&value) {
            return false;
        }
        self.0.push(value);
        true
    }

    /// Returns true if an equal value is present.
    pub fn contains(&self, value: &Value) -> bool {
        self.0.contains(value)
    }

    /// Number of distinct values.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the set holds no values.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.0.iter()
    }
}

impl PartialEq for ValueSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.0.iter().all(|v| other.contains(v))
    }
}

impl FromIterator<Value> for ValueSet {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        let mut set = ValueSet::new();
        for value in iter {
            set.insert(value);
        }
        set
    }
}

impl<'a> IntoIterator for &'a ValueSet {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
