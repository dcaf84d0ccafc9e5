//! Animated values
//!
//! Springs and tweens animate a closed set of value shapes. Numbers and
//! dates are scalars; arrays and records are walked component-wise, so a
//! record of arrays of numbers animates every leaf independently.

use indexmap::IndexMap;
use kinetic_core::StoreValue;
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A value held by a spring or tweened store
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Value {
    /// Unset. The first `set` on an unset store snaps instead of animating.
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    /// Milliseconds since the UNIX epoch
    Date(f64),
    Array(Vec<Value>),
    Record(IndexMap<String, Value>),
}

/// The shape of a [`Value`], used in error messages
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Number,
    Text,
    Date,
    Array,
    Record,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "boolean",
            ValueKind::Number => "number",
            ValueKind::Text => "string",
            ValueKind::Date => "date",
            ValueKind::Array => "array",
            ValueKind::Record => "record",
        };
        f.write_str(name)
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Number(_) => ValueKind::Number,
            Value::Text(_) => ValueKind::Text,
            Value::Date(_) => ValueKind::Date,
            Value::Array(_) => ValueKind::Array,
            Value::Record(_) => ValueKind::Record,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// A date value from a wall-clock time
    pub fn date(time: SystemTime) -> Self {
        let millis = match time.duration_since(UNIX_EPOCH) {
            Ok(after) => after.as_secs_f64() * 1000.0,
            Err(before) => -before.duration().as_secs_f64() * 1000.0,
        };
        Value::Date(millis)
    }

    /// The wall-clock time of a date value
    pub fn as_system_time(&self) -> Option<SystemTime> {
        match *self {
            Value::Date(ms) if ms >= 0.0 => Duration::try_from_secs_f64(ms / 1000.0)
                .ok()
                .map(|after| UNIX_EPOCH + after),
            Value::Date(ms) => Duration::try_from_secs_f64(-ms / 1000.0)
                .ok()
                .map(|before| UNIX_EPOCH - before),
            _ => None,
        }
    }

    /// Build a record from `(key, value)` pairs, keeping their order
    pub fn record<K, V, I>(fields: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Value::Record(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// A field of a record value
    pub fn field(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Record(fields) => fields.get(key),
            _ => None,
        }
    }

    /// An element of an array value
    pub fn index(&self, i: usize) -> Option<&Value> {
        match self {
            Value::Array(items) => items.get(i),
            _ => None,
        }
    }
}

impl StoreValue for Value {
    fn changed(&self, next: &Self) -> bool {
        match (self, next) {
            (Value::Null, Value::Null) => false,
            (Value::Bool(a), Value::Bool(b)) => a != b,
            (Value::Number(a), Value::Number(b)) => a != b,
            (Value::Text(a), Value::Text(b)) => a != b,
            // Dates, arrays and records are reference-like: every write counts.
            _ => true,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<f32> for Value {
    fn from(n: f32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<SystemTime> for Value {
    fn from(time: SystemTime) -> Self {
        Value::date(time)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(items: [T; N]) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}
