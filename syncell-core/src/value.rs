//! The leaf scalar type stored by value throughout the value graph.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An immutable leaf scalar. Leaf values are never wrapped in a mutation
/// proxy; they are copied in and out of containers by value.
///
/// `Float` carries an [`OrderedFloat`] rather than a bare `f64` so that
/// `Value` is `Eq + Hash + Ord`, which mapping keys and set elements both
/// require.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Value {
    /// Absence of a value.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed 64-bit integer.
    Int(i64),
    /// Floating point number.
    Float(OrderedFloat<f64>),
    /// UTF-8 string.
    Str(String),
}

impl Value {
    /// Shorthand for constructing a [`Value::Float`] from a plain `f64`.
    pub fn float(v: f64) -> Self {
        Value::Float(OrderedFloat(v))
    }

    /// Returns the wrapped `i64` if this is an [`Value::Int`].
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the wrapped `&str` if this is a [`Value::Str`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{}", n.0),
            Value::Str(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_values_are_hashable_and_ordered() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(Value::float(1.5));
        set.insert(Value::float(1.5));
        set.insert(Value::float(2.5));
        assert_eq!(set.len(), 2);
        assert!(Value::float(1.0) < Value::float(2.0));
    }

    #[test]
    fn roundtrips_through_json() {
        let v = Value::Str("hello".into());
        let json = serde_json::to_string(&v).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);
    }
}
