//! Value types for the object (and entity) position of facts.
//!
//! This module defines the [`Value`] enum which represents every kind of
//! datum a fact may carry, along with the [`ValueDataType`] used as the schema
//! of typed variables.

use std::{
    fmt::{Display, Formatter},
    hash::{Hash, Hasher},
};

use ipld_core::cid::Cid;
use serde::Serialize;

use crate::TypeError;

/// All value representations that may be stored in a [`Fact`](crate::Fact)
#[derive(Debug, Clone, PartialOrd, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// A boolean
    Boolean(bool),
    /// A 64-bit signed integer
    Integer(i64),
    /// A floating point number
    Float(f64),
    /// A UTF-8 string
    String(String),
    /// A byte buffer
    Bytes(Vec<u8>),
    /// A content identifier, used for delegations and other content-addressed
    /// entities
    Link(Cid),
}

impl Value {
    /// Get the [`ValueDataType`] that corresponds to this variant of [`Value`]
    pub fn data_type(&self) -> ValueDataType {
        match self {
            Value::Boolean(_) => ValueDataType::Boolean,
            Value::Integer(_) => ValueDataType::Integer,
            Value::Float(_) => ValueDataType::Float,
            Value::String(_) => ValueDataType::String,
            Value::Bytes(_) => ValueDataType::Bytes,
            Value::Link(_) => ValueDataType::Link,
        }
    }

    /// Borrow the text if this is a [`Value::String`]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(text) => Some(text),
            _ => None,
        }
    }

    /// Borrow the link if this is a [`Value::Link`]
    pub fn as_link(&self) -> Option<&Cid> {
        match self {
            Value::Link(link) => Some(link),
            _ => None,
        }
    }

    /// Numeric view used by comparison constraints
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Integer(number) => Some(*number as f64),
            Value::Float(number) => Some(*number),
            _ => None,
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Boolean(b) => b.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Float(f) => f.to_le_bytes().hash(state),
            Value::String(s) => s.hash(state),
            Value::Bytes(b) => b.hash(state),
            Value::Link(l) => Hash::hash(l, state),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_le_bytes() == b.to_le_bytes(),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Link(a), Value::Link(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Boolean(value) => write!(f, "{value}"),
            Value::Integer(value) => write!(f, "{value}"),
            Value::Float(value) => write!(f, "{value}"),
            Value::String(value) => write!(f, "{value:?}"),
            Value::Bytes(value) => write!(f, "bytes({})", value.len()),
            Value::Link(value) => write!(f, "{value}"),
        }
    }
}

/// The type of a [`Value`], used as the schema of typed variables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ValueDataType {
    /// [`Value::Boolean`]
    Boolean,
    /// [`Value::Integer`]
    Integer,
    /// [`Value::Float`]
    Float,
    /// [`Value::String`]
    String,
    /// [`Value::Bytes`]
    Bytes,
    /// [`Value::Link`]
    Link,
}

impl Display for ValueDataType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ValueDataType::Boolean => "Boolean",
            ValueDataType::Integer => "Integer",
            ValueDataType::Float => "Float",
            ValueDataType::String => "String",
            ValueDataType::Bytes => "Bytes",
            ValueDataType::Link => "Link",
        };
        write!(f, "{name}")
    }
}

impl From<&Value> for ValueDataType {
    fn from(value: &Value) -> Self {
        value.data_type()
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value.into())
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Integer(value.into())
    }
}

/// Unix timestamps are unsigned; values beyond `i64::MAX` saturate, which is
/// far past any meaningful expiration.
impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::Integer(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

impl From<Cid> for Value {
    fn from(value: Cid) -> Self {
        Value::Link(value)
    }
}

impl From<&Cid> for Value {
    fn from(value: &Cid) -> Self {
        Value::Link(*value)
    }
}

macro_rules! value_try_from {
    ( $type:ty, $variant:ident, $data_type:ident ) => {
        impl TryFrom<Value> for $type {
            type Error = TypeError;

            fn try_from(value: Value) -> Result<Self, Self::Error> {
                match value {
                    Value::$variant(inner) => Ok(inner),
                    other => Err(TypeError {
                        expected: ValueDataType::$data_type,
                        actual: other.data_type(),
                    }),
                }
            }
        }
    };
}

value_try_from!(bool, Boolean, Boolean);
value_try_from!(i64, Integer, Integer);
value_try_from!(f64, Float, Float);
value_try_from!(String, String, String);
value_try_from!(Vec<u8>, Bytes, Bytes);
value_try_from!(Cid, Link, Link);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_reports_data_types() {
        assert_eq!(Value::from("did:key:alice").data_type(), ValueDataType::String);
        assert_eq!(Value::from(42i64).data_type(), ValueDataType::Integer);
        assert_eq!(Value::from(true).data_type(), ValueDataType::Boolean);
        assert_eq!(Value::from(1.5f64).data_type(), ValueDataType::Float);
    }

    #[test]
    fn it_does_not_coerce_between_variants() {
        assert_ne!(Value::Integer(1), Value::Float(1.0));
        assert_ne!(Value::from("1"), Value::Integer(1));

        let error = String::try_from(Value::Integer(1)).unwrap_err();
        assert_eq!(
            error,
            TypeError {
                expected: ValueDataType::String,
                actual: ValueDataType::Integer
            }
        );
    }

    #[test]
    fn it_saturates_large_timestamps() {
        assert_eq!(Value::from(u64::MAX), Value::Integer(i64::MAX));
        assert_eq!(Value::from(1_700_000_000u64), Value::Integer(1_700_000_000));
    }

    #[test]
    fn it_hashes_links_by_content() {
        use ipld_core::cid::multihash::Multihash;
        use std::collections::HashSet;

        let link = |byte: u8| {
            Value::from(Cid::new_v1(
                0x71,
                Multihash::<64>::wrap(0x12, &[byte; 32]).unwrap(),
            ))
        };

        let links: HashSet<Value> = [link(1), link(1), link(2)].into_iter().collect();
        assert_eq!(links.len(), 2);
        assert!(links.contains(&link(1)));
        assert!(!links.contains(&Value::from("1")));
    }
}
