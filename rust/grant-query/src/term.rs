//! Term types for pattern matching and query construction
//!
//! A [`Term`] is either:
//! - a **Constant**: a concrete [`Value`] that must be equal to the observed one
//! - a **Variable**: a name-keyed placeholder, optionally typed, that binds to
//!   the observed value or must agree with an existing binding
//! - a **Blank**: a wildcard that matches anything and binds nothing
//!
//! Variables are compared by name only. Two occurrences of the same name
//! inside one conjunction always refer to the same binding, which is how joins
//! are expressed. Helpers that need private variables use [`Variable::unique`]
//! so that their names can not collide with the caller's.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use ipld_core::cid::Cid;
use serde::Serialize;

use crate::{TypeError, Value, ValueDataType};

static NEXT_VARIABLE: AtomicU64 = AtomicU64::new(0);

/// A named placeholder with an optional value schema
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Variable {
    name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    data_type: Option<ValueDataType>,
}

impl Variable {
    /// Create an untyped variable that accepts any value
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            data_type: None,
        }
    }

    /// Create a variable that only accepts values of `data_type`
    pub fn typed<N: Into<String>>(name: N, data_type: ValueDataType) -> Self {
        Self {
            name: name.into(),
            data_type: Some(data_type),
        }
    }

    /// Create a variable with a process-unique name derived from `label`
    pub fn unique(label: &str, data_type: Option<ValueDataType>) -> Self {
        let id = NEXT_VARIABLE.fetch_add(1, Ordering::Relaxed);
        Self {
            name: format!("{label}#{id}"),
            data_type,
        }
    }

    /// Fresh variable accepting only strings
    pub fn string(label: &str) -> Self {
        Self::unique(label, Some(ValueDataType::String))
    }

    /// Fresh variable accepting only integers
    pub fn integer(label: &str) -> Self {
        Self::unique(label, Some(ValueDataType::Integer))
    }

    /// Fresh variable accepting only links
    pub fn link(label: &str) -> Self {
        Self::unique(label, Some(ValueDataType::Link))
    }

    /// Fresh variable accepting any value
    pub fn any(label: &str) -> Self {
        Self::unique(label, None)
    }

    /// The key under which this variable is bound
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The schema of this variable, `None` when untyped
    pub fn data_type(&self) -> Option<ValueDataType> {
        self.data_type
    }

    /// Whether `value` conforms to the schema of this variable
    pub fn accepts(&self, value: &Value) -> bool {
        match self.data_type {
            Some(data_type) => value.data_type() == data_type,
            None => true,
        }
    }

    /// Read a value through this variable's schema
    ///
    /// Non-conforming values are rejected with a [`TypeError`], they are
    /// never coerced.
    pub fn read(&self, value: Value) -> Result<Value, TypeError> {
        match self.data_type {
            Some(expected) if value.data_type() != expected => Err(TypeError {
                expected,
                actual: value.data_type(),
            }),
            _ => Ok(value),
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.data_type {
            Some(data_type) => write!(f, "?{}<{}>", self.name, data_type),
            None => write!(f, "?{}", self.name),
        }
    }
}

/// Term represents a constant value, a variable placeholder or a blank
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Term {
    /// A variable that binds or unifies with the observed value
    #[serde(rename = "?")]
    Variable(Variable),
    /// A wildcard that matches anything without binding
    #[serde(rename = "_")]
    Blank,
    /// A concrete value
    #[serde(untagged)]
    Constant(Value),
}

impl Term {
    /// Create a term for an untyped named variable
    pub fn var<N: Into<String>>(name: N) -> Self {
        Term::Variable(Variable::new(name))
    }

    /// Create a blank term
    pub fn blank() -> Self {
        Term::Blank
    }

    /// Check if this term is a variable
    pub fn is_variable(&self) -> bool {
        matches!(self, Term::Variable(_))
    }

    /// Check if this term is a constant value
    pub fn is_constant(&self) -> bool {
        matches!(self, Term::Constant(_))
    }

    /// Check if this term is blank
    pub fn is_blank(&self) -> bool {
        matches!(self, Term::Blank)
    }

    /// Get the variable if this term is one
    pub fn as_variable(&self) -> Option<&Variable> {
        match self {
            Term::Variable(variable) => Some(variable),
            _ => None,
        }
    }

    /// Get the constant value if this term is one
    pub fn as_constant(&self) -> Option<&Value> {
        match self {
            Term::Constant(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Constant(value) => write!(f, "{value}"),
            Term::Variable(variable) => write!(f, "{variable}"),
            Term::Blank => write!(f, "_"),
        }
    }
}

impl From<Variable> for Term {
    fn from(variable: Variable) -> Self {
        Term::Variable(variable)
    }
}

impl From<&Variable> for Term {
    fn from(variable: &Variable) -> Self {
        Term::Variable(variable.clone())
    }
}

impl From<&Term> for Term {
    fn from(term: &Term) -> Self {
        term.clone()
    }
}

impl From<Value> for Term {
    fn from(value: Value) -> Self {
        Term::Constant(value)
    }
}

impl From<&str> for Term {
    fn from(value: &str) -> Self {
        Term::Constant(Value::from(value))
    }
}

impl From<String> for Term {
    fn from(value: String) -> Self {
        Term::Constant(Value::from(value))
    }
}

impl From<&String> for Term {
    fn from(value: &String) -> Self {
        Term::Constant(Value::from(value.as_str()))
    }
}

impl From<i64> for Term {
    fn from(value: i64) -> Self {
        Term::Constant(Value::from(value))
    }
}

impl From<u64> for Term {
    fn from(value: u64) -> Self {
        Term::Constant(Value::from(value))
    }
}

impl From<bool> for Term {
    fn from(value: bool) -> Self {
        Term::Constant(Value::from(value))
    }
}

impl From<Cid> for Term {
    fn from(value: Cid) -> Self {
        Term::Constant(Value::from(value))
    }
}
