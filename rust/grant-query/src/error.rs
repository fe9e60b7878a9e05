//! Error types for the query engine

use thiserror::Error;

use crate::{Value, ValueDataType};

/// Errors that can occur while building or evaluating queries
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// A constraint referenced a variable that no earlier clause bound
    #[error("Unbound variable {name:?} referenced")]
    UnboundVariable {
        /// Name of the variable
        name: String,
    },

    /// A value did not conform to the schema of the term reading it
    #[error(transparent)]
    Type(#[from] TypeError),

    /// An externally supplied binding disagrees with an existing one
    #[error("Can not bind {name:?} to {value} because it is already bound to {existing}")]
    Conflict {
        /// Name of the variable
        name: String,
        /// Value the variable is already bound to
        existing: Value,
        /// Value that was rejected
        value: Value,
    },

    /// Attribute was not of the `namespace/name` form
    #[error("Invalid attribute: {attribute}")]
    InvalidAttribute {
        /// The rejected attribute text
        attribute: String,
    },
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

/// A value of one type was handed to something expecting another
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Type mismatch: expected value of type {expected}, got {actual}")]
pub struct TypeError {
    /// The type the reader accepts
    pub expected: ValueDataType,
    /// The type that was actually supplied
    pub actual: ValueDataType,
}
