//! Facts are the atomic unit of the store: an entity (`of`), an attribute
//! (`the`) and a value (`is`).

use std::{fmt, str::FromStr};

use serde::Serialize;

use crate::{QueryError, Value};

/// A namespaced attribute name such as `ucan/issuer` or `capability/nb/proof`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Attribute(String);

impl Attribute {
    /// Join a namespace and a path of segments into an attribute.
    ///
    /// The namespace is always present, so the result is well formed even
    /// when the path is empty.
    pub fn namespaced<'a, I>(namespace: &str, path: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut name = namespace.to_owned();
        for segment in path {
            name.push('/');
            name.push_str(segment);
        }
        Self(name)
    }

    /// The attribute text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Attribute {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((namespace, name)) if !namespace.is_empty() && !name.is_empty() => {
                Ok(Self(s.to_owned()))
            }
            _ => Err(QueryError::InvalidAttribute {
                attribute: s.to_owned(),
            }),
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Attribute> for Value {
    fn from(attribute: Attribute) -> Self {
        Value::String(attribute.0)
    }
}

/// An atomic fact associating an entity with a value through an attribute
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Fact {
    /// The entity the fact is about
    pub of: Value,
    /// What is being said about the entity
    pub the: Attribute,
    /// The value related to the entity
    pub is: Value,
}

impl Fact {
    /// Create a fact
    pub fn new<Of: Into<Value>, Is: Into<Value>>(of: Of, the: Attribute, is: Is) -> Self {
        Self {
            of: of.into(),
            the,
            is: is.into(),
        }
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {} {}]", self.of, self.the, self.is)
    }
}

/// Changes accepted by [`MemoryStore::transact`](crate::MemoryStore::transact)
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// Add a fact to the active set
    Assert(Fact),
    /// Remove a fact from the active set
    Retract(Fact),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_parses_namespaced_attributes() {
        assert!("ucan/issuer".parse::<Attribute>().is_ok());
        assert!("capability/nb/proof".parse::<Attribute>().is_ok());
        assert!("issuer".parse::<Attribute>().is_err());
        assert!("/issuer".parse::<Attribute>().is_err());
        assert!("ucan/".parse::<Attribute>().is_err());
    }

    #[test]
    fn it_joins_attribute_paths() {
        let attribute = Attribute::namespaced("meta", ["space", "name"]);
        assert_eq!(attribute.as_str(), "meta/space/name");
    }
}
