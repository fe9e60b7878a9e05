//! Variable bindings produced while a query is evaluated.

use std::{collections::BTreeMap, sync::Arc};

use crate::{QueryError, Term, TypeError, Value, Variable};

/// An immutable set of variable bindings accumulated while evaluating a
/// conjunction.
///
/// Extending bindings returns a new value; the original is never mutated, so
/// every branch of a disjunction can start from the same bindings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Bindings {
    variables: Arc<BTreeMap<String, Value>>,
}

impl Bindings {
    /// Empty bindings
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bound variables
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Whether nothing is bound
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Iterate over bound names and values in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.variables
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    /// Value bound to `variable`, if any
    pub fn get(&self, variable: &Variable) -> Option<&Value> {
        self.variables.get(variable.name())
    }

    /// Whether `term` has a value under these bindings
    pub fn has(&self, term: &Term) -> bool {
        match term {
            Term::Variable(variable) => self.variables.contains_key(variable.name()),
            Term::Constant(_) => true,
            Term::Blank => false,
        }
    }

    /// Resolve `term` to a value: constants resolve to themselves, variables
    /// to their binding, blanks and unbound variables to `None`
    pub fn resolve(&self, term: &Term) -> Option<Value> {
        match term {
            Term::Constant(value) => Some(value.clone()),
            Term::Variable(variable) => self.get(variable).cloned(),
            Term::Blank => None,
        }
    }

    /// Read the value bound to `variable` as `T`
    pub fn read<T>(&self, variable: &Variable) -> Result<T, QueryError>
    where
        T: TryFrom<Value, Error = TypeError>,
    {
        let value = self
            .get(variable)
            .cloned()
            .ok_or_else(|| QueryError::UnboundVariable {
                name: variable.name().to_owned(),
            })?;
        Ok(T::try_from(value)?)
    }

    /// Like [`Bindings::read`] but tolerates an unbound variable, which is what
    /// optional clauses leave behind
    pub fn read_optional<T>(&self, variable: &Variable) -> Result<Option<T>, QueryError>
    where
        T: TryFrom<Value, Error = TypeError>,
    {
        match self.get(variable) {
            Some(value) => Ok(Some(T::try_from(value.clone())?)),
            None => Ok(None),
        }
    }

    /// Unify `term` with an observed value.
    ///
    /// Returns extended bindings when the term is an unbound variable that
    /// accepts the value, the same bindings when the term already agrees with
    /// the value, and `None` when it does not.
    pub fn unify(&self, term: &Term, value: &Value) -> Option<Self> {
        match term {
            Term::Blank => Some(self.clone()),
            Term::Constant(constant) => (constant == value).then(|| self.clone()),
            Term::Variable(variable) => match self.get(variable) {
                Some(existing) => (existing == value).then(|| self.clone()),
                None if variable.accepts(value) => Some(self.insert(variable, value.clone())),
                None => None,
            },
        }
    }

    /// Bind an externally supplied value to `variable`.
    ///
    /// Unlike [`Bindings::unify`] this reports failures: a value that does not
    /// conform to the variable's schema is a [`QueryError::Type`] and a value
    /// that disagrees with an existing binding is a [`QueryError::Conflict`].
    pub fn bind(&self, variable: &Variable, value: Value) -> Result<Self, QueryError> {
        let value = variable.read(value)?;
        match self.get(variable) {
            Some(existing) if existing == &value => Ok(self.clone()),
            Some(existing) => Err(QueryError::Conflict {
                name: variable.name().to_owned(),
                existing: existing.clone(),
                value,
            }),
            None => Ok(self.insert(variable, value)),
        }
    }

    fn insert(&self, variable: &Variable, value: Value) -> Self {
        let mut variables = (*self.variables).clone();
        variables.insert(variable.name().to_owned(), value);
        Self {
            variables: Arc::new(variables),
        }
    }
}
