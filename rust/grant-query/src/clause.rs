//! Clauses are the predicates queries are made of.
//!
//! A [`Clause`] is plain data. The interpreter in [`crate::evaluate`] gives it
//! meaning, which keeps every combinator testable on its own.

use std::fmt;

use crate::Term;

/// A triple pattern matched against every fact of the store
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    /// Entity term
    pub of: Term,
    /// Attribute term
    pub the: Term,
    /// Value term
    pub is: Term,
}

impl Pattern {
    /// Create a pattern from its three terms
    pub fn new<Of, The, Is>(of: Of, the: The, is: Is) -> Self
    where
        Of: Into<Term>,
        The: Into<Term>,
        Is: Into<Term>,
    {
        Self {
            of: of.into(),
            the: the.into(),
            is: is.into(),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {} {}]", self.of, self.the, self.is)
    }
}

/// Numeric comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// `left > right`
    Greater,
    /// `left >= right`
    GreaterOrEqual,
    /// `left < right`
    Less,
    /// `left <= right`
    LessOrEqual,
}

impl Comparison {
    /// Apply the operator
    pub fn holds(&self, left: f64, right: f64) -> bool {
        match self {
            Comparison::Greater => left > right,
            Comparison::GreaterOrEqual => left >= right,
            Comparison::Less => left < right,
            Comparison::LessOrEqual => left <= right,
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Comparison::Greater => ">",
            Comparison::GreaterOrEqual => ">=",
            Comparison::Less => "<",
            Comparison::LessOrEqual => "<=",
        };
        write!(f, "{symbol}")
    }
}

/// A query predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// Match a triple pattern against the store
    Match(Pattern),
    /// All clauses hold, evaluated left to right
    And(Vec<Clause>),
    /// Any clause holds; results of every branch are concatenated
    Or(Vec<Clause>),
    /// The inner clause has no solution under the incoming bindings
    Not(Box<Clause>),
    /// The inner clause's solutions, or the incoming bindings if it has none
    Optional(Box<Clause>),
    /// `text` matches the glob `pattern`
    Glob {
        /// Text being constrained
        text: Term,
        /// Glob pattern
        pattern: Term,
    },
    /// `text` matches the SQL like `pattern`
    Like {
        /// Text being constrained
        text: Term,
        /// Like pattern
        pattern: Term,
    },
    /// Numeric comparison between two terms
    Compare {
        /// Left operand
        left: Term,
        /// Operator
        operator: Comparison,
        /// Right operand
        right: Term,
    },
    /// The two terms are equal, binding whichever side is unbound
    Is {
        /// Left operand
        left: Term,
        /// Right operand
        right: Term,
    },
}

impl Clause {
    /// Clause matching `[of the is]`
    pub fn select<Of, The, Is>(of: Of, the: The, is: Is) -> Self
    where
        Of: Into<Term>,
        The: Into<Term>,
        Is: Into<Term>,
    {
        Clause::Match(Pattern::new(of, the, is))
    }

    /// Conjunction of `clauses`
    pub fn all<I: IntoIterator<Item = Clause>>(clauses: I) -> Self {
        Clause::And(clauses.into_iter().collect())
    }

    /// Disjunction of `clauses`
    pub fn any<I: IntoIterator<Item = Clause>>(clauses: I) -> Self {
        Clause::Or(clauses.into_iter().collect())
    }

    /// Negation of `clause`
    pub fn not(clause: Clause) -> Self {
        Clause::Not(Box::new(clause))
    }

    /// Optional `clause`
    pub fn optional(clause: Clause) -> Self {
        Clause::Optional(Box::new(clause))
    }

    /// Glob constraint
    pub fn glob<T: Into<Term>, P: Into<Term>>(text: T, pattern: P) -> Self {
        Clause::Glob {
            text: text.into(),
            pattern: pattern.into(),
        }
    }

    /// Like constraint
    pub fn like<T: Into<Term>, P: Into<Term>>(text: T, pattern: P) -> Self {
        Clause::Like {
            text: text.into(),
            pattern: pattern.into(),
        }
    }

    /// `left > right`
    pub fn greater<L: Into<Term>, R: Into<Term>>(left: L, right: R) -> Self {
        Clause::Compare {
            left: left.into(),
            operator: Comparison::Greater,
            right: right.into(),
        }
    }

    /// `left < right`
    pub fn less<L: Into<Term>, R: Into<Term>>(left: L, right: R) -> Self {
        Clause::Compare {
            left: left.into(),
            operator: Comparison::Less,
            right: right.into(),
        }
    }

    /// Equality constraint
    pub fn is<L: Into<Term>, R: Into<Term>>(left: L, right: R) -> Self {
        Clause::Is {
            left: left.into(),
            right: right.into(),
        }
    }

    /// Conjoin `other` after this clause, flattening nested conjunctions
    pub fn and(self, other: Clause) -> Self {
        match self {
            Clause::And(mut clauses) => {
                clauses.push(other);
                Clause::And(clauses)
            }
            clause => Clause::And(vec![clause, other]),
        }
    }

    /// Disjoin `other` with this clause, flattening nested disjunctions
    pub fn or(self, other: Clause) -> Self {
        match self {
            Clause::Or(mut clauses) => {
                clauses.push(other);
                Clause::Or(clauses)
            }
            clause => Clause::Or(vec![clause, other]),
        }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, name: &str, clauses: &[Clause]) -> fmt::Result {
            write!(f, "({name}")?;
            for clause in clauses {
                write!(f, " {clause}")?;
            }
            write!(f, ")")
        }

        match self {
            Clause::Match(pattern) => write!(f, "{pattern}"),
            Clause::And(clauses) => join(f, "and", clauses),
            Clause::Or(clauses) => join(f, "or", clauses),
            Clause::Not(clause) => write!(f, "(not {clause})"),
            Clause::Optional(clause) => write!(f, "(optional {clause})"),
            Clause::Glob { text, pattern } => write!(f, "(glob {text} {pattern})"),
            Clause::Like { text, pattern } => write!(f, "(like {text} {pattern})"),
            Clause::Compare {
                left,
                operator,
                right,
            } => write!(f, "({operator} {left} {right})"),
            Clause::Is { left, right } => write!(f, "(= {left} {right})"),
        }
    }
}
