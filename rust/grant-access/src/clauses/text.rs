//! Text constraints on principals and resources.

use grant_query::{Clause, Term};
use serde::{Deserialize, Serialize};

/// Constraint on a text term, as accepted by query selectors.
///
/// Serialized the way selectors are written by hand: `{"glob": "did:key:*"}`,
/// `{"like": "did:%"}` or a plain string for an exact match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextConstraint {
    /// Glob pattern (`*`, `?`)
    Glob {
        /// The pattern
        glob: String,
    },
    /// SQL like pattern (`%`, `_`)
    Like {
        /// The pattern
        like: String,
    },
    /// Exact text
    Is(String),
}

impl TextConstraint {
    /// Glob constraint
    pub fn glob<P: Into<String>>(pattern: P) -> Self {
        TextConstraint::Glob {
            glob: pattern.into(),
        }
    }

    /// Like constraint
    pub fn like<P: Into<String>>(pattern: P) -> Self {
        TextConstraint::Like {
            like: pattern.into(),
        }
    }

    /// Any text at all
    pub fn any() -> Self {
        Self::glob("*")
    }
}

impl From<&str> for TextConstraint {
    fn from(text: &str) -> Self {
        TextConstraint::Is(text.to_owned())
    }
}

impl From<String> for TextConstraint {
    fn from(text: String) -> Self {
        TextConstraint::Is(text)
    }
}

/// Constrain `text` by `constraint`
pub fn matches(text: &Term, constraint: &TextConstraint) -> Clause {
    match constraint {
        TextConstraint::Glob { glob } => Clause::glob(text, glob),
        TextConstraint::Like { like } => Clause::like(text, like),
        TextConstraint::Is(value) => Clause::is(text, value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grant_query::{Bindings, Variable, evaluate};
    use pretty_assertions::assert_eq;

    #[test]
    fn it_reads_selector_notation() -> testresult::TestResult {
        let constraints: Vec<TextConstraint> =
            serde_json::from_str(r#"[{"glob": "did:key:*"}, {"like": "did:%"}, "did:key:alice"]"#)?;
        assert_eq!(
            constraints,
            vec![
                TextConstraint::glob("did:key:*"),
                TextConstraint::like("did:%"),
                TextConstraint::from("did:key:alice"),
            ]
        );
        Ok(())
    }

    #[test]
    fn it_binds_exact_text() -> testresult::TestResult {
        let who = Variable::new("who");
        let facts: Vec<grant_query::Fact> = Vec::new();
        let results = evaluate(
            &facts,
            &matches(&Term::from(&who), &"did:key:alice".into()),
            &Bindings::new(),
        )?;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].read::<String>(&who)?, "did:key:alice");
        Ok(())
    }
}
