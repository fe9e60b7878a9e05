//! Interpreter for [`Clause`] trees.
//!
//! Evaluation is a nested-loop join: every clause maps one incoming
//! [`Bindings`] to the list of bindings under which it holds. Results follow
//! fact insertion order first and clause declaration order second, so the same
//! store and query always produce the same answer in the same order.

use crate::{
    Attribute, Bindings, Clause, Comparison, Pattern, QueryError, QueryResult, Source, Term,
    TypeError, Value, ValueDataType, text,
};

/// Evaluate the conjunction of `clauses` starting from empty bindings
pub fn query<S>(source: &S, clauses: &[Clause]) -> QueryResult<Vec<Bindings>>
where
    S: Source + ?Sized,
{
    let mut frames = vec![Bindings::new()];
    for clause in clauses {
        frames = join(source, clause, frames)?;
        if frames.is_empty() {
            break;
        }
    }
    tracing::debug!(clauses = clauses.len(), results = frames.len(), "evaluated query");
    Ok(frames)
}

/// Every extension of `bindings` under which `clause` holds
pub fn evaluate<S>(source: &S, clause: &Clause, bindings: &Bindings) -> QueryResult<Vec<Bindings>>
where
    S: Source + ?Sized,
{
    let results = match clause {
        Clause::Match(pattern) => select(source, pattern, bindings),
        Clause::And(clauses) => {
            let mut frames = vec![bindings.clone()];
            for clause in clauses {
                frames = join(source, clause, frames)?;
                if frames.is_empty() {
                    break;
                }
            }
            frames
        }
        Clause::Or(clauses) => {
            let mut frames = Vec::new();
            for clause in clauses {
                frames.extend(evaluate(source, clause, bindings)?);
            }
            frames
        }
        Clause::Not(clause) => {
            if evaluate(source, clause, bindings)?.is_empty() {
                vec![bindings.clone()]
            } else {
                vec![]
            }
        }
        Clause::Optional(clause) => {
            let frames = evaluate(source, clause, bindings)?;
            if frames.is_empty() {
                vec![bindings.clone()]
            } else {
                frames
            }
        }
        Clause::Glob { text, pattern } => {
            matches_text(text, pattern, bindings, text::glob, text::glob_literal)?
        }
        Clause::Like { text, pattern } => {
            matches_text(text, pattern, bindings, text::like, text::like_literal)?
        }
        Clause::Compare {
            left,
            operator,
            right,
        } => compare(left, *operator, right, bindings)?,
        Clause::Is { left, right } => equate(left, right, bindings)?,
    };

    tracing::trace!(%clause, results = results.len(), "evaluated clause");
    Ok(results)
}

fn join<S>(source: &S, clause: &Clause, frames: Vec<Bindings>) -> QueryResult<Vec<Bindings>>
where
    S: Source + ?Sized,
{
    let mut joined = Vec::new();
    for frame in &frames {
        joined.extend(evaluate(source, clause, frame)?);
    }
    Ok(joined)
}

fn select<S>(source: &S, pattern: &Pattern, bindings: &Bindings) -> Vec<Bindings>
where
    S: Source + ?Sized,
{
    let attribute = match bindings.resolve(&pattern.the) {
        Some(Value::String(name)) => match name.parse::<Attribute>() {
            Ok(attribute) => Some(attribute),
            // Stored attributes are always well formed
            Err(_) => return vec![],
        },
        Some(_) => return vec![],
        None => None,
    };

    source
        .scan(attribute.as_ref())
        .filter_map(|fact| {
            bindings
                .unify(&pattern.of, &fact.of)?
                .unify(&pattern.the, &Value::from(fact.the.clone()))?
                .unify(&pattern.is, &fact.is)
        })
        .collect()
}

fn unbound(term: &Term) -> QueryError {
    QueryError::UnboundVariable {
        name: match term {
            Term::Variable(variable) => variable.name().to_owned(),
            _ => "_".to_owned(),
        },
    }
}

fn matches_text(
    text: &Term,
    pattern: &Term,
    bindings: &Bindings,
    matcher: fn(&str, &str) -> bool,
    literal: fn(&str) -> Option<String>,
) -> QueryResult<Vec<Bindings>> {
    let pattern = match bindings.resolve(pattern) {
        Some(Value::String(pattern)) => pattern,
        Some(other) => {
            return Err(TypeError {
                expected: ValueDataType::String,
                actual: other.data_type(),
            }
            .into());
        }
        None => return Err(unbound(pattern)),
    };

    match bindings.resolve(text) {
        Some(Value::String(text)) if matcher(&text, &pattern) => Ok(vec![bindings.clone()]),
        Some(_) => Ok(vec![]),
        None if text.is_blank() => Ok(vec![bindings.clone()]),
        None => match literal(&pattern) {
            Some(literal) => Ok(bindings
                .unify(text, &Value::String(literal))
                .into_iter()
                .collect()),
            None => Err(unbound(text)),
        },
    }
}

fn compare(
    left: &Term,
    operator: Comparison,
    right: &Term,
    bindings: &Bindings,
) -> QueryResult<Vec<Bindings>> {
    let number = |term: &Term| -> QueryResult<f64> {
        let value = bindings.resolve(term).ok_or_else(|| unbound(term))?;
        value.as_number().ok_or_else(|| {
            TypeError {
                expected: ValueDataType::Integer,
                actual: value.data_type(),
            }
            .into()
        })
    };

    if operator.holds(number(left)?, number(right)?) {
        Ok(vec![bindings.clone()])
    } else {
        Ok(vec![])
    }
}

fn equate(left: &Term, right: &Term, bindings: &Bindings) -> QueryResult<Vec<Bindings>> {
    if left.is_blank() || right.is_blank() {
        return Ok(vec![bindings.clone()]);
    }

    match (bindings.resolve(left), bindings.resolve(right)) {
        (Some(left), Some(right)) => Ok(if left == right {
            vec![bindings.clone()]
        } else {
            vec![]
        }),
        (None, Some(value)) => Ok(bindings.unify(left, &value).into_iter().collect()),
        (Some(value), None) => Ok(bindings.unify(right, &value).into_iter().collect()),
        (None, None) => Err(unbound(left)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Fact, MemoryStore, Variable};
    use pretty_assertions::assert_eq;

    fn fact<Is: Into<Value>>(of: &str, the: &str, is: Is) -> Fact {
        Fact::new(of, the.parse().unwrap(), is)
    }

    fn store() -> MemoryStore {
        [
            fact("ucan-a", "ucan/issuer", "did:key:alice"),
            fact("ucan-a", "ucan/audience", "did:key:bob"),
            fact("ucan-a", "ucan/expiration", 100i64),
            fact("ucan-b", "ucan/issuer", "did:key:bob"),
            fact("ucan-b", "ucan/audience", "did:key:carol"),
            fact("ucan-c", "ucan/issuer", "did:mailto:web.mail:alice"),
            fact("ucan-c", "ucan/audience", "did:key:bob"),
        ]
        .into_iter()
        .collect()
    }

    fn values(results: &[Bindings], name: &str) -> Vec<Value> {
        let variable = Variable::new(name);
        results
            .iter()
            .filter_map(|bindings| bindings.get(&variable).cloned())
            .collect()
    }

    #[test]
    fn it_joins_on_shared_variables() -> testresult::TestResult {
        let results = query(
            &store(),
            &[
                Clause::select(Term::var("first"), "ucan/audience", Term::var("middle")),
                Clause::select(Term::var("second"), "ucan/issuer", Term::var("middle")),
                Clause::select(Term::var("second"), "ucan/audience", Term::var("last")),
            ],
        )?;

        // both delegations to bob join with the one bob issued to carol
        assert_eq!(
            values(&results, "first"),
            vec![Value::from("ucan-a"), Value::from("ucan-c")]
        );
        assert_eq!(
            values(&results, "last"),
            vec![Value::from("did:key:carol"), Value::from("did:key:carol")]
        );
        Ok(())
    }

    #[test]
    fn it_returns_results_in_insertion_order() -> testresult::TestResult {
        let results = query(
            &store(),
            &[Clause::select(Term::var("ucan"), "ucan/audience", "did:key:bob")],
        )?;
        assert_eq!(
            values(&results, "ucan"),
            vec![Value::from("ucan-a"), Value::from("ucan-c")]
        );
        Ok(())
    }

    #[test]
    fn it_matches_indexed_and_linear_sources_alike() -> testresult::TestResult {
        let store = store();
        let facts: Vec<Fact> = store.facts().cloned().collect();
        let clauses = [
            Clause::select(Term::var("ucan"), Term::var("the"), Term::var("is")),
            Clause::select(Term::var("ucan"), "ucan/issuer", Term::var("issuer")),
        ];

        assert_eq!(query(&store, &clauses)?, query(&facts, &clauses)?);
        assert_eq!(query(&store, &clauses)?.len(), 7);
        Ok(())
    }

    #[test]
    fn it_concatenates_disjunctions() -> testresult::TestResult {
        let results = query(
            &store(),
            &[Clause::select(Term::var("ucan"), "ucan/issuer", "did:key:bob")
                .or(Clause::select(Term::var("ucan"), "ucan/issuer", "did:key:alice"))
                .or(Clause::select(Term::var("ucan"), "ucan/audience", "did:key:bob"))],
        )?;
        assert_eq!(
            values(&results, "ucan"),
            vec![
                Value::from("ucan-b"),
                Value::from("ucan-a"),
                Value::from("ucan-a"),
                Value::from("ucan-c")
            ]
        );
        Ok(())
    }

    #[test]
    fn it_filters_with_negation() -> testresult::TestResult {
        let results = query(
            &store(),
            &[
                Clause::select(Term::var("ucan"), "ucan/audience", "did:key:bob"),
                Clause::not(Clause::select(
                    Term::var("ucan"),
                    "ucan/issuer",
                    "did:mailto:web.mail:alice",
                )),
            ],
        )?;
        assert_eq!(values(&results, "ucan"), vec![Value::from("ucan-a")]);
        Ok(())
    }

    #[test]
    fn it_tolerates_missing_optional_facts() -> testresult::TestResult {
        let results = query(
            &store(),
            &[
                Clause::select(Term::var("ucan"), "ucan/issuer", Term::Blank),
                Clause::optional(Clause::select(
                    Term::var("ucan"),
                    "ucan/expiration",
                    Term::var("expiration"),
                )),
            ],
        )?;
        assert_eq!(results.len(), 3);
        assert_eq!(values(&results, "expiration"), vec![Value::Integer(100)]);
        Ok(())
    }

    #[test]
    fn it_applies_text_constraints() -> testresult::TestResult {
        let store = store();
        let issued = Clause::select(Term::var("ucan"), "ucan/issuer", Term::var("issuer"));

        let globbed = query(
            &store,
            &[issued.clone(), Clause::glob(Term::var("issuer"), "did:mailto:*")],
        )?;
        assert_eq!(values(&globbed, "ucan"), vec![Value::from("ucan-c")]);

        let liked = query(
            &store,
            &[issued, Clause::like(Term::var("issuer"), "DID:KEY:%")],
        )?;
        assert_eq!(
            values(&liked, "ucan"),
            vec![Value::from("ucan-a"), Value::from("ucan-b")]
        );
        Ok(())
    }

    #[test]
    fn it_binds_text_matched_against_literal_patterns() -> testresult::TestResult {
        let results = query(
            &store(),
            &[
                Clause::glob(Term::var("issuer"), "did:key:bob"),
                Clause::select(Term::var("ucan"), "ucan/issuer", Term::var("issuer")),
            ],
        )?;
        assert_eq!(values(&results, "ucan"), vec![Value::from("ucan-b")]);
        Ok(())
    }

    #[test]
    fn it_rejects_unbound_constraint_operands() {
        let error = query(&store(), &[Clause::glob(Term::var("issuer"), "did:*")]).unwrap_err();
        assert_eq!(
            error,
            QueryError::UnboundVariable {
                name: "issuer".into()
            }
        );

        let error = query(&store(), &[Clause::less(Term::var("time"), 5i64)]).unwrap_err();
        assert!(matches!(error, QueryError::UnboundVariable { .. }));
    }

    #[test]
    fn it_compares_numbers() -> testresult::TestResult {
        let store = store();
        let expiring = Clause::select(Term::var("ucan"), "ucan/expiration", Term::var("expiration"));

        let expired = query(
            &store,
            &[expiring.clone(), Clause::less(Term::var("expiration"), 150i64)],
        )?;
        assert_eq!(expired.len(), 1);

        let valid = query(
            &store,
            &[expiring, Clause::greater(Term::var("expiration"), 150i64)],
        )?;
        assert!(valid.is_empty());

        let error = query(
            &store,
            &[Clause::less(Term::from("soon"), 1i64)],
        )
        .unwrap_err();
        assert!(matches!(error, QueryError::Type(_)));
        Ok(())
    }

    #[test]
    fn it_binds_through_equality() -> testresult::TestResult {
        let results = query(
            &store(),
            &[
                Clause::is(Term::var("who"), "did:key:carol"),
                Clause::select(Term::var("ucan"), "ucan/audience", Term::var("who")),
            ],
        )?;
        assert_eq!(values(&results, "ucan"), vec![Value::from("ucan-b")]);
        Ok(())
    }

    #[test]
    fn it_skips_facts_outside_variable_schema() -> testresult::TestResult {
        let expiration = Variable::typed("expiration", ValueDataType::String);
        let results = query(
            &store(),
            &[Clause::select(Term::var("ucan"), "ucan/expiration", expiration)],
        )?;
        assert!(results.is_empty());
        Ok(())
    }

    #[test]
    fn it_matches_nothing_for_malformed_attributes() -> testresult::TestResult {
        let results = query(
            &store(),
            &[Clause::select(Term::var("ucan"), "issuer", Term::Blank)],
        )?;
        assert!(results.is_empty());
        Ok(())
    }

    #[test]
    fn it_is_deterministic() -> testresult::TestResult {
        let clauses = [Clause::select(Term::var("ucan"), "ucan/audience", Term::var("who"))
            .or(Clause::select(Term::var("ucan"), "ucan/issuer", Term::var("who")))];
        assert_eq!(query(&store(), &clauses)?, query(&store(), &clauses)?);
        Ok(())
    }
}
