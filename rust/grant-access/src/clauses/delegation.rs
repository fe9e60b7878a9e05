//! Delegation shape and temporal validity.
//!
//! Validity is always evaluated against an explicit `time` term, never the
//! wall clock, so that past and future validity can be queried.

use grant_query::{Clause, Term, Variable};

use super::capability;

/// `ucan` carries an expiration that is before `time`
pub fn is_expired(ucan: &Term, time: &Term) -> Clause {
    let expiration = Variable::integer("expiration");
    Clause::select(ucan, "ucan/expiration", &expiration).and(Clause::less(&expiration, time))
}

/// `ucan` carries a not-before that is after `time`
pub fn is_premature(ucan: &Term, time: &Term) -> Clause {
    let not_before = Variable::integer("notBefore");
    Clause::select(ucan, "ucan/notBefore", &not_before).and(Clause::greater(&not_before, time))
}

/// `ucan` is neither expired nor premature at `time`
pub fn is_valid(ucan: &Term, time: &Term) -> Clause {
    Clause::not(is_expired(ucan, time)).and(Clause::not(is_premature(ucan, time)))
}

/// `ucan` delegates `capability` from `issuer` to `audience` and is valid at
/// `time`
pub fn matches(
    ucan: &Term,
    capability: &Term,
    audience: &Term,
    issuer: &Term,
    time: &Term,
) -> Clause {
    Clause::select(ucan, "ucan/audience", audience)
        .and(Clause::select(ucan, "ucan/issuer", issuer))
        .and(Clause::select(ucan, "ucan/capability", capability))
        .and(is_valid(ucan, time))
}

/// `ucan` forwards whatever its issuer holds: it delegates a `ucan:*`
/// capability whose stored ability is bound to `can`.
///
/// The resource is left open; callers decide which subject the forwarded
/// access applies to.
pub fn forwards(ucan: &Term, audience: &Term, issuer: &Term, can: &Term, time: &Term) -> Clause {
    let capability = Term::from(Variable::link("forwarded"));
    matches(ucan, &capability, audience, issuer, time)
        .and(capability::matches(&capability, &"ucan:*".into(), can))
}

/// `ucan` was issued by `issuer`
pub fn issued_by(ucan: &Term, issuer: &Term) -> Clause {
    Clause::select(ucan, "ucan/issuer", issuer)
}

/// `ucan` links `proof` as one of its proofs
pub fn has_proof(ucan: &Term, proof: &Term) -> Clause {
    Clause::select(ucan, "ucan/proof", proof)
}

/// `ucan` has the metadata fact `the` (such as `meta/space/name`) set to `is`
pub fn has_meta(ucan: &Term, the: &str, is: &Term) -> Clause {
    Clause::select(ucan, the, is)
}
