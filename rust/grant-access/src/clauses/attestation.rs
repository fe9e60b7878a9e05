//! Service attestations.
//!
//! An attestation is a delegation from a service to an agent with a
//! `ucan/attest` capability on the service itself, whose `nb.proof` names the
//! delegation being vouched for. Grants issued by accounts are only accepted
//! together with one.

use grant_query::{Clause, Term, Variable};

use super::delegation;

/// Ability of attestation capabilities
pub const ATTEST: &str = "ucan/attest";

/// `attestation` is issued by `provider` to `audience`, attests `proof` and
/// is valid at `time`
pub fn matches(
    attestation: &Term,
    provider: &Term,
    audience: &Term,
    proof: &Term,
    time: &Term,
) -> Clause {
    let capability = Term::from(Variable::link("attestation"));
    Clause::select(&capability, "capability/nb/proof", proof)
        .and(Clause::select(&capability, "capability/can", ATTEST))
        .and(Clause::select(&capability, "capability/with", provider))
        .and(delegation::matches(
            attestation,
            &capability,
            audience,
            provider,
            time,
        ))
}
