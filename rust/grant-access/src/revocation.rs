//! Revocation checks over proof chains.
//!
//! Resolution never consults revocations. Once an [`Authorization`] has been
//! found, [`check`] walks the proof graph behind it and fails on the first
//! revocation that is effective.
//!
//! A revocation of delegation `D` is effective when it was issued by `D`'s
//! issuer or audience, or by the issuer of any delegation between `D` and the
//! leaf being checked (the leaf included). Revocations by principals upstream
//! of `D` or unrelated to the chain are ignored.

use std::collections::{BTreeMap, HashMap};

use ipld_core::cid::Cid;

use crate::{AccessError, Authorization, Delegation, Proof};

/// Dereference delegations linked from proof chains
pub trait Resolve {
    /// The delegation with `cid`, if it is known
    fn resolve(&self, cid: &Cid) -> Option<&Delegation>;
}

impl Resolve for HashMap<Cid, Delegation> {
    fn resolve(&self, cid: &Cid) -> Option<&Delegation> {
        self.get(cid)
    }
}

/// Recorded revocations, keyed by the revoked delegation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Revocations {
    entries: HashMap<Cid, BTreeMap<String, Cid>>,
}

impl Revocations {
    /// No recorded revocations
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of revoked delegations
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is revoked
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record that `scope` revoked `ucan`, with `cause` being the revocation
    /// receipt. Revocations of the same delegation by other scopes are kept.
    pub fn add<S: Into<String>>(&mut self, ucan: Cid, scope: S, cause: Cid) {
        self.entries
            .entry(ucan)
            .or_default()
            .insert(scope.into(), cause);
    }

    /// Replace every recorded revocation of `ucan` with `scopes`
    pub fn reset(&mut self, ucan: Cid, scopes: BTreeMap<String, Cid>) {
        if scopes.is_empty() {
            self.entries.remove(&ucan);
        } else {
            self.entries.insert(ucan, scopes);
        }
    }

    /// Revocations of `ucan` by scope
    pub fn get(&self, ucan: &Cid) -> Option<&BTreeMap<String, Cid>> {
        self.entries.get(ucan)
    }
}

/// Fail if any delegation reachable from `leaf` is effectively revoked.
///
/// Embedded proofs are walked directly and linked ones through `resolver`.
/// Links that cannot be resolved are skipped.
pub fn validate<R: Resolve + ?Sized>(
    revocations: &Revocations,
    leaf: &Delegation,
    resolver: &R,
) -> Result<(), AccessError> {
    let mut path = Vec::new();
    visit(revocations, leaf, resolver, &mut path)
}

/// [`validate`] every proof of `authorization`
pub fn check<R: Resolve + ?Sized>(
    revocations: &Revocations,
    authorization: &Authorization,
    resolver: &R,
) -> Result<(), AccessError> {
    if revocations.is_empty() {
        return Ok(());
    }
    for proof in &authorization.proofs {
        validate(revocations, proof, resolver)?;
    }
    Ok(())
}

fn visit<'a, R: Resolve + ?Sized>(
    revocations: &Revocations,
    delegation: &'a Delegation,
    resolver: &'a R,
    path: &mut Vec<&'a Delegation>,
) -> Result<(), AccessError> {
    let cid = delegation.cid();
    if path.iter().any(|downstream| downstream.cid() == cid) {
        return Ok(());
    }

    if let Some(scopes) = revocations.get(&cid) {
        for (scope, cause) in scopes {
            let effective = scope == delegation.issuer()
                || scope == delegation.audience()
                || path.iter().any(|downstream| downstream.issuer() == scope);
            if effective {
                return Err(AccessError::Revoked {
                    ucan: cid,
                    scope: scope.clone(),
                    cause: *cause,
                });
            }
            tracing::debug!(%cid, %scope, "ignoring revocation outside of the proof chain");
        }
    }

    path.push(delegation);
    for proof in delegation.proofs() {
        let resolved = match proof {
            Proof::Delegation(proof) => Some(proof.as_ref()),
            Proof::Link(link) => resolver.resolve(link),
        };
        match resolved {
            Some(proof) => visit(revocations, proof, resolver, path)?,
            None => tracing::warn!(cid = %proof.cid(), "skipping unresolvable proof"),
        }
    }
    path.pop();

    Ok(())
}
