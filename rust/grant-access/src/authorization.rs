//! Authorization resolution.
//!
//! Answers "can this authority invoke these abilities on this subject, and
//! which delegations prove it?". A delegation proves access when:
//!
//! - it delegates a capability on the subject whose ability, read as a glob,
//!   contains the requested one (**explicit**), or
//! - it forwards everything its issuer holds (`ucan:*`) and the issuer is the
//!   subject itself, or holds an explicit delegation on the subject that is
//!   linked as a proof (**forwarded**). Only one level of re-delegation is
//!   followed.
//!
//! Grants issued by, or on, an account additionally require a service
//! [attestation](crate::clauses::attestation) naming the grant.

use std::collections::BTreeMap;

use grant_query::{Bindings, Cid, Clause, Term, Variable};
use indexmap::{IndexMap, IndexSet};
use ipld_core::ipld::Ipld;
use serde::{Deserialize, Serialize, Serializer};

use crate::{
    AccessError, Database, Delegation, Settings,
    clauses::{TextConstraint, attestation, capability, delegation, text},
};

/// Resource of capabilities that forward everything the issuer holds
pub const FORWARD: &str = "ucan:*";

/// Abilities mapped to their caveats
pub type Can = BTreeMap<String, Vec<Ipld>>;

/// Proof that an authority may exercise abilities on a subject
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Authorization {
    /// Principal the authorization is for
    pub authority: String,
    /// Resource the abilities apply to
    pub subject: String,
    /// Authorized abilities
    pub can: Can,
    /// Delegations proving the access, grants before attestations
    #[serde(serialize_with = "serialize_proofs")]
    pub proofs: Vec<Delegation>,
}

fn serialize_proofs<S: Serializer>(proofs: &[Delegation], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(proofs.iter().map(|proof| proof.cid().to_string()))
}

/// Terms an authorization match is expressed over
#[derive(Debug, Clone, PartialEq)]
pub struct Claim {
    /// Audience of the matched delegation
    pub authority: Term,
    /// Resource access is claimed on; must not be blank
    pub subject: Term,
    /// Issuer of the matched delegation
    pub issuer: Term,
    /// Requested ability, or a variable bound to the delegated one
    pub can: Term,
    /// Attestation of the matched delegation, when one is required
    pub attestation: Term,
    /// Time validity is checked at
    pub time: Term,
}

impl Claim {
    /// Claim at `time` with every other term left open
    pub fn at<T: Into<Term>>(time: T) -> Self {
        Self {
            authority: Variable::string("authority").into(),
            subject: Variable::string("subject").into(),
            issuer: Variable::string("issuer").into(),
            can: Variable::string("can").into(),
            attestation: Variable::link("attestation").into(),
            time: time.into(),
        }
    }
}

/// `ucan` explicitly delegates the claimed ability on the claimed subject.
///
/// Forwarding capabilities on [`FORWARD`] never match here.
pub fn explicit(ucan: &Term, claim: &Claim) -> Clause {
    let capability = Term::from(Variable::link("capability"));
    let stored = Term::from(Variable::string("can"));
    capability::matches(&capability, &claim.subject, &stored)
        .and(Clause::not(Clause::is(&claim.subject, FORWARD)))
        .and(capability::provides(&stored, &claim.can))
        .and(delegation::matches(
            ucan,
            &capability,
            &claim.authority,
            &claim.issuer,
            &claim.time,
        ))
}

/// `ucan` forwards the claimed ability on the claimed subject, either because
/// its issuer is the subject or because it links an explicit delegation on
/// the subject to its issuer as a proof
pub fn forwards(ucan: &Term, claim: &Claim) -> Clause {
    let forwarded = Term::from(Variable::string("forwarded"));
    let proof = Term::from(Variable::link("proof"));
    let delegated = Claim {
        authority: claim.issuer.clone(),
        subject: claim.subject.clone(),
        can: claim.can.clone(),
        ..Claim::at(claim.time.clone())
    };

    delegation::forwards(ucan, &claim.authority, &claim.issuer, &forwarded, &claim.time).and(
        Clause::any([
            delegation::issued_by(ucan, &claim.subject)
                .and(capability::provides(&forwarded, &claim.can)),
            // TODO: follow forwarding proofs recursively once deeper chains
            // are part of the contract.
            delegation::has_proof(ucan, &proof)
                .and(explicit(&proof, &delegated))
                .and(Clause::glob(&claim.can, &forwarded)),
        ]),
    )
}

/// `ucan` proves the claim, accompanied by an attestation from a provider
/// whenever its issuer or the subject is an account
pub fn matches(ucan: &Term, claim: &Claim, settings: &Settings) -> Clause {
    let by_account = Clause::glob(&claim.issuer, &settings.account)
        .or(Clause::glob(&claim.subject, &settings.account));
    let provider = Term::from(Variable::string("provider"));
    let attested = attestation::matches(
        &claim.attestation,
        &provider,
        &claim.authority,
        ucan,
        &claim.time,
    )
    .and(Clause::glob(&provider, &settings.provider));

    explicit(ucan, claim)
        .or(forwards(ucan, claim))
        .and(Clause::not(by_account.clone()).or(by_account.and(attested)))
}

/// What [`find`] looks for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Principals access is requested for
    pub authority: TextConstraint,
    /// Resources access is requested on
    #[serde(default = "TextConstraint::any")]
    pub subject: TextConstraint,
    /// Requested abilities, all of which must be proven. When empty every
    /// delegated ability is reported.
    #[serde(default)]
    pub can: Can,
    /// Unix seconds validity is checked at
    pub time: u64,
}

impl Query {
    /// Query for everything `authority` may do on any subject at `time`
    pub fn new<A: Into<TextConstraint>>(authority: A, time: u64) -> Self {
        Self {
            authority: authority.into(),
            subject: TextConstraint::any(),
            can: Can::new(),
            time,
        }
    }

    /// Restrict the subject
    pub fn subject<S: Into<TextConstraint>>(mut self, subject: S) -> Self {
        self.subject = subject.into();
        self
    }

    /// Require `ability`
    pub fn can<C: Into<String>>(mut self, ability: C) -> Self {
        self.can.insert(ability.into(), Vec::new());
        self
    }
}

/// Variables one requested ability is resolved through
#[derive(Debug, Clone)]
pub struct ProofSelector {
    /// The requested ability, `None` when every ability was requested
    pub need: Option<String>,
    /// Bound to the delegated ability when `need` is `None`
    pub can: Variable,
    /// Bound to the matched grant
    pub proof: Variable,
    /// Bound to the grant's attestation when one was required
    pub attestation: Variable,
}

/// A compiled [`Query`]
#[derive(Debug, Clone)]
pub struct Selector {
    /// Bound to the authority of each match
    pub authority: Variable,
    /// Bound to the subject of each match
    pub subject: Variable,
    /// One entry per requested ability
    pub proofs: Vec<ProofSelector>,
    /// Clauses to evaluate
    pub clauses: Vec<Clause>,
}

/// Compile `query` into clauses.
///
/// Each requested ability gets its own proof group; all groups share the
/// authority and subject, so every ability has to be proven on the same
/// subject.
pub fn query(query: &Query, settings: &Settings) -> Selector {
    let authority = Variable::string("authority");
    let subject = Variable::string("subject");

    let needs: Vec<Option<String>> = if query.can.is_empty() {
        vec![None]
    } else {
        query.can.keys().cloned().map(Some).collect()
    };

    let mut clauses = Vec::new();
    let mut proofs = Vec::new();
    for need in needs {
        let selector = ProofSelector {
            can: Variable::string("can"),
            proof: Variable::link("proof"),
            attestation: Variable::link("attestation"),
            need,
        };

        let claim = Claim {
            authority: Term::from(&authority),
            subject: Term::from(&subject),
            can: match &selector.need {
                Some(need) => Term::from(need),
                None => Term::from(&selector.can),
            },
            attestation: Term::from(&selector.attestation),
            ..Claim::at(query.time)
        };
        clauses.push(matches(&Term::from(&selector.proof), &claim, settings));
        proofs.push(selector);
    }

    clauses.push(text::matches(&Term::from(&subject), &query.subject));
    clauses.push(text::matches(&Term::from(&authority), &query.authority));

    Selector {
        authority,
        subject,
        proofs,
        clauses,
    }
}

#[derive(Default)]
struct Group {
    can: Can,
    proofs: IndexSet<Cid>,
    attestations: IndexSet<Cid>,
}

/// Group query results by authority and subject into [`Authorization`]s,
/// dereferencing proofs from `database`
pub fn select(
    database: &Database,
    selector: &Selector,
    rows: &[Bindings],
) -> Result<Vec<Authorization>, AccessError> {
    let mut groups: IndexMap<(String, String), Group> = IndexMap::new();

    for row in rows {
        let authority: String = row.read(&selector.authority)?;
        let subject: String = row.read(&selector.subject)?;
        let group = groups.entry((authority, subject)).or_default();

        for proof in &selector.proofs {
            let ability = match &proof.need {
                Some(need) => need.clone(),
                None => row.read(&proof.can)?,
            };
            group.can.entry(ability).or_default();
            group.proofs.insert(row.read(&proof.proof)?);
            if let Some(attestation) = row.read_optional(&proof.attestation)? {
                group.attestations.insert(attestation);
            }
        }
    }

    let authorizations: Vec<Authorization> = groups
        .into_iter()
        .map(|((authority, subject), group)| {
            let cids: IndexSet<Cid> = group
                .proofs
                .into_iter()
                .chain(group.attestations)
                .collect();
            let proofs = cids
                .iter()
                .filter_map(|cid| database.dereference(cid))
                .collect();

            Authorization {
                authority,
                subject,
                can: group.can,
                proofs,
            }
        })
        .collect();

    tracing::debug!(
        rows = rows.len(),
        authorizations = authorizations.len(),
        "selected authorizations"
    );

    Ok(authorizations)
}

/// Every authorization matching `query`. Finding nothing is not an error.
pub fn find(database: &Database, query: &Query) -> Result<Vec<Authorization>, AccessError> {
    let selector = self::query(query, database.settings());
    let rows = grant_query::query(database.index(), &selector.clauses)?;
    select(database, &selector, &rows)
}

/// The authorization of `authority` to exercise `can` on `subject` at `time`.
///
/// A principal is always authorized on itself, which needs no proofs.
pub fn get(
    database: &Database,
    authority: &str,
    subject: &str,
    can: &Can,
    time: u64,
) -> Result<Authorization, AccessError> {
    if authority == subject {
        return Ok(Authorization {
            authority: authority.to_owned(),
            subject: subject.to_owned(),
            can: Can::from([("*".to_owned(), Vec::new())]),
            proofs: Vec::new(),
        });
    }

    let query = Query {
        authority: authority.into(),
        subject: subject.into(),
        can: can.clone(),
        time,
    };

    find(database, &query)?
        .into_iter()
        .next()
        .ok_or_else(|| AccessError::AccessDenied {
            authority: authority.to_owned(),
            subject: subject.to_owned(),
            can: can.keys().cloned().collect(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Capability;
    use pretty_assertions::assert_eq;

    const SPACE: &str = "did:key:space";
    const ALICE: &str = "did:key:alice";
    const BOB: &str = "did:key:bob";

    #[test]
    fn it_does_not_treat_forwarding_as_explicit() -> anyhow::Result<()> {
        let forward = Delegation::builder(SPACE, ALICE)
            .capability(Capability::new(FORWARD, "*"))
            .build()?;
        let database = Database::from_proofs([forward])?;

        let ucan = Term::from(Variable::link("ucan"));
        let claim = Claim {
            authority: ALICE.into(),
            ..Claim::at(0u64)
        };
        assert!(grant_query::query(database.index(), &[explicit(&ucan, &claim)])?.is_empty());
        assert_eq!(
            grant_query::query(database.index(), &[forwards(&ucan, &claim)])?.len(),
            1
        );
        Ok(())
    }

    #[test]
    fn it_follows_one_level_of_redelegation() -> anyhow::Result<()> {
        let grant = Delegation::builder(SPACE, ALICE)
            .capability(Capability::new(SPACE, "store/*"))
            .build()?;
        let forward = Delegation::builder(ALICE, BOB)
            .capability(Capability::new(FORWARD, "*"))
            .proof(grant.clone())
            .build()?;
        let database = Database::from_proofs([forward.clone()])?;

        let found = get(&database, BOB, SPACE, &Can::from([("store/add".into(), vec![])]), 0)?;
        assert_eq!(found.proofs, vec![forward]);

        let denied = get(&database, BOB, SPACE, &Can::from([("upload/add".into(), vec![])]), 0);
        assert!(matches!(denied, Err(AccessError::AccessDenied { .. })));
        Ok(())
    }

    #[test]
    fn it_reports_delegated_abilities_when_none_are_requested() -> anyhow::Result<()> {
        let grant = Delegation::builder(SPACE, ALICE)
            .capability(Capability::new(SPACE, "store/add"))
            .capability(Capability::new(SPACE, "upload/*"))
            .build()?;
        let database = Database::from_proofs([grant.clone()])?;

        let found = find(&database, &Query::new(ALICE, 0))?;
        assert_eq!(found.len(), 1);
        assert_eq!(
            found[0].can.keys().collect::<Vec<_>>(),
            vec!["store/add", "upload/*"]
        );
        assert_eq!(found[0].proofs, vec![grant]);
        Ok(())
    }

    #[test]
    fn it_serializes_a_view() -> anyhow::Result<()> {
        let grant = Delegation::builder(SPACE, ALICE)
            .capability(Capability::new(SPACE, "store/add"))
            .build()?;
        let database = Database::from_proofs([grant.clone()])?;

        let found = get(&database, ALICE, SPACE, &Can::from([("store/add".into(), vec![])]), 0)?;
        assert_eq!(
            serde_json::to_value(&found)?,
            serde_json::json!({
                "authority": ALICE,
                "subject": SPACE,
                "can": { "store/add": [] },
                "proofs": [grant.cid().to_string()],
            })
        );
        Ok(())
    }
}
