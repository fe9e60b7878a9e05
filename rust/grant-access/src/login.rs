//! Account logins.
//!
//! Logging in to an account leaves the agent with a `ucan:*` / `*` delegation
//! from the account and an attestation of it from the service that verified
//! the login. Only the pair counts; a login without its attestation is a
//! self-asserted claim and is never reported.

use grant_query::{Bindings, Cid, Clause, Term, Variable};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    AccessError, Database, Delegation, Settings,
    authorization::FORWARD,
    clauses::{TextConstraint, attestation, capability, delegation, text},
};

/// `ucan` is a login: `account` delegates everything (`ucan:*` / `*`) to
/// `authority` and the delegation is valid at `time`
pub fn matches(
    ucan: &Term,
    account: &Term,
    authority: &Term,
    time: &Term,
    settings: &Settings,
) -> Clause {
    let capability = Term::from(Variable::link("login"));
    delegation::matches(ucan, &capability, authority, account, time)
        .and(capability::matches(&capability, &FORWARD.into(), &"*".into()))
        .and(Clause::glob(account, &settings.account))
}

/// What [`find`] looks for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Agents logged in
    pub authority: TextConstraint,
    /// Services trusted to attest logins, the provider namespace by default
    #[serde(default)]
    pub provider: Option<TextConstraint>,
    /// Accounts of interest, the account namespace by default
    #[serde(default)]
    pub account: Option<TextConstraint>,
    /// Unix seconds validity is checked at
    pub time: u64,
}

impl Query {
    /// Every login of `authority` valid at `time`
    pub fn new<A: Into<TextConstraint>>(authority: A, time: u64) -> Self {
        Self {
            authority: authority.into(),
            provider: None,
            account: None,
            time,
        }
    }
}

/// A compiled login [`Query`]
#[derive(Debug, Clone)]
pub struct Selector {
    /// Bound to the account
    pub account: Variable,
    /// Bound to the login delegation
    pub proof: Variable,
    /// Bound to its attestation
    pub attestation: Variable,
    /// Clauses to evaluate
    pub clauses: Vec<Clause>,
}

/// Compile a login `query`
pub fn query(query: &Query, settings: &Settings) -> Selector {
    let account = Variable::string("account");
    let authority = Variable::string("authority");
    let provider = Variable::string("provider");
    let proof = Variable::link("proof");
    let attestation = Variable::link("attestation");
    let time = Term::from(query.time);

    let accounts = query
        .account
        .clone()
        .unwrap_or_else(|| TextConstraint::glob(&settings.account));
    let providers = query
        .provider
        .clone()
        .unwrap_or_else(|| TextConstraint::glob(&settings.provider));

    Selector {
        clauses: vec![
            matches(
                &Term::from(&proof),
                &Term::from(&account),
                &Term::from(&authority),
                &time,
                settings,
            ),
            attestation::matches(
                &Term::from(&attestation),
                &Term::from(&provider),
                &Term::from(&authority),
                &Term::from(&proof),
                &time,
            ),
            text::matches(&Term::from(&authority), &query.authority),
            text::matches(&Term::from(&account), &accounts),
            text::matches(&Term::from(&provider), &providers),
        ],
        account,
        proof,
        attestation,
    }
}

/// Every login to one account, possibly from several login events
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Login {
    /// Account DID
    pub account: String,
    /// Login delegations by CID
    pub proofs: IndexMap<Cid, Delegation>,
    /// Their attestations by CID
    pub attestations: IndexMap<Cid, Delegation>,
}

/// Group query results per account, in first-seen order
pub fn select(
    database: &Database,
    selector: &Selector,
    rows: &[Bindings],
) -> Result<IndexMap<String, Login>, AccessError> {
    let mut logins: IndexMap<String, Login> = IndexMap::new();
    for row in rows {
        let account: String = row.read(&selector.account)?;
        let login = logins.entry(account.clone()).or_insert_with(|| Login {
            account,
            ..Login::default()
        });

        let proof: Cid = row.read(&selector.proof)?;
        let attestation: Cid = row.read(&selector.attestation)?;
        if let Some(delegation) = database.dereference(&proof) {
            login.proofs.insert(proof, delegation);
        }
        if let Some(delegation) = database.dereference(&attestation) {
            login.attestations.insert(attestation, delegation);
        }
    }
    Ok(logins)
}

/// Every login matching `query`
pub fn find(database: &Database, query: &Query) -> Result<IndexMap<String, Login>, AccessError> {
    let selector = self::query(query, database.settings());
    let rows = grant_query::query(database.index(), &selector.clauses)?;
    select(database, &selector, &rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Capability, clauses::attestation::ATTEST};
    use pretty_assertions::assert_eq;

    const ACCOUNT: &str = "did:mailto:web.mail:alice";
    const AGENT: &str = "did:key:agent";
    const SERVICE: &str = "did:web:up.storage";

    fn login(expiration: u64) -> anyhow::Result<(Delegation, Delegation)> {
        let login = Delegation::builder(ACCOUNT, AGENT)
            .capability(Capability::new(FORWARD, "*"))
            .expiration(expiration)
            .build()?;
        let attestation = Delegation::builder(SERVICE, AGENT)
            .capability(Capability::new(SERVICE, ATTEST).with_caveat("proof", login.cid()))
            .expiration(expiration)
            .build()?;
        Ok((login, attestation))
    }

    #[test]
    fn it_groups_logins_per_account() -> anyhow::Result<()> {
        let (first, first_attestation) = login(100)?;
        let (second, second_attestation) = login(200)?;
        let database = Database::from_proofs([
            first.clone(),
            first_attestation.clone(),
            second.clone(),
            second_attestation.clone(),
        ])?;

        let logins = find(&database, &Query::new(AGENT, 50))?;
        assert_eq!(logins.len(), 1);

        let login = &logins[ACCOUNT];
        assert_eq!(
            login.proofs.keys().collect::<Vec<_>>(),
            vec![&first.cid(), &second.cid()]
        );
        assert_eq!(
            login.attestations.keys().collect::<Vec<_>>(),
            vec![&first_attestation.cid(), &second_attestation.cid()]
        );

        let later = find(&database, &Query::new(AGENT, 150))?;
        assert_eq!(later[ACCOUNT].proofs.keys().collect::<Vec<_>>(), vec![&second.cid()]);
        Ok(())
    }

    #[test]
    fn it_requires_an_attestation() -> anyhow::Result<()> {
        let (login, _) = login(100)?;
        let database = Database::from_proofs([login])?;
        assert!(find(&database, &Query::new(AGENT, 0))?.is_empty());
        Ok(())
    }

    #[test]
    fn it_only_trusts_configured_providers() -> anyhow::Result<()> {
        let (login, attestation) = login(100)?;
        let database = Database::from_proofs([login, attestation])?;

        let query = Query {
            provider: Some("did:web:other.service".into()),
            ..Query::new(AGENT, 0)
        };
        assert!(find(&database, &query)?.is_empty());
        Ok(())
    }
}
