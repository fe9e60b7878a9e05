//! Accounts the agent has access to.
//!
//! An account is a subject in the account namespace (`did:mailto:*` by
//! default). Access to it is proven the same way as to any other subject, and
//! always comes with an attestation.

use grant_query::{Bindings, Cid, Clause, Term, Variable};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    AccessError, Database, Delegation, Settings,
    authorization::{self, Claim},
    clauses::{TextConstraint, text},
};

/// `ucan` proves `claim` on a subject in the account namespace
pub fn matches(ucan: &Term, claim: &Claim, settings: &Settings) -> Clause {
    authorization::matches(ucan, claim, settings)
        .and(Clause::glob(&claim.subject, &settings.account))
}

/// What [`find`] looks for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Holders of the access
    #[serde(default = "TextConstraint::any")]
    pub audience: TextConstraint,
    /// Accounts of interest
    #[serde(default = "TextConstraint::any")]
    pub account: TextConstraint,
    /// Ability that must be delegated, any when omitted
    #[serde(default)]
    pub can: Option<String>,
    /// Unix seconds validity is checked at
    pub time: u64,
}

impl Query {
    /// Every account `audience` has access to at `time`
    pub fn new<A: Into<TextConstraint>>(audience: A, time: u64) -> Self {
        Self {
            audience: audience.into(),
            account: TextConstraint::any(),
            can: None,
            time,
        }
    }
}

/// A compiled account [`Query`]
#[derive(Debug, Clone)]
pub struct Selector {
    /// Bound to the account
    pub account: Variable,
    /// Bound to the matched grant
    pub proof: Variable,
    /// Bound to the grant's attestation
    pub attestation: Variable,
    /// Clauses to evaluate
    pub clauses: Vec<Clause>,
}

/// Compile an account `query`
pub fn query(query: &Query, settings: &Settings) -> Selector {
    let audience = Variable::string("audience");
    let account = Variable::string("account");
    let proof = Variable::link("proof");
    let attestation = Variable::link("attestation");

    let claim = Claim {
        authority: Term::from(&audience),
        subject: Term::from(&account),
        can: match &query.can {
            Some(can) => Term::from(can),
            None => Variable::string("can").into(),
        },
        attestation: Term::from(&attestation),
        ..Claim::at(query.time)
    };

    Selector {
        clauses: vec![
            matches(&Term::from(&proof), &claim, settings),
            text::matches(&Term::from(&audience), &query.audience),
            text::matches(&Term::from(&account), &query.account),
        ],
        account,
        proof,
        attestation,
    }
}

/// Proofs of access to one account
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Account {
    /// Account DID
    pub id: String,
    /// Grants by CID
    pub proofs: IndexMap<Cid, Delegation>,
    /// Attestations of the grants by CID
    pub attestations: IndexMap<Cid, Delegation>,
}

/// Aggregate query results per account, in first-seen order
pub fn select(
    database: &Database,
    selector: &Selector,
    rows: &[Bindings],
) -> Result<IndexMap<String, Account>, AccessError> {
    let mut accounts: IndexMap<String, Account> = IndexMap::new();
    for row in rows {
        let id: String = row.read(&selector.account)?;
        let account = accounts.entry(id.clone()).or_insert_with(|| Account {
            id,
            ..Account::default()
        });

        let proof: Cid = row.read(&selector.proof)?;
        if let Some(delegation) = database.dereference(&proof) {
            account.proofs.insert(proof, delegation);
        }
        if let Some(attestation) = row.read_optional::<Cid>(&selector.attestation)?
            && let Some(delegation) = database.dereference(&attestation)
        {
            account.attestations.insert(attestation, delegation);
        }
    }
    Ok(accounts)
}

/// Every account matching `query`
pub fn find(database: &Database, query: &Query) -> Result<IndexMap<String, Account>, AccessError> {
    let selector = self::query(query, database.settings());
    let rows = grant_query::query(database.index(), &selector.clauses)?;
    select(database, &selector, &rows)
}
