//! Spaces the agent has access to.
//!
//! Spaces are resources in the space namespace (`did:key:*` by default). On
//! top of the authorization rules, space queries pick up the human readable
//! name recorded in a grant's `meta/space/name` fact when there is one.

use std::collections::BTreeMap;

use grant_query::{Bindings, Cid, Clause, Term, Variable};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::{
    AccessError, Database, Settings,
    authorization::{self, Can},
    clauses::{TextConstraint, capability, delegation, text},
};

/// Fact the space name is recorded under
pub const NAME: &str = "meta/space/name";

/// Terms a space match is expressed over
#[derive(Debug, Clone, PartialEq)]
pub struct Claim {
    /// Audience of the matched delegation
    pub authority: Term,
    /// The space
    pub space: Term,
    /// Delegated ability
    pub can: Term,
    /// Name of the space, left unbound when none was recorded
    pub name: Term,
    /// Time validity is checked at
    pub time: Term,
}

impl Claim {
    /// Claim at `time` with every other term left open
    pub fn at<T: Into<Term>>(time: T) -> Self {
        Self {
            authority: Variable::string("authority").into(),
            space: Variable::string("space").into(),
            can: Variable::string("can").into(),
            name: Variable::string("name").into(),
            time: time.into(),
        }
    }

    fn authorization(&self, authority: &Term) -> authorization::Claim {
        authorization::Claim {
            authority: authority.clone(),
            subject: self.space.clone(),
            can: self.can.clone(),
            ..authorization::Claim::at(self.time.clone())
        }
    }
}

/// Bind `name` to the space name recorded in `ucan`, if there is one
pub fn named(ucan: &Term, name: &Term) -> Clause {
    Clause::optional(delegation::has_meta(ucan, NAME, name))
}

/// `ucan` explicitly delegates access to the space
pub fn explicit(ucan: &Term, claim: &Claim, settings: &Settings) -> Clause {
    authorization::explicit(ucan, &claim.authorization(&claim.authority))
        .and(named(ucan, &claim.name))
        .and(Clause::glob(&claim.space, &settings.space))
}

/// `ucan` forwards access that its issuer was explicitly delegated on the
/// space. The name comes from the explicit delegation.
pub fn implicit(ucan: &Term, claim: &Claim, settings: &Settings) -> Clause {
    let proof = Term::from(Variable::link("proof"));
    forwarded(ucan, &proof, claim).and(Clause::glob(&claim.space, &settings.space))
}

/// `ucan` gives access to the space in any of the ways the agent can hold it:
/// explicitly, by being forwarded from the space itself, or by forwarding an
/// explicit delegation on the space
pub fn matches(ucan: &Term, claim: &Claim, settings: &Settings) -> Clause {
    let proof = Term::from(Variable::link("proof"));
    let forward = Term::from(Variable::string("forwarded"));

    Clause::any([
        authorization::explicit(ucan, &claim.authorization(&claim.authority))
            .and(named(ucan, &claim.name)),
        delegation::forwards(ucan, &claim.authority, &claim.space, &forward, &claim.time)
            .and(capability::provides(&forward, &claim.can))
            .and(named(ucan, &claim.name)),
        forwarded(ucan, &proof, claim),
    ])
    .and(Clause::glob(&claim.space, &settings.space))
}

fn forwarded(ucan: &Term, proof: &Term, claim: &Claim) -> Clause {
    let issuer = Term::from(Variable::string("issuer"));
    let forward = Term::from(Variable::string("forwarded"));

    delegation::forwards(ucan, &claim.authority, &issuer, &forward, &claim.time)
        .and(delegation::has_proof(ucan, proof))
        .and(authorization::explicit(proof, &claim.authorization(&issuer)))
        .and(Clause::glob(&claim.can, &forward))
        .and(named(proof, &claim.name))
}

/// Which rule a space [`Query`] uses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rule {
    /// [`matches`]
    #[default]
    Match,
    /// [`explicit`]
    Explicit,
    /// [`implicit`]
    Implicit,
}

/// What [`find`] looks for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Principals holding access
    pub authority: TextConstraint,
    /// Spaces of interest
    #[serde(default = "TextConstraint::any")]
    pub space: TextConstraint,
    /// Ability that must be delegated, any when omitted
    #[serde(default)]
    pub can: Option<String>,
    /// Unix seconds validity is checked at
    pub time: u64,
    /// Rule to match with
    #[serde(default)]
    pub rule: Rule,
}

impl Query {
    /// Every space `authority` has access to at `time`
    pub fn new<A: Into<TextConstraint>>(authority: A, time: u64) -> Self {
        Self {
            authority: authority.into(),
            space: TextConstraint::any(),
            can: None,
            time,
            rule: Rule::default(),
        }
    }
}

/// A compiled space [`Query`]
#[derive(Debug, Clone)]
pub struct Selector {
    /// Bound to the space
    pub space: Variable,
    /// Bound to the space name, when one was recorded
    pub name: Variable,
    /// Bound to the matched delegation
    pub proof: Variable,
    /// Clauses to evaluate
    pub clauses: Vec<Clause>,
}

/// Compile a space `query`
pub fn query(query: &Query, settings: &Settings) -> Selector {
    let authority = Variable::string("authority");
    let space = Variable::string("space");
    let name = Variable::string("name");
    let proof = Variable::link("proof");

    let claim = Claim {
        authority: Term::from(&authority),
        space: Term::from(&space),
        name: Term::from(&name),
        can: match &query.can {
            Some(can) => Term::from(can),
            None => Variable::string("can").into(),
        },
        ..Claim::at(query.time)
    };
    let ucan = Term::from(&proof);
    let rule = match query.rule {
        Rule::Match => matches(&ucan, &claim, settings),
        Rule::Explicit => explicit(&ucan, &claim, settings),
        Rule::Implicit => implicit(&ucan, &claim, settings),
    };

    Selector {
        clauses: vec![
            rule,
            text::matches(&Term::from(&space), &query.space),
            text::matches(&Term::from(&authority), &query.authority),
        ],
        space,
        name,
        proof,
    }
}

/// A space along with the delegation giving access to it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Space {
    /// Space DID
    pub space: String,
    /// Recorded name of the space
    pub name: Option<String>,
    /// Delegation giving access
    pub proof: Cid,
}

/// Distinct matches in first-seen order
pub fn select(selector: &Selector, rows: &[Bindings]) -> Result<Vec<Space>, AccessError> {
    let mut spaces = IndexSet::new();
    for row in rows {
        spaces.insert(Space {
            space: row.read(&selector.space)?,
            name: row.read_optional(&selector.name)?,
            proof: row.read(&selector.proof)?,
        });
    }
    Ok(spaces.into_iter().collect())
}

/// Every space matching `query`
pub fn find(database: &Database, query: &Query) -> Result<Vec<Space>, AccessError> {
    let selector = self::query(query, database.settings());
    let rows = grant_query::query(database.index(), &selector.clauses)?;
    select(&selector, &rows)
}

/// What [`direct`] and [`indirect`] list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    /// Holders of the delegations
    pub audience: TextConstraint,
    /// Spaces of interest
    #[serde(default = "TextConstraint::any")]
    pub subject: TextConstraint,
    /// Abilities to list proofs for
    #[serde(default)]
    pub can: Can,
    /// Accounts access may be forwarded through, defaults to the account
    /// namespace
    #[serde(default)]
    pub account: Option<TextConstraint>,
    /// Unix seconds validity is checked at
    pub time: u64,
}

/// Proof variable for one listed ability
#[derive(Debug, Clone)]
pub struct Need {
    /// Listed ability, `None` to list whatever is delegated
    pub need: Option<String>,
    /// Bound to the delegated ability when `need` is `None`
    pub can: Variable,
    /// Bound to the proving delegation
    pub proof: Variable,
}

/// A compiled [`Listing`]
#[derive(Debug, Clone)]
pub struct ListingSelector {
    /// Bound to the space
    pub subject: Variable,
    /// Bound to the holder
    pub audience: Variable,
    /// Bound to the forwarding account for indirect listings
    pub account: Option<Variable>,
    /// One entry per listed ability
    pub proofs: Vec<Need>,
    /// Clauses to evaluate
    pub clauses: Vec<Clause>,
}

/// One listed space
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Listed {
    /// The space
    pub subject: String,
    /// Holder of the access
    pub audience: String,
    /// Account the access was forwarded through
    pub account: Option<String>,
    /// Proving delegation per ability
    pub proofs: BTreeMap<String, Cid>,
}

fn needs(can: &Can) -> Vec<Need> {
    let mut needs: Vec<Option<String>> = can.keys().cloned().map(Some).collect();
    if needs.is_empty() {
        needs.push(None);
    }
    needs
        .into_iter()
        .map(|need| Need {
            need,
            can: Variable::string("can"),
            proof: Variable::link("proof"),
        })
        .collect()
}

/// Spaces delegated straight to the audience, matching each listed ability
/// exactly. Re-delegated access is not listed.
pub fn direct(listing: &Listing) -> ListingSelector {
    let subject = Variable::string("space");
    let audience = Variable::string("audience");
    let time = Term::from(listing.time);
    let proofs = needs(&listing.can);

    let mut clauses: Vec<Clause> = proofs
        .iter()
        .map(|need| {
            let capability = Term::from(Variable::link("capability"));
            let can = match &need.need {
                Some(need) => Term::from(need),
                None => Term::from(&need.can),
            };
            capability::matches(&capability, &Term::from(&subject), &can).and(
                delegation::matches(
                    &Term::from(&need.proof),
                    &capability,
                    &Term::from(&audience),
                    &Variable::string("issuer").into(),
                    &time,
                ),
            )
        })
        .collect();
    clauses.push(text::matches(&Term::from(&audience), &listing.audience));
    clauses.push(text::matches(&Term::from(&subject), &listing.subject));

    ListingSelector {
        subject,
        audience,
        account: None,
        proofs,
        clauses,
    }
}

/// Spaces an account was delegated and then forwarded to the audience with a
/// `ucan:*` login. Lists every ability when none is named.
pub fn indirect(listing: &Listing, settings: &Settings) -> ListingSelector {
    let subject = Variable::string("space");
    let audience = Variable::string("audience");
    let account = Variable::string("account");
    let time = Term::from(listing.time);
    let proofs = needs(&listing.can);

    let mut clauses: Vec<Clause> = proofs
        .iter()
        .map(|need| {
            let login = Term::from(Variable::link("login"));
            let proof = Term::from(Variable::link("proof"));
            let capability = Term::from(Variable::link("capability"));
            let stored = Term::from(&need.can);

            let granted = match &need.need {
                Some(need) => Clause::glob(need, &stored),
                None => Clause::all([]),
            };

            capability::matches(&login, &authorization::FORWARD.into(), &"*".into())
                .and(delegation::matches(
                    &Term::from(&need.proof),
                    &login,
                    &Term::from(&audience),
                    &Term::from(&account),
                    &time,
                ))
                .and(delegation::has_proof(&Term::from(&need.proof), &proof))
                .and(delegation::matches(
                    &proof,
                    &capability,
                    &Term::from(&account),
                    &Variable::string("issuer").into(),
                    &time,
                ))
                .and(capability::matches(&capability, &Term::from(&subject), &stored))
                .and(granted)
        })
        .collect();

    let accounts = listing
        .account
        .clone()
        .unwrap_or_else(|| TextConstraint::glob(&settings.account));
    clauses.push(text::matches(&Term::from(&audience), &listing.audience));
    clauses.push(text::matches(&Term::from(&subject), &listing.subject));
    clauses.push(text::matches(&Term::from(&account), &accounts));

    ListingSelector {
        subject,
        audience,
        account: Some(account),
        proofs,
        clauses,
    }
}

/// Evaluate a listing, one distinct [`Listed`] per result in first-seen order
pub fn list(database: &Database, selector: &ListingSelector) -> Result<Vec<Listed>, AccessError> {
    let rows = grant_query::query(database.index(), &selector.clauses)?;

    let mut entries = IndexSet::new();
    for row in &rows {
        let mut proofs = BTreeMap::new();
        for need in &selector.proofs {
            let ability = match &need.need {
                Some(need) => need.clone(),
                None => row.read(&need.can)?,
            };
            proofs.insert(ability, row.read(&need.proof)?);
        }

        entries.insert(Listed {
            subject: row.read(&selector.subject)?,
            audience: row.read(&selector.audience)?,
            account: match &selector.account {
                Some(account) => Some(row.read(account)?),
                None => None,
            },
            proofs,
        });
    }

    Ok(entries.into_iter().collect())
}
