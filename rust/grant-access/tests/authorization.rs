use grant_access::{
    AccessError, Archive, Can, Capability, Database, Delegation, DelegationBuilder, Settings,
    TextConstraint,
    authorization::{self, FORWARD, Query},
    clauses::attestation::ATTEST,
};
use pretty_assertions::assert_eq;

const SPACE: &str = "did:key:z6MkSpace";
const OTHER: &str = "did:key:z6MkOther";
const AGENT: &str = "did:key:z6MkAgent";
const BOB: &str = "did:key:z6MkBob";
const ACCOUNT: &str = "did:mailto:web.mail:alice";
const SERVICE: &str = "did:web:up.storage";

fn can(abilities: &[&str]) -> Can {
    abilities
        .iter()
        .map(|ability| (ability.to_string(), Vec::new()))
        .collect()
}

fn grant(space: &str, audience: &str, ability: &str) -> anyhow::Result<Delegation> {
    Ok(Delegation::builder(space, audience)
        .capability(Capability::new(space, ability))
        .build()?)
}

fn login(account: &str, agent: &str) -> DelegationBuilder {
    Delegation::builder(account, agent).capability(Capability::new(FORWARD, "*"))
}

fn attest(proof: &Delegation, agent: &str) -> anyhow::Result<Delegation> {
    Ok(attest_as(SERVICE, proof, agent).build()?)
}

fn attest_as(issuer: &str, proof: &Delegation, agent: &str) -> DelegationBuilder {
    Delegation::builder(issuer, agent)
        .capability(Capability::new(issuer, ATTEST).with_caveat("proof", proof.cid()))
}

#[test]
fn it_authorizes_principals_on_themselves() -> anyhow::Result<()> {
    let database = Database::default();

    let found = authorization::get(&database, AGENT, AGENT, &can(&["store/add"]), 0)?;
    assert_eq!(found.can, can(&["*"]));
    assert!(found.proofs.is_empty());
    Ok(())
}

#[test]
fn it_contains_requested_abilities_in_delegated_globs() -> anyhow::Result<()> {
    let proof = grant(SPACE, AGENT, "store/*")?;
    let database = Database::from_proofs([proof.clone()])?;

    let found = authorization::get(&database, AGENT, SPACE, &can(&["store/add"]), 0)?;
    assert_eq!(found.proofs, vec![proof]);
    assert_eq!(found.can, can(&["store/add"]));

    let denied = authorization::get(&database, AGENT, SPACE, &can(&["upload/add"]), 0);
    assert_eq!(
        denied,
        Err(AccessError::AccessDenied {
            authority: AGENT.into(),
            subject: SPACE.into(),
            can: vec!["upload/add".into()],
        })
    );
    Ok(())
}

#[test]
fn it_respects_time_bounds() -> anyhow::Result<()> {
    let expiring = Delegation::builder(SPACE, AGENT)
        .capability(Capability::new(SPACE, "store/add"))
        .expiration(1_000)
        .build()?;
    let eternal = grant(OTHER, AGENT, "store/add")?;
    let premature = Delegation::builder(SPACE, BOB)
        .capability(Capability::new(SPACE, "store/add"))
        .not_before(1_000)
        .build()?;
    let database = Database::from_proofs([expiring, eternal, premature])?;
    let store = can(&["store/add"]);

    assert!(authorization::get(&database, AGENT, SPACE, &store, 999).is_ok());
    assert!(authorization::get(&database, AGENT, SPACE, &store, 1_000).is_ok());
    assert!(authorization::get(&database, AGENT, SPACE, &store, 1_001).is_err());

    assert!(authorization::get(&database, AGENT, OTHER, &store, 0).is_ok());
    assert!(authorization::get(&database, AGENT, OTHER, &store, u32::MAX.into()).is_ok());

    assert!(authorization::get(&database, BOB, SPACE, &store, 999).is_err());
    assert!(authorization::get(&database, BOB, SPACE, &store, 1_000).is_ok());
    Ok(())
}

#[test]
fn it_requires_attestations_for_account_logins() -> anyhow::Result<()> {
    let login = login(ACCOUNT, AGENT).build()?;
    let query = Query::new(AGENT, 0).subject(ACCOUNT).can("store/add");

    let mut database = Database::from_proofs([login.clone()])?;
    assert!(authorization::find(&database, &query)?.is_empty());

    let attestation = attest(&login, AGENT)?;
    database.assert(attestation.clone())?;

    let found = authorization::find(&database, &query)?;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].subject, ACCOUNT);
    assert_eq!(found[0].proofs, vec![login, attestation]);
    Ok(())
}

#[test]
fn it_ignores_attestations_of_other_delegations() -> anyhow::Result<()> {
    let login = login(ACCOUNT, AGENT).build()?;
    let unrelated = grant(SPACE, AGENT, "store/add")?;
    let database = Database::from_proofs([login, attest(&unrelated, AGENT)?])?;

    let query = Query::new(AGENT, 0).subject(ACCOUNT).can("store/add");
    assert!(authorization::find(&database, &query)?.is_empty());
    Ok(())
}

#[test]
fn it_ignores_attestations_issued_outside_the_provider_namespace() -> anyhow::Result<()> {
    let login = login(ACCOUNT, AGENT).build()?;
    let query = Query::new(AGENT, 0).subject(ACCOUNT).can("store/add");

    let by_account = attest_as(ACCOUNT, &login, AGENT).build()?;
    let database = Database::from_proofs([login.clone(), by_account])?;
    assert!(authorization::find(&database, &query)?.is_empty());

    let by_agent = attest_as(AGENT, &login, AGENT).build()?;
    let database = Database::from_proofs([login.clone(), by_agent])?;
    assert!(authorization::find(&database, &query)?.is_empty());

    let settings = Settings {
        provider: AGENT.into(),
        ..Settings::default()
    };
    let mut database = Database::new(settings);
    database.assert(login.clone())?;
    database.assert(attest(&login, AGENT)?)?;
    assert!(authorization::find(&database, &query)?.is_empty());
    Ok(())
}

#[test]
fn it_stops_honoring_logins_once_their_attestation_expires() -> anyhow::Result<()> {
    let login = login(ACCOUNT, AGENT).build()?;
    let attestation = attest_as(SERVICE, &login, AGENT).expiration(100).build()?;
    let database = Database::from_proofs([login.clone(), attestation.clone()])?;
    let store = can(&["store/add"]);

    let found = authorization::get(&database, AGENT, ACCOUNT, &store, 100)?;
    assert_eq!(found.proofs, vec![login, attestation]);

    assert_eq!(
        authorization::get(&database, AGENT, ACCOUNT, &store, 101),
        Err(AccessError::AccessDenied {
            authority: AGENT.into(),
            subject: ACCOUNT.into(),
            can: vec!["store/add".into()],
        })
    );
    Ok(())
}

#[test]
fn it_resolves_spaces_delegated_to_an_account() -> anyhow::Result<()> {
    let proof = grant(SPACE, ACCOUNT, "store/*")?;
    let login = login(ACCOUNT, AGENT).proof(proof).build()?;
    let mut database = Database::from_proofs([login.clone()])?;
    let store = can(&["store/add"]);

    assert!(authorization::get(&database, AGENT, SPACE, &store, 0).is_err());

    let attestation = attest(&login, AGENT)?;
    database.assert(attestation.clone())?;

    let found = authorization::get(&database, AGENT, SPACE, &store, 0)?;
    assert_eq!(found.proofs, vec![login, attestation]);
    Ok(())
}

#[test]
fn it_reads_the_account_namespace_from_settings() -> anyhow::Result<()> {
    let login = login(ACCOUNT, AGENT).build()?;
    let settings = Settings {
        account: "did:plc:*".into(),
        ..Settings::default()
    };
    let mut database = Database::new(settings);
    database.assert(login.clone())?;

    let found = authorization::get(&database, AGENT, ACCOUNT, &can(&["store/add"]), 0)?;
    assert_eq!(found.proofs, vec![login]);
    Ok(())
}

#[test]
fn it_extracts_facts_idempotently() -> anyhow::Result<()> {
    let proof = grant(SPACE, AGENT, "store/add")?;
    let once = Database::from_proofs([proof.clone()])?;
    let twice = Database::from_proofs([proof.clone(), proof])?;

    let query = Query::new(AGENT, 0);
    assert_eq!(
        authorization::find(&once, &query)?,
        authorization::find(&twice, &query)?
    );
    assert_eq!(once.index().len(), twice.index().len());
    Ok(())
}

#[test]
fn it_keeps_subjects_apart() -> anyhow::Result<()> {
    let space = grant(SPACE, AGENT, "store/add")?;
    let other = grant(OTHER, AGENT, "store/add")?;
    let database = Database::from_proofs([space.clone(), other.clone()])?;

    let found = authorization::find(&database, &Query::new(AGENT, 0).can("store/add"))?;
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].subject, SPACE);
    assert_eq!(found[0].proofs, vec![space]);
    assert_eq!(found[1].subject, OTHER);
    assert_eq!(found[1].proofs, vec![other]);
    Ok(())
}

#[test]
fn it_resolves_several_abilities_from_one_delegation() -> anyhow::Result<()> {
    let proof = Delegation::builder(SPACE, AGENT)
        .capability(Capability::new(SPACE, "store/add"))
        .capability(Capability::new(SPACE, "store/remove"))
        .build()?;
    let database = Database::from_proofs([proof.clone()])?;

    let query = Query::new(AGENT, 0)
        .subject(TextConstraint::glob("*"))
        .can("store/add")
        .can("store/remove");
    let found = authorization::find(&database, &query)?;

    assert_eq!(
        found,
        vec![grant_access::Authorization {
            authority: AGENT.into(),
            subject: SPACE.into(),
            can: can(&["store/add", "store/remove"]),
            proofs: vec![proof],
        }]
    );
    Ok(())
}

#[test]
fn it_requires_every_ability_on_the_same_subject() -> anyhow::Result<()> {
    let database = Database::from_proofs([
        grant(SPACE, AGENT, "store/add")?,
        grant(OTHER, AGENT, "store/remove")?,
    ])?;

    let query = Query::new(AGENT, 0).can("store/add").can("store/remove");
    assert!(authorization::find(&database, &query)?.is_empty());
    Ok(())
}

#[test]
fn it_constrains_authorities_by_pattern() -> anyhow::Result<()> {
    let database = Database::from_proofs([
        grant(SPACE, AGENT, "store/add")?,
        grant(SPACE, BOB, "store/add")?,
    ])?;

    let found = authorization::find(&database, &Query::new(TextConstraint::like("%bob"), 0))?;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].authority, BOB);
    Ok(())
}

#[test]
fn it_preserves_results_across_archives() -> anyhow::Result<()> {
    let login = login(ACCOUNT, AGENT)
        .proof(grant(SPACE, ACCOUNT, "*")?)
        .build()?;
    let attestation = attest(&login, AGENT)?;
    let database = Database::from_proofs([login, attestation])?;

    let bytes = database.to_archive().to_bytes()?;
    let restored = Database::from_archive(&Archive::from_bytes(&bytes)?, Settings::default())?;

    let query = Query::new(AGENT, 0).can("store/add");
    assert_eq!(
        authorization::find(&restored, &query)?,
        authorization::find(&database, &query)?
    );
    assert_eq!(authorization::find(&restored, &query)?.len(), 2);
    Ok(())
}

#[test]
fn it_revokes_access_on_retraction() -> anyhow::Result<()> {
    let agent = grant(SPACE, AGENT, "store/add")?;
    let bob = grant(SPACE, BOB, "store/add")?;
    let mut database = Database::from_proofs([agent.clone(), bob.clone()])?;
    let store = can(&["store/add"]);

    database.retract(&agent.cid())?;

    assert!(authorization::get(&database, AGENT, SPACE, &store, 0).is_err());
    let found = authorization::get(&database, BOB, SPACE, &store, 0)?;
    assert_eq!(found.proofs, vec![bob]);
    Ok(())
}
