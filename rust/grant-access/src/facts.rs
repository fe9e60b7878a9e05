//! Decomposition of delegations into `(of, the, is)` facts.
//!
//! | entity       | attribute              | value                        |
//! |--------------|------------------------|------------------------------|
//! | delegation   | `ucan/issuer`          | issuer DID                   |
//! | delegation   | `ucan/audience`        | audience DID                 |
//! | delegation   | `ucan/expiration`      | Unix seconds, when finite    |
//! | delegation   | `ucan/notBefore`       | Unix seconds, when present   |
//! | delegation   | `ucan/capability`      | capability entity            |
//! | delegation   | `ucan/proof`           | proof CID                    |
//! | delegation   | `meta/<path>`          | leaves of every fact entry   |
//! | capability   | `capability/with`      | resource                     |
//! | capability   | `capability/can`       | ability                      |
//! | capability   | `capability/nb/<path>` | leaves of the caveats        |
//!
//! Capability entities are derived from their content, so the same
//! capability delegated twice is one entity.

use std::collections::BTreeMap;

use grant_query::{Attribute, Fact, Value};
use ipld_core::ipld::Ipld;

use crate::{AccessError, Delegation, Proof};

fn attribute(name: &str) -> Attribute {
    Attribute::namespaced("ucan", [name])
}

/// Every fact about `delegation` and, recursively, its embedded proofs
pub fn facts(delegation: &Delegation) -> Result<Vec<Fact>, AccessError> {
    let mut facts = Vec::new();
    extract(delegation, &mut facts)?;
    Ok(facts)
}

fn extract(delegation: &Delegation, facts: &mut Vec<Fact>) -> Result<(), AccessError> {
    let entity = Value::Link(delegation.cid());

    facts.push(Fact::new(
        entity.clone(),
        attribute("issuer"),
        delegation.issuer(),
    ));
    facts.push(Fact::new(
        entity.clone(),
        attribute("audience"),
        delegation.audience(),
    ));
    if let Some(expiration) = delegation.expiration() {
        facts.push(Fact::new(entity.clone(), attribute("expiration"), expiration));
    }
    if let Some(not_before) = delegation.not_before() {
        facts.push(Fact::new(entity.clone(), attribute("notBefore"), not_before));
    }

    for capability in delegation.capabilities() {
        let id = Value::Link(capability.id()?);
        facts.push(Fact::new(
            id.clone(),
            Attribute::namespaced("capability", ["with"]),
            capability.with.as_str(),
        ));
        facts.push(Fact::new(
            id.clone(),
            Attribute::namespaced("capability", ["can"]),
            capability.can.as_str(),
        ));
        flatten(&id, &["capability", "nb"], &capability.nb, facts);
        facts.push(Fact::new(entity.clone(), attribute("capability"), id));
    }

    for fact in delegation.facts() {
        flatten(&entity, &["meta"], fact, facts);
    }

    for proof in delegation.proofs() {
        if let Proof::Delegation(proof) = proof {
            extract(proof, facts)?;
        }
        facts.push(Fact::new(entity.clone(), attribute("proof"), proof.cid()));
    }

    Ok(())
}

fn flatten(entity: &Value, path: &[&str], map: &BTreeMap<String, Ipld>, facts: &mut Vec<Fact>) {
    for (key, value) in map {
        let mut path = path.to_vec();
        path.push(key.as_str());
        leaves(entity, &path, value, facts);
    }
}

fn leaves(entity: &Value, path: &[&str], value: &Ipld, facts: &mut Vec<Fact>) {
    let leaf = match value {
        Ipld::Null => return,
        Ipld::Map(map) => return flatten(entity, path, map, facts),
        Ipld::List(list) => {
            for item in list {
                leaves(entity, path, item, facts);
            }
            return;
        }
        Ipld::Bool(value) => Value::Boolean(*value),
        Ipld::Integer(value) => match i64::try_from(*value) {
            Ok(value) => Value::Integer(value),
            Err(_) => Value::Float(*value as f64),
        },
        Ipld::Float(value) => Value::Float(*value),
        Ipld::String(value) => Value::String(value.clone()),
        Ipld::Bytes(value) => Value::Bytes(value.clone()),
        Ipld::Link(cid) => Value::Link(*cid),
    };

    let (namespace, path) = match path.split_first() {
        Some((namespace, path)) => (*namespace, path),
        None => return,
    };

    facts.push(Fact::new(
        entity.clone(),
        Attribute::namespaced(namespace, path.iter().copied()),
        leaf,
    ));
}
