//! Builder for [`Delegation`]s.

use std::collections::BTreeMap;

use ipld_core::ipld::Ipld;

use super::{Block, Capability, Delegation, Proof};
use crate::AccessError;

/// Typed builder for [`Delegation`]
#[derive(Debug, Clone)]
pub struct DelegationBuilder {
    issuer: String,
    audience: String,
    capabilities: Vec<Capability>,
    expiration: Option<u64>,
    not_before: Option<u64>,
    facts: Vec<BTreeMap<String, Ipld>>,
    proofs: Vec<Proof>,
}

impl DelegationBuilder {
    /// Builder for a delegation from `issuer` to `audience` with nothing
    /// delegated yet
    pub fn new<I: Into<String>, A: Into<String>>(issuer: I, audience: A) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            capabilities: Vec::new(),
            expiration: None,
            not_before: None,
            facts: Vec::new(),
            proofs: Vec::new(),
        }
    }

    /// Delegate `capability`
    pub fn capability(mut self, capability: Capability) -> Self {
        self.capabilities.push(capability);
        self
    }

    /// Expire at `time` (Unix seconds)
    pub fn expiration(mut self, time: u64) -> Self {
        self.expiration = Some(time);
        self
    }

    /// Become valid at `time` (Unix seconds)
    pub fn not_before(mut self, time: u64) -> Self {
        self.not_before = Some(time);
        self
    }

    /// Attach a metadata fact
    pub fn fact(mut self, fact: BTreeMap<String, Ipld>) -> Self {
        self.facts.push(fact);
        self
    }

    /// Add a proof, either embedded or by CID
    pub fn proof<P: Into<Proof>>(mut self, proof: P) -> Self {
        self.proofs.push(proof.into());
        self
    }

    /// Encode the payload and derive the CID
    pub fn build(self) -> Result<Delegation, AccessError> {
        let block = Block {
            issuer: self.issuer,
            audience: self.audience,
            capabilities: self.capabilities,
            expiration: self.expiration,
            not_before: self.not_before,
            facts: self.facts,
            proofs: self.proofs.iter().map(Proof::cid).collect(),
        };
        Delegation::from_parts(block, self.proofs)
    }
}
