//! Delegations (grants) and their content-addressed encoding.
//!
//! A [`Delegation`] is assumed to be signature-valid; this crate only reads
//! its payload. The payload is encoded as a DAG-CBOR [`Block`] in which
//! embedded proofs are replaced by their CIDs, and the delegation's CID is
//! derived from that block.

pub mod builder;

use std::collections::{BTreeMap, HashMap, HashSet};

use ipld_core::{cid::Cid, ipld::Ipld};
use serde::{Deserialize, Serialize};

use crate::{AccessError, cid::to_dagcbor_cid, cid::to_entity_cid};

pub use builder::DelegationBuilder;

/// A single permission statement inside a delegation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capability {
    /// Resource the ability applies to
    pub with: String,
    /// Ability, possibly a glob such as `store/*`
    pub can: String,
    /// Caveats
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub nb: BTreeMap<String, Ipld>,
}

impl Capability {
    /// Capability without caveats
    pub fn new<W: Into<String>, C: Into<String>>(with: W, can: C) -> Self {
        Self {
            with: with.into(),
            can: can.into(),
            nb: BTreeMap::new(),
        }
    }

    /// Add a caveat
    pub fn with_caveat<K: Into<String>, V: Into<Ipld>>(mut self, key: K, value: V) -> Self {
        self.nb.insert(key.into(), value.into());
        self
    }

    /// Content-derived entity id of this capability
    pub fn id(&self) -> Result<Cid, AccessError> {
        to_entity_cid(self)
    }
}

/// The encoded payload of a delegation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Issuer DID
    #[serde(rename = "iss")]
    pub issuer: String,
    /// Audience DID
    #[serde(rename = "aud")]
    pub audience: String,
    /// Capabilities in declaration order
    #[serde(rename = "att")]
    pub capabilities: Vec<Capability>,
    /// Unix seconds after which the delegation is no longer valid
    #[serde(rename = "exp", default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<u64>,
    /// Unix seconds before which the delegation is not yet valid
    #[serde(rename = "nbf", default, skip_serializing_if = "Option::is_none")]
    pub not_before: Option<u64>,
    /// Arbitrary metadata
    #[serde(rename = "fct", default, skip_serializing_if = "Vec::is_empty")]
    pub facts: Vec<BTreeMap<String, Ipld>>,
    /// Proof CIDs
    #[serde(rename = "prf", default, skip_serializing_if = "Vec::is_empty")]
    pub proofs: Vec<Cid>,
}

/// A proof backing a delegation
#[derive(Debug, Clone, PartialEq)]
pub enum Proof {
    /// The proof delegation is embedded
    Delegation(Box<Delegation>),
    /// Only the CID of the proof is known
    Link(Cid),
}

impl Proof {
    /// CID of the proof delegation
    pub fn cid(&self) -> Cid {
        match self {
            Proof::Delegation(delegation) => delegation.cid(),
            Proof::Link(cid) => *cid,
        }
    }

    /// The embedded delegation, if there is one
    pub fn as_delegation(&self) -> Option<&Delegation> {
        match self {
            Proof::Delegation(delegation) => Some(delegation),
            Proof::Link(_) => None,
        }
    }
}

impl From<Delegation> for Proof {
    fn from(delegation: Delegation) -> Self {
        Proof::Delegation(Box::new(delegation))
    }
}

impl From<Cid> for Proof {
    fn from(cid: Cid) -> Self {
        Proof::Link(cid)
    }
}

/// A grant of capabilities from an issuer to an audience
#[derive(Debug, Clone, PartialEq)]
pub struct Delegation {
    block: Block,
    proofs: Vec<Proof>,
    cid: Cid,
}

impl Delegation {
    /// Start building a delegation from `issuer` to `audience`
    pub fn builder<I: Into<String>, A: Into<String>>(issuer: I, audience: A) -> DelegationBuilder {
        DelegationBuilder::new(issuer, audience)
    }

    fn from_parts(block: Block, proofs: Vec<Proof>) -> Result<Self, AccessError> {
        let cid = to_dagcbor_cid(&block)?;
        Ok(Self { block, proofs, cid })
    }

    /// Content identifier
    pub fn cid(&self) -> Cid {
        self.cid
    }

    /// Getter for the `issuer` field
    pub fn issuer(&self) -> &str {
        &self.block.issuer
    }

    /// Getter for the `audience` field
    pub fn audience(&self) -> &str {
        &self.block.audience
    }

    /// Getter for the `capabilities` field
    pub fn capabilities(&self) -> &[Capability] {
        &self.block.capabilities
    }

    /// Getter for the `expiration` field, `None` means it never expires
    pub fn expiration(&self) -> Option<u64> {
        self.block.expiration
    }

    /// Getter for the `not_before` field
    pub fn not_before(&self) -> Option<u64> {
        self.block.not_before
    }

    /// Getter for the `facts` field
    pub fn facts(&self) -> &[BTreeMap<String, Ipld>] {
        &self.block.facts
    }

    /// Getter for the `proofs` field
    pub fn proofs(&self) -> &[Proof] {
        &self.proofs
    }

    /// Whether the delegation is within its time bounds at `time`
    pub fn is_valid_at(&self, time: u64) -> bool {
        self.expiration().is_none_or(|expiration| time <= expiration)
            && self.not_before().is_none_or(|not_before| time >= not_before)
    }

    /// This delegation and every embedded proof, root first
    pub fn export(&self) -> Vec<Block> {
        let mut blocks = Vec::new();
        let mut seen = HashSet::new();
        self.collect(&mut blocks, &mut seen);
        blocks
    }

    fn collect(&self, blocks: &mut Vec<Block>, seen: &mut HashSet<Cid>) {
        if !seen.insert(self.cid) {
            return;
        }
        blocks.push(self.block.clone());
        for proof in &self.proofs {
            if let Proof::Delegation(delegation) = proof {
                delegation.collect(blocks, seen);
            }
        }
    }

    /// Reassemble a delegation from blocks produced by [`Delegation::export`].
    ///
    /// The first block is the root. Proofs whose blocks are present become
    /// embedded delegations, the rest stay links.
    pub fn import(blocks: &[Block]) -> Result<Self, AccessError> {
        let root = blocks
            .first()
            .ok_or_else(|| AccessError::Decode("delegation archive has no blocks".into()))?;

        let mut index = HashMap::new();
        for block in blocks {
            index.insert(to_dagcbor_cid(block)?, block);
        }

        Self::assemble(root, &index)
    }

    fn assemble(block: &Block, index: &HashMap<Cid, &Block>) -> Result<Self, AccessError> {
        let proofs = block
            .proofs
            .iter()
            .map(|cid| match index.get(cid) {
                Some(proof) => Ok(Proof::from(Self::assemble(proof, index)?)),
                None => Ok(Proof::Link(*cid)),
            })
            .collect::<Result<Vec<_>, AccessError>>()?;

        Self::from_parts(block.clone(), proofs)
    }
}
