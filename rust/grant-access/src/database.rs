//! The agent's proof database.
//!
//! A [`Database`] keeps the delegations an agent holds together with the fact
//! index that queries run against, and a dereference map that turns CIDs
//! found by queries back into delegations.

use std::collections::{BTreeMap, HashMap, HashSet};

use grant_query::{Commit, Fact, Instruction, MemoryStore};
use indexmap::IndexMap;
use ipld_core::{cid::Cid, ipld::Ipld};
use serde::{Deserialize, Serialize};

use crate::{AccessError, Block, Delegation, Proof, Settings, facts::facts, revocation::Resolve};

/// A delegation held by the agent along with its metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// Free-form metadata recorded when the proof was imported
    pub meta: BTreeMap<String, Ipld>,
    /// The delegation
    pub delegation: Delegation,
}

/// Persisted form of a single [`Entry`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedEntry {
    /// Entry metadata
    #[serde(default)]
    pub meta: BTreeMap<String, Ipld>,
    /// Blocks of the delegation, root first
    pub delegation: Vec<Block>,
}

/// Persisted form of a [`Database`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Archive {
    /// Entries in import order
    pub proofs: Vec<ArchivedEntry>,
}

impl Archive {
    /// Encode the archive as DAG-CBOR
    pub fn to_bytes(&self) -> Result<Vec<u8>, AccessError> {
        serde_ipld_dagcbor::to_vec(self).map_err(|error| AccessError::Encode(error.to_string()))
    }

    /// Decode an archive from DAG-CBOR
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AccessError> {
        serde_ipld_dagcbor::from_slice(bytes).map_err(|error| AccessError::Decode(error.to_string()))
    }
}

/// Delegations available to an agent, indexed for querying
#[derive(Debug, Clone, Default)]
pub struct Database {
    proofs: IndexMap<String, Entry>,
    delegations: HashMap<Cid, Delegation>,
    index: MemoryStore,
    settings: Settings,
}

impl Database {
    /// Empty database using `settings`
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Database holding `proofs` with default settings
    pub fn from_proofs<I>(proofs: I) -> Result<Self, AccessError>
    where
        I: IntoIterator<Item = Delegation>,
    {
        let mut database = Self::default();
        for proof in proofs {
            database.assert(proof)?;
        }
        Ok(database)
    }

    /// Restore a database from an archive
    pub fn from_archive(archive: &Archive, settings: Settings) -> Result<Self, AccessError> {
        let mut database = Self::new(settings);
        for entry in &archive.proofs {
            let delegation = Delegation::import(&entry.delegation)?;
            database.assert_with_meta(delegation, entry.meta.clone())?;
        }
        Ok(database)
    }

    /// Persistable form of this database
    pub fn to_archive(&self) -> Archive {
        let proofs = self
            .proofs
            .values()
            .map(|entry| ArchivedEntry {
                meta: entry.meta.clone(),
                delegation: entry.delegation.export(),
            })
            .collect();
        Archive { proofs }
    }

    /// Settings the resolution rules use
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Replace the settings
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// The fact index
    pub fn index(&self) -> &MemoryStore {
        &self.index
    }

    /// Number of top-level proofs
    pub fn len(&self) -> usize {
        self.proofs.len()
    }

    /// Whether the database holds no proofs
    pub fn is_empty(&self) -> bool {
        self.proofs.is_empty()
    }

    /// Top-level proofs in import order
    pub fn proofs(&self) -> impl Iterator<Item = &Entry> {
        self.proofs.values()
    }

    /// Dereference any delegation reachable from a top-level proof
    pub fn get(&self, cid: &Cid) -> Option<&Delegation> {
        self.delegations.get(cid)
    }

    /// Clone the delegation with `cid` out of the database, logging when it
    /// is missing
    pub(crate) fn dereference(&self, cid: &Cid) -> Option<Delegation> {
        let delegation = self.get(cid).cloned();
        if delegation.is_none() {
            tracing::warn!(%cid, "matched proof is missing from the database");
        }
        delegation
    }

    /// Import a delegation with empty metadata
    pub fn assert(&mut self, delegation: Delegation) -> Result<Commit, AccessError> {
        self.assert_with_meta(delegation, BTreeMap::new())
    }

    /// Import a delegation.
    ///
    /// Importing a delegation that is already present only updates its
    /// metadata; the fact index is left as it was.
    pub fn assert_with_meta(
        &mut self,
        delegation: Delegation,
        meta: BTreeMap<String, Ipld>,
    ) -> Result<Commit, AccessError> {
        let facts = facts(&delegation)?;
        let commit = self
            .index
            .transact(facts.into_iter().map(Instruction::Assert));

        self.remember(&delegation);
        self.proofs
            .insert(delegation.cid().to_string(), Entry { meta, delegation });

        Ok(commit)
    }

    /// Discard a top-level proof.
    ///
    /// Facts still derived from the remaining proofs stay in the index, so
    /// capabilities or embedded proofs shared with other grants keep working.
    pub fn retract(&mut self, cid: &Cid) -> Result<Option<Entry>, AccessError> {
        let Some(entry) = self.proofs.shift_remove(&cid.to_string()) else {
            return Ok(None);
        };

        let mut remaining = HashSet::new();
        for proof in self.proofs.values() {
            remaining.extend(facts(&proof.delegation)?);
        }

        let retracted: Vec<Fact> = facts(&entry.delegation)?
            .into_iter()
            .filter(|fact| !remaining.contains(fact))
            .collect();
        let commit = self
            .index
            .transact(retracted.into_iter().map(Instruction::Retract));

        self.delegations.clear();
        let delegations: Vec<Delegation> = self
            .proofs
            .values()
            .map(|entry| entry.delegation.clone())
            .collect();
        for delegation in &delegations {
            self.remember(delegation);
        }

        tracing::debug!(
            cid = %cid,
            retracted = commit.retracted,
            "retracted proof"
        );

        Ok(Some(entry))
    }

    fn remember(&mut self, delegation: &Delegation) {
        self.delegations
            .entry(delegation.cid())
            .or_insert_with(|| delegation.clone());

        for proof in delegation.proofs() {
            if let Proof::Delegation(proof) = proof {
                self.remember(proof);
            }
        }
    }
}

impl Resolve for Database {
    fn resolve(&self, cid: &Cid) -> Option<&Delegation> {
        self.get(cid)
    }
}
