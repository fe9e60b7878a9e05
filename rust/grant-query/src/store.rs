//! Fact stores the evaluator reads from.

use std::collections::{HashMap, HashSet};

use crate::{Attribute, Fact, Instruction};

/// Read access to a set of facts.
///
/// Implementations must yield facts in insertion order whether or not an
/// attribute is given, so that filtering through an index never changes the
/// order of query results.
pub trait Source {
    /// Facts with the given attribute, or all facts when `the` is `None`
    fn scan<'a>(&'a self, the: Option<&Attribute>) -> Box<dyn Iterator<Item = &'a Fact> + 'a>;
}

/// Plain fact lists scan linearly; handy as a reference implementation.
impl Source for [Fact] {
    fn scan<'a>(&'a self, the: Option<&Attribute>) -> Box<dyn Iterator<Item = &'a Fact> + 'a> {
        match the {
            Some(attribute) => {
                let attribute = attribute.clone();
                Box::new(self.iter().filter(move |fact| fact.the == attribute))
            }
            None => Box::new(self.iter()),
        }
    }
}

impl Source for Vec<Fact> {
    fn scan<'a>(&'a self, the: Option<&Attribute>) -> Box<dyn Iterator<Item = &'a Fact> + 'a> {
        self.as_slice().scan(the)
    }
}

/// Summary of an applied transaction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Commit {
    /// Facts that were not present before and now are
    pub asserted: usize,
    /// Facts that were present before and now are not
    pub retracted: usize,
}

/// An in-memory, insertion-ordered, duplicate-free fact store with a
/// secondary index from attribute to fact positions.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    facts: Vec<Fact>,
    members: HashSet<Fact>,
    index: HashMap<Attribute, Vec<usize>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of active facts
    pub fn len(&self) -> usize {
        self.facts.len()
    }

    /// Whether the store has no active facts
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// Whether `fact` is in the active set
    pub fn contains(&self, fact: &Fact) -> bool {
        self.members.contains(fact)
    }

    /// Iterate over all active facts in insertion order
    pub fn facts(&self) -> impl Iterator<Item = &Fact> {
        self.facts.iter()
    }

    /// Apply a batch of instructions in order.
    ///
    /// Asserting a fact that is already present and retracting one that is
    /// absent are both no-ops, which makes re-importing the same facts
    /// idempotent.
    pub fn transact<I>(&mut self, instructions: I) -> Commit
    where
        I: IntoIterator<Item = Instruction>,
    {
        let mut commit = Commit::default();
        let mut retracted = HashSet::new();

        for instruction in instructions {
            match instruction {
                Instruction::Assert(fact) => {
                    if retracted.remove(&fact) {
                        // Retracted earlier in this batch but still physically
                        // present; reviving it keeps its original position.
                        commit.retracted -= 1;
                    } else if !self.members.contains(&fact) {
                        self.push(fact);
                        commit.asserted += 1;
                    }
                }
                Instruction::Retract(fact) => {
                    if self.members.contains(&fact) && retracted.insert(fact) {
                        commit.retracted += 1;
                    }
                }
            }
        }

        if !retracted.is_empty() {
            self.facts.retain(|fact| !retracted.contains(fact));
            for fact in &retracted {
                self.members.remove(fact);
            }
            self.reindex();
        }

        tracing::debug!(
            asserted = commit.asserted,
            retracted = commit.retracted,
            size = self.facts.len(),
            "transacted facts"
        );

        commit
    }

    fn push(&mut self, fact: Fact) {
        let position = self.facts.len();
        self.index
            .entry(fact.the.clone())
            .or_default()
            .push(position);
        self.members.insert(fact.clone());
        self.facts.push(fact);
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (position, fact) in self.facts.iter().enumerate() {
            self.index
                .entry(fact.the.clone())
                .or_default()
                .push(position);
        }
    }
}

impl FromIterator<Fact> for MemoryStore {
    fn from_iter<T: IntoIterator<Item = Fact>>(iter: T) -> Self {
        let mut store = Self::new();
        store.transact(iter.into_iter().map(Instruction::Assert));
        store
    }
}

impl Source for MemoryStore {
    fn scan<'a>(&'a self, the: Option<&Attribute>) -> Box<dyn Iterator<Item = &'a Fact> + 'a> {
        match the {
            Some(attribute) => match self.index.get(attribute) {
                Some(positions) => Box::new(positions.iter().map(|position| &self.facts[*position])),
                None => Box::new(std::iter::empty()),
            },
            None => Box::new(self.facts.iter()),
        }
    }
}
