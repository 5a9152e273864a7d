//! Fingerprint index for unit clauses.
//!
//! Each unit clause is keyed by the fingerprints of the two sides of its
//! literal, one trie per polarity. Equations that are not oriented are
//! stored under both side orders, so a query never has to guess which order
//! an indexed equation was written in.

use super::fingerprint::{compatible, FingerprintSpec, FpMode, FpSample};
use super::trie::TrieNode;
use crate::logic::{Clause, ClauseId, Literal, TermBank};
use std::collections::{HashMap, HashSet};
use tracing::{debug, error, trace};

#[derive(Debug, Clone)]
struct UnitKeys {
    positive: bool,
    keys: Vec<Vec<FpSample>>,
}

#[derive(Debug, Clone)]
pub struct UnitClauseIndex {
    spec: FingerprintSpec,
    positive: TrieNode<FpSample, ClauseId>,
    negative: TrieNode<FpSample, ClauseId>,
    keys: HashMap<ClauseId, UnitKeys>,
    entries: usize,
}

impl UnitClauseIndex {
    pub fn new(spec: FingerprintSpec) -> Self {
        UnitClauseIndex {
            spec,
            positive: TrieNode::default(),
            negative: TrieNode::default(),
            keys: HashMap::new(),
            entries: 0,
        }
    }

    pub fn spec(&self) -> FingerprintSpec {
        self.spec
    }

    fn key(&self, bank: &TermBank, lit: &Literal, swapped: bool) -> Vec<FpSample> {
        let (first, second) = if swapped {
            (lit.rterm, lit.lterm)
        } else {
            (lit.lterm, lit.rterm)
        };
        let mut key = Vec::with_capacity(2 * self.spec.len());
        self.spec.fingerprint_into(bank, first, &mut key);
        self.spec.fingerprint_into(bank, second, &mut key);
        key
    }

    fn root_mut(&mut self, positive: bool) -> &mut TrieNode<FpSample, ClauseId> {
        if positive {
            &mut self.positive
        } else {
            &mut self.negative
        }
    }

    /// Add a unit clause.
    ///
    /// Inserting a clause twice or a clause that is not a unit is fatal.
    pub fn insert(&mut self, bank: &TermBank, clause: &Clause) {
        let lit = match clause.literals() {
            [lit] => *lit,
            lits => {
                error!(clause = %clause.id, literals = lits.len(), "non-unit clause in unit index");
                panic!("clause {} is not a unit clause", clause.id);
            }
        };
        if self.keys.contains_key(&clause.id) {
            error!(clause = %clause.id, "clause inserted twice into unit index");
            panic!("clause {} inserted twice into unit index", clause.id);
        }

        let mut keys = vec![self.key(bank, &lit, false)];
        if lit.is_equational(bank) && !lit.oriented {
            keys.push(self.key(bank, &lit, true));
        }
        for key in &keys {
            self.root_mut(lit.positive).insert(key, clause.id);
        }
        self.entries += keys.len();
        debug!(clause = %clause.id, entries = keys.len(), "unit index insert");
        self.keys.insert(
            clause.id,
            UnitKeys {
                positive: lit.positive,
                keys,
            },
        );
    }

    /// Remove a clause and both of its entries. Returns false if it was not
    /// indexed.
    pub fn delete(&mut self, id: ClauseId) -> bool {
        let Some(unit) = self.keys.remove(&id) else {
            return false;
        };
        let root = self.root_mut(unit.positive);
        let mut removed = 0;
        for key in &unit.keys {
            removed += root.remove(key, |&c| c == id);
        }
        self.entries -= removed;
        debug!(clause = %id, removed, "unit index delete");
        true
    }

    pub fn contains(&self, id: ClauseId) -> bool {
        self.keys.contains_key(&id)
    }

    /// Number of indexed clauses
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Number of trie entries, counting unoriented equations twice
    pub fn entry_count(&self) -> usize {
        self.entries
    }

    pub fn clauses(&self) -> impl Iterator<Item = ClauseId> + '_ {
        self.keys.keys().copied()
    }

    /// Indexed unit clauses whose literal may be a generalization
    /// (`FpMode::Generalizations`) or an instance (`FpMode::Instances`) of
    /// `lit`, each reported once.
    ///
    /// Query with literals oriented the same way as the indexed ones. For
    /// instance retrieval an unoriented equation is looked up under both
    /// side orders.
    pub fn query(&self, bank: &TermBank, lit: &Literal, mode: FpMode) -> UnitCandidates<'_> {
        let root = if lit.positive {
            &self.positive
        } else {
            &self.negative
        };
        let mut walks = vec![FpWalk::new(root, self.key(bank, lit, false), mode)];
        if mode == FpMode::Instances && lit.is_equational(bank) && !lit.oriented {
            walks.push(FpWalk::new(root, self.key(bank, lit, true), mode));
        }
        trace!(positive = lit.positive, ?mode, walks = walks.len(), "unit index query");
        UnitCandidates {
            walks,
            seen: HashSet::new(),
        }
    }
}

/// Depth-first walk of one trie along compatible children
#[derive(Debug)]
struct FpWalk<'a> {
    key: Vec<FpSample>,
    mode: FpMode,
    stack: Vec<(&'a TrieNode<FpSample, ClauseId>, usize)>,
    pending: std::slice::Iter<'a, ClauseId>,
}

impl<'a> FpWalk<'a> {
    fn new(root: &'a TrieNode<FpSample, ClauseId>, key: Vec<FpSample>, mode: FpMode) -> Self {
        FpWalk {
            key,
            mode,
            stack: vec![(root, 0)],
            pending: [].iter(),
        }
    }
}

impl<'a> Iterator for FpWalk<'a> {
    type Item = ClauseId;

    fn next(&mut self) -> Option<ClauseId> {
        loop {
            if let Some(&id) = self.pending.next() {
                return Some(id);
            }
            let (node, depth) = self.stack.pop()?;
            if depth == self.key.len() {
                self.pending = node.values.iter();
                continue;
            }
            let query = self.key[depth];
            for (&indexed, child) in &node.children {
                if compatible(self.mode, indexed, query) {
                    self.stack.push((child, depth + 1));
                }
            }
        }
    }
}

/// Lazy result of `UnitClauseIndex::query`
#[derive(Debug)]
pub struct UnitCandidates<'a> {
    walks: Vec<FpWalk<'a>>,
    seen: HashSet<ClauseId>,
}

impl<'a> Iterator for UnitCandidates<'a> {
    type Item = ClauseId;

    fn next(&mut self) -> Option<ClauseId> {
        loop {
            let walk = self.walks.last_mut()?;
            match walk.next() {
                Some(id) => {
                    if self.seen.insert(id) {
                        return Some(id);
                    }
                }
                None => {
                    self.walks.pop();
                }
            }
        }
    }
}
