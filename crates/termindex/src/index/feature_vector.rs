//! Feature vector indexing for subsumption filtering.
//!
//! Feature vectors provide a necessary condition for subsumption: if clause C
//! subsumes clause D, then feature(C) ≤ feature(D) componentwise. Every
//! feature below is monotone under instantiation and under taking a bigger
//! multiset of literals, which is what makes the filter sound.
//!
//! Clauses are stored in an ordered trie keyed by their (permuted) vectors,
//! so each level of a query is a range scan over the children.

use super::trie::TrieNode;
use crate::logic::{Clause, ClauseId, Head, SymbolId, TermBank, TermId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, error, trace};

// =============================================================================
// Feature collection
// =============================================================================

/// Which features are collected for a clause.
///
/// The two literal counts always come first. Symbols are folded into
/// `max_symbols` buckets by id; each bucket contributes its occurrence count
/// in positive and negative literals and, optionally, the maximal depth + 1
/// at which it occurs in positive and negative literals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureSpec {
    pub max_symbols: usize,
    pub symbol_counts: bool,
    pub symbol_depths: bool,
}

impl Default for FeatureSpec {
    fn default() -> Self {
        FeatureSpec {
            max_symbols: 16,
            symbol_counts: true,
            symbol_depths: true,
        }
    }
}

impl FeatureSpec {
    fn per_bucket(&self) -> usize {
        2 * (self.symbol_counts as usize) + 2 * (self.symbol_depths as usize)
    }

    /// Length of an unpermuted feature vector
    pub fn raw_len(&self) -> usize {
        2 + self.max_symbols * self.per_bucket()
    }

    /// Compute the unpermuted features of a clause
    pub fn raw_features(&self, bank: &TermBank, clause: &Clause) -> Vec<u32> {
        let mut raw = vec![0u32; self.raw_len()];
        let per_bucket = self.per_bucket();
        let true_sym = SymbolId::TRUE;
        let mut stack: Vec<(TermId, u32)> = Vec::new();

        for lit in clause.literals() {
            let polarity = if lit.positive { 0 } else { 1 };
            raw[polarity] += 1;
            if per_bucket == 0 || self.max_symbols == 0 {
                continue;
            }

            stack.clear();
            stack.push((lit.lterm, 0));
            stack.push((lit.rterm, 0));
            while let Some((t, depth)) = stack.pop() {
                let f = match bank.head(t) {
                    Head::Var(_) => continue,
                    Head::Sym(f) => f,
                };
                if f != true_sym {
                    let mut slot = 2 + (f.index() % self.max_symbols) * per_bucket;
                    if self.symbol_counts {
                        raw[slot + polarity] += 1;
                        slot += 2;
                    }
                    if self.symbol_depths {
                        let d = &mut raw[slot + polarity];
                        *d = (*d).max(depth + 1);
                    }
                }
                for &arg in bank.args(t) {
                    stack.push((arg, depth + 1));
                }
            }
        }
        raw
    }

    /// Order features by decreasing number of distinct values over a sample
    /// of clauses, dropping those that are zero throughout.
    ///
    /// An empty sample yields the identity permutation.
    pub fn compute_permutation<'a, I>(&self, bank: &TermBank, sample: I) -> FeaturePermutation
    where
        I: IntoIterator<Item = &'a Clause>,
    {
        let len = self.raw_len();
        let mut distinct: Vec<BTreeSet<u32>> = vec![BTreeSet::new(); len];
        let mut sampled = 0usize;
        for clause in sample {
            for (i, v) in self.raw_features(bank, clause).into_iter().enumerate() {
                distinct[i].insert(v);
            }
            sampled += 1;
        }
        if sampled == 0 {
            return FeaturePermutation::identity(self);
        }

        let mut order: Vec<usize> = (0..len)
            .filter(|&i| distinct[i].iter().any(|&v| v != 0))
            .collect();
        order.sort_by(|&a, &b| distinct[b].len().cmp(&distinct[a].len()).then(a.cmp(&b)));
        debug!(sampled, kept = order.len(), of = len, "feature permutation computed");
        FeaturePermutation { order }
    }
}

/// Selection and order of raw features that make up the trie key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeaturePermutation {
    order: Vec<usize>,
}

impl FeaturePermutation {
    pub fn identity(spec: &FeatureSpec) -> Self {
        FeaturePermutation {
            order: (0..spec.raw_len()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn apply(&self, raw: &[u32]) -> FeatureVector {
        FeatureVector {
            values: self.order.iter().map(|&i| raw[i]).collect(),
        }
    }
}

// =============================================================================
// Feature Vector
// =============================================================================

/// A permuted feature vector.
///
/// For subsumption C ⊆σ D, we have feature(C) ≤ feature(D) componentwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeatureVector {
    pub values: Vec<u32>,
}

impl FeatureVector {
    /// True if self ≤ other componentwise (self could subsume other)
    #[inline]
    pub fn compatible_as_subsumer(&self, other: &FeatureVector) -> bool {
        self.values.iter().zip(&other.values).all(|(&a, &b)| a <= b)
    }

    /// True if other ≤ self componentwise (self could be subsumed by other)
    #[inline]
    pub fn compatible_as_subsumed(&self, other: &FeatureVector) -> bool {
        other.compatible_as_subsumer(self)
    }
}

// =============================================================================
// Feature Index
// =============================================================================

/// Query direction of a feature vector lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Indexed clauses whose vector is ≤ the query (forward subsumption)
    Subsumers,
    /// Indexed clauses whose vector is ≥ the query (backward subsumption)
    Subsumed,
}

/// Feature vector index for subsumption candidate retrieval.
///
/// The permutation is fixed when the index is created.
#[derive(Debug, Clone)]
pub struct FvIndex {
    spec: FeatureSpec,
    perm: FeaturePermutation,
    root: TrieNode<u32, ClauseId>,
    vectors: HashMap<ClauseId, FeatureVector>,
}

impl FvIndex {
    pub fn new(spec: FeatureSpec, perm: FeaturePermutation) -> Self {
        FvIndex {
            spec,
            perm,
            root: TrieNode::default(),
            vectors: HashMap::new(),
        }
    }

    /// Index with every feature of `spec` in natural order
    pub fn with_identity(spec: FeatureSpec) -> Self {
        let perm = FeaturePermutation::identity(&spec);
        Self::new(spec, perm)
    }

    pub fn spec(&self) -> &FeatureSpec {
        &self.spec
    }

    pub fn permutation(&self) -> &FeaturePermutation {
        &self.perm
    }

    /// Feature vector of a clause under this index's permutation
    pub fn features(&self, bank: &TermBank, clause: &Clause) -> FeatureVector {
        self.perm.apply(&self.spec.raw_features(bank, clause))
    }

    /// Add a clause. Inserting a clause that is already present is fatal.
    pub fn insert(&mut self, bank: &TermBank, clause: &Clause) {
        if self.vectors.contains_key(&clause.id) {
            error!(clause = %clause.id, "clause inserted twice into feature vector index");
            panic!("clause {} inserted twice into feature vector index", clause.id);
        }
        let fv = self.features(bank, clause);
        self.root.insert(&fv.values, clause.id);
        debug!(clause = %clause.id, "feature vector index insert");
        self.vectors.insert(clause.id, fv);
    }

    /// Remove a clause by identity. Returns false if it was not indexed.
    pub fn delete(&mut self, id: ClauseId) -> bool {
        let Some(fv) = self.vectors.remove(&id) else {
            return false;
        };
        let removed = self.root.remove(&fv.values, |&c| c == id);
        debug!(clause = %id, removed, "feature vector index delete");
        removed > 0
    }

    pub fn contains(&self, id: ClauseId) -> bool {
        self.vectors.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub(crate) fn node_count(&self) -> usize {
        self.root.node_count()
    }

    /// Indexed clauses whose vector is compatible with the query clause in
    /// the given direction.
    ///
    /// This is a necessary condition only; callers still run the real
    /// subsumption test on every candidate.
    pub fn query(&self, bank: &TermBank, clause: &Clause, direction: Direction) -> FvCandidates<'_> {
        let query = self.features(bank, clause);
        trace!(clause = %clause.id, ?direction, "feature vector query");
        FvCandidates {
            query,
            direction,
            stack: vec![(&self.root, 0)],
            pending: [].iter(),
        }
    }
}

/// Lazy result of `FvIndex::query`
#[derive(Debug)]
pub struct FvCandidates<'a> {
    query: FeatureVector,
    direction: Direction,
    stack: Vec<(&'a TrieNode<u32, ClauseId>, usize)>,
    pending: std::slice::Iter<'a, ClauseId>,
}

impl<'a> Iterator for FvCandidates<'a> {
    type Item = ClauseId;

    fn next(&mut self) -> Option<ClauseId> {
        loop {
            if let Some(&id) = self.pending.next() {
                return Some(id);
            }
            let (node, depth) = self.stack.pop()?;
            if depth == self.query.values.len() {
                self.pending = node.values.iter();
                continue;
            }
            let bound = self.query.values[depth];
            match self.direction {
                Direction::Subsumers => {
                    for child in node.children.range(..=bound).map(|(_, c)| c) {
                        self.stack.push((child, depth + 1));
                    }
                }
                Direction::Subsumed => {
                    for child in node.children.range(bound..).map(|(_, c)| c) {
                        self.stack.push((child, depth + 1));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StandardWeights;
    use crate::logic::{Literal, Signature};

    struct TestCtx {
        bank: TermBank,
        next_id: u32,
    }

    impl TestCtx {
        fn new() -> Self {
            let mut sig = Signature::new();
            sig.add_symbol("a", 0).unwrap();
            sig.add_symbol("b", 0).unwrap();
            sig.add_symbol("f", 1).unwrap();
            sig.add_predicate("p", 1).unwrap();
            sig.add_predicate("q", 2).unwrap();
            TestCtx {
                bank: TermBank::new(sig, StandardWeights::default()).unwrap(),
                next_id: 0,
            }
        }

        fn t(&mut self, name: &str, args: &[TermId]) -> TermId {
            let s = self.bank.signature().get(name).unwrap();
            self.bank.app(s, args).unwrap()
        }

        fn atom(&mut self, positive: bool, name: &str, args: &[TermId]) -> Literal {
            let a = self.t(name, args);
            Literal::atom(&self.bank, positive, a)
        }

        fn clause(&mut self, lits: Vec<Literal>) -> Clause {
            self.next_id += 1;
            Clause::new(ClauseId(self.next_id), lits, &self.bank)
        }
    }

    #[test]
    fn test_raw_features() {
        let mut ctx = TestCtx::new();
        let a = ctx.t("a", &[]);
        let fa = ctx.t("f", &[a]);
        let l1 = ctx.atom(true, "p", &[fa]);
        let l2 = ctx.atom(false, "p", &[a]);
        let c = ctx.clause(vec![l1, l2]);

        let spec = FeatureSpec::default();
        let raw = spec.raw_features(&ctx.bank, &c);
        assert_eq!(raw.len(), 2 + 16 * 4);
        assert_eq!(&raw[..2], &[1, 1]);

        let slot = |s: &str| 2 + ctx.bank.signature().get(s).unwrap().index() * 4;
        // a: once positive at depth 2, once negative at depth 1
        assert_eq!(&raw[slot("a")..slot("a") + 4], &[1, 1, 3, 2]);
        assert_eq!(&raw[slot("f")..slot("f") + 4], &[1, 0, 2, 0]);
        assert_eq!(&raw[slot("p")..slot("p") + 4], &[1, 1, 1, 1]);
        // $true is not counted
        assert_eq!(&raw[2..6], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_compatibility() {
        let small = FeatureVector { values: vec![1, 0, 2] };
        let big = FeatureVector { values: vec![1, 3, 2] };
        assert!(small.compatible_as_subsumer(&big));
        assert!(!big.compatible_as_subsumer(&small));
        assert!(big.compatible_as_subsumed(&small));
        assert!(small.compatible_as_subsumed(&small));
    }

    #[test]
    fn test_permutation_drops_constant_zero() {
        let mut ctx = TestCtx::new();
        let a = ctx.t("a", &[]);
        let b = ctx.t("b", &[]);
        let l1 = ctx.atom(true, "p", &[a]);
        let l2 = ctx.atom(true, "p", &[b]);
        let l3 = ctx.atom(false, "p", &[b]);
        let c1 = ctx.clause(vec![l1]);
        let c2 = ctx.clause(vec![l2, l3]);

        let spec = FeatureSpec {
            symbol_depths: false,
            ..FeatureSpec::default()
        };
        let perm = spec.compute_permutation(&ctx.bank, [&c1, &c2]);
        // Nonzero somewhere: pos/neg literal counts, pos/neg for p, pos a,
        // pos/neg b
        assert_eq!(perm.len(), 7);
        let empty: [&Clause; 0] = [];
        assert_eq!(spec.compute_permutation(&ctx.bank, empty), FeaturePermutation::identity(&spec));
    }

    #[test]
    fn test_index_queries() {
        let mut ctx = TestCtx::new();
        let a = ctx.t("a", &[]);
        let x = ctx.bank.var(0);
        let fx = ctx.t("f", &[x]);
        let fa = ctx.t("f", &[a]);

        let px = ctx.atom(true, "p", &[x]);
        let qxa = ctx.atom(false, "q", &[x, a]);
        let general = ctx.clause(vec![px, qxa]);

        let pfa = ctx.atom(true, "p", &[fa]);
        let qfaa = ctx.atom(false, "q", &[fa, a]);
        let pa = ctx.atom(true, "p", &[a]);
        let specific = ctx.clause(vec![pfa, qfaa, pa]);

        let pfx = ctx.atom(false, "p", &[fx]);
        let unrelated = ctx.clause(vec![pfx]);

        let mut index = FvIndex::with_identity(FeatureSpec::default());
        index.insert(&ctx.bank, &general);
        index.insert(&ctx.bank, &specific);
        index.insert(&ctx.bank, &unrelated);
        assert_eq!(index.len(), 3);

        let subsumers: Vec<ClauseId> = index.query(&ctx.bank, &specific, Direction::Subsumers).collect();
        assert!(subsumers.contains(&general.id));
        assert!(subsumers.contains(&specific.id));
        assert!(!subsumers.contains(&unrelated.id));

        let subsumed: Vec<ClauseId> = index.query(&ctx.bank, &general, Direction::Subsumed).collect();
        assert!(subsumed.contains(&specific.id));
        assert!(!subsumed.contains(&unrelated.id));

        assert!(index.delete(general.id));
        assert!(!index.delete(general.id));
        assert!(!index.contains(general.id));
        let subsumers: Vec<ClauseId> = index.query(&ctx.bank, &specific, Direction::Subsumers).collect();
        assert_eq!(subsumers, vec![specific.id]);
    }

    #[test]
    #[should_panic(expected = "inserted twice")]
    fn test_double_insert_is_fatal() {
        let mut ctx = TestCtx::new();
        let a = ctx.t("a", &[]);
        let pa = ctx.atom(true, "p", &[a]);
        let c = ctx.clause(vec![pa]);
        let mut index = FvIndex::with_identity(FeatureSpec::default());
        index.insert(&ctx.bank, &c);
        index.insert(&ctx.bank, &c);
    }
}
