//! Clause indices for subsumption and demodulation candidate retrieval.
//!
//! `EsIndex` owns one index of each kind and routes clauses to them:
//!
//! - `FvIndex`: feature vector trie, for clauses that are not units
//! - `UnitClauseIndex`: fingerprint tries, for unit clauses
//! - `PdTree`: perfect discrimination tree over demodulator left sides
//!
//! Which clauses are indexed is recorded in a side-table inside `EsIndex`,
//! not on the clause. Clauses are never owned; callers keep them and pass
//! them in by reference. All queries are lazy and borrow the index, so the
//! index cannot change while a query is being consumed.

pub mod disc_tree;
pub mod feature_vector;
pub mod fingerprint;
mod trie;
pub mod unit_clause;


use crate::config::IndexConfig;
use crate::error::{Result, TermIndexError};
use crate::logic::{Clause, ClauseId, ClausePos, Side, TermBank, TermId};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, error, info};

pub use disc_tree::{DemodCandidates, DemodEntry, PdTree};
pub use feature_vector::{Direction, FeaturePermutation, FeatureSpec, FeatureVector, FvCandidates, FvIndex};
pub use fingerprint::{FingerprintSpec, FpMode, FpSample};
pub use unit_clause::{UnitCandidates, UnitClauseIndex};

// =============================================================================
// Membership side-table
// =============================================================================

/// Sub-index a clause was routed to by `EsIndex::insert_clause`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Placement {
    FeatureVectors,
    UnitClauses,
    /// The matching sub-index is disabled; the clause is only recorded
    Unindexed,
}

/// What `EsIndex` knows about one clause
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Membership {
    pub placement: Option<Placement>,
    pub demodulator: bool,
}

/// Sizes of the sub-indices
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub clauses: usize,
    pub feature_vector_clauses: usize,
    pub feature_vector_nodes: usize,
    pub unit_clauses: usize,
    pub unit_entries: usize,
    pub demodulators: usize,
    pub demodulator_entries: usize,
    pub demodulator_nodes: usize,
}

// =============================================================================
// EsIndex
// =============================================================================

/// The index set of one proof attempt
#[derive(Debug, Clone)]
pub struct EsIndex {
    fv: Option<FvIndex>,
    units: Option<UnitClauseIndex>,
    demod: Option<PdTree>,
    members: IndexMap<ClauseId, Membership>,
}

impl EsIndex {
    /// Create the enabled sub-indices, using every feature in natural order
    pub fn new(config: &IndexConfig) -> Self {
        let perm = FeaturePermutation::identity(&config.features);
        Self::build(config, perm)
    }

    /// Create the enabled sub-indices, deriving the feature permutation from
    /// a sample of clauses
    pub fn with_sample<'a, I>(config: &IndexConfig, bank: &TermBank, sample: I) -> Self
    where
        I: IntoIterator<Item = &'a Clause>,
    {
        let perm = config.features.compute_permutation(bank, sample);
        Self::build(config, perm)
    }

    fn build(config: &IndexConfig, perm: FeaturePermutation) -> Self {
        info!(
            feature_vectors = config.feature_vectors,
            features = perm.len(),
            unit_clauses = config.unit_clauses,
            fingerprint = ?config.fingerprint,
            demodulators = config.demodulators,
            "index set created"
        );
        EsIndex {
            fv: config
                .feature_vectors
                .then(|| FvIndex::new(config.features.clone(), perm)),
            units: config.unit_clauses.then(|| UnitClauseIndex::new(config.fingerprint)),
            demod: config.demodulators.then(PdTree::new),
            members: IndexMap::new(),
        }
    }

    fn check_weight(bank: &TermBank, clause: &Clause) {
        let fresh = clause.compute_weight(bank);
        if fresh != clause.weight() {
            error!(clause = %clause.id, cached = clause.weight(), fresh, "stale clause weight");
            panic!(
                "clause {} has cached weight {} but weighs {}",
                clause.id,
                clause.weight(),
                fresh
            );
        }
    }

    /// Index a clause for subsumption: units go to the fingerprint index,
    /// everything else to the feature vector index.
    ///
    /// A stale weight cache or a second insert of the same clause is fatal.
    pub fn insert_clause(&mut self, bank: &TermBank, clause: &Clause) {
        Self::check_weight(bank, clause);
        if self.membership(clause.id).and_then(|m| m.placement).is_some() {
            error!(clause = %clause.id, "clause inserted twice");
            panic!("clause {} inserted twice", clause.id);
        }

        let placement = if clause.is_unit() {
            match self.units.as_mut() {
                Some(units) => {
                    units.insert(bank, clause);
                    Placement::UnitClauses
                }
                None => Placement::Unindexed,
            }
        } else {
            match self.fv.as_mut() {
                Some(fv) => {
                    fv.insert(bank, clause);
                    Placement::FeatureVectors
                }
                None => Placement::Unindexed,
            }
        };
        debug!(clause = %clause.id, ?placement, "clause indexed");
        self.members.entry(clause.id).or_default().placement = Some(placement);
    }

    /// Index a unit positive equation as a rewrite rule: its left side if
    /// it is oriented, both sides otherwise.
    pub fn insert_demodulator(&mut self, bank: &TermBank, clause: &Clause) -> Result<()> {
        let lit = match clause.literals() {
            [lit] if lit.is_positive_equation(bank) => *lit,
            _ => {
                return Err(TermIndexError::NotADemodulator(
                    clause.display(bank).to_string(),
                ))
            }
        };
        Self::check_weight(bank, clause);
        if self.membership(clause.id).map_or(false, |m| m.demodulator) {
            error!(clause = %clause.id, "demodulator inserted twice");
            panic!("demodulator {} inserted twice", clause.id);
        }

        if let Some(demod) = self.demod.as_mut() {
            demod.insert(bank, clause, &ClausePos::side_root(clause.id, 0, Side::Left))?;
            if !lit.oriented {
                demod.insert(bank, clause, &ClausePos::side_root(clause.id, 0, Side::Right))?;
            }
        }
        self.members.entry(clause.id).or_default().demodulator = true;
        Ok(())
    }

    /// Remove a clause from every sub-index it was added to. Returns false
    /// if the clause was not indexed.
    pub fn delete_entry(&mut self, id: ClauseId) -> bool {
        let Some(member) = self.members.shift_remove(&id) else {
            return false;
        };
        match member.placement {
            Some(Placement::FeatureVectors) => {
                if let Some(fv) = self.fv.as_mut() {
                    fv.delete(id);
                }
            }
            Some(Placement::UnitClauses) => {
                if let Some(units) = self.units.as_mut() {
                    units.delete(id);
                }
            }
            Some(Placement::Unindexed) | None => {}
        }
        if member.demodulator {
            if let Some(demod) = self.demod.as_mut() {
                demod.delete(id);
            }
        }
        debug!(clause = %id, "clause removed from index set");
        true
    }

    pub fn is_indexed(&self, id: ClauseId) -> bool {
        self.members.contains_key(&id)
    }

    pub fn membership(&self, id: ClauseId) -> Option<Membership> {
        self.members.get(&id).copied()
    }

    /// Indexed clauses in insertion order
    pub fn members(&self) -> impl Iterator<Item = (ClauseId, Membership)> + '_ {
        self.members.iter().map(|(&id, &m)| (id, m))
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Indexed clauses that may subsume `clause`, each reported once.
    pub fn subsumer_candidates(&self, bank: &TermBank, clause: &Clause) -> Candidates<'_> {
        let mut sources = Vec::new();
        if let Some(fv) = &self.fv {
            sources.push(Source::Features(fv.query(bank, clause, Direction::Subsumers)));
        }
        if let Some(units) = &self.units {
            for lit in clause.literals() {
                sources.push(Source::Units(units.query(bank, lit, FpMode::Generalizations)));
            }
        }
        Candidates::new(sources)
    }

    /// Indexed clauses that `clause` may subsume, each reported once.
    pub fn subsumed_candidates(&self, bank: &TermBank, clause: &Clause) -> Candidates<'_> {
        let mut sources = Vec::new();
        if let Some(fv) = &self.fv {
            sources.push(Source::Features(fv.query(bank, clause, Direction::Subsumed)));
        }
        if let Some(units) = &self.units {
            match clause.literals() {
                [] => sources.push(Source::Listed(units.clauses().collect::<Vec<_>>().into_iter())),
                [lit] => sources.push(Source::Units(units.query(bank, lit, FpMode::Instances))),
                _ => {}
            }
        }
        Candidates::new(sources)
    }

    /// Rewrite rules whose left side matches `term`
    pub fn demodulator_candidates<'a>(
        &'a self,
        bank: &'a TermBank,
        term: TermId,
    ) -> impl Iterator<Item = DemodEntry> + 'a {
        self.demod
            .as_ref()
            .map(|demod| demod.query(bank, term))
            .into_iter()
            .flatten()
    }

    pub fn stats(&self) -> IndexStats {
        let mut stats = IndexStats {
            clauses: self.members.values().filter(|m| m.placement.is_some()).count(),
            demodulators: self.members.values().filter(|m| m.demodulator).count(),
            ..IndexStats::default()
        };
        if let Some(fv) = &self.fv {
            stats.feature_vector_clauses = fv.len();
            stats.feature_vector_nodes = fv.node_count();
        }
        if let Some(units) = &self.units {
            stats.unit_clauses = units.len();
            stats.unit_entries = units.entry_count();
        }
        if let Some(demod) = &self.demod {
            stats.demodulator_entries = demod.len();
            stats.demodulator_nodes = demod.node_count();
        }
        stats
    }
}

// =============================================================================
// Combined candidates
// =============================================================================

#[derive(Debug)]
enum Source<'a> {
    Features(FvCandidates<'a>),
    Units(UnitCandidates<'a>),
    Listed(std::vec::IntoIter<ClauseId>),
}

impl<'a> Iterator for Source<'a> {
    type Item = ClauseId;

    fn next(&mut self) -> Option<ClauseId> {
        match self {
            Source::Features(it) => it.next(),
            Source::Units(it) => it.next(),
            Source::Listed(it) => it.next(),
        }
    }
}

/// Lazy, duplicate-free union of sub-index query results
#[derive(Debug)]
pub struct Candidates<'a> {
    /// Remaining sources, next at the end
    sources: Vec<Source<'a>>,
    seen: HashSet<ClauseId>,
}

impl<'a> Candidates<'a> {
    fn new(mut sources: Vec<Source<'a>>) -> Self {
        sources.reverse();
        Candidates {
            sources,
            seen: HashSet::new(),
        }
    }
}

impl<'a> Iterator for Candidates<'a> {
    type Item = ClauseId;

    fn next(&mut self) -> Option<ClauseId> {
        loop {
            let source = self.sources.last_mut()?;
            match source.next() {
                Some(id) => {
                    if self.seen.insert(id) {
                        return Some(id);
                    }
                }
                None => {
                    self.sources.pop();
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
            sig.add_predicate("q", 1).unwrap();
            TestCtx {
                bank: TermBank::new(sig, StandardWeights::default()).unwrap(),
                next_id: 0,
            }
        }

        fn t(&mut self, name: &str, args: &[TermId]) -> TermId {
            let s = self.bank.signature().get(name).unwrap();
            self.bank.app(s, args).unwrap()
        }

        fn atom(&mut self, positive: bool, name: &str, arg: TermId) -> Literal {
            let a = self.t(name, &[arg]);
            Literal::atom(&self.bank, positive, a)
        }

        fn clause(&mut self, lits: Vec<Literal>) -> Clause {
            self.next_id += 1;
            Clause::new(ClauseId(self.next_id), lits, &self.bank)
        }

        fn sorted(iter: impl Iterator<Item = ClauseId>) -> Vec<ClauseId> {
            let mut ids: Vec<ClauseId> = iter.collect();
            ids.sort();
            ids
        }
    }

    #[test]
    fn test_routing_and_queries() {
        let mut ctx = TestCtx::new();
        let a = ctx.t("a", &[]);
        let x = ctx.bank.var(0);
        let px = ctx.atom(true, "p", x);
        let pa = ctx.atom(true, "p", a);
        let qa = ctx.atom(false, "q", a);

        let unit = ctx.clause(vec![px]);
        let pair = ctx.clause(vec![pa, qa]);
        let mut index = EsIndex::new(&IndexConfig::default());
        index.insert_clause(&ctx.bank, &unit);
        index.insert_clause(&ctx.bank, &pair);

        assert_eq!(index.membership(unit.id).unwrap().placement, Some(Placement::UnitClauses));
        assert_eq!(index.membership(pair.id).unwrap().placement, Some(Placement::FeatureVectors));

        // p(x) subsumes p(a) | ~q(a) through its literal
        let subsumers = TestCtx::sorted(index.subsumer_candidates(&ctx.bank, &pair));
        assert_eq!(subsumers, vec![unit.id, pair.id]);
        let subsumed = TestCtx::sorted(index.subsumed_candidates(&ctx.bank, &unit));
        assert_eq!(subsumed, vec![unit.id, pair.id]);

        let empty = ctx.clause(vec![]);
        let all = TestCtx::sorted(index.subsumed_candidates(&ctx.bank, &empty));
        assert_eq!(all, vec![unit.id, pair.id]);

        assert!(index.delete_entry(unit.id));
        assert!(!index.delete_entry(unit.id));
        assert!(!index.is_indexed(unit.id));
        let subsumers = TestCtx::sorted(index.subsumer_candidates(&ctx.bank, &pair));
        assert_eq!(subsumers, vec![pair.id]);
    }

    #[test]
    fn test_demodulators() {
        let mut ctx = TestCtx::new();
        let a = ctx.t("a", &[]);
        let b = ctx.t("b", &[]);
        let x = ctx.bank.var(0);
        let fx = ctx.t("f", &[x]);
        let fa = ctx.t("f", &[a]);

        let mut oriented = Literal::equation(true, fx, x);
        oriented.oriented = true;
        let rule = ctx.clause(vec![oriented]);
        let swap = ctx.clause(vec![Literal::equation(true, a, b)]);

        let mut index = EsIndex::new(&IndexConfig::default());
        index.insert_demodulator(&ctx.bank, &rule).unwrap();
        index.insert_demodulator(&ctx.bank, &swap).unwrap();
        assert_eq!(index.stats().demodulator_entries, 3);
        assert_eq!(index.stats().demodulators, 2);
        assert_eq!(index.stats().clauses, 0);

        let hits: Vec<DemodEntry> = index.demodulator_candidates(&ctx.bank, fa).collect();
        assert_eq!(hits, vec![DemodEntry { clause: rule.id, literal: 0, side: Side::Left }]);
        let hits: Vec<DemodEntry> = index.demodulator_candidates(&ctx.bank, b).collect();
        assert_eq!(hits, vec![DemodEntry { clause: swap.id, literal: 0, side: Side::Right }]);

        assert!(index.delete_entry(swap.id));
        assert_eq!(index.demodulator_candidates(&ctx.bank, b).count(), 0);
        assert_eq!(index.stats().demodulator_entries, 1);

        let neg = ctx.clause(vec![Literal::equation(false, a, b)]);
        assert!(matches!(
            index.insert_demodulator(&ctx.bank, &neg),
            Err(TermIndexError::NotADemodulator(_))
        ));
        let pa = ctx.atom(true, "p", a);
        let atom = ctx.clause(vec![pa]);
        assert!(index.insert_demodulator(&ctx.bank, &atom).is_err());
        assert!(!index.is_indexed(neg.id));
    }

    #[test]
    fn test_disabled_sub_indices() {
        let mut ctx = TestCtx::new();
        let a = ctx.t("a", &[]);
        let pa = ctx.atom(true, "p", a);
        let unit = ctx.clause(vec![pa]);
        let config = IndexConfig {
            unit_clauses: false,
            demodulators: false,
            ..IndexConfig::default()
        };
        let mut index = EsIndex::new(&config);
        index.insert_clause(&ctx.bank, &unit);
        assert_eq!(index.membership(unit.id).unwrap().placement, Some(Placement::Unindexed));
        assert!(index.is_indexed(unit.id));
        assert_eq!(index.subsumer_candidates(&ctx.bank, &unit).count(), 0);

        let eq = ctx.clause(vec![Literal::equation(true, a, a)]);
        index.insert_demodulator(&ctx.bank, &eq).unwrap();
        assert_eq!(index.demodulator_candidates(&ctx.bank, a).count(), 0);
        assert_eq!(index.stats().demodulators, 1);
        assert!(index.delete_entry(eq.id));
    }

    #[test]
    fn test_members_in_insertion_order() {
        let mut ctx = TestCtx::new();
        let a = ctx.t("a", &[]);
        let b = ctx.t("b", &[]);
        let mut index = EsIndex::new(&IndexConfig::default());
        let mut ids = Vec::new();
        for t in [b, a, b] {
            let lit = ctx.atom(false, "q", t);
            let c = ctx.clause(vec![lit]);
            index.insert_clause(&ctx.bank, &c);
            ids.push(c.id);
        }
        index.delete_entry(ids[1]);
        let order: Vec<ClauseId> = index.members().map(|(id, _)| id).collect();
        assert_eq!(order, vec![ids[0], ids[2]]);
        assert_eq!(index.len(), 2);
    }

    #[test]
    #[should_panic(expected = "inserted twice")]
    fn test_double_insert_is_fatal() {
        let mut ctx = TestCtx::new();
        let a = ctx.t("a", &[]);
        let pa = ctx.atom(true, "p", a);
        let c = ctx.clause(vec![pa]);
        let mut index = EsIndex::new(&IndexConfig::default());
        index.insert_clause(&ctx.bank, &c);
        index.insert_clause(&ctx.bank, &c);
    }

    #[test]
    #[should_panic(expected = "cached weight")]
    fn test_stale_weight_is_fatal() {
        let mut ctx = TestCtx::new();
        let a = ctx.t("a", &[]);
        let fa = ctx.t("f", &[a]);
        let pa = ctx.atom(true, "p", a);
        let qa = ctx.atom(true, "q", a);
        let mut c = ctx.clause(vec![pa, qa]);
        c.literals_mut()[0] = ctx.atom(true, "p", fa);
        EsIndex::new(&IndexConfig::default()).insert_clause(&ctx.bank, &c);
    }
}
