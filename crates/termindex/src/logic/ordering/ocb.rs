//! Ordering control block: symbol precedence and KBO weights.

use super::CompareResult;
use crate::config::{OrderingConfig, PrecedenceScheme, WeightScheme};
use crate::error::{Result, TermIndexError};
use crate::logic::core::clause::Clause;
use crate::logic::core::term::{Head, TermBank};
use crate::logic::interner::{Signature, SymbolId};
use tracing::{error, info};

/// Precedence and weight function for the Knuth-Bendix ordering.
///
/// `$true` is always the smallest symbol and weighs as much as a variable.
/// Read-only once built.
#[derive(Debug, Clone)]
pub struct Ocb {
    /// Rank per symbol id, higher rank = greater
    ranks: Vec<u32>,
    weights: Vec<i64>,
    var_weight: i64,
}

impl Ocb {
    /// Build from the configured schemes.
    ///
    /// Frequency-based precedences see every symbol with count zero here and
    /// fall back to declaration order; use `with_sample` for them.
    pub fn new(sig: &Signature, cfg: &OrderingConfig) -> Result<Self> {
        Self::build(sig, cfg, &vec![0; sig.len()])
    }

    /// Build from the configured schemes, counting symbol occurrences over
    /// a clause sample for the frequency precedences
    pub fn with_sample<'a, I>(bank: &TermBank, cfg: &OrderingConfig, sample: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Clause>,
    {
        let sig = bank.signature();
        let mut counts = vec![0u64; sig.len()];
        let mut stack = Vec::new();
        for clause in sample {
            stack.extend(clause.term_roots());
            while let Some(t) = stack.pop() {
                if let Head::Sym(f) = bank.head(t) {
                    if f != SymbolId::TRUE {
                        counts[f.index()] += 1;
                    }
                }
                stack.extend(bank.args(t).iter().copied());
            }
        }
        Self::build(sig, cfg, &counts)
    }

    /// Build from an explicit precedence (lowest first, every symbol except
    /// `$true` exactly once) and explicit weights indexed by symbol id
    pub fn from_parts(
        sig: &Signature,
        precedence: &[SymbolId],
        weights: Vec<i64>,
        var_weight: i64,
    ) -> Result<Self> {
        let n = sig.len();
        if weights.len() != n {
            return Err(TermIndexError::InadmissibleOrdering(format!(
                "{} weights given for {} symbols",
                weights.len(),
                n
            )));
        }
        let mut ranks = vec![u32::MAX; n];
        ranks[SymbolId::TRUE.index()] = 0;
        for (i, &f) in precedence.iter().enumerate() {
            if f.index() >= n || ranks[f.index()] != u32::MAX {
                return Err(TermIndexError::InadmissibleOrdering(format!(
                    "precedence is not a permutation at {}",
                    f
                )));
            }
            ranks[f.index()] = i as u32 + 1;
        }
        if ranks.contains(&u32::MAX) {
            return Err(TermIndexError::InadmissibleOrdering(
                "precedence does not cover every symbol".into(),
            ));
        }
        let mut weights = weights;
        weights[SymbolId::TRUE.index()] = var_weight;
        let ocb = Ocb {
            ranks,
            weights,
            var_weight,
        };
        ocb.validate(sig)?;
        Ok(ocb)
    }

    fn build(sig: &Signature, cfg: &OrderingConfig, counts: &[u64]) -> Result<Self> {
        // Scheme order, lowest first; ties by declaration order
        let mut order: Vec<SymbolId> = sig
            .iter()
            .map(|(id, _)| id)
            .filter(|&id| id != SymbolId::TRUE)
            .collect();
        order.sort_by_key(|&f| (precedence_key(sig, cfg.precedence, counts, f), f));

        let mut overrides = Vec::with_capacity(cfg.precedence_override.len());
        for name in &cfg.precedence_override {
            let f = sig.require(name)?;
            if f == SymbolId::TRUE {
                return Err(TermIndexError::InadmissibleOrdering(
                    "$true cannot be moved in the precedence".into(),
                ));
            }
            if !overrides.contains(&f) {
                overrides.push(f);
            }
        }
        order.retain(|f| !overrides.contains(f));
        order.extend(overrides);

        let mut weights: Vec<i64> = sig
            .iter()
            .map(|(_, info)| match cfg.weights {
                WeightScheme::Constant | WeightScheme::FirstMaximal0 => 1,
                WeightScheme::Signature => info.weight,
                WeightScheme::Arity => info.arity as i64 + 1,
            })
            .collect();
        if cfg.weights == WeightScheme::FirstMaximal0 {
            if let Some(&top) = order.last() {
                let info = sig.info(top);
                if info.arity == 1 && !info.predicate {
                    weights[top.index()] = 0;
                }
            }
        }
        for (name, &w) in &cfg.weight_override {
            weights[sig.require(name)?.index()] = w;
        }

        let ocb = Self::from_parts(sig, &order, weights, cfg.variable_weight)?;
        info!(
            symbols = sig.len(),
            precedence = ?cfg.precedence,
            weights = ?cfg.weights,
            "ordering control block built"
        );
        Ok(ocb)
    }

    fn validate(&self, sig: &Signature) -> Result<()> {
        let bad = |msg: String| Err(TermIndexError::InadmissibleOrdering(msg));
        if self.var_weight <= 0 {
            return bad(format!("variable weight {} is not positive", self.var_weight));
        }
        if self.weights.len() > 1 && !self.weights[1..].iter().any(|&w| w > 0) {
            return bad("every symbol weighs zero".into());
        }
        let top = self.ranks.iter().copied().max().unwrap_or(0);
        for (f, info) in sig.iter() {
            let w = self.weight(f);
            if w < 0 {
                return bad(format!("symbol {} has negative weight {}", info.name, w));
            }
            if info.arity == 0 && w < self.var_weight {
                return bad(format!(
                    "constant {} weighs {} below the variable weight {}",
                    info.name, w, self.var_weight
                ));
            }
            if info.arity == 1 && w == 0 && self.rank(f) != top {
                return bad(format!(
                    "unary symbol {} has weight zero but is not maximal",
                    info.name
                ));
            }
        }
        Ok(())
    }

    /// Compare two symbols in the precedence
    pub fn precedence(&self, f: SymbolId, g: SymbolId) -> CompareResult {
        match self.rank(f).cmp(&self.rank(g)) {
            std::cmp::Ordering::Greater => CompareResult::Greater,
            std::cmp::Ordering::Less => CompareResult::Lesser,
            std::cmp::Ordering::Equal => CompareResult::Equal,
        }
    }

    pub fn rank(&self, f: SymbolId) -> u32 {
        match self.ranks.get(f.index()) {
            Some(&rank) => rank,
            None => unknown_symbol(f),
        }
    }

    pub fn weight(&self, f: SymbolId) -> i64 {
        match self.weights.get(f.index()) {
            Some(&weight) => weight,
            None => unknown_symbol(f),
        }
    }

    /// Whether every symbol of `sig` has a rank and a weight
    pub fn covers(&self, sig: &Signature) -> bool {
        sig.len() <= self.ranks.len()
    }

    pub fn var_weight(&self) -> i64 {
        self.var_weight
    }

    /// Symbols from lowest to highest precedence
    pub fn precedence_order(&self) -> Vec<SymbolId> {
        let mut order: Vec<SymbolId> = (0..self.ranks.len() as u32).map(SymbolId).collect();
        order.sort_by_key(|&f| self.rank(f));
        order
    }
}

#[cold]
fn unknown_symbol(f: SymbolId) -> ! {
    error!(symbol = %f, "symbol declared after the ordering was built");
    panic!("symbol {} was declared after the ordering was built", f);
}

fn precedence_key(
    sig: &Signature,
    scheme: PrecedenceScheme,
    counts: &[u64],
    f: SymbolId,
) -> (i64, i64) {
    let info = sig.info(f);
    let arity = info.arity as i64;
    let count = counts.get(f.index()).copied().unwrap_or(0) as i64;
    match scheme {
        PrecedenceScheme::Declaration => (0, 0),
        PrecedenceScheme::Arity => (arity, 0),
        PrecedenceScheme::InvArity => (-arity, 0),
        PrecedenceScheme::ConstMax => ((arity == 0 && !info.predicate) as i64, 0),
        PrecedenceScheme::UnaryFirst => (
            (arity == 1 && !info.predicate) as i64,
            info.unary_maximal as i64,
        ),
        PrecedenceScheme::Frequency => (count, 0),
        PrecedenceScheme::InvFrequency => (-count, 0),
    }
}
