//! Clauses

use super::literal::Literal;
use super::term::{TermBank, TermId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of a clause, assigned by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClauseId(pub u32);

/// A clause (disjunction of literals) with its cached standard weight.
///
/// The cache is computed by `Clause::new`. Code that mutates literals through
/// `literals_mut` must call `refresh_weight` afterwards; the aggregate index
/// refuses clauses whose cache is stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub id: ClauseId,
    literals: Vec<Literal>,
    weight: u64,
}

impl Clause {
    pub fn new(id: ClauseId, literals: Vec<Literal>, bank: &TermBank) -> Self {
        let weight = Self::weight_of(&literals, bank);
        Clause {
            id,
            literals,
            weight,
        }
    }

    fn weight_of(literals: &[Literal], bank: &TermBank) -> u64 {
        literals.iter().map(|l| l.standard_weight(bank)).sum()
    }

    pub fn literals(&self) -> &[Literal] {
        &self.literals
    }

    pub fn literals_mut(&mut self) -> &mut [Literal] {
        &mut self.literals
    }

    pub fn literal(&self, i: usize) -> Option<&Literal> {
        self.literals.get(i)
    }

    pub fn len(&self) -> usize {
        self.literals.len()
    }

    /// Check if this clause is empty (contradiction)
    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    pub fn is_unit(&self) -> bool {
        self.literals.len() == 1
    }

    /// Cached standard weight
    pub fn weight(&self) -> u64 {
        self.weight
    }

    /// Recompute the standard weight from the literals
    pub fn compute_weight(&self, bank: &TermBank) -> u64 {
        Self::weight_of(&self.literals, bank)
    }

    pub fn refresh_weight(&mut self, bank: &TermBank) {
        self.weight = self.compute_weight(bank);
    }

    /// Both sides of every literal
    pub fn term_roots(&self) -> impl Iterator<Item = TermId> + '_ {
        self.literals.iter().flat_map(|l| [l.lterm, l.rterm])
    }

    pub fn display<'a>(&'a self, bank: &'a TermBank) -> ClauseDisplay<'a> {
        ClauseDisplay { clause: self, bank }
    }
}

/// Display wrapper for Clause that resolves symbol names
pub struct ClauseDisplay<'a> {
    clause: &'a Clause,
    bank: &'a TermBank,
}

impl<'a> fmt::Display for ClauseDisplay<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.clause.is_empty() {
            return write!(f, "⊥");
        }
        for (i, lit) in self.clause.literals.iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{}", lit.display(self.bank))?;
        }
        Ok(())
    }
}

impl fmt::Display for ClauseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}
