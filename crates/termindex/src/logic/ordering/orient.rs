//! Literal ordering, equation orientation and maximal literals
//!
//! Literals are compared as multisets of their sides: `{l, r}` for a
//! positive literal and `{l, l, r, r}` for a negative one, so a negative
//! literal beats the positive literal over the same equation.

use super::{CompareResult, Kbo};
use crate::logic::core::clause::Clause;
use crate::logic::core::literal::Literal;
use crate::logic::core::term::{TermBank, TermId};
use tracing::trace;

fn literal_multiset(lit: &Literal) -> Vec<TermId> {
    if lit.positive {
        vec![lit.lterm, lit.rterm]
    } else {
        vec![lit.lterm, lit.lterm, lit.rterm, lit.rterm]
    }
}

impl Kbo {
    /// Compare two literals with the multiset extension of the term ordering
    pub fn compare_literals(&mut self, bank: &TermBank, a: &Literal, b: &Literal) -> CompareResult {
        self.compare_multisets(bank, literal_multiset(a), literal_multiset(b))
    }

    fn compare_multisets(
        &mut self,
        bank: &TermBank,
        mut m: Vec<TermId>,
        mut n: Vec<TermId>,
    ) -> CompareResult {
        // Shared terms are syntactically equal, cancel them first
        let mut i = 0;
        while i < m.len() {
            match n.iter().position(|&u| u == m[i]) {
                Some(j) => {
                    n.swap_remove(j);
                    m.swap_remove(i);
                }
                None => i += 1,
            }
        }

        match (m.is_empty(), n.is_empty()) {
            (true, true) => return CompareResult::Equal,
            (false, true) => return CompareResult::Greater,
            (true, false) => return CompareResult::Lesser,
            _ => {}
        }

        let mut table = Vec::with_capacity(m.len());
        for &s in &m {
            let row: Vec<CompareResult> = n.iter().map(|&t| self.compare(bank, s, t)).collect();
            table.push(row);
        }
        let m_dominates = (0..n.len()).all(|j| table.iter().any(|row| row[j] == CompareResult::Greater));
        if m_dominates {
            return CompareResult::Greater;
        }
        let n_dominates = table
            .iter()
            .all(|row| row.iter().any(|&r| r == CompareResult::Lesser));
        if n_dominates {
            return CompareResult::Lesser;
        }
        CompareResult::Uncomparable
    }

    /// Put the greater side of an equation on the left.
    ///
    /// Sets `oriented` iff one side is strictly greater. Non-equational atoms
    /// are always oriented. Returns the new `oriented` flag.
    pub fn orient_literal(&mut self, bank: &TermBank, lit: &mut Literal) -> bool {
        if !lit.is_equational(bank) {
            lit.oriented = true;
            return true;
        }
        lit.oriented = match self.compare(bank, lit.lterm, lit.rterm) {
            CompareResult::Greater => true,
            CompareResult::Lesser => {
                lit.swap_sides();
                true
            }
            CompareResult::Equal | CompareResult::Uncomparable => false,
        };
        lit.oriented
    }

    /// Orient every literal of a clause and refresh its weight cache
    pub fn orient_clause(&mut self, bank: &TermBank, clause: &mut Clause) {
        let mut oriented = 0;
        for lit in clause.literals_mut() {
            if self.orient_literal(bank, lit) {
                oriented += 1;
            }
        }
        clause.refresh_weight(bank);
        trace!(clause = %clause.id, oriented, "clause oriented");
    }

    /// Flag every literal that no other literal of the clause dominates
    pub fn mark_maximal_literals(&mut self, bank: &TermBank, clause: &mut Clause) {
        let lits = clause.literals();
        let mut maximal = vec![true; lits.len()];
        for i in 0..lits.len() {
            for j in 0..lits.len() {
                if i != j && self.compare_literals(bank, &lits[j], &lits[i]) == CompareResult::Greater {
                    maximal[i] = false;
                    break;
                }
            }
        }
        for (lit, flag) in clause.literals_mut().iter_mut().zip(maximal) {
            lit.maximal = flag;
        }
    }
}
