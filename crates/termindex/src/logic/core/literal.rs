//! Equational literals
//!
//! Every literal is an equation `l = r` or its negation. A non-equational
//! atom `P(t1..tn)` is encoded as `P(t1..tn) = $true`.

use super::term::{TermBank, TermId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Side of an equation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn flip(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// A literal `l = r` (positive) or `l != r` (negative)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Literal {
    pub positive: bool,
    pub lterm: TermId,
    pub rterm: TermId,
    /// Set when `lterm` is known to be strictly greater than `rterm`
    pub oriented: bool,
    /// Set by `Kbo::mark_maximal_literals`
    pub maximal: bool,
}

impl Literal {
    /// Create an unoriented equation or disequation
    pub fn equation(positive: bool, lterm: TermId, rterm: TermId) -> Self {
        Literal {
            positive,
            lterm,
            rterm,
            oriented: false,
            maximal: false,
        }
    }

    /// Create a non-equational literal from an atom term
    pub fn atom(bank: &TermBank, positive: bool, atom: TermId) -> Self {
        Literal {
            positive,
            lterm: atom,
            rterm: bank.true_term(),
            oriented: true,
            maximal: false,
        }
    }

    pub fn is_equational(&self, bank: &TermBank) -> bool {
        self.rterm != bank.true_term()
    }

    /// Positive equation between two real terms
    pub fn is_positive_equation(&self, bank: &TermBank) -> bool {
        self.positive && self.is_equational(bank)
    }

    pub fn side(&self, side: Side) -> TermId {
        match side {
            Side::Left => self.lterm,
            Side::Right => self.rterm,
        }
    }

    pub fn swap_sides(&mut self) {
        std::mem::swap(&mut self.lterm, &mut self.rterm);
    }

    /// Addressing weight of both sides
    pub fn standard_weight(&self, bank: &TermBank) -> u64 {
        bank.standard_weight(self.lterm) + bank.standard_weight(self.rterm)
    }

    pub fn display<'a>(&'a self, bank: &'a TermBank) -> LiteralDisplay<'a> {
        LiteralDisplay { literal: self, bank }
    }
}

/// Display wrapper for Literal that resolves symbol names
pub struct LiteralDisplay<'a> {
    literal: &'a Literal,
    bank: &'a TermBank,
}

impl<'a> fmt::Display for LiteralDisplay<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lit = self.literal;
        if !lit.is_equational(self.bank) {
            if !lit.positive {
                write!(f, "~")?;
            }
            return write!(f, "{}", self.bank.display(lit.lterm));
        }
        let op = if lit.positive { "=" } else { "!=" };
        write!(
            f,
            "{} {} {}",
            self.bank.display(lit.lterm),
            op,
            self.bank.display(lit.rterm)
        )
    }
}
