//! Subterm positions inside clauses and their compact integer encoding.
//!
//! A `ClausePos` names a subterm structurally: literal index, equation side
//! and a path of argument indices. A `CompactPos` folds the same address into
//! one integer, the standard weight of everything that precedes the subterm in
//! a left-to-right preorder walk of the clause:
//!
//! - every literal before the target contributes its standard weight
//! - on the right side, the left term contributes its weight
//! - each step into argument `i` contributes one function unit for the
//!   enclosing head plus the weights of arguments `0..i`
//!
//! Subterm ranges nest and never overlap, so the encoding is injective for a
//! fixed clause. It is only meaningful against the exact clause it was
//! computed from; any mutation of the clause invalidates it.

use super::clause::{Clause, ClauseId};
use super::literal::Side;
use super::term::{TermBank, TermId};
use crate::error::{Result, TermIndexError};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::error;

/// Structural address of a subterm in a clause
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClausePos {
    pub clause: ClauseId,
    pub literal: usize,
    pub side: Side,
    /// Argument indices from the side's root
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<usize>,
}

/// Single-integer address of a subterm in a clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CompactPos(pub u64);

impl ClausePos {
    /// Position of the root of one side of a literal
    pub fn side_root(clause: ClauseId, literal: usize, side: Side) -> Self {
        ClausePos {
            clause,
            literal,
            side,
            path: Vec::new(),
        }
    }

    /// Resolve this position to the subterm it names
    pub fn subterm(&self, bank: &TermBank, clause: &Clause) -> Result<TermId> {
        let lit = clause
            .literal(self.literal)
            .ok_or_else(|| self.invalid("literal index out of range"))?;
        bank.subterm(lit.side(self.side), &self.path)
            .ok_or_else(|| self.invalid("argument index out of range"))
    }

    fn invalid(&self, why: &str) -> TermIndexError {
        TermIndexError::InvalidPosition(format!("{}: {}", self, why))
    }
}

impl fmt::Display for ClausePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = match self.side {
            Side::Left => "L",
            Side::Right => "R",
        };
        write!(f, "{}.{}.{}", self.clause, self.literal, side)?;
        for i in &self.path {
            write!(f, ".{}", i)?;
        }
        Ok(())
    }
}

/// Encode a structural position as a single integer
pub fn encode(bank: &TermBank, clause: &Clause, pos: &ClausePos) -> Result<CompactPos> {
    if pos.clause != clause.id {
        return Err(pos.invalid("position belongs to another clause"));
    }
    let lit = clause
        .literal(pos.literal)
        .ok_or_else(|| pos.invalid("literal index out of range"))?;

    let mut acc: u64 = clause.literals()[..pos.literal]
        .iter()
        .map(|l| l.standard_weight(bank))
        .sum();
    if pos.side == Side::Right {
        acc += bank.standard_weight(lit.lterm);
    }

    let unit = bank.standard_weights().function;
    let mut t = lit.side(pos.side);
    for &i in &pos.path {
        let args = bank.args(t);
        if i >= args.len() {
            return Err(pos.invalid("argument index out of range"));
        }
        acc += unit;
        acc += args[..i].iter().map(|&a| bank.standard_weight(a)).sum::<u64>();
        t = args[i];
    }
    Ok(CompactPos(acc))
}

/// Decode a compact position against the clause it was computed from
pub fn decode(bank: &TermBank, clause: &Clause, cpos: CompactPos) -> Result<ClausePos> {
    let invalid = |why: &str| {
        TermIndexError::InvalidPosition(format!("{} in {}: {}", cpos.0, clause.id, why))
    };

    let mut budget = cpos.0;
    let mut found = None;
    for (i, lit) in clause.literals().iter().enumerate() {
        let w = lit.standard_weight(bank);
        if budget < w {
            found = Some((i, lit));
            break;
        }
        budget -= w;
    }
    let (literal, lit) = found.ok_or_else(|| invalid("past the last literal"))?;

    let lw = bank.standard_weight(lit.lterm);
    let side = if budget < lw {
        Side::Left
    } else {
        budget -= lw;
        Side::Right
    };

    let unit = bank.standard_weights().function;
    let mut t = lit.side(side);
    let mut path = Vec::new();
    while budget > 0 {
        if bank.is_var(t) || budget < unit {
            return Err(invalid("inside a symbol"));
        }
        budget -= unit;
        let mut next = None;
        for (i, &arg) in bank.args(t).iter().enumerate() {
            let w = bank.standard_weight(arg);
            if budget < w {
                next = Some((i, arg));
                break;
            }
            budget -= w;
        }
        let (i, arg) = next.ok_or_else(|| invalid("past the last argument"))?;
        path.push(i);
        t = arg;
    }

    Ok(ClausePos {
        clause: clause.id,
        literal,
        side,
        path,
    })
}

/// Decode a compact position this caller issued itself.
///
/// # Panics
///
/// Panics if the value does not decode, which means the clause was mutated
/// after the position was encoded.
pub fn decode_expect(bank: &TermBank, clause: &Clause, cpos: CompactPos) -> ClausePos {
    match decode(bank, clause, cpos) {
        Ok(pos) => pos,
        Err(e) => {
            error!(clause = %clause.id, cpos = cpos.0, error = %e, "stale compact position");
            panic!("stale compact position {} for clause {}: {}", cpos.0, clause.id, e);
        }
    }
}

/// Enumerate every position of a clause in increasing compact order
pub fn positions<'a>(bank: &'a TermBank, clause: &'a Clause) -> Positions<'a> {
    Positions {
        bank,
        clause,
        next_side: 0,
        base: 0,
        stack: Vec::new(),
    }
}

/// Lazy preorder walk over all subterm positions of a clause
pub struct Positions<'a> {
    bank: &'a TermBank,
    clause: &'a Clause,
    /// Index of the next literal side to open, two per literal
    next_side: usize,
    /// Compact offset of the next side root
    base: u64,
    /// Pending subterms: (term, literal, side, path, offset)
    stack: Vec<(TermId, usize, Side, Vec<usize>, u64)>,
}

impl<'a> Iterator for Positions<'a> {
    type Item = (ClausePos, CompactPos);

    fn next(&mut self) -> Option<Self::Item> {
        let bank = self.bank;
        if self.stack.is_empty() {
            let literal = self.next_side / 2;
            let lit = self.clause.literal(literal)?;
            let side = if self.next_side % 2 == 0 {
                Side::Left
            } else {
                Side::Right
            };
            let root = lit.side(side);
            self.stack.push((root, literal, side, Vec::new(), self.base));
            self.base += bank.standard_weight(root);
            self.next_side += 1;
        }

        let (t, literal, side, path, offset) = self.stack.pop()?;
        let unit = bank.standard_weights().function;
        let args = bank.args(t);
        let mut child_offsets = Vec::with_capacity(args.len());
        let mut off = offset + unit;
        for &arg in args {
            child_offsets.push(off);
            off += bank.standard_weight(arg);
        }
        for (i, (&arg, &off)) in args.iter().zip(&child_offsets).enumerate().rev() {
            let mut child_path = path.clone();
            child_path.push(i);
            self.stack.push((arg, literal, side, child_path, off));
        }

        let pos = ClausePos {
            clause: self.clause.id,
            literal,
            side,
            path,
        };
        Some((pos, CompactPos(offset)))
    }
}
