//! Term fingerprints.
//!
//! A fingerprint samples a term at a fixed list of positions. Comparing two
//! fingerprints position by position rules out most pairs of terms that
//! cannot match, without looking at the terms themselves.

use crate::logic::{Head, SymbolId, TermBank, TermId};
use serde::{Deserialize, Serialize};

/// What a term has at a sampled position
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum FpSample {
    /// A symbol sits at the position
    Symbol(SymbolId),
    /// A variable sits at the position
    Variable,
    /// The position is below a variable
    BelowVariable,
    /// The position does not exist and no variable is above it
    NotPresent,
}

/// Sample set used for fingerprints.
///
/// Positions are argument paths from the root; `[]` is the root itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FingerprintSpec {
    /// Root, both arguments and the first grandchild
    Fp4,
    /// Root, both arguments and all four grandchildren below them
    #[default]
    Fp7,
    /// `Fp7` plus the third argument
    Fp8,
}

const FP4: &[&[usize]] = &[&[], &[0], &[1], &[0, 0]];
const FP7: &[&[usize]] = &[&[], &[0], &[1], &[0, 0], &[0, 1], &[1, 0], &[1, 1]];
const FP8: &[&[usize]] = &[&[], &[0], &[1], &[2], &[0, 0], &[0, 1], &[1, 0], &[1, 1]];

impl FingerprintSpec {
    pub fn paths(self) -> &'static [&'static [usize]] {
        match self {
            FingerprintSpec::Fp4 => FP4,
            FingerprintSpec::Fp7 => FP7,
            FingerprintSpec::Fp8 => FP8,
        }
    }

    /// Number of samples per term
    pub fn len(self) -> usize {
        self.paths().len()
    }

    pub fn is_empty(self) -> bool {
        self.paths().is_empty()
    }

    /// Append the fingerprint of `t` to `out`
    pub fn fingerprint_into(self, bank: &TermBank, t: TermId, out: &mut Vec<FpSample>) {
        out.extend(self.paths().iter().map(|path| sample(bank, t, path)));
    }

    pub fn fingerprint(self, bank: &TermBank, t: TermId) -> Vec<FpSample> {
        let mut out = Vec::with_capacity(self.len());
        self.fingerprint_into(bank, t, &mut out);
        out
    }
}

/// Sample `t` at an argument path
pub fn sample(bank: &TermBank, t: TermId, path: &[usize]) -> FpSample {
    let mut current = t;
    for &i in path {
        if bank.is_var(current) {
            return FpSample::BelowVariable;
        }
        match bank.args(current).get(i) {
            Some(&arg) => current = arg,
            None => return FpSample::NotPresent,
        }
    }
    match bank.head(current) {
        Head::Var(_) => FpSample::Variable,
        Head::Sym(f) => FpSample::Symbol(f),
    }
}

/// Which side of a fingerprint comparison may be instantiated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FpMode {
    /// Indexed terms that may be generalizations of the query
    Generalizations,
    /// Indexed terms that may be instances of the query
    Instances,
}

/// Whether the sample of an indexed term is compatible with the sample of a
/// query term at the same position.
pub fn compatible(mode: FpMode, indexed: FpSample, query: FpSample) -> bool {
    match mode {
        FpMode::Generalizations => could_match(indexed, query),
        FpMode::Instances => could_match(query, indexed),
    }
}

/// Whether a pattern with sample `pattern` can be instantiated to a term with
/// sample `instance` at the same position. Variables in the instance are
/// rigid.
fn could_match(pattern: FpSample, instance: FpSample) -> bool {
    use FpSample::*;
    match (pattern, instance) {
        (BelowVariable, _) => true,
        (Variable, Symbol(_) | Variable) => true,
        (Variable, _) => false,
        (Symbol(f), Symbol(g)) => f == g,
        (Symbol(_), _) => false,
        (NotPresent, NotPresent) => true,
        (NotPresent, _) => false,
    }
}
