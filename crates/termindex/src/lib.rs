//! termindex: term ordering and clause indexing for saturation provers
//!
//! This library provides the pieces of a superposition prover's core that
//! sit between clause storage and inference:
//!
//! - a hash-consed term bank with equational literals and clauses
//! - a Knuth-Bendix ordering with a one-pass comparator
//! - compact single-integer positions of subterms in clauses
//! - subsumption and demodulation candidate indices

pub mod config;
pub mod error;
pub mod index;
pub mod logic;

pub use config::{
    CoreConfig, IndexConfig, OrderingConfig, PrecedenceScheme, StandardWeights, WeightScheme,
};
pub use error::{Result, TermIndexError};

pub use logic::{
    decode, decode_expect, encode, positions, Bindings, Clause, ClauseId, ClausePos, CompactPos,
    CompareResult, DerefMode, Head, Kbo, Literal, Ocb, Side, Signature, SymbolId, TermBank,
    TermId, VariableId,
};

pub use index::{
    Candidates, DemodEntry, Direction, EsIndex, FeatureSpec, FingerprintSpec, FpMode, FvIndex,
    IndexStats, Membership, PdTree, Placement, UnitClauseIndex,
};
