//! First-order term layer and the Knuth-Bendix ordering
//!
//! This module provides the shared term bank, equational literals, clauses,
//! compact subterm positions and the KBO comparator built on top of them.

pub mod core;
pub mod interner;
pub mod ordering;

// Re-export commonly used types
pub use core::clause::{Clause, ClauseDisplay, ClauseId};
pub use core::literal::{Literal, LiteralDisplay, Side};
pub use core::position::{decode, decode_expect, encode, positions, ClausePos, CompactPos, Positions};
pub use core::term::{Bindings, DerefMode, Head, TermBank, TermDisplay, TermId};
pub use interner::{Signature, SymbolId, SymbolInfo, VariableId};
pub use ordering::{CompareResult, Kbo, Ocb};
