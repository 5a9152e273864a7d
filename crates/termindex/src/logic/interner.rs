//! Symbol table for one proof attempt.
//!
//! Function symbols, constants and predicate symbols share a single
//! namespace and a single dense id space, so the ordering and the indices
//! can address per-symbol data with a plain `Vec` lookup:
//! - `SymbolId` is a `u32` index into the signature
//! - `VariableId` is a `u32` variable number, never interned by name
//!
//! Symbol 0 is always `$true`, the right-hand side of non-equational atoms.

use crate::error::{Result, TermIndexError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// ID of a symbol in the signature
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolId(pub(crate) u32);

/// Variable number
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VariableId(pub(crate) u32);

impl SymbolId {
    /// The reserved `$true` constant
    pub const TRUE: SymbolId = SymbolId(0);

    /// Get the raw ID value
    pub fn as_u32(self) -> u32 {
        self.0
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl VariableId {
    pub fn new(n: u32) -> Self {
        VariableId(n)
    }

    /// Get the raw ID value
    pub fn as_u32(self) -> u32 {
        self.0
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Metadata stored for each symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolInfo {
    pub name: String,
    pub arity: usize,
    /// Predicate symbols only occur at the top of an atom
    pub predicate: bool,
    /// Weight used by `WeightScheme::Signature`
    pub weight: i64,
    /// Requested on top of the precedence by `PrecedenceScheme::UnaryFirst`
    pub unary_maximal: bool,
}

/// Symbol table
#[derive(Debug, Clone)]
pub struct Signature {
    symbols: Vec<SymbolInfo>,
    lookup: HashMap<String, SymbolId>,
}

impl Default for Signature {
    fn default() -> Self {
        Self::new()
    }
}

impl Signature {
    /// Create a signature holding only `$true`
    pub fn new() -> Self {
        let mut sig = Signature {
            symbols: Vec::new(),
            lookup: HashMap::new(),
        };
        sig.push("$true", 0, true);
        sig
    }

    fn push(&mut self, name: &str, arity: usize, predicate: bool) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(SymbolInfo {
            name: name.to_string(),
            arity,
            predicate,
            weight: 1,
            unary_maximal: false,
        });
        self.lookup.insert(name.to_string(), id);
        id
    }

    fn declare(&mut self, name: &str, arity: usize, predicate: bool) -> Result<SymbolId> {
        if let Some(&id) = self.lookup.get(name) {
            let info = &self.symbols[id.index()];
            if info.arity != arity {
                return Err(TermIndexError::ArityMismatch {
                    symbol: name.to_string(),
                    expected: info.arity,
                    found: arity,
                });
            }
            if info.predicate != predicate {
                return Err(TermIndexError::InvalidConfig(format!(
                    "symbol {} declared both as function and predicate",
                    name
                )));
            }
            return Ok(id);
        }
        Ok(self.push(name, arity, predicate))
    }

    /// Declare a function symbol or constant (get-or-create)
    pub fn add_symbol(&mut self, name: &str, arity: usize) -> Result<SymbolId> {
        self.declare(name, arity, false)
    }

    /// Declare a predicate symbol (get-or-create)
    pub fn add_predicate(&mut self, name: &str, arity: usize) -> Result<SymbolId> {
        self.declare(name, arity, true)
    }

    /// Look up a symbol by name
    pub fn get(&self, name: &str) -> Option<SymbolId> {
        self.lookup.get(name).copied()
    }

    /// Look up a symbol by name, failing with `UnknownSymbol`
    pub fn require(&self, name: &str) -> Result<SymbolId> {
        self.get(name)
            .ok_or_else(|| TermIndexError::UnknownSymbol(name.to_string()))
    }

    pub fn info(&self, id: SymbolId) -> &SymbolInfo {
        &self.symbols[id.index()]
    }

    pub fn name(&self, id: SymbolId) -> &str {
        &self.symbols[id.index()].name
    }

    pub fn arity(&self, id: SymbolId) -> usize {
        self.symbols[id.index()].arity
    }

    pub fn is_predicate(&self, id: SymbolId) -> bool {
        self.symbols[id.index()].predicate
    }

    pub fn weight(&self, id: SymbolId) -> i64 {
        self.symbols[id.index()].weight
    }

    pub fn set_weight(&mut self, id: SymbolId, weight: i64) {
        self.symbols[id.index()].weight = weight;
    }

    pub fn set_unary_maximal(&mut self, id: SymbolId, flag: bool) {
        self.symbols[id.index()].unary_maximal = flag;
    }

    /// Iterate over all symbols in declaration order (including `$true`)
    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &SymbolInfo)> {
        self.symbols
            .iter()
            .enumerate()
            .map(|(i, info)| (SymbolId(i as u32), info))
    }

    /// Number of symbols (including `$true`)
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.0)
    }
}

impl fmt::Display for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "X{}", self.0)
    }
}
