//! Configuration types.
//!
//! Everything is deserializable from JSON and every field has a default, so
//! a config file only needs to mention what it changes:
//!
//! ```json
//! { "ordering": { "precedence": "arity", "weights": "first_maximal0" },
//!   "index": { "fingerprint": "fp4" } }
//! ```

use crate::error::{Result, TermIndexError};
use crate::index::feature_vector::FeatureSpec;
use crate::index::fingerprint::FingerprintSpec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Top-level configuration for one proof attempt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub ordering: OrderingConfig,
    pub index: IndexConfig,
    pub standard_weights: StandardWeights,
}

impl CoreConfig {
    /// Parse a configuration from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: CoreConfig = serde_json::from_str(json)?;
        config.standard_weights.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

// =============================================================================
// Standard weights
// =============================================================================

/// Per-symbol and per-variable unit used for position addressing.
///
/// Independent from the KBO weight function. Both units must be positive and
/// a variable may not outweigh a function symbol, otherwise an instance could
/// be lighter than its pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StandardWeights {
    pub function: u64,
    pub variable: u64,
}

impl Default for StandardWeights {
    fn default() -> Self {
        StandardWeights {
            function: 2,
            variable: 1,
        }
    }
}

impl StandardWeights {
    pub fn validate(&self) -> Result<()> {
        if self.variable == 0 || self.function == 0 {
            return Err(TermIndexError::InvalidConfig(
                "standard weights must be positive".into(),
            ));
        }
        if self.variable > self.function {
            return Err(TermIndexError::InvalidConfig(format!(
                "standard variable weight {} exceeds function weight {}",
                self.variable, self.function
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Ordering
// =============================================================================

/// How the symbol precedence is generated.
///
/// Ties are always broken by declaration order (later declared is greater),
/// so every scheme yields a total order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrecedenceScheme {
    /// Later declared symbols are greater
    Declaration,
    /// Higher arity is greater
    #[default]
    Arity,
    /// Lower arity is greater
    InvArity,
    /// Constants are greater than everything else
    ConstMax,
    /// Unary function symbols are greater than everything else
    UnaryFirst,
    /// More frequent symbols (over a clause sample) are greater
    Frequency,
    /// Less frequent symbols are greater
    InvFrequency,
}

/// How KBO symbol weights are generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightScheme {
    /// Every symbol weighs 1
    #[default]
    Constant,
    /// Use the per-symbol weights stored in the signature
    Signature,
    /// arity + 1
    Arity,
    /// Like `Constant`, but the precedence-maximal unary function weighs 0
    FirstMaximal0,
}

/// Configuration of the ordering control block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderingConfig {
    pub precedence: PrecedenceScheme,
    pub weights: WeightScheme,
    /// Weight of every variable (must be positive)
    pub variable_weight: i64,
    /// Symbol names placed above all scheme-ordered symbols, lowest first
    pub precedence_override: Vec<String>,
    /// Explicit symbol weights, winning over the scheme
    pub weight_override: BTreeMap<String, i64>,
}

impl Default for OrderingConfig {
    fn default() -> Self {
        OrderingConfig {
            precedence: PrecedenceScheme::default(),
            weights: WeightScheme::default(),
            variable_weight: 1,
            precedence_override: Vec::new(),
            weight_override: BTreeMap::new(),
        }
    }
}

// =============================================================================
// Indexing
// =============================================================================

/// Which sub-indices the aggregate index creates, and how they are keyed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub feature_vectors: bool,
    pub unit_clauses: bool,
    pub demodulators: bool,
    pub features: FeatureSpec,
    pub fingerprint: FingerprintSpec,
}

impl Default for IndexConfig {
    fn default() -> Self {
        IndexConfig {
            feature_vectors: true,
            unit_clauses: true,
            demodulators: true,
            features: FeatureSpec::default(),
            fingerprint: FingerprintSpec::default(),
        }
    }
}
