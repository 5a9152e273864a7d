//! Error types for termindex
//!
//! Only recoverable conditions live here: configuration problems and
//! malformed requests. Index corruption (double insert, stale positions used
//! as if fresh, weight cache mismatches) is not recoverable and panics.

use thiserror::Error;
use std::io;

#[derive(Error, Debug)]
pub enum TermIndexError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("Arity mismatch for {symbol}: expected {expected}, got {found}")]
    ArityMismatch {
        symbol: String,
        expected: usize,
        found: usize,
    },

    #[error("Inadmissible ordering: {0}")]
    InadmissibleOrdering(String),

    #[error("Invalid position: {0}")]
    InvalidPosition(String),

    #[error("Not a demodulator: {0}")]
    NotADemodulator(String),
}

pub type Result<T> = std::result::Result<T, TermIndexError>;
