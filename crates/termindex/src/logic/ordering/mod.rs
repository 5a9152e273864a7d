//! Knuth-Bendix ordering
//!
//! - `ocb`: precedence and weight function, built once per proof attempt
//! - `kbo`: the one-pass comparator and its boolean fast path
//! - `orient`: literal comparison, equation orientation and maximality

pub mod kbo;
pub mod ocb;
pub mod orient;


pub use kbo::Kbo;
pub use ocb::Ocb;

/// Result of comparing two terms or literals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareResult {
    Greater,
    Lesser,
    Equal,
    Uncomparable,
}

impl CompareResult {
    /// Result of the comparison with the arguments swapped
    pub fn inverse(self) -> CompareResult {
        match self {
            CompareResult::Greater => CompareResult::Lesser,
            CompareResult::Lesser => CompareResult::Greater,
            other => other,
        }
    }
}
