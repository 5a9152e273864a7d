//! Terms, literals, clauses and positions

pub mod clause;
pub mod literal;
pub mod position;
pub mod term;

#[cfg(test)]
mod proptest_tests;
