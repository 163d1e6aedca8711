//! Property-based tests for key derivation and value ordering

mod keys;
mod ordering;
