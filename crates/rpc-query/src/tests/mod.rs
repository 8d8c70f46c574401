//! Test module for rpc-query
//!
//! Property-based tests (proptest) for keys, filters and tree assembly, and
//! async tests for calls through a counting transport.


#[cfg(test)]
pub mod tree_tests;

#[cfg(test)]
pub mod call_tests;
