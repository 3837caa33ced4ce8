//! Test module for reform-schema
//!
//! Property-based tests (proptest) and unit tests for coercers,
//! validators, the error tree, nodes and configuration.


#[cfg(test)]
pub mod config_tests;

#[cfg(test)]
pub mod error_tests;

#[cfg(test)]
pub mod node_tests;

#[cfg(test)]
pub mod validator_tests;
