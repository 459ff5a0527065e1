//! Shared models and utilities
//!
//! The IR model here is an adapter surface for the loop-analysis,
//! dependence-analysis and outlining collaborators. It carries exactly what the
//! segment synthesis needs and nothing more.

pub mod models;

#[cfg(test)]
pub(crate) mod testing;
