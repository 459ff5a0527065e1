//! SCC Attributes - dependence-pattern classification of SCCs
//!
//! Each SCC gets exactly one tag. Tags are a closed variant carrying the
//! kind-specific payload (entry value, period, step, reduction operator) and
//! are dispatched with exhaustive `match`.

pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use domain::{ReductionOperator, SccAttributes, SccClassification, SccKind};
pub use infrastructure::{ClassifierContext, SccClassifier};
pub use ports::{InductionFacts, InductionFactsPort, InductionVariableInfo, PeriodicVariableInfo};
