//! Induction-variable facts port
//!
//! The induction-variable analysis is an external collaborator. The classifier
//! only asks it three things: is this PHI an induction variable, is it a
//! periodic variable, and which IV (if any) governs the loop's trip count.

use crate::shared::models::{InstId, Operand};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Closed-form recurrence `phi = start + k * step`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InductionVariableInfo {
    pub phi: InstId,
    pub start: Operand,
    pub step: Operand,
    /// Instructions computing the next value (the back-edge update chain)
    pub updates: Vec<InstId>,
}

/// Bounded-period recurrence: entry value, period and step are static
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodicVariableInfo {
    pub phi: InstId,
    pub initial: Operand,
    pub period: Operand,
    pub step: Operand,
}

/// Queries the classifier needs from the induction-variable analysis
pub trait InductionFactsPort {
    fn induction_variable(&self, phi: InstId) -> Option<&InductionVariableInfo>;

    fn periodic_variable(&self, phi: InstId) -> Option<&PeriodicVariableInfo>;

    /// PHI of the IV whose closed-form trip count is known before loop entry
    fn governing_iv(&self) -> Option<InstId>;

    fn is_iv_governed(&self) -> bool {
        self.governing_iv().is_some()
    }
}

/// In-memory facts table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InductionFacts {
    #[serde(default)]
    pub induction_variables: Vec<InductionVariableInfo>,
    #[serde(default)]
    pub periodic_variables: Vec<PeriodicVariableInfo>,
    #[serde(default)]
    pub governing_iv: Option<InstId>,
    #[serde(skip)]
    iv_index: FxHashMap<InstId, usize>,
    #[serde(skip)]
    periodic_index: FxHashMap<InstId, usize>,
}

impl InductionFacts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_induction_variable(mut self, iv: InductionVariableInfo) -> Self {
        self.induction_variables.push(iv);
        self.reindex();
        self
    }

    pub fn with_periodic_variable(mut self, pv: PeriodicVariableInfo) -> Self {
        self.periodic_variables.push(pv);
        self.reindex();
        self
    }

    /// Mark `phi` as the loop-governing IV
    pub fn governed_by(mut self, phi: InstId) -> Self {
        self.governing_iv = Some(phi);
        self
    }

    /// Rebuild lookup tables (needed after deserialization)
    pub fn reindex(&mut self) {
        self.iv_index = self
            .induction_variables
            .iter()
            .enumerate()
            .map(|(i, iv)| (iv.phi, i))
            .collect();
        self.periodic_index = self
            .periodic_variables
            .iter()
            .enumerate()
            .map(|(i, pv)| (pv.phi, i))
            .collect();
    }
}

impl InductionFactsPort for InductionFacts {
    fn induction_variable(&self, phi: InstId) -> Option<&InductionVariableInfo> {
        match self.iv_index.get(&phi) {
            Some(&i) => self.induction_variables.get(i),
            None => self.induction_variables.iter().find(|iv| iv.phi == phi),
        }
    }

    fn periodic_variable(&self, phi: InstId) -> Option<&PeriodicVariableInfo> {
        match self.periodic_index.get(&phi) {
            Some(&i) => self.periodic_variables.get(i),
            None => self.periodic_variables.iter().find(|pv| pv.phi == phi),
        }
    }

    fn governing_iv(&self) -> Option<InstId> {
        self.governing_iv
    }
}
