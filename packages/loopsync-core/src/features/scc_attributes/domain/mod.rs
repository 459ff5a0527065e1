//! SCC attribute tags

use crate::errors::{ConsistencyViolation, Result};
use crate::shared::models::{InstId, Opcode, Operand, SccId};
use serde::{Deserialize, Serialize};

/// Commutative and associative operator of a reducible accumulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReductionOperator {
    Add,
    Mul,
    And,
    Or,
    Xor,
    FAdd,
    FMul,
}

impl ReductionOperator {
    /// Operator class of an update instruction.
    ///
    /// `acc_is_lhs` tells whether the accumulator chain enters through the
    /// first operand; subtraction is only reducible in that position
    /// (`acc - x1 - x2 == acc - (x1 + x2)`).
    pub fn of(opcode: Opcode, acc_is_lhs: bool) -> Option<Self> {
        match opcode {
            Opcode::Add => Some(Self::Add),
            Opcode::Sub if acc_is_lhs => Some(Self::Add),
            Opcode::Mul => Some(Self::Mul),
            Opcode::And => Some(Self::And),
            Opcode::Or => Some(Self::Or),
            Opcode::Xor => Some(Self::Xor),
            Opcode::FAdd => Some(Self::FAdd),
            Opcode::FSub if acc_is_lhs => Some(Self::FAdd),
            Opcode::FMul => Some(Self::FMul),
            _ => None,
        }
    }

    pub fn is_floating_point(&self) -> bool {
        matches!(self, Self::FAdd | Self::FMul)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Mul => "mul",
            Self::And => "and",
            Self::Or => "or",
            Self::Xor => "xor",
            Self::FAdd => "fadd",
            Self::FMul => "fmul",
        }
    }
}

/// Dependence pattern of one SCC. Immutable once computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SccAttributes {
    /// Closed-form recurrence, step known at loop entry
    InductionVariable {
        phi: InstId,
        start: Operand,
        step: Operand,
    },

    /// Bounded-period variant of an induction; recomputable by each replica
    PeriodicVariable {
        phi: InstId,
        initial: Operand,
        period: Operand,
        step: Operand,
    },

    /// Re-associable reduction, combinable after the loop
    ReducibleAccumulator {
        phi: InstId,
        operator: ReductionOperator,
        initial: Operand,
    },

    /// Values only feed control decisions of an IV-governed loop
    ControlOnly,

    /// Must preserve original iteration order
    Sequential,
}

/// Payload-free view of `SccAttributes`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SccKind {
    InductionVariable,
    PeriodicVariable,
    ReducibleAccumulator,
    ControlOnly,
    Sequential,
}

impl SccKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SccKind::InductionVariable => "induction_variable",
            SccKind::PeriodicVariable => "periodic_variable",
            SccKind::ReducibleAccumulator => "reducible_accumulator",
            SccKind::ControlOnly => "control_only",
            SccKind::Sequential => "sequential",
        }
    }
}

impl SccAttributes {
    pub fn kind(&self) -> SccKind {
        match self {
            SccAttributes::InductionVariable { .. } => SccKind::InductionVariable,
            SccAttributes::PeriodicVariable { .. } => SccKind::PeriodicVariable,
            SccAttributes::ReducibleAccumulator { .. } => SccKind::ReducibleAccumulator,
            SccAttributes::ControlOnly => SccKind::ControlOnly,
            SccAttributes::Sequential => SccKind::Sequential,
        }
    }

    pub fn is_induction_variable(&self) -> bool {
        matches!(self, SccAttributes::InductionVariable { .. })
    }

    pub fn is_sequential(&self) -> bool {
        matches!(self, SccAttributes::Sequential)
    }

    /// Periodic variables and reducible accumulators can be recomputed or
    /// combined per replica instead of being ordered
    pub fn is_recomputable(&self) -> bool {
        matches!(
            self,
            SccAttributes::PeriodicVariable { .. } | SccAttributes::ReducibleAccumulator { .. }
        )
    }

    /// The recurrence PHI, for tags that have one
    pub fn phi(&self) -> Option<InstId> {
        match self {
            SccAttributes::InductionVariable { phi, .. }
            | SccAttributes::PeriodicVariable { phi, .. }
            | SccAttributes::ReducibleAccumulator { phi, .. } => Some(*phi),
            SccAttributes::ControlOnly | SccAttributes::Sequential => None,
        }
    }
}

/// Tags of every node of one SCCDAG, indexed by `SccId`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SccClassification {
    tags: Vec<SccAttributes>,
}

impl SccClassification {
    pub(crate) fn from_tags(tags: Vec<SccAttributes>) -> Self {
        Self { tags }
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn get(&self, scc: SccId) -> Option<&SccAttributes> {
        self.tags.get(scc.index())
    }

    /// Tag lookup; a missing tag is an internal consistency violation
    pub fn expect(&self, scc: SccId) -> Result<&SccAttributes> {
        self.get(scc)
            .ok_or_else(|| ConsistencyViolation::UnclassifiableScc { scc }.into())
    }

    pub fn iter(&self) -> impl Iterator<Item = (SccId, &SccAttributes)> + '_ {
        self.tags
            .iter()
            .enumerate()
            .map(|(i, t)| (SccId::from_index(i), t))
    }

    pub fn count(&self, kind: SccKind) -> usize {
        self.tags.iter().filter(|t| t.kind() == kind).count()
    }
}
