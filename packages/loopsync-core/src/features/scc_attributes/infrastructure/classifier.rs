//! SCC classifier
//!
//! Rules are tried in a fixed precedence and the first match wins:
//!
//! 1. InductionVariable - IV PHI plus its update chain (plus exit compare and
//!    branch when that IV governs the loop), step loop-invariant
//! 2. PeriodicVariable - periodic PHI plus side-effect free arithmetic
//! 3. ReducibleAccumulator - one header PHI, one commutative-associative
//!    operator, no intermediate value escaping into the loop
//! 4. ControlOnly - IV-governed loop, values only reach control instructions,
//!    after the loop included
//! 5. Sequential - everything else
//!
//! Classification is a pure function of (SCC, SCCDAG, function, loop, facts).

use crate::features::scc_attributes::domain::{
    ReductionOperator, SccAttributes, SccClassification, SccKind,
};
use crate::features::scc_attributes::ports::InductionFactsPort;
use crate::config::ClassifierConfig;
use crate::errors::{ConsistencyViolation, Result};
use crate::features::dependence::DependenceKind;
use crate::features::loop_structure::LoopStructure;
use crate::features::sccdag::{Scc, SccDag};
use crate::shared::models::{Function, InstId, Opcode, SccId};

/// Static loop facts the classifier reads
pub struct ClassifierContext<'a> {
    pub func: &'a Function,
    pub lp: &'a LoopStructure,
    pub dag: &'a SccDag,
    pub facts: &'a dyn InductionFactsPort,
}

#[derive(Debug, Clone, Default)]
pub struct SccClassifier {
    config: ClassifierConfig,
}

impl SccClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// Classify every node of the SCCDAG
    pub fn classify_all(&self, cx: &ClassifierContext<'_>) -> Result<SccClassification> {
        let tags = cx
            .dag
            .nodes()
            .iter()
            .map(|scc| self.classify(scc.id(), cx))
            .collect::<Result<Vec<_>>>()?;
        let classification = SccClassification::from_tags(tags);
        tracing::debug!(
            loop_id = %cx.dag.loop_id(),
            sccs = classification.len(),
            sequential = classification.count(SccKind::Sequential),
            "sccs classified"
        );
        Ok(classification)
    }

    /// Assign exactly one tag to `id`
    pub fn classify(&self, id: SccId, cx: &ClassifierContext<'_>) -> Result<SccAttributes> {
        let scc = cx
            .dag
            .scc(id)
            .ok_or(ConsistencyViolation::UnclassifiableScc { scc: id })?;

        if let Some(tag) = self.induction_variable(scc, cx) {
            return Ok(tag);
        }
        if let Some(tag) = self.periodic_variable(scc, cx) {
            return Ok(tag);
        }
        if let Some(tag) = self.reducible_accumulator(scc, cx) {
            return Ok(tag);
        }
        if self.is_control_only(scc, cx) {
            return Ok(SccAttributes::ControlOnly);
        }
        Ok(SccAttributes::Sequential)
    }

    fn induction_variable(&self, scc: &Scc, cx: &ClassifierContext<'_>) -> Option<SccAttributes> {
        scc.phis(cx.func).find_map(|phi| {
            let iv = cx.facts.induction_variable(phi)?;
            if !cx.lp.is_invariant_operand(&iv.step) {
                return None;
            }
            let governing = cx.facts.governing_iv() == Some(phi);
            let closed = scc.members().iter().all(|&m| {
                m == phi
                    || iv.updates.contains(&m)
                    || (governing && opcode(cx.func, m).map_or(false, |op| op.is_control()))
            });
            closed.then(|| SccAttributes::InductionVariable {
                phi,
                start: iv.start,
                step: iv.step,
            })
        })
    }

    fn periodic_variable(&self, scc: &Scc, cx: &ClassifierContext<'_>) -> Option<SccAttributes> {
        scc.phis(cx.func).find_map(|phi| {
            let pv = cx.facts.periodic_variable(phi)?;
            let pure = scc.members().iter().all(|&m| {
                m == phi
                    || opcode(cx.func, m).map_or(false, |op| {
                        op.is_binary_arith() || op.is_compare() || op == Opcode::Select
                    })
            });
            pure.then(|| SccAttributes::PeriodicVariable {
                phi,
                initial: pv.initial,
                period: pv.period,
                step: pv.step,
            })
        })
    }

    fn reducible_accumulator(
        &self,
        scc: &Scc,
        cx: &ClassifierContext<'_>,
    ) -> Option<SccAttributes> {
        let mut phis = scc.phis(cx.func);
        let phi = phis.next()?;
        if phis.next().is_some() || scc.len() < 2 {
            return None;
        }
        let phi_inst = cx.func.inst(phi)?;
        if phi_inst.block != cx.lp.header() {
            return None;
        }

        if scc
            .internal_edges()
            .iter()
            .any(|e| e.kind != DependenceKind::Data)
        {
            return None;
        }

        let mut operator: Option<ReductionOperator> = None;
        for &member in scc.members() {
            if member == phi {
                continue;
            }
            let inst = cx.func.inst(member)?;
            let in_scc: Vec<usize> = inst
                .operands
                .iter()
                .enumerate()
                .filter(|(_, op)| op.as_inst().map_or(false, |d| scc.contains(d)))
                .map(|(pos, _)| pos)
                .collect();
            if in_scc.len() != 1 {
                return None;
            }
            let class = ReductionOperator::of(inst.opcode, in_scc[0] == 0)?;
            if class.is_floating_point() && !self.config.allow_fp_reassociation {
                return None;
            }
            match operator {
                None => operator = Some(class),
                Some(existing) if existing == class => {}
                Some(_) => return None,
            }
        }

        // intermediate values must not be observed elsewhere in the loop
        if cx
            .dag
            .outgoing_dependences(scc.id())
            .iter()
            .any(|e| e.kind.carries_value())
        {
            return None;
        }

        let mut outside = phi_inst
            .incoming()
            .filter(|(block, _)| !cx.lp.contains_block(*block));
        let (_, initial) = outside.next()?;
        if outside.next().is_some() {
            return None;
        }
        let latch_values_in_scc = phi_inst
            .incoming()
            .filter(|(block, _)| cx.lp.contains_block(*block))
            .all(|(_, value)| value.as_inst().map_or(false, |v| scc.contains(v)));
        if !latch_values_in_scc {
            return None;
        }

        Some(SccAttributes::ReducibleAccumulator {
            phi,
            operator: operator?,
            initial: *initial,
        })
    }

    fn is_control_only(&self, scc: &Scc, cx: &ClassifierContext<'_>) -> bool {
        if !cx.facts.is_iv_governed() {
            return false;
        }
        let side_effects = scc
            .members()
            .iter()
            .any(|&m| opcode(cx.func, m).map_or(true, |op| op.has_side_effects()));
        if side_effects {
            return false;
        }
        let in_loop = cx
            .dag
            .outgoing_dependences(scc.id())
            .iter()
            .filter(|e| e.kind.carries_value())
            .all(|e| opcode(cx.func, e.to).map_or(false, |op| op.is_control()));
        // live-out values count as consumed unless a branch decision reads them
        in_loop
            && scc.members().iter().all(|&m| {
                cx.func
                    .users(m)
                    .into_iter()
                    .filter(|&user| !cx.lp.contains_inst(user))
                    .all(|user| opcode(cx.func, user).map_or(false, decides_branch))
            })
    }
}

fn decides_branch(op: Opcode) -> bool {
    op.is_compare() || matches!(op, Opcode::Br | Opcode::CondBr)
}

fn opcode(func: &Function, inst: InstId) -> Option<Opcode> {
    func.inst(inst).map(|i| i.opcode)
}
