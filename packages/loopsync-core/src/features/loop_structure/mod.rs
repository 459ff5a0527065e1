//! Natural loop description
//!
//! A `LoopStructure` is built once per loop and is read-only afterward. It
//! records the header, the ordered body blocks, the latches (blocks with a
//! back-edge to the header), the exit targets and which body instructions are
//! loop invariant.

use crate::errors::{LoopSyncError, Result};
use crate::shared::models::{BlockId, Function, InstId, LoopId, Opcode, Operand};
use rustc_hash::FxHashSet;
use std::collections::VecDeque;

/// One natural loop
#[derive(Debug, Clone)]
pub struct LoopStructure {
    id: LoopId,
    header: BlockId,
    blocks: Vec<BlockId>,
    block_set: FxHashSet<BlockId>,
    latches: Vec<BlockId>,
    exit_blocks: Vec<BlockId>,
    /// Body instructions in block order, then instruction order
    insts: Vec<InstId>,
    inst_set: FxHashSet<InstId>,
    invariants: FxHashSet<InstId>,
}

impl LoopStructure {
    /// Describe the loop formed by `blocks` (which must include `header`).
    ///
    /// Rejects shapes that are not natural loops: a body block other than the
    /// header with a predecessor outside the loop (header does not dominate
    /// it), a body block unreachable from the header, or no back-edge.
    pub fn new(func: &Function, id: LoopId, header: BlockId, blocks: Vec<BlockId>) -> Result<Self> {
        let mut block_set = FxHashSet::default();
        for &block in &blocks {
            func.expect_block(block)?;
            if !block_set.insert(block) {
                return Err(LoopSyncError::precondition(format!(
                    "{}: block {} listed twice",
                    id, block
                )));
            }
        }
        if !block_set.contains(&header) {
            return Err(LoopSyncError::precondition(format!(
                "{}: header {} is not part of the body",
                id, header
            )));
        }

        for &block in &blocks {
            if block == header {
                continue;
            }
            if let Some(outside) = func
                .predecessors(block)
                .into_iter()
                .find(|pred| !block_set.contains(pred))
            {
                return Err(LoopSyncError::precondition(format!(
                    "{}: {} is entered from {} outside the loop, header does not dominate it",
                    id, block, outside
                )));
            }
        }

        // every body block must be reachable from the header without leaving
        let mut seen = FxHashSet::default();
        let mut worklist = VecDeque::from([header]);
        seen.insert(header);
        while let Some(block) = worklist.pop_front() {
            for &succ in &func.expect_block(block)?.succs {
                if block_set.contains(&succ) && seen.insert(succ) {
                    worklist.push_back(succ);
                }
            }
        }
        if let Some(unreached) = blocks.iter().find(|b| !seen.contains(b)) {
            return Err(LoopSyncError::precondition(format!(
                "{}: {} is not reachable from header {}",
                id, unreached, header
            )));
        }

        let latches: Vec<BlockId> = blocks
            .iter()
            .copied()
            .filter(|&b| func.block(b).map_or(false, |bb| bb.succs.contains(&header)))
            .collect();
        if latches.is_empty() {
            return Err(LoopSyncError::precondition(format!(
                "{}: no latch branches back to header {}",
                id, header
            )));
        }

        let mut exit_blocks = Vec::new();
        for &block in &blocks {
            for &succ in &func.expect_block(block)?.succs {
                if !block_set.contains(&succ) && !exit_blocks.contains(&succ) {
                    exit_blocks.push(succ);
                }
            }
        }

        let insts: Vec<InstId> = blocks
            .iter()
            .filter_map(|&b| func.block(b))
            .flat_map(|bb| bb.insts.iter().copied())
            .collect();
        let inst_set: FxHashSet<InstId> = insts.iter().copied().collect();

        let mut structure = LoopStructure {
            id,
            header,
            blocks,
            block_set,
            latches,
            exit_blocks,
            insts,
            inst_set,
            invariants: FxHashSet::default(),
        };
        structure.invariants = structure.compute_invariants(func);
        Ok(structure)
    }

    /// Pure instructions whose operands are all invariant, to a fixed point.
    /// PHIs, memory accesses and side effects are never invariant.
    fn compute_invariants(&self, func: &Function) -> FxHashSet<InstId> {
        let mut invariants = FxHashSet::default();
        let mut changed = true;
        while changed {
            changed = false;
            for &id in &self.insts {
                if invariants.contains(&id) {
                    continue;
                }
                let Some(inst) = func.inst(id) else {
                    continue;
                };
                let pure = !inst.is_phi()
                    && !inst.opcode.is_memory()
                    && !inst.opcode.has_side_effects()
                    && !inst.opcode.is_terminator()
                    && inst.opcode != Opcode::Other;
                if !pure {
                    continue;
                }
                let operands_invariant = inst.operands.iter().all(|op| match op {
                    Operand::Inst(def) => !self.inst_set.contains(def) || invariants.contains(def),
                    Operand::Const(_) | Operand::Arg(_) => true,
                });
                if operands_invariant {
                    invariants.insert(id);
                    changed = true;
                }
            }
        }
        invariants
    }

    pub fn id(&self) -> LoopId {
        self.id
    }

    pub fn header(&self) -> BlockId {
        self.header
    }

    pub fn blocks(&self) -> &[BlockId] {
        &self.blocks
    }

    pub fn latches(&self) -> &[BlockId] {
        &self.latches
    }

    /// Blocks outside the loop that are targeted from inside it
    pub fn exit_blocks(&self) -> &[BlockId] {
        &self.exit_blocks
    }

    /// Body instructions in program order
    pub fn insts(&self) -> &[InstId] {
        &self.insts
    }

    pub fn contains_block(&self, block: BlockId) -> bool {
        self.block_set.contains(&block)
    }

    pub fn contains_inst(&self, inst: InstId) -> bool {
        self.inst_set.contains(&inst)
    }

    /// Invariance flag of a body instruction; instructions outside the loop are
    /// trivially invariant
    pub fn is_invariant(&self, inst: InstId) -> bool {
        !self.inst_set.contains(&inst) || self.invariants.contains(&inst)
    }

    pub fn is_invariant_operand(&self, operand: &Operand) -> bool {
        match operand {
            Operand::Inst(id) => self.is_invariant(*id),
            Operand::Const(_) | Operand::Arg(_) => true,
        }
    }

    pub fn is_latch(&self, block: BlockId) -> bool {
        self.latches.contains(&block)
    }

    pub fn is_back_edge(&self, from: BlockId, to: BlockId) -> bool {
        to == self.header && self.is_latch(from)
    }

    /// Reject instructions that do not belong to this loop
    pub fn require_inst(&self, inst: InstId) -> Result<()> {
        if self.contains_inst(inst) {
            Ok(())
        } else {
            Err(LoopSyncError::precondition(format!(
                "{} is not part of {}",
                inst, self.id
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::FunctionBuilder;

    /// entry -> header -> body -> latch -> header | exit
    fn diamond_free_loop() -> (Function, Vec<BlockId>) {
        let mut b = FunctionBuilder::new("f");
        let entry = b.block("entry");
        let header = b.block("header");
        let body = b.block("body");
        let exit = b.block("exit");
        b.position_at_end(entry);
        let base = b.push(Opcode::Add, vec![Operand::Arg(0), Operand::Const(8)]);
        b.br(header);
        b.position_at_end(header);
        let i = b.phi(&[(entry, Operand::Const(0))]);
        b.br(body);
        b.position_at_end(body);
        let scaled = b.push(Opcode::Mul, vec![base.into(), Operand::Const(4)]);
        let _offset = b.push(Opcode::Add, vec![scaled.into(), i.into()]);
        let next = b.push(Opcode::Add, vec![i.into(), Operand::Const(1)]);
        b.add_incoming(i, body, next.into());
        let cmp = b.push(Opcode::ICmp, vec![next.into(), Operand::Arg(1)]);
        b.cond_br(cmp.into(), header, exit);
        b.position_at_end(exit);
        b.ret(None);
        (b.finish(), vec![entry, header, body, exit])
    }

    #[test]
    fn test_latches_exits_and_invariants() {
        let (func, blocks) = diamond_free_loop();
        let (header, body, exit) = (blocks[1], blocks[2], blocks[3]);
        let lp = LoopStructure::new(&func, LoopId(0), header, vec![header, body]).unwrap();

        assert_eq!(lp.latches(), &[body]);
        assert_eq!(lp.exit_blocks(), &[exit]);
        assert!(lp.is_back_edge(body, header));
        assert!(!lp.is_back_edge(header, body));

        // base*4 only depends on values defined before the loop
        assert!(lp.is_invariant(InstId(4)));
        // offset uses the induction PHI
        assert!(!lp.is_invariant(InstId(5)));
        // the PHI itself is never invariant
        assert!(!lp.is_invariant(InstId(2)));
        // definitions outside the loop are invariant
        assert!(lp.is_invariant(InstId(0)));
    }

    #[test]
    fn test_rejects_side_entry() {
        let (func, blocks) = diamond_free_loop();
        // treating `body` as the header leaves the real header entered from entry
        let result = LoopStructure::new(&func, LoopId(1), blocks[2], vec![blocks[1], blocks[2]]);
        assert!(matches!(result, Err(LoopSyncError::Precondition(_))));
    }

    #[test]
    fn test_rejects_duplicate_and_missing_header() {
        let (func, blocks) = diamond_free_loop();
        let dup = LoopStructure::new(&func, LoopId(2), blocks[1], vec![blocks[1], blocks[1]]);
        assert!(dup.is_err());
        let missing = LoopStructure::new(&func, LoopId(3), blocks[1], vec![blocks[2]]);
        assert!(missing.is_err());
    }

    #[test]
    fn test_require_inst_outside_loop() {
        let (func, blocks) = diamond_free_loop();
        let lp = LoopStructure::new(&func, LoopId(0), blocks[1], vec![blocks[1], blocks[2]]).unwrap();
        assert!(lp.require_inst(InstId(2)).is_ok());
        assert!(lp.require_inst(InstId(0)).is_err());
    }
}
