//! Unit-test fixtures

use crate::features::loop_structure::LoopStructure;
use crate::shared::models::{Function, FunctionBuilder, InstId, LoopId, Opcode, Operand};

/// Single-block loop: `n` opaque instructions followed by the latch branch.
///
/// Instruction `k` of the body is `InstId(k + 1)` (the entry branch is `%0`);
/// the latch branch is `InstId(n + 1)`.
pub(crate) fn straight_loop(n: usize) -> (Function, LoopStructure, Vec<InstId>) {
    let mut b = FunctionBuilder::new("straight");
    let entry = b.block("entry");
    let header = b.block("header");
    let exit = b.block("exit");
    b.position_at_end(entry);
    b.br(header);
    b.position_at_end(header);
    let body: Vec<InstId> = (0..n)
        .map(|_| b.push(Opcode::Other, Vec::new()))
        .collect();
    b.cond_br(Operand::Arg(0), header, exit);
    b.position_at_end(exit);
    b.ret(None);
    let func = b.finish();
    let lp = LoopStructure::new(&func, LoopId(0), header, vec![header]).expect("natural loop");
    (func, lp, body)
}
