//! Loop builders
//!
//! Every builder returns a single-block counted loop unless stated otherwise:
//!
//! ```text
//! entry:  br header
//! header: i = phi [entry: 0], [header: i_next]
//!         ... body ...
//!         i_next = add i, 1
//!         cmp = icmp i_next, %arg0
//!         condbr cmp, header, exit
//! exit:   ret
//! ```

use loopsync_core::features::scc_attributes::{InductionFacts, InductionVariableInfo};
use loopsync_core::features::sequential_segments::{CorrelationMap, LoopAnalysis};
use loopsync_core::shared::models::{
    BlockId, Function, FunctionBuilder, FunctionDto, InstId, Instruction, LoopId, Opcode, Operand,
};
use loopsync_core::{DependenceEdge, DependenceGraph, LoopStructure};

/// A built loop plus the handles tests look at
#[derive(Debug, Clone)]
pub struct BuiltLoop {
    pub analysis: LoopAnalysis,
    pub facts: InductionFacts,
    pub iv: InstId,
    pub branch: InstId,
    /// Builder-specific handles, in the order documented by each builder
    pub marks: Vec<InstId>,
}

struct Counted {
    b: FunctionBuilder,
    entry: BlockId,
    header: BlockId,
    exit: BlockId,
    iv: InstId,
}

fn open_counted(name: &str) -> Counted {
    let mut b = FunctionBuilder::new(name);
    let entry = b.block("entry");
    let header = b.block("header");
    let exit = b.block("exit");
    b.position_at_end(entry);
    b.br(header);
    b.position_at_end(header);
    let iv = b.phi(&[(entry, Operand::Const(0))]);
    b.set_name(iv, "i");
    Counted {
        b,
        entry,
        header,
        exit,
        iv,
    }
}

fn close_counted(
    mut c: Counted,
    ret: Option<Operand>,
    extra: impl FnOnce(&mut Vec<DependenceEdge>),
    marks: Vec<InstId>,
) -> BuiltLoop {
    let i_next = c.b.push(Opcode::Add, vec![c.iv.into(), Operand::Const(1)]);
    c.b.add_incoming(c.iv, c.header, i_next.into());
    let cmp = c.b.push(Opcode::ICmp, vec![i_next.into(), Operand::Arg(0)]);
    let branch = c.b.cond_br(cmp.into(), c.header, c.exit);
    c.b.position_at_end(c.exit);
    c.b.ret(ret);
    let func = c.b.finish();

    let structure = LoopStructure::new(&func, LoopId(0), c.header, vec![c.header]).unwrap();
    let mut analysis = LoopAnalysis::with_def_use(func, structure).unwrap();
    analysis
        .dependences
        .add_exit_control_dependences(&analysis.function, &analysis.structure)
        .unwrap();
    let mut edges = Vec::new();
    extra(&mut edges);
    for edge in edges {
        analysis.dependences.add_dependence(edge).unwrap();
    }

    let facts = InductionFacts::new()
        .with_induction_variable(InductionVariableInfo {
            phi: c.iv,
            start: Operand::Const(0),
            step: Operand::Const(1),
            updates: vec![i_next],
        })
        .governed_by(c.iv);

    BuiltLoop {
        analysis,
        facts,
        iv: c.iv,
        branch,
        marks,
    }
}

/// `acc = acc / a[i]; use(acc)`: one non-associative recurrence.
///
/// marks: `[acc, x, acc_next, call]`
pub fn division_recurrence() -> BuiltLoop {
    let mut c = open_counted("division_recurrence");
    let acc = c.b.phi(&[(c.entry, Operand::Arg(1))]);
    c.b.set_name(acc, "acc");
    let x = c.b.push(Opcode::Load, vec![c.iv.into()]);
    let acc_next = c.b.push(Opcode::SDiv, vec![acc.into(), x.into()]);
    c.b.add_incoming(acc, c.header, acc_next.into());
    let call = c.b.push(Opcode::Call, vec![acc_next.into()]);
    close_counted(
        c,
        Some(acc_next.into()),
        |_| {},
        vec![acc, x, acc_next, call],
    )
}

/// `a[i] = a[i] * 2`: no cross-iteration dependence besides `i`.
///
/// marks: `[x, y, store]`
pub fn elementwise_scale() -> BuiltLoop {
    let mut c = open_counted("elementwise_scale");
    let x = c.b.push(Opcode::Load, vec![c.iv.into()]);
    let y = c.b.push(Opcode::Mul, vec![x.into(), Operand::Const(2)]);
    let store = c.b.push(Opcode::Store, vec![y.into(), c.iv.into()]);
    close_counted(c, None, |_| {}, vec![x, y, store])
}

/// [`elementwise_scale`] with a `log()` call after the store that only the
/// task body has, ordered against its own previous iteration.
///
/// marks: `[x, y, store, call]`
pub fn elementwise_scale_with_log() -> BuiltLoop {
    let mut c = open_counted("elementwise_scale.task");
    let x = c.b.push(Opcode::Load, vec![c.iv.into()]);
    let y = c.b.push(Opcode::Mul, vec![x.into(), Operand::Const(2)]);
    let store = c.b.push(Opcode::Store, vec![y.into(), c.iv.into()]);
    let call = c.b.push(Opcode::Call, vec![Operand::Arg(1)]);
    close_counted(
        c,
        None,
        |edges| edges.push(DependenceEdge::memory(call, call).carried()),
        vec![x, y, store, call],
    )
}

/// `log_a(); log_b();` with each call ordered against its own previous
/// iteration through memory.
///
/// marks: `[call_a, call_b]`
pub fn two_ordered_calls() -> BuiltLoop {
    let mut c = open_counted("two_ordered_calls");
    let call_a = c.b.push(Opcode::Call, vec![Operand::Arg(1)]);
    let call_b = c.b.push(Opcode::Call, vec![Operand::Arg(2)]);
    close_counted(
        c,
        None,
        |edges| {
            edges.push(DependenceEdge::memory(call_a, call_a).carried());
            edges.push(DependenceEdge::memory(call_b, call_b).carried());
        },
        vec![call_a, call_b],
    )
}

/// `sum = sum + a[i]; a[i] = i` with the store ordered across iterations.
///
/// marks: `[sum, x, sum_next, store]`
pub fn running_sum_with_store() -> BuiltLoop {
    let mut c = open_counted("running_sum");
    let sum = c.b.phi(&[(c.entry, Operand::Const(0))]);
    c.b.set_name(sum, "sum");
    let x = c.b.push(Opcode::Load, vec![c.iv.into()]);
    let sum_next = c.b.push(Opcode::Add, vec![sum.into(), x.into()]);
    c.b.add_incoming(sum, c.header, sum_next.into());
    let store = c.b.push(Opcode::Store, vec![c.iv.into(), c.iv.into()]);
    close_counted(
        c,
        Some(sum_next.into()),
        |edges| edges.push(DependenceEdge::memory(store, store).carried()),
        vec![sum, x, sum_next, store],
    )
}

/// Single-block loop of `n` opaque instructions and a latch branch on an
/// argument. Body instruction `k` is `InstId(k + 1)`.
pub fn straight_loop(n: usize) -> (Function, LoopStructure, Vec<InstId>) {
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
    let lp = LoopStructure::new(&func, LoopId(0), header, vec![header]).unwrap();
    (func, lp, body)
}

/// Task clone of `original` with `shift` extra instructions at the top of the
/// entry block. Every instruction id moves up by `shift`.
pub fn shifted_clone(original: &LoopAnalysis, shift: usize) -> (LoopAnalysis, CorrelationMap) {
    let moved = |id: InstId| InstId::from_index(id.index() + shift);
    let dto = FunctionDto::from(original.function.clone());

    let mut insts = Vec::with_capacity(dto.insts.len() + shift);
    let entry = dto.blocks[0].id;
    for k in 0..shift {
        insts.push(Instruction {
            id: InstId::from_index(k),
            opcode: Opcode::Other,
            operands: Vec::new(),
            incoming_blocks: Vec::new(),
            block: entry,
            name: Some(format!("task_setup{}", k)),
        });
    }
    for inst in &dto.insts {
        let mut inst = inst.clone();
        inst.id = moved(inst.id);
        for operand in &mut inst.operands {
            if let Operand::Inst(def) = operand {
                *def = moved(*def);
            }
        }
        insts.push(inst);
    }
    let mut blocks = dto.blocks.clone();
    for block in &mut blocks {
        block.insts = block.insts.iter().map(|&i| moved(i)).collect();
    }
    blocks[0].insts.splice(0..0, (0..shift).map(InstId::from_index));

    let function = Function::from_parts(format!("{}.task", dto.name), blocks, insts).unwrap();
    let structure = LoopStructure::new(
        &function,
        original.structure.id(),
        original.structure.header(),
        original.structure.blocks().to_vec(),
    )
    .unwrap();
    let mut dependences = DependenceGraph::new(&structure);
    for edge in original.dependences.edges() {
        let mut edge = *edge;
        edge.from = moved(edge.from);
        edge.to = moved(edge.to);
        dependences.add_dependence(edge).unwrap();
    }

    let mut correlation = CorrelationMap::new();
    for inst in original.function.insts() {
        correlation.insert(inst.id, moved(inst.id));
    }
    (
        LoopAnalysis {
            function,
            structure,
            dependences,
        },
        correlation,
    )
}
