//! Functions and basic blocks
//!
//! A `Function` owns two arenas: blocks and instructions. Handles index into
//! them directly, so deserialized functions are checked for handle/position
//! agreement before they are accepted.

use super::ids::{BlockId, InstId};
use super::instruction::{Instruction, Opcode, Operand};
use crate::errors::{LoopSyncError, Result};
use serde::{Deserialize, Serialize};

/// Basic block: ordered instructions plus CFG successors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicBlock {
    pub id: BlockId,
    pub name: String,
    #[serde(default)]
    pub insts: Vec<InstId>,
    #[serde(default)]
    pub succs: Vec<BlockId>,
}

/// Serializable DTO for Function
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDto {
    pub name: String,
    pub blocks: Vec<BasicBlock>,
    pub insts: Vec<Instruction>,
}

/// Function arena
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FunctionDto", into = "FunctionDto")]
pub struct Function {
    pub name: String,
    blocks: Vec<BasicBlock>,
    insts: Vec<Instruction>,
}

impl TryFrom<FunctionDto> for Function {
    type Error = LoopSyncError;

    fn try_from(dto: FunctionDto) -> Result<Self> {
        Function::from_parts(dto.name, dto.blocks, dto.insts)
    }
}

impl From<Function> for FunctionDto {
    fn from(func: Function) -> Self {
        FunctionDto {
            name: func.name,
            blocks: func.blocks,
            insts: func.insts,
        }
    }
}

impl Function {
    /// Assemble a function from raw tables, checking handle consistency
    pub fn from_parts(
        name: String,
        blocks: Vec<BasicBlock>,
        insts: Vec<Instruction>,
    ) -> Result<Self> {
        for (pos, block) in blocks.iter().enumerate() {
            if block.id.index() != pos {
                return Err(LoopSyncError::precondition(format!(
                    "block {} stored at position {}",
                    block.id, pos
                )));
            }
            for succ in &block.succs {
                if succ.index() >= blocks.len() {
                    return Err(LoopSyncError::precondition(format!(
                        "{} has unknown successor {}",
                        block.id, succ
                    )));
                }
            }
            for inst in &block.insts {
                match insts.get(inst.index()) {
                    Some(i) if i.block == block.id => {}
                    _ => {
                        return Err(LoopSyncError::precondition(format!(
                            "{} lists {} which does not belong to it",
                            block.id, inst
                        )))
                    }
                }
            }
        }
        for (pos, inst) in insts.iter().enumerate() {
            if inst.id.index() != pos {
                return Err(LoopSyncError::precondition(format!(
                    "instruction {} stored at position {}",
                    inst.id, pos
                )));
            }
            if inst.block.index() >= blocks.len() {
                return Err(LoopSyncError::precondition(format!(
                    "{} lives in unknown block {}",
                    inst.id, inst.block
                )));
            }
            for operand in inst.inst_operands() {
                if operand.index() >= insts.len() {
                    return Err(LoopSyncError::precondition(format!(
                        "{} uses unknown value {}",
                        inst.id, operand
                    )));
                }
            }
        }
        Ok(Function {
            name,
            blocks,
            insts,
        })
    }

    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    pub fn insts(&self) -> &[Instruction] {
        &self.insts
    }

    pub fn block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.get(id.index())
    }

    pub fn inst(&self, id: InstId) -> Option<&Instruction> {
        self.insts.get(id.index())
    }

    /// Instruction lookup that reports unknown handles as precondition errors
    pub fn expect_inst(&self, id: InstId) -> Result<&Instruction> {
        self.inst(id)
            .ok_or_else(|| LoopSyncError::precondition(format!("unknown instruction {}", id)))
    }

    pub fn expect_block(&self, id: BlockId) -> Result<&BasicBlock> {
        self.block(id)
            .ok_or_else(|| LoopSyncError::precondition(format!("unknown block {}", id)))
    }

    /// CFG predecessors of a block, in block order
    pub fn predecessors(&self, block: BlockId) -> Vec<BlockId> {
        self.blocks
            .iter()
            .filter(|b| b.succs.contains(&block))
            .map(|b| b.id)
            .collect()
    }

    /// Last instruction of the block if it is a terminator
    pub fn terminator(&self, block: BlockId) -> Option<InstId> {
        let last = *self.block(block)?.insts.last()?;
        self.inst(last)
            .filter(|i| i.opcode.is_terminator())
            .map(|i| i.id)
    }

    /// Instructions using `value` as an operand
    pub fn users(&self, value: InstId) -> Vec<InstId> {
        self.insts
            .iter()
            .filter(|i| i.inst_operands().any(|op| op == value))
            .map(|i| i.id)
            .collect()
    }
}

/// Incremental function builder
///
/// Instructions are appended to the block the builder is positioned at.
/// Creating a block positions the builder at it.
#[derive(Debug)]
pub struct FunctionBuilder {
    func: Function,
    current: Option<BlockId>,
}

impl FunctionBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            func: Function {
                name: name.into(),
                blocks: Vec::new(),
                insts: Vec::new(),
            },
            current: None,
        }
    }

    /// Create a block and position at its end
    pub fn block(&mut self, name: impl Into<String>) -> BlockId {
        let id = BlockId::from_index(self.func.blocks.len());
        self.func.blocks.push(BasicBlock {
            id,
            name: name.into(),
            insts: Vec::new(),
            succs: Vec::new(),
        });
        self.current = Some(id);
        id
    }

    pub fn position_at_end(&mut self, block: BlockId) {
        self.current = Some(block);
    }

    fn current_block(&mut self) -> BlockId {
        match self.current {
            Some(block) => block,
            None => self.block("entry"),
        }
    }

    /// Append an instruction to the current block
    pub fn push(&mut self, opcode: Opcode, operands: Vec<Operand>) -> InstId {
        let block = self.current_block();
        let id = InstId::from_index(self.func.insts.len());
        self.func.insts.push(Instruction {
            id,
            opcode,
            operands,
            incoming_blocks: Vec::new(),
            block,
            name: None,
        });
        self.func.blocks[block.index()].insts.push(id);
        id
    }

    /// Append a PHI; further incoming values can be added with `add_incoming`
    pub fn phi(&mut self, incoming: &[(BlockId, Operand)]) -> InstId {
        let id = self.push(Opcode::Phi, incoming.iter().map(|(_, v)| *v).collect());
        self.func.insts[id.index()].incoming_blocks = incoming.iter().map(|(b, _)| *b).collect();
        id
    }

    pub fn add_incoming(&mut self, phi: InstId, block: BlockId, value: Operand) {
        if let Some(inst) = self.func.insts.get_mut(phi.index()) {
            inst.operands.push(value);
            inst.incoming_blocks.push(block);
        }
    }

    pub fn set_name(&mut self, inst: InstId, name: impl Into<String>) {
        if let Some(inst) = self.func.insts.get_mut(inst.index()) {
            inst.name = Some(name.into());
        }
    }

    pub fn br(&mut self, target: BlockId) -> InstId {
        let id = self.push(Opcode::Br, Vec::new());
        let block = self.current_block();
        self.func.blocks[block.index()].succs.push(target);
        id
    }

    pub fn cond_br(&mut self, cond: Operand, then_block: BlockId, else_block: BlockId) -> InstId {
        let id = self.push(Opcode::CondBr, vec![cond]);
        let block = self.current_block();
        let succs = &mut self.func.blocks[block.index()].succs;
        succs.push(then_block);
        succs.push(else_block);
        id
    }

    pub fn ret(&mut self, value: Option<Operand>) -> InstId {
        self.push(Opcode::Ret, value.into_iter().collect())
    }

    pub fn finish(self) -> Function {
        self.func
    }
}
