//! Instructions and operands

use super::ids::{BlockId, InstId};
use serde::{Deserialize, Serialize};

/// Instruction opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Opcode {
    Phi,
    Add,
    Sub,
    Mul,
    SDiv,
    FAdd,
    FSub,
    FMul,
    FDiv,
    And,
    Or,
    Xor,
    Shl,
    ICmp,
    FCmp,
    Select,
    Load,
    Store,
    Call,
    Br,
    CondBr,
    Ret,
    Other,
}

impl Opcode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Opcode::Phi => "phi",
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Mul => "mul",
            Opcode::SDiv => "sdiv",
            Opcode::FAdd => "fadd",
            Opcode::FSub => "fsub",
            Opcode::FMul => "fmul",
            Opcode::FDiv => "fdiv",
            Opcode::And => "and",
            Opcode::Or => "or",
            Opcode::Xor => "xor",
            Opcode::Shl => "shl",
            Opcode::ICmp => "icmp",
            Opcode::FCmp => "fcmp",
            Opcode::Select => "select",
            Opcode::Load => "load",
            Opcode::Store => "store",
            Opcode::Call => "call",
            Opcode::Br => "br",
            Opcode::CondBr => "condbr",
            Opcode::Ret => "ret",
            Opcode::Other => "other",
        }
    }

    pub fn is_terminator(&self) -> bool {
        matches!(self, Opcode::Br | Opcode::CondBr | Opcode::Ret)
    }

    pub fn is_compare(&self) -> bool {
        matches!(self, Opcode::ICmp | Opcode::FCmp)
    }

    /// Terminators and the compares that feed them
    pub fn is_control(&self) -> bool {
        self.is_terminator() || self.is_compare()
    }

    pub fn has_side_effects(&self) -> bool {
        matches!(self, Opcode::Store | Opcode::Call)
    }

    pub fn is_memory(&self) -> bool {
        matches!(self, Opcode::Load | Opcode::Store)
    }

    pub fn is_binary_arith(&self) -> bool {
        matches!(
            self,
            Opcode::Add
                | Opcode::Sub
                | Opcode::Mul
                | Opcode::SDiv
                | Opcode::FAdd
                | Opcode::FSub
                | Opcode::FMul
                | Opcode::FDiv
                | Opcode::And
                | Opcode::Or
                | Opcode::Xor
                | Opcode::Shl
        )
    }
}

/// Instruction operand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    Inst(InstId),
    Const(i64),
    Arg(u32),
}

impl Operand {
    pub fn as_inst(&self) -> Option<InstId> {
        match self {
            Operand::Inst(id) => Some(*id),
            _ => None,
        }
    }
}

impl From<InstId> for Operand {
    fn from(id: InstId) -> Self {
        Operand::Inst(id)
    }
}

/// A single instruction
///
/// `incoming_blocks` is parallel to `operands` for PHI nodes and empty for
/// everything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub id: InstId,
    pub opcode: Opcode,
    #[serde(default)]
    pub operands: Vec<Operand>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub incoming_blocks: Vec<BlockId>,
    pub block: BlockId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Instruction {
    pub fn is_phi(&self) -> bool {
        self.opcode == Opcode::Phi
    }

    /// Instruction operands only (constants and arguments skipped)
    pub fn inst_operands(&self) -> impl Iterator<Item = InstId> + '_ {
        self.operands.iter().filter_map(Operand::as_inst)
    }

    /// PHI incoming pairs
    pub fn incoming(&self) -> impl Iterator<Item = (BlockId, &Operand)> + '_ {
        self.incoming_blocks.iter().copied().zip(self.operands.iter())
    }

    /// Printable label, e.g. `%4 = add`
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => format!("{} ({}) = {}", self.id, name, self.opcode.as_str()),
            None => format!("{} = {}", self.id, self.opcode.as_str()),
        }
    }
}
