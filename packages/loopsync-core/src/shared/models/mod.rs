//! Arena-based IR model (functions, blocks, instructions, handles)

mod function;
mod ids;
mod instruction;

pub use function::{BasicBlock, Function, FunctionBuilder, FunctionDto};
pub use ids::{BlockId, InstId, LoopId, SccId, SegmentId};
pub use instruction::{Instruction, Opcode, Operand};
