//! # Three-Address Code
//!
//! The IR consumed by the register allocator.
//!
//! - `ast`: Identifiers, operands, expressions and instructions.
//! - `def_use`: Structural def/use sets of an instruction.
//! - `cfg`: Basic blocks and the control flow graph.
//! - `frontend`: Reader for the textual form.

pub mod ast;
pub mod cfg;
pub mod def_use;
pub mod frontend;

pub use ast::{BinaryOp, Exp, Ident, Instr, Prim};
pub use cfg::{BasicBlock, CfgError, ControlFlowGraph};
