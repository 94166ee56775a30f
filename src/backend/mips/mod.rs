//! # MIPS Target
//!
//! Register file, instruction forms and the lowering of register-allocated
//! TAC into MIPS assembly.

pub mod imm;
pub mod inst;
pub mod lower;
pub mod regs;

pub use lower::{lower_function, Frame, LowerError, MipsFunction, MipsLowering};
