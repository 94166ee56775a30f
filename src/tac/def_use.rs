//! # Structural Def/Use
//!
//! The variables an instruction writes and reads, read off its shape. The
//! lists keep operand order (defs first, then uses from left to right) so
//! callers that need a stable variable order can take it from here.

use rustc_hash::FxHashSet;

use super::ast::{Exp, Ident, Instr, Prim};

/// Variables defined by the instruction.
pub fn defs(instr: &Instr) -> Vec<&Ident> {
    match instr {
        Instr::Assign(var, _) => vec![var],
        Instr::Call(var, _, _) => var.iter().collect(),
        Instr::GotoIf(..) | Instr::Goto(_) | Instr::Label(_) => Vec::new(),
    }
}

/// Variables used by the instruction, without duplicates.
pub fn uses(instr: &Instr) -> Vec<&Ident> {
    let prims: Vec<&Prim> = match instr {
        Instr::Assign(_, Exp::Prim(p)) => vec![p],
        Instr::Assign(_, Exp::BinOp(lhs, _, rhs)) => vec![lhs, rhs],
        Instr::Call(_, _, args) => args.iter().collect(),
        Instr::GotoIf(test, _) => vec![test],
        Instr::Goto(_) | Instr::Label(_) => Vec::new(),
    };

    let mut uses: Vec<&Ident> = Vec::new();
    for ident in prims.into_iter().filter_map(Prim::ident) {
        if !uses.contains(&ident) {
            uses.push(ident);
        }
    }
    uses
}

pub fn def_set(instr: &Instr) -> FxHashSet<Ident> { defs(instr).into_iter().cloned().collect() }

pub fn use_set(instr: &Instr) -> FxHashSet<Ident> { uses(instr).into_iter().cloned().collect() }
