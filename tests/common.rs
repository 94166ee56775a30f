#![allow(dead_code)]

use rustc_hash::FxHashMap;
use tacmips::{
    backend::{
        mips::inst::MipsInst,
        reg_alloc::{interference_graph, liveness_analysis, InterfGraph, Liveness, RegisterAllocMap},
    },
    tac::{frontend, ControlFlowGraph, Ident, Instr},
};

pub fn ident(name: &str) -> Ident { Ident::new(name) }

/// Parse a single TAC instruction.
pub fn instr(src: &str) -> Instr {
    let mut instrs = frontend::parse(src).unwrap();
    assert_eq!(instrs.len(), 1, "expected one instruction in `{}`", src);
    instrs.remove(0)
}

pub fn cfg(src: &str) -> ControlFlowGraph {
    let instrs = frontend::parse(src).unwrap();
    ControlFlowGraph::from_instrs(instrs).unwrap()
}

pub fn analyze(src: &str) -> (ControlFlowGraph, Liveness, InterfGraph) {
    let cfg = cfg(src);
    let liveness = liveness_analysis::analyze(&cfg).unwrap();
    let graph = interference_graph::build(&cfg, &liveness).unwrap();
    (cfg, liveness, graph)
}

/// A register map from `(variable, color)` pairs.
pub fn alloc_map(max_regs: usize, colors: &[(&str, usize)]) -> RegisterAllocMap {
    let colors: FxHashMap<Ident, usize> = colors
        .iter()
        .map(|(name, color)| (ident(name), *color))
        .collect();
    RegisterAllocMap::new(colors, max_regs)
}

pub fn names(set: Option<&rustc_hash::FxHashSet<Ident>>) -> Vec<String> {
    let mut names: Vec<String> = set
        .into_iter()
        .flatten()
        .map(|v| v.name().to_string())
        .collect();
    names.sort();
    names
}

pub fn asm(insts: &[MipsInst]) -> String {
    insts
        .iter()
        .map(|inst| inst.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
