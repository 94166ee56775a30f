//! # Control Flow Graph
//!
//! Basic blocks of TAC instructions, linked by possible control transfer.
//! Blocks are indexed from zero in layout order, block `0` is the entry.
//!
//! [ControlFlowGraph::from_instrs] splits a flat instruction listing into
//! blocks: a label starts a new block, a branch ends one. Blocks built by
//! hand with [ControlFlowGraph::add_block] may be empty and may jump to
//! themselves.

use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use super::ast::{Ident, Instr};
use crate::collections::{Graph, GraphError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBlock {
    index: usize,
    instrs: Vec<Instr>,
}

impl BasicBlock {
    pub fn index(&self) -> usize { self.index }

    pub fn instrs(&self) -> &[Instr] { &self.instrs }

    pub fn len(&self) -> usize { self.instrs.len() }

    pub fn is_empty(&self) -> bool { self.instrs.is_empty() }

    /// The last instruction, absent for an empty block.
    pub fn last(&self) -> Option<&Instr> { self.instrs.last() }
}

#[derive(Debug, Error)]
pub enum CfgError {
    #[error("jump to undefined label `{0}`")]
    UndefinedLabel(Ident),

    #[error("label `{0}` is defined more than once")]
    DuplicateLabel(Ident),

    #[error("graph error: {0}")]
    Graph(#[from] GraphError),
}

#[derive(Debug, Clone)]
pub struct ControlFlowGraph {
    graph: Graph<usize, BasicBlock>,
}

impl Default for ControlFlowGraph {
    fn default() -> Self { Self::new() }
}

impl ControlFlowGraph {
    pub fn new() -> Self {
        Self {
            graph: Graph::directed(),
        }
    }

    /// Append a block and return its index.
    pub fn add_block(&mut self, instrs: Vec<Instr>) -> usize {
        let index = self.graph.len();
        self.graph.add_vertex(index, BasicBlock { index, instrs });
        index
    }

    /// Record that control may transfer from `from` to `to`.
    pub fn add_edge(&mut self, from: usize, to: usize) -> Result<(), CfgError> {
        self.graph.add_edge(&from, &to)?;
        Ok(())
    }

    pub fn entry(&self) -> Option<usize> { if self.graph.is_empty() { None } else { Some(0) } }

    pub fn len(&self) -> usize { self.graph.len() }

    pub fn is_empty(&self) -> bool { self.graph.is_empty() }

    pub fn block(&self, index: usize) -> Option<&BasicBlock> { self.graph.payload(&index) }

    /// Iterate over the blocks in index order.
    pub fn blocks(&self) -> impl Iterator<Item = &BasicBlock> + '_ {
        self.graph.iter().map(|(_, block)| block)
    }

    /// Successors of a block, in ascending index order.
    pub fn succs(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        self.graph.succs(&index).copied()
    }

    /// Predecessors of a block, in ascending index order.
    pub fn preds(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        self.graph.preds(&index).copied()
    }

    /// Iterate over every instruction along with its `(block, index)` id.
    pub fn instrs(&self) -> impl Iterator<Item = ((usize, usize), &Instr)> + '_ {
        self.blocks().flat_map(|block| {
            block
                .instrs()
                .iter()
                .enumerate()
                .map(move |(i, instr)| ((block.index(), i), instr))
        })
    }

    /// Blocks reachable from the entry.
    pub fn reachable_blocks(&self) -> FxHashSet<usize> {
        let mut reachables = FxHashSet::default();
        let mut worklist: Vec<usize> = self.entry().into_iter().collect();

        while let Some(block) = worklist.pop() {
            if !reachables.insert(block) {
                continue;
            }
            worklist.extend(self.succs(block));
        }

        reachables
    }

    /// Split a flat instruction list into basic blocks and link them.
    ///
    /// An empty listing yields a single empty block.
    pub fn from_instrs(instrs: Vec<Instr>) -> Result<Self, CfgError> {
        let mut blocks: Vec<Vec<Instr>> = Vec::new();
        let mut current: Vec<Instr> = Vec::new();

        for instr in instrs {
            if matches!(instr, Instr::Label(_)) && !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
            let ends_block = instr.branch_target().is_some();
            current.push(instr);
            if ends_block {
                blocks.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() || blocks.is_empty() {
            blocks.push(current);
        }

        let mut labels: FxHashMap<Ident, usize> = FxHashMap::default();
        for (index, block) in blocks.iter().enumerate() {
            if let Some(Instr::Label(label)) = block.first() {
                if labels.insert(label.clone(), index).is_some() {
                    return Err(CfgError::DuplicateLabel(label.clone()));
                }
            }
        }

        let mut cfg = Self::new();
        let count = blocks.len();
        for block in blocks {
            cfg.add_block(block);
        }

        for index in 0..count {
            let last = cfg.block(index).and_then(BasicBlock::last).cloned();
            let falls_through = last.as_ref().map_or(true, Instr::falls_through);

            if let Some(label) = last.as_ref().and_then(Instr::branch_target) {
                let target = *labels
                    .get(label)
                    .ok_or_else(|| CfgError::UndefinedLabel(label.clone()))?;
                cfg.add_edge(index, target)?;
            }
            if falls_through && index + 1 < count {
                cfg.add_edge(index, index + 1)?;
            }
        }

        Ok(cfg)
    }

    pub fn to_mermaid(&self) -> String {
        let mut result = String::from("graph TD;\n");
        for block in self.blocks() {
            for succ in self.succs(block.index()) {
                result.push_str(&format!("    B{} --> B{};\n", block.index(), succ));
            }
        }
        result
    }
}
