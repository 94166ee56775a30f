//! # Compilation Driver
//!
//! Runs the stages over one unit of TAC, in order:
//!
//! 1. `parse`: text to instructions.
//! 2. `cfg`: instructions to basic blocks.
//! 3. `liveness`: live variables around every instruction.
//! 4. `interference`: the interference graph.
//! 5. `coloring`: registers and spill slots.
//! 6. `lower`: MIPS instructions.
//!
//! Every stage error is wrapped into a [CompileError] that records the stage
//! and classifies the failure.

use log::info;
use thiserror::Error;

use crate::{
    backend::{
        mips::{self, regs::ALLOCATABLE_REGS, LowerError, MipsFunction},
        reg_alloc::{
            self,
            interference_graph,
            liveness_analysis,
            InterfGraph,
            Liveness,
            RegisterAllocMap,
            TieBreak,
        },
    },
    tac::{frontend, CfgError, ControlFlowGraph, Instr},
};

#[derive(Debug, Error)]
pub enum CompileErrorKind {
    #[error("malformed instruction")]
    MalformedInstruction,

    #[error("unreachable type")]
    UnreachableType,

    #[error("internal error")]
    Internal,

    #[error("configuration error")]
    Config,
}

#[derive(Debug, Error)]
#[error("{kind} in {stage}: {err}")]
pub struct CompileError {
    kind: CompileErrorKind,
    err: Box<dyn std::error::Error>,
    stage: String,
}

pub type CompileResult<T> = Result<T, CompileError>;

impl CompileError {
    pub fn malformed(stage: impl Into<String>, err: Box<dyn std::error::Error>) -> Self {
        Self {
            kind: CompileErrorKind::MalformedInstruction,
            err,
            stage: stage.into(),
        }
    }

    pub fn unreachable_type(stage: impl Into<String>, err: Box<dyn std::error::Error>) -> Self {
        Self {
            kind: CompileErrorKind::UnreachableType,
            err,
            stage: stage.into(),
        }
    }

    pub fn internal(stage: impl Into<String>, err: Box<dyn std::error::Error>) -> Self {
        Self {
            kind: CompileErrorKind::Internal,
            err,
            stage: stage.into(),
        }
    }

    pub fn config(stage: impl Into<String>, err: Box<dyn std::error::Error>) -> Self {
        Self {
            kind: CompileErrorKind::Config,
            err,
            stage: stage.into(),
        }
    }

    pub fn kind(&self) -> &CompileErrorKind { &self.kind }

    pub fn stage(&self) -> &str { &self.stage }

    pub fn source_error(&self) -> &dyn std::error::Error { self.err.as_ref() }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("register budget {0} is outside 1..=16")]
    InvalidBudget(usize),
}

/// Knobs of one compilation.
#[derive(Debug, Clone)]
pub struct CompileConfig {
    /// Registers the allocator may hand out, at most 16.
    pub max_regs: usize,
    /// Order among equally saturated variables.
    pub tie_break: TieBreak,
    /// Label of the emitted unit.
    pub name: String,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            max_regs: 8,
            tie_break: TieBreak::Insertion,
            name: "main".to_string(),
        }
    }
}

impl CompileConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_regs == 0 || self.max_regs > ALLOCATABLE_REGS.len() {
            return Err(ConfigError::InvalidBudget(self.max_regs));
        }
        Ok(())
    }
}

/// Everything the stages produced for one unit.
#[derive(Debug)]
pub struct CompileOutput {
    pub cfg: ControlFlowGraph,
    pub liveness: Liveness,
    pub graph: InterfGraph,
    pub alloc: RegisterAllocMap,
    pub function: MipsFunction,
}

fn classify_cfg(err: CfgError) -> CompileError {
    match err {
        CfgError::UndefinedLabel(_) | CfgError::DuplicateLabel(_) => CompileError::malformed("cfg", err.into()),
        CfgError::Graph(_) => CompileError::internal("cfg", err.into()),
    }
}

fn classify_lower(err: LowerError) -> CompileError {
    match err {
        LowerError::TooManyArguments { .. } | LowerError::ConstantOutOfRange(_) => {
            CompileError::malformed("lower", err.into())
        }
        LowerError::VoidResult(_) => CompileError::unreachable_type("lower", err.into()),
        LowerError::Unallocated(_)
        | LowerError::InvalidRegister(_)
        | LowerError::OutOfScratch
        | LowerError::FrameTooLarge(_) => CompileError::internal("lower", err.into()),
    }
}

/// Compile already parsed instructions.
pub fn compile_instrs(instrs: Vec<Instr>, config: &CompileConfig) -> CompileResult<CompileOutput> {
    config
        .validate()
        .map_err(|e| CompileError::config("config", e.into()))?;

    let cfg = ControlFlowGraph::from_instrs(instrs).map_err(classify_cfg)?;
    info!("cfg: {} blocks", cfg.len());

    let liveness = liveness_analysis::analyze(&cfg).map_err(|e| CompileError::internal("liveness", e.into()))?;
    info!("liveness: converged after {} passes", liveness.passes());

    let graph =
        interference_graph::build(&cfg, &liveness).map_err(|e| CompileError::internal("interference", e.into()))?;
    info!(
        "interference: {} variables, {} edges",
        graph.len(),
        graph.edge_count()
    );

    let alloc = reg_alloc::color_graph(&graph, config.max_regs, &config.tie_break)
        .map_err(|e| CompileError::config("coloring", e.into()))?;
    info!(
        "coloring: {} registers, {} spill slots",
        alloc.registers_used(),
        alloc.spill_slots()
    );

    let function = mips::lower_function(&config.name, &cfg, &alloc).map_err(classify_lower)?;
    info!("lower: {} instructions", function.body().len());

    Ok(CompileOutput {
        cfg,
        liveness,
        graph,
        alloc,
        function,
    })
}

/// Compile a unit of textual TAC.
pub fn compile(src: &str, config: &CompileConfig) -> CompileResult<CompileOutput> {
    let instrs = frontend::parse(src).map_err(|e| CompileError::malformed("parse", e.into()))?;
    info!("parse: {} instructions", instrs.len());
    compile_instrs(instrs, config)
}
