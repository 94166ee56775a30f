use std::fmt;

use log::{debug, trace};
use thiserror::Error;

use super::{
    imm::Imm16,
    inst::{AluOpRRI, AluOpRRR, MemLoc, MipsInst},
    regs::{self, PReg, ARG_REGS, CALLEE_SAVED_REGS, CALLER_SAVED_REGS, RETURN_REG},
};
use crate::{
    backend::reg_alloc::{Location, RegisterAllocMap},
    tac::{BinaryOp, ControlFlowGraph, Exp, Ident, Instr, Prim},
};

pub const WORD_SIZE: usize = 4;

/// Builtins that produce no value.
pub const VOID_BUILTINS: [&str; 1] = ["print"];

#[derive(Debug, Error)]
pub enum LowerError {
    #[error("call to `{callee}` passes {count} arguments, at most 4 fit in registers")]
    TooManyArguments { callee: Ident, count: usize },

    #[error("`{0}` returns no value but its result is assigned")]
    VoidResult(Ident),

    #[error("variable `{0}` has no register or spill slot")]
    Unallocated(Ident),

    #[error("register index {0} is outside the allocatable set")]
    InvalidRegister(usize),

    #[error("no scratch register left")]
    OutOfScratch,

    #[error("frame of {0} bytes does not fit an immediate")]
    FrameTooLarge(usize),

    #[error("constant {0} does not fit a 32-bit word")]
    ConstantOutOfRange(i64),
}

/// Stack frame of a lowered unit.
///
/// From `$sp` upwards: the spill slots, one word per caller-saved register
/// kept across calls, one word per callee-saved register the unit writes,
/// then the return address.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    spill_slots: usize,
    call_saved: Vec<PReg>,
    callee_saved: Vec<PReg>,
    saves_ra: bool,
}

impl Frame {
    pub fn new(spill_slots: usize, saves_ra: bool) -> Self {
        Self {
            spill_slots,
            saves_ra,
            ..Default::default()
        }
    }

    /// The frame needed to run the body of `cfg` under `map`.
    ///
    /// Callee-saved registers are only known once the body is lowered, see
    /// [Frame::with_callee_saved].
    pub fn for_unit(cfg: &ControlFlowGraph, map: &RegisterAllocMap) -> Self {
        let has_calls = cfg
            .instrs()
            .any(|(_, instr)| matches!(instr, Instr::Call(..)));
        let frame = Self::new(map.spill_slots(), has_calls);
        if !has_calls {
            return frame;
        }

        let mut held: Vec<PReg> = map
            .iter()
            .into_iter()
            .filter_map(|(_, location)| match location {
                Location::Register(index) => regs::allocatable(index),
                Location::Spill(_) => None,
            })
            .filter(|reg| CALLER_SAVED_REGS.contains(reg))
            .collect();
        held.sort();
        held.dedup();
        frame.with_call_saved(held)
    }

    pub fn with_call_saved(mut self, regs: Vec<PReg>) -> Self {
        self.call_saved = regs;
        self
    }

    pub fn with_callee_saved(mut self, regs: Vec<PReg>) -> Self {
        self.callee_saved = regs;
        self
    }

    pub fn spill_slots(&self) -> usize { self.spill_slots }

    /// Caller-saved registers holding variables, kept across every call.
    pub fn call_saved(&self) -> &[PReg] { &self.call_saved }

    /// Callee-saved registers the unit writes.
    pub fn callee_saved(&self) -> &[PReg] { &self.callee_saved }

    pub fn saves_ra(&self) -> bool { self.saves_ra }

    /// Frame size in bytes.
    pub fn size(&self) -> usize {
        let words = self.spill_slots + self.call_saved.len() + self.callee_saved.len() + usize::from(self.saves_ra);
        words * WORD_SIZE
    }

    pub fn is_empty(&self) -> bool { self.size() == 0 }

    pub fn spill_loc(&self, slot: usize) -> MemLoc {
        MemLoc {
            base: regs::sp(),
            offset: (slot * WORD_SIZE) as i32,
        }
    }

    pub fn call_save_loc(&self, index: usize) -> MemLoc { self.spill_loc(self.spill_slots + index) }

    pub fn callee_save_loc(&self, index: usize) -> MemLoc {
        self.spill_loc(self.spill_slots + self.call_saved.len() + index)
    }

    pub fn ra_loc(&self) -> MemLoc {
        self.spill_loc(self.spill_slots + self.call_saved.len() + self.callee_saved.len())
    }
}

/// Scratch registers for one instruction.
///
/// Candidates come from outside the register budget, so they never hold a
/// live variable. Registers the instruction reads or writes are skipped.
struct Scratch {
    candidates: Vec<PReg>,
    avoid: Vec<PReg>,
}

impl Scratch {
    fn new(max_regs: usize, avoid: Vec<PReg>) -> Self {
        Self {
            candidates: regs::scratch_candidates(max_regs),
            avoid,
        }
    }

    fn take(&mut self) -> Result<PReg, LowerError> {
        let pos = self
            .candidates
            .iter()
            .position(|r| !self.avoid.contains(r))
            .ok_or(LowerError::OutOfScratch)?;
        let reg = self.candidates.remove(pos);
        self.avoid.push(reg);
        Ok(reg)
    }
}

/// Where an operand currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operand {
    Reg(PReg),
    Spill(usize),
    Const(i32),
}

pub struct MipsLowering<'a> {
    name: &'a str,
    map: &'a RegisterAllocMap,
    frame: Frame,
}

impl<'a> MipsLowering<'a> {
    pub fn new(name: &'a str, map: &'a RegisterAllocMap, frame: Frame) -> Self { Self { name, map, frame } }

    pub fn frame(&self) -> &Frame { &self.frame }

    /// Block labels live under the unit name, apart from the unit label.
    fn label(&self, label: &Ident) -> String { format!("{}.{}", self.name, label.name()) }

    fn location(&self, v: &Ident) -> Result<Location, LowerError> {
        self.map
            .location(v)
            .ok_or_else(|| LowerError::Unallocated(v.clone()))
    }

    fn reg_of(&self, v: &Ident) -> Result<Option<PReg>, LowerError> {
        match self.location(v)? {
            Location::Register(index) => regs::allocatable(index)
                .map(Some)
                .ok_or(LowerError::InvalidRegister(index)),
            Location::Spill(_) => Ok(None),
        }
    }

    fn operand(&self, prim: &Prim) -> Result<Operand, LowerError> {
        match prim {
            Prim::Const(value) => i32::try_from(*value)
                .map(Operand::Const)
                .map_err(|_| LowerError::ConstantOutOfRange(*value)),
            Prim::Name(v) => match self.location(v)? {
                Location::Register(index) => regs::allocatable(index)
                    .map(Operand::Reg)
                    .ok_or(LowerError::InvalidRegister(index)),
                Location::Spill(slot) => Ok(Operand::Spill(slot)),
            },
        }
    }

    /// Lower one TAC instruction.
    pub fn lower_instr(&self, instr: &Instr) -> Result<Vec<MipsInst>, LowerError> {
        let insts = match instr {
            Instr::Assign(dst, Exp::Prim(src)) => self.lower_copy(dst, src)?,
            Instr::Assign(dst, Exp::BinOp(lhs, op, rhs)) => self.lower_binary(dst, lhs, *op, rhs)?,
            Instr::Call(dst, callee, args) => self.lower_call(dst.as_ref(), callee, args)?,
            Instr::GotoIf(test, label) => self.lower_branch(test, label)?,
            Instr::Goto(label) => vec![MipsInst::J(self.label(label))],
            Instr::Label(label) => vec![MipsInst::Label(self.label(label))],
        };
        trace!("lower: `{}` -> {} instructions", instr, insts.len());
        Ok(insts)
    }

    fn lower_copy(&self, dst: &Ident, src: &Prim) -> Result<Vec<MipsInst>, LowerError> {
        let src = self.operand(src)?;
        let mut insts = Vec::new();

        match (self.location(dst)?, src) {
            (Location::Register(_), Operand::Const(imm)) => {
                let rd = self.dst_reg(dst)?;
                insts.push(MipsInst::Li { rd, imm });
            }
            (Location::Register(_), Operand::Reg(rs)) => {
                let rd = self.dst_reg(dst)?;
                if rd != rs {
                    insts.push(MipsInst::Move { rd, rs });
                }
            }
            (Location::Register(_), Operand::Spill(slot)) => {
                let rd = self.dst_reg(dst)?;
                insts.push(MipsInst::Lw {
                    rd,
                    loc: self.frame.spill_loc(slot),
                });
            }
            (Location::Spill(slot), Operand::Const(imm)) => {
                let mut scratch = Scratch::new(self.map.max_regs(), vec![]);
                let tmp = scratch.take()?;
                insts.push(MipsInst::Li { rd: tmp, imm });
                insts.push(MipsInst::Sw {
                    src: tmp,
                    loc: self.frame.spill_loc(slot),
                });
            }
            (Location::Spill(slot), Operand::Reg(rs)) => {
                insts.push(MipsInst::Sw {
                    src: rs,
                    loc: self.frame.spill_loc(slot),
                });
            }
            (Location::Spill(dst_slot), Operand::Spill(src_slot)) => {
                if dst_slot != src_slot {
                    let mut scratch = Scratch::new(self.map.max_regs(), vec![]);
                    let tmp = scratch.take()?;
                    insts.push(MipsInst::Lw {
                        rd: tmp,
                        loc: self.frame.spill_loc(src_slot),
                    });
                    insts.push(MipsInst::Sw {
                        src: tmp,
                        loc: self.frame.spill_loc(dst_slot),
                    });
                }
            }
        }

        Ok(insts)
    }

    fn dst_reg(&self, dst: &Ident) -> Result<PReg, LowerError> {
        self.reg_of(dst)?
            .ok_or_else(|| LowerError::Unallocated(dst.clone()))
    }

    fn lower_binary(
        &self,
        dst: &Ident,
        lhs: &Prim,
        op: BinaryOp,
        rhs: &Prim,
    ) -> Result<Vec<MipsInst>, LowerError> {
        let mut lhs = self.operand(lhs)?;
        let mut rhs = self.operand(rhs)?;
        let imm_op = AluOpRRI::from_binary_op(op);

        // move a lone constant to the immediate position
        if matches!(lhs, Operand::Const(_))
            && !matches!(rhs, Operand::Const(_))
            && op.is_commutative()
            && imm_op.is_some()
        {
            std::mem::swap(&mut lhs, &mut rhs);
        }

        let rd = self.reg_of(dst)?;
        let mut avoid: Vec<PReg> = rd.into_iter().collect();
        for operand in [lhs, rhs] {
            if let Operand::Reg(r) = operand {
                avoid.push(r);
            }
        }
        let mut scratch = Scratch::new(self.map.max_regs(), avoid);
        let mut insts = Vec::new();
        // first scratch taken for an operand, reused as the target of a
        // spilled destination
        let mut operand_scratch: Option<PReg> = None;

        let rs1 = match lhs {
            Operand::Reg(r) => r,
            Operand::Spill(slot) => {
                let tmp = scratch.take()?;
                operand_scratch.get_or_insert(tmp);
                insts.push(MipsInst::Lw {
                    rd: tmp,
                    loc: self.frame.spill_loc(slot),
                });
                tmp
            }
            Operand::Const(imm) => {
                // both constants: nothing is read later, so the destination
                // can hold the left one
                let target = match (rd, rhs) {
                    (Some(rd), Operand::Const(_)) => rd,
                    (None, _) | (Some(_), Operand::Reg(_) | Operand::Spill(_)) => {
                        let tmp = scratch.take()?;
                        operand_scratch.get_or_insert(tmp);
                        tmp
                    }
                };
                insts.push(MipsInst::Li { rd: target, imm });
                target
            }
        };

        let rhs_imm = match (rhs, imm_op) {
            (Operand::Const(value), Some(imm_op)) => Imm16::try_from_i64(i64::from(value)).map(|imm| (imm_op, imm)),
            (Operand::Const(_), None) | (Operand::Reg(_) | Operand::Spill(_), _) => None,
        };

        let rs2 = match (rhs_imm, rhs) {
            (Some(_), _) => None,
            (None, Operand::Reg(r)) => Some(r),
            (None, Operand::Spill(slot)) => {
                if lhs == rhs {
                    Some(rs1)
                } else {
                    let tmp = scratch.take()?;
                    operand_scratch.get_or_insert(tmp);
                    insts.push(MipsInst::Lw {
                        rd: tmp,
                        loc: self.frame.spill_loc(slot),
                    });
                    Some(tmp)
                }
            }
            (None, Operand::Const(imm)) => {
                let tmp = scratch.take()?;
                operand_scratch.get_or_insert(tmp);
                insts.push(MipsInst::Li { rd: tmp, imm });
                Some(tmp)
            }
        };

        let target = match rd {
            Some(rd) => rd,
            None => match operand_scratch {
                Some(tmp) => tmp,
                None => scratch.take()?,
            },
        };

        match (rhs_imm, rs2) {
            (Some((op, imm)), _) => insts.push(MipsInst::AluRRI {
                op,
                rd: target,
                rs: rs1,
                imm,
            }),
            (None, Some(rs2)) => insts.push(MipsInst::AluRRR {
                op: op.into(),
                rd: target,
                rs1,
                rs2,
            }),
            (None, None) => return Err(LowerError::OutOfScratch),
        }

        if let Location::Spill(slot) = self.location(dst)? {
            insts.push(MipsInst::Sw {
                src: target,
                loc: self.frame.spill_loc(slot),
            });
        }

        Ok(insts)
    }

    fn lower_call(
        &self,
        dst: Option<&Ident>,
        callee: &Ident,
        args: &[Prim],
    ) -> Result<Vec<MipsInst>, LowerError> {
        if args.len() > ARG_REGS.len() {
            return Err(LowerError::TooManyArguments {
                callee: callee.clone(),
                count: args.len(),
            });
        }
        if dst.is_some() && VOID_BUILTINS.contains(&callee.name()) {
            return Err(LowerError::VoidResult(callee.clone()));
        }

        let dst_reg = match dst {
            Some(dst) => self.reg_of(dst)?,
            None => None,
        };
        // the destination is overwritten by the result anyway
        let kept: Vec<(usize, PReg)> = self
            .frame
            .call_saved()
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, reg)| Some(*reg) != dst_reg)
            .collect();

        let mut insts = Vec::new();
        for (index, reg) in kept.iter().copied() {
            insts.push(MipsInst::Sw {
                src: reg,
                loc: self.frame.call_save_loc(index),
            });
        }
        for (arg, rd) in args.iter().zip(ARG_REGS) {
            match self.operand(arg)? {
                Operand::Reg(rs) => insts.push(MipsInst::Move { rd, rs }),
                Operand::Spill(slot) => insts.push(MipsInst::Lw {
                    rd,
                    loc: self.frame.spill_loc(slot),
                }),
                Operand::Const(imm) => insts.push(MipsInst::Li { rd, imm }),
            }
        }
        insts.push(MipsInst::Jal(callee.name().to_string()));
        for (index, reg) in kept.iter().copied() {
            insts.push(MipsInst::Lw {
                rd: reg,
                loc: self.frame.call_save_loc(index),
            });
        }

        if let Some(dst) = dst {
            match self.location(dst)? {
                Location::Register(_) => insts.push(MipsInst::Move {
                    rd: self.dst_reg(dst)?,
                    rs: RETURN_REG,
                }),
                Location::Spill(slot) => insts.push(MipsInst::Sw {
                    src: RETURN_REG,
                    loc: self.frame.spill_loc(slot),
                }),
            }
        }

        Ok(insts)
    }

    fn lower_branch(&self, test: &Prim, label: &Ident) -> Result<Vec<MipsInst>, LowerError> {
        let label = self.label(label);
        let insts = match self.operand(test)? {
            Operand::Reg(rs) => vec![MipsInst::Bnez { rs, label }],
            Operand::Spill(slot) => {
                let mut scratch = Scratch::new(self.map.max_regs(), vec![]);
                let tmp = scratch.take()?;
                vec![
                    MipsInst::Lw {
                        rd: tmp,
                        loc: self.frame.spill_loc(slot),
                    },
                    MipsInst::Bnez { rs: tmp, label },
                ]
            }
            Operand::Const(0) => vec![],
            Operand::Const(_) => vec![MipsInst::J(label)],
        };
        Ok(insts)
    }
}

/// A lowered unit: frame setup, the body, frame teardown and return.
#[derive(Debug, Clone)]
pub struct MipsFunction {
    name: String,
    frame: Frame,
    body: Vec<MipsInst>,
}

impl MipsFunction {
    pub fn name(&self) -> &str { &self.name }

    pub fn frame(&self) -> &Frame { &self.frame }

    pub fn body(&self) -> &[MipsInst] { &self.body }

    fn frame_imm(&self, size: i64) -> Result<Imm16, LowerError> {
        Imm16::try_from_i64(size).ok_or(LowerError::FrameTooLarge(self.frame.size()))
    }

    pub fn prologue(&self) -> Result<Vec<MipsInst>, LowerError> {
        let mut insts = Vec::new();
        if self.frame.is_empty() {
            return Ok(insts);
        }
        insts.push(MipsInst::AluRRI {
            op: AluOpRRI::Addi,
            rd: regs::sp(),
            rs: regs::sp(),
            imm: self.frame_imm(-(self.frame.size() as i64))?,
        });
        if self.frame.saves_ra() {
            insts.push(MipsInst::Sw {
                src: regs::ra(),
                loc: self.frame.ra_loc(),
            });
        }
        for (index, reg) in self.frame.callee_saved().iter().enumerate() {
            insts.push(MipsInst::Sw {
                src: *reg,
                loc: self.frame.callee_save_loc(index),
            });
        }
        Ok(insts)
    }

    pub fn epilogue(&self) -> Result<Vec<MipsInst>, LowerError> {
        let mut insts = Vec::new();
        if !self.frame.is_empty() {
            for (index, reg) in self.frame.callee_saved().iter().enumerate() {
                insts.push(MipsInst::Lw {
                    rd: *reg,
                    loc: self.frame.callee_save_loc(index),
                });
            }
            if self.frame.saves_ra() {
                insts.push(MipsInst::Lw {
                    rd: regs::ra(),
                    loc: self.frame.ra_loc(),
                });
            }
            insts.push(MipsInst::AluRRI {
                op: AluOpRRI::Addi,
                rd: regs::sp(),
                rs: regs::sp(),
                imm: self.frame_imm(self.frame.size() as i64)?,
            });
        }
        insts.push(MipsInst::Jr(regs::ra()));
        Ok(insts)
    }

    /// Every instruction of the unit, in layout order.
    pub fn instrs(&self) -> Result<Vec<MipsInst>, LowerError> {
        let mut insts = self.prologue()?;
        insts.extend(self.body.iter().cloned());
        insts.extend(self.epilogue()?);
        Ok(insts)
    }
}

impl fmt::Display for MipsFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let insts = self.instrs().map_err(|_| fmt::Error)?;
        writeln!(f, "\t.text")?;
        writeln!(f, "\t.globl {}", self.name)?;
        writeln!(f, "{}:", self.name)?;
        for inst in insts {
            match inst {
                MipsInst::Label(_) => writeln!(f, "{}", inst)?,
                MipsInst::Li { .. }
                | MipsInst::Move { .. }
                | MipsInst::AluRRI { .. }
                | MipsInst::AluRRR { .. }
                | MipsInst::Lw { .. }
                | MipsInst::Sw { .. }
                | MipsInst::J(_)
                | MipsInst::Bnez { .. }
                | MipsInst::Jal(_)
                | MipsInst::Jr(_) => writeln!(f, "\t{}", inst)?,
            }
        }
        Ok(())
    }
}

/// Lower a whole unit under a register assignment.
pub fn lower_function(
    name: &str,
    cfg: &ControlFlowGraph,
    map: &RegisterAllocMap,
) -> Result<MipsFunction, LowerError> {
    let lowering = MipsLowering::new(name, map, Frame::for_unit(cfg, map));

    let mut body = Vec::new();
    for (_, instr) in cfg.instrs() {
        body.extend(lowering.lower_instr(instr)?);
    }

    // the callee-saved area sits above every offset the body uses
    let written: Vec<PReg> = CALLEE_SAVED_REGS
        .iter()
        .copied()
        .filter(|reg| body.iter().any(|inst| inst.defs().contains(reg)))
        .collect();
    let frame = lowering.frame().clone().with_callee_saved(written);

    let function = MipsFunction {
        name: name.to_string(),
        frame,
        body,
    };
    // surface an oversized frame here rather than at display time
    function.prologue()?;

    debug!(
        "lower: `{}` with {} instructions, frame of {} bytes",
        function.name,
        function.body.len(),
        function.frame.size()
    );

    Ok(function)
}
