use std::fmt;

use super::{imm::Imm16, regs::PReg};
use crate::tac::BinaryOp;

/// A word in memory, addressed relative to a base register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemLoc {
    pub base: PReg,
    pub offset: i32,
}

impl fmt::Display for MemLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}({})", self.offset, self.base) }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MipsInst {
    Li {
        rd: PReg,
        imm: i32,
    },
    Move {
        rd: PReg,
        rs: PReg,
    },
    AluRRI {
        op: AluOpRRI,
        rd: PReg,
        rs: PReg,
        imm: Imm16,
    },
    AluRRR {
        op: AluOpRRR,
        rd: PReg,
        rs1: PReg,
        rs2: PReg,
    },
    Lw {
        rd: PReg,
        loc: MemLoc,
    },
    Sw {
        src: PReg,
        loc: MemLoc,
    },
    Label(String),
    J(String),
    Bnez {
        rs: PReg,
        label: String,
    },
    Jal(String),
    Jr(PReg),
}

impl MipsInst {
    /// Registers written by the instruction.
    pub fn defs(&self) -> Vec<PReg> {
        match self {
            MipsInst::Li { rd, .. }
            | MipsInst::Move { rd, .. }
            | MipsInst::AluRRI { rd, .. }
            | MipsInst::AluRRR { rd, .. }
            | MipsInst::Lw { rd, .. } => vec![*rd],
            MipsInst::Jal(_) => vec![super::regs::ra(), super::regs::RETURN_REG],
            MipsInst::Sw { .. }
            | MipsInst::Label(_)
            | MipsInst::J(_)
            | MipsInst::Bnez { .. }
            | MipsInst::Jr(_) => vec![],
        }
    }

    /// Registers read by the instruction.
    pub fn uses(&self) -> Vec<PReg> {
        match self {
            MipsInst::Move { rs, .. } | MipsInst::AluRRI { rs, .. } | MipsInst::Bnez { rs, .. } => {
                vec![*rs]
            }
            MipsInst::AluRRR { rs1, rs2, .. } => vec![*rs1, *rs2],
            MipsInst::Lw { loc, .. } => vec![loc.base],
            MipsInst::Sw { src, loc } => vec![*src, loc.base],
            MipsInst::Jr(rs) => vec![*rs],
            MipsInst::Li { .. } | MipsInst::Label(_) | MipsInst::J(_) | MipsInst::Jal(_) => vec![],
        }
    }
}

impl fmt::Display for MipsInst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use MipsInst as I;

        match self {
            I::Li { rd, imm } => write!(f, "li {}, {}", rd, imm),
            I::Move { rd, rs } => write!(f, "move {}, {}", rd, rs),
            I::AluRRI { op, rd, rs, imm } => write!(f, "{} {}, {}, {}", op, rd, rs, imm),
            I::AluRRR { op, rd, rs1, rs2 } => write!(f, "{} {}, {}, {}", op, rd, rs1, rs2),
            I::Lw { rd, loc } => write!(f, "lw {}, {}", rd, loc),
            I::Sw { src, loc } => write!(f, "sw {}, {}", src, loc),
            I::Label(label) => write!(f, "{}:", label),
            I::J(label) => write!(f, "j {}", label),
            I::Bnez { rs, label } => write!(f, "bnez {}, {}", rs, label),
            I::Jal(func) => write!(f, "jal {}", func),
            I::Jr(rs) => write!(f, "jr {}", rs),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AluOpRRR {
    Add,
    Sub,
    Mul,
    Seq,
    Sne,
    Slt,
    Sgt,
    Sle,
    Sge,
}

impl From<BinaryOp> for AluOpRRR {
    fn from(op: BinaryOp) -> Self {
        match op {
            BinaryOp::Add => AluOpRRR::Add,
            BinaryOp::Sub => AluOpRRR::Sub,
            BinaryOp::Mul => AluOpRRR::Mul,
            BinaryOp::Eq => AluOpRRR::Seq,
            BinaryOp::Ne => AluOpRRR::Sne,
            BinaryOp::LtS => AluOpRRR::Slt,
            BinaryOp::GtS => AluOpRRR::Sgt,
            BinaryOp::LeS => AluOpRRR::Sle,
            BinaryOp::GeS => AluOpRRR::Sge,
        }
    }
}

impl fmt::Display for AluOpRRR {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AluOpRRR::Add => write!(f, "add"),
            AluOpRRR::Sub => write!(f, "sub"),
            AluOpRRR::Mul => write!(f, "mul"),
            AluOpRRR::Seq => write!(f, "seq"),
            AluOpRRR::Sne => write!(f, "sne"),
            AluOpRRR::Slt => write!(f, "slt"),
            AluOpRRR::Sgt => write!(f, "sgt"),
            AluOpRRR::Sle => write!(f, "sle"),
            AluOpRRR::Sge => write!(f, "sge"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AluOpRRI {
    Addi,
    Slti,
}

impl AluOpRRI {
    /// The immediate form of a TAC operator, if the target has one.
    pub fn from_binary_op(op: BinaryOp) -> Option<Self> {
        match op {
            BinaryOp::Add => Some(AluOpRRI::Addi),
            BinaryOp::LtS => Some(AluOpRRI::Slti),
            BinaryOp::Sub
            | BinaryOp::Mul
            | BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::GtS
            | BinaryOp::LeS
            | BinaryOp::GeS => None,
        }
    }
}

impl fmt::Display for AluOpRRI {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AluOpRRI::Addi => write!(f, "addi"),
            AluOpRRI::Slti => write!(f, "slti"),
        }
    }
}
