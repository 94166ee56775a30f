use std::fmt;

/// A MIPS general purpose register, by hardware number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PReg(u8);

impl PReg {
    pub const fn new(num: u8) -> Self { Self(num) }

    pub const fn num(&self) -> u8 { self.0 }
}

pub const fn zero() -> PReg { PReg::new(0) }

pub const fn at() -> PReg { PReg::new(1) }

pub const fn v0() -> PReg { PReg::new(2) }

pub const fn v1() -> PReg { PReg::new(3) }

pub const fn a0() -> PReg { PReg::new(4) }

pub const fn a1() -> PReg { PReg::new(5) }

pub const fn a2() -> PReg { PReg::new(6) }

pub const fn a3() -> PReg { PReg::new(7) }

pub const fn t0() -> PReg { PReg::new(8) }

pub const fn t1() -> PReg { PReg::new(9) }

pub const fn t2() -> PReg { PReg::new(10) }

pub const fn t3() -> PReg { PReg::new(11) }

pub const fn t4() -> PReg { PReg::new(12) }

pub const fn t5() -> PReg { PReg::new(13) }

pub const fn t6() -> PReg { PReg::new(14) }

pub const fn t7() -> PReg { PReg::new(15) }

pub const fn s0() -> PReg { PReg::new(16) }

pub const fn s1() -> PReg { PReg::new(17) }

pub const fn s2() -> PReg { PReg::new(18) }

pub const fn s3() -> PReg { PReg::new(19) }

pub const fn s4() -> PReg { PReg::new(20) }

pub const fn s5() -> PReg { PReg::new(21) }

pub const fn s6() -> PReg { PReg::new(22) }

pub const fn s7() -> PReg { PReg::new(23) }

pub const fn t8() -> PReg { PReg::new(24) }

pub const fn t9() -> PReg { PReg::new(25) }

pub const fn k0() -> PReg { PReg::new(26) }

pub const fn k1() -> PReg { PReg::new(27) }

pub const fn gp() -> PReg { PReg::new(28) }

pub const fn sp() -> PReg { PReg::new(29) }

pub const fn fp() -> PReg { PReg::new(30) }

pub const fn ra() -> PReg { PReg::new(31) }

pub const fn display_preg(reg: PReg) -> &'static str {
    match reg.num() {
        0 => "$zero",
        1 => "$at",
        2 => "$v0",
        3 => "$v1",
        4 => "$a0",
        5 => "$a1",
        6 => "$a2",
        7 => "$a3",
        8 => "$t0",
        9 => "$t1",
        10 => "$t2",
        11 => "$t3",
        12 => "$t4",
        13 => "$t5",
        14 => "$t6",
        15 => "$t7",
        16 => "$s0",
        17 => "$s1",
        18 => "$s2",
        19 => "$s3",
        20 => "$s4",
        21 => "$s5",
        22 => "$s6",
        23 => "$s7",
        24 => "$t8",
        25 => "$t9",
        26 => "$k0",
        27 => "$k1",
        28 => "$gp",
        29 => "$sp",
        30 => "$fp",
        31 => "$ra",
        _ => "<invalid>",
    }
}

impl fmt::Display for PReg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", display_preg(*self)) }
}

/// Registers handed out by the allocator, in color order.
pub const ALLOCATABLE_REGS: [PReg; 16] = [
    s0(),
    s1(),
    s2(),
    s3(),
    s4(),
    s5(),
    s6(),
    s7(),
    t0(),
    t1(),
    t2(),
    t3(),
    t4(),
    t5(),
    t6(),
    t7(),
];

/// Never allocated, always available as scratch.
pub const RESERVED_SCRATCH_REGS: [PReg; 2] = [t8(), t9()];

/// Preserved across calls: a unit writing one saves it in its frame.
pub const CALLEE_SAVED_REGS: [PReg; 8] = [s0(), s1(), s2(), s3(), s4(), s5(), s6(), s7()];

/// Clobbered by calls: a value in one must be saved around `jal`.
pub const CALLER_SAVED_REGS: [PReg; 10] = [t0(), t1(), t2(), t3(), t4(), t5(), t6(), t7(), t8(), t9()];

pub const ARG_REGS: [PReg; 4] = [a0(), a1(), a2(), a3()];

pub const RETURN_REG: PReg = v0();

/// The physical register for an allocator register index.
pub fn allocatable(index: usize) -> Option<PReg> { ALLOCATABLE_REGS.get(index).copied() }

/// Scratch candidates under a register budget: allocatable registers the
/// budget leaves unused, then the reserved ones.
pub fn scratch_candidates(max_regs: usize) -> Vec<PReg> {
    ALLOCATABLE_REGS
        .iter()
        .skip(max_regs)
        .chain(RESERVED_SCRATCH_REGS.iter())
        .copied()
        .collect()
}
