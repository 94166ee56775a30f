use core::fmt;

/// A signed 16-bit immediate, as taken by `addi` and `slti`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Imm16(i16);

impl Imm16 {
    pub fn as_i16(&self) -> i16 { self.0 }

    pub fn try_from_i64(x: i64) -> Option<Self> { i16::try_from(x).ok().map(Imm16) }
}

impl fmt::Display for Imm16 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "{}", self.0) }
}
