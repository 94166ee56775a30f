use std::fmt;

/// A TAC variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ident(String);

impl Ident {
    pub fn new(name: impl Into<String>) -> Self { Self(name.into()) }

    pub fn name(&self) -> &str { &self.0 }
}

impl From<&str> for Ident {
    fn from(name: &str) -> Self { Self::new(name) }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// An operand: either an integer constant or a variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Prim {
    Const(i64),
    Name(Ident),
}

impl Prim {
    pub fn name(name: impl Into<String>) -> Self { Prim::Name(Ident::new(name)) }

    pub fn ident(&self) -> Option<&Ident> {
        match self {
            Prim::Const(_) => None,
            Prim::Name(ident) => Some(ident),
        }
    }
}

impl fmt::Display for Prim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prim::Const(value) => write!(f, "{}", value),
            Prim::Name(ident) => write!(f, "{}", ident),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Eq,
    Ne,
    LtS,
    GtS,
    LeS,
    GeS,
}

impl BinaryOp {
    /// Whether swapping the operands keeps the result.
    pub fn is_commutative(&self) -> bool {
        match self {
            BinaryOp::Add | BinaryOp::Mul | BinaryOp::Eq | BinaryOp::Ne => true,
            BinaryOp::Sub | BinaryOp::LtS | BinaryOp::GtS | BinaryOp::LeS | BinaryOp::GeS => false,
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "+" => Some(BinaryOp::Add),
            "-" => Some(BinaryOp::Sub),
            "*" => Some(BinaryOp::Mul),
            "==" => Some(BinaryOp::Eq),
            "!=" => Some(BinaryOp::Ne),
            "<" => Some(BinaryOp::LtS),
            ">" => Some(BinaryOp::GtS),
            "<=" => Some(BinaryOp::LeS),
            ">=" => Some(BinaryOp::GeS),
            _ => None,
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryOp::Add => write!(f, "+"),
            BinaryOp::Sub => write!(f, "-"),
            BinaryOp::Mul => write!(f, "*"),
            BinaryOp::Eq => write!(f, "=="),
            BinaryOp::Ne => write!(f, "!="),
            BinaryOp::LtS => write!(f, "<"),
            BinaryOp::GtS => write!(f, ">"),
            BinaryOp::LeS => write!(f, "<="),
            BinaryOp::GeS => write!(f, ">="),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Exp {
    Prim(Prim),
    BinOp(Prim, BinaryOp, Prim),
}

impl fmt::Display for Exp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exp::Prim(p) => write!(f, "{}", p),
            Exp::BinOp(lhs, op, rhs) => write!(f, "{} {} {}", lhs, op, rhs),
        }
    }
}

/// A three-address-code instruction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Instr {
    Assign(Ident, Exp),
    Call(Option<Ident>, Ident, Vec<Prim>),
    /// Jump to the label if the test is non-zero.
    GotoIf(Prim, Ident),
    Goto(Ident),
    Label(Ident),
}

impl Instr {
    pub fn assign(var: impl Into<String>, exp: Exp) -> Self { Instr::Assign(Ident::new(var), exp) }

    /// The source of a plain copy `x = y`, if this is one.
    pub fn copy_source(&self) -> Option<&Ident> {
        match self {
            Instr::Assign(_, Exp::Prim(Prim::Name(src))) => Some(src),
            Instr::Assign(..)
            | Instr::Call(..)
            | Instr::GotoIf(..)
            | Instr::Goto(_)
            | Instr::Label(_) => None,
        }
    }

    /// Whether control may fall through to the next instruction.
    pub fn falls_through(&self) -> bool { !matches!(self, Instr::Goto(_)) }

    /// The jump target, if this is a branch.
    pub fn branch_target(&self) -> Option<&Ident> {
        match self {
            Instr::GotoIf(_, label) | Instr::Goto(label) => Some(label),
            Instr::Assign(..) | Instr::Call(..) | Instr::Label(_) => None,
        }
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::Assign(var, exp) => write!(f, "{} = {}", var, exp),
            Instr::Call(var, name, args) => {
                if let Some(var) = var {
                    write!(f, "{} = ", var)?;
                }
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Instr::GotoIf(test, label) => write!(f, "if {} goto {}", test, label),
            Instr::Goto(label) => write!(f, "goto {}", label),
            Instr::Label(label) => write!(f, "{}:", label),
        }
    }
}
