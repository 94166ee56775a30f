use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Pos {
    row: usize,
    col: usize,
}

impl Default for Pos {
    fn default() -> Self { Self { row: 1, col: 1 } }
}

impl Pos {
    pub fn new() -> Self { Self::default() }

    pub fn row(&self) -> usize { self.row }

    pub fn col(&self) -> usize { self.col }

    pub fn update(&mut self, c: char) {
        if c == '\n' {
            self.row += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}:{}", self.row, self.col) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordKind {
    If,
    Goto,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Ident(String),
    /// Decimal digits of an integer literal, sign excluded.
    Int(String),
    Keyword(KeywordKind),
    /// An operator symbol. Unknown operators are lexed too and rejected by
    /// the parser.
    Op(String),
    LeftParen,
    RightParen,
    Comma,
    Colon,
    /// The assignment `=`.
    Equal,
    Newline,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Ident(name) => write!(f, "identifier `{}`", name),
            TokenKind::Int(digits) => write!(f, "integer `{}`", digits),
            TokenKind::Keyword(KeywordKind::If) => write!(f, "`if`"),
            TokenKind::Keyword(KeywordKind::Goto) => write!(f, "`goto`"),
            TokenKind::Op(op) => write!(f, "operator `{}`", op),
            TokenKind::LeftParen => write!(f, "`(`"),
            TokenKind::RightParen => write!(f, "`)`"),
            TokenKind::Comma => write!(f, "`,`"),
            TokenKind::Colon => write!(f, "`:`"),
            TokenKind::Equal => write!(f, "`=`"),
            TokenKind::Newline => write!(f, "end of line"),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub pos: Pos,
    pub kind: TokenKind,
}

impl Token {
    pub fn new(pos: Pos, kind: TokenKind) -> Self { Self { pos, kind } }
}
