//! # TAC Text Frontend
//!
//! Reads the line-oriented textual form of three-address code:
//!
//! ```text
//! # comments run to the end of the line
//! x = 1
//! L1:
//! y = x + -3
//! t = y < 10
//! if t goto L1
//! r = input_int()
//! print(r)
//! goto L2
//! ```

pub mod lexer;
pub mod parser;
pub mod tokens;

pub use parser::Parser;
use thiserror::Error;
use tokens::Pos;

use super::ast::Instr;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("{pos}: unexpected character `{ch}`")]
    UnexpectedChar { pos: Pos, ch: char },

    #[error("{pos}: unexpected {found}, expected {expected}")]
    UnexpectedToken {
        pos: Pos,
        found: String,
        expected: &'static str,
    },

    #[error("{pos}: unknown operator `{op}`")]
    UnknownOperator { pos: Pos, op: String },

    #[error("{pos}: integer literal out of range: {literal}")]
    InvalidInteger { pos: Pos, literal: String },
}

/// Parse a TAC listing.
pub fn parse(src: &str) -> Result<Vec<Instr>, ParseError> { Parser::new(src).parse() }
