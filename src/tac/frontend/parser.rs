use super::{
    lexer::Lexer,
    tokens::{KeywordKind, Pos, Token, TokenKind},
    ParseError,
};
use crate::tac::ast::{BinaryOp, Exp, Ident, Instr, Prim};

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    /// Current token
    curr_token: Token,
    /// Peeked
    peeked: bool,
}

impl<'a> Parser<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            lexer: Lexer::new(src),
            curr_token: Token::new(Pos::default(), TokenKind::Eof),
            peeked: false,
        }
    }

    fn next_token(&mut self) -> Result<&Token, ParseError> {
        if self.peeked {
            self.peeked = false;
            return Ok(&self.curr_token);
        }
        self.curr_token = self.lexer.next_token()?;
        Ok(&self.curr_token)
    }

    fn peek_token(&mut self) -> Result<&Token, ParseError> {
        if self.peeked {
            return Ok(&self.curr_token);
        }
        self.curr_token = self.lexer.next_token()?;
        self.peeked = true;
        Ok(&self.curr_token)
    }

    fn eat(&mut self) { self.peeked = false; }

    fn unexpected(token: &Token, expected: &'static str) -> ParseError {
        ParseError::UnexpectedToken {
            pos: token.pos,
            found: token.kind.to_string(),
            expected,
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &'static str) -> Result<(), ParseError> {
        let token = self.next_token()?;
        if token.kind == kind {
            Ok(())
        } else {
            Err(Self::unexpected(token, expected))
        }
    }

    fn expect_ident(&mut self) -> Result<Ident, ParseError> {
        let token = self.next_token()?;
        match &token.kind {
            TokenKind::Ident(name) => Ok(Ident::new(name.clone())),
            _ => Err(Self::unexpected(token, "identifier")),
        }
    }

    /// Parse the whole listing into a flat instruction list.
    pub fn parse(&mut self) -> Result<Vec<Instr>, ParseError> {
        let mut instrs = Vec::new();
        loop {
            let kind = self.peek_token()?.kind.clone();
            match kind {
                TokenKind::Eof => break,
                TokenKind::Newline => self.eat(),
                _ => {
                    instrs.push(self.parse_instr()?);
                    let token = self.next_token()?;
                    if !matches!(token.kind, TokenKind::Newline | TokenKind::Eof) {
                        return Err(Self::unexpected(token, "end of line"));
                    }
                }
            }
        }
        Ok(instrs)
    }

    fn parse_instr(&mut self) -> Result<Instr, ParseError> {
        let token = self.next_token()?.clone();
        match token.kind {
            TokenKind::Keyword(KeywordKind::Goto) => Ok(Instr::Goto(self.expect_ident()?)),
            TokenKind::Keyword(KeywordKind::If) => {
                let test = self.parse_prim()?;
                self.expect(TokenKind::Keyword(KeywordKind::Goto), "`goto`")?;
                Ok(Instr::GotoIf(test, self.expect_ident()?))
            }
            TokenKind::Ident(name) => {
                let ident = Ident::new(name);
                let next = self.next_token()?.clone();
                match next.kind {
                    TokenKind::Colon => Ok(Instr::Label(ident)),
                    TokenKind::LeftParen => Ok(Instr::Call(None, ident, self.parse_args()?)),
                    TokenKind::Equal => self.parse_assign(ident),
                    _ => Err(Self::unexpected(&next, "`:`, `(` or `=`")),
                }
            }
            _ => Err(Self::unexpected(&token, "instruction")),
        }
    }

    fn parse_assign(&mut self, var: Ident) -> Result<Instr, ParseError> {
        let lhs = self.parse_prim()?;

        // a call with a result
        if let Prim::Name(func) = &lhs {
            if self.peek_token()?.kind == TokenKind::LeftParen {
                self.eat();
                let func = func.clone();
                return Ok(Instr::Call(Some(var), func, self.parse_args()?));
            }
        }

        let token = self.peek_token()?.clone();
        match token.kind {
            TokenKind::Op(symbol) => {
                self.eat();
                let op = BinaryOp::from_symbol(&symbol).ok_or(ParseError::UnknownOperator {
                    pos: token.pos,
                    op: symbol,
                })?;
                let rhs = self.parse_prim()?;
                Ok(Instr::Assign(var, Exp::BinOp(lhs, op, rhs)))
            }
            _ => Ok(Instr::Assign(var, Exp::Prim(lhs))),
        }
    }

    /// Parse the arguments after an opening parenthesis.
    fn parse_args(&mut self) -> Result<Vec<Prim>, ParseError> {
        let mut args = Vec::new();
        if self.peek_token()?.kind == TokenKind::RightParen {
            self.eat();
            return Ok(args);
        }
        loop {
            args.push(self.parse_prim()?);
            let token = self.next_token()?;
            match token.kind {
                TokenKind::Comma => continue,
                TokenKind::RightParen => break,
                _ => return Err(Self::unexpected(token, "`,` or `)`")),
            }
        }
        Ok(args)
    }

    fn parse_prim(&mut self) -> Result<Prim, ParseError> {
        let token = self.next_token()?.clone();
        match token.kind {
            TokenKind::Ident(name) => Ok(Prim::Name(Ident::new(name))),
            TokenKind::Int(digits) => Self::parse_int(token.pos, &digits, false),
            TokenKind::Op(op) if op == "-" => {
                let next = self.next_token()?.clone();
                match next.kind {
                    TokenKind::Int(digits) => Self::parse_int(token.pos, &digits, true),
                    _ => Err(Self::unexpected(&next, "integer")),
                }
            }
            _ => Err(Self::unexpected(&token, "identifier or integer")),
        }
    }

    fn parse_int(pos: Pos, digits: &str, negative: bool) -> Result<Prim, ParseError> {
        let literal = if negative {
            format!("-{}", digits)
        } else {
            digits.to_string()
        };
        // constants must fit a 32-bit word
        literal
            .parse::<i32>()
            .map(|value| Prim::Const(i64::from(value)))
            .map_err(|_| ParseError::InvalidInteger { pos, literal })
    }
}
