use std::{iter::Peekable, str::Chars};

use super::{
    tokens::{KeywordKind, Pos, Token, TokenKind},
    ParseError,
};

pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    curr_pos: Pos,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            chars: src.chars().peekable(),
            curr_pos: Pos::new(),
        }
    }

    fn peek_char(&mut self) -> Option<char> { self.chars.peek().copied() }

    fn next_char(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.curr_pos.update(c);
        Some(c)
    }

    pub fn next_token(&mut self) -> Result<Token, ParseError> {
        // skip blanks and comments, but not newlines
        while let Some(c) = self.peek_char() {
            if c == '#' {
                while self.peek_char().is_some_and(|c| c != '\n') {
                    self.next_char();
                }
            } else if c.is_whitespace() && c != '\n' {
                self.next_char();
            } else {
                break;
            }
        }

        let start = self.curr_pos;

        let Some(c) = self.peek_char() else {
            return Ok(Token::new(start, TokenKind::Eof));
        };

        if c.is_ascii_digit() {
            return Ok(Token::new(start, TokenKind::Int(self.take_while(|c| c.is_ascii_digit()))));
        }

        if c.is_alphabetic() || c == '_' {
            let word = self.take_while(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '$'));
            let kind = match word.as_str() {
                "if" => TokenKind::Keyword(KeywordKind::If),
                "goto" => TokenKind::Keyword(KeywordKind::Goto),
                _ => TokenKind::Ident(word),
            };
            return Ok(Token::new(start, kind));
        }

        self.next_char();
        let kind = match c {
            '\n' => TokenKind::Newline,
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '=' => {
                if self.peek_char() == Some('=') {
                    self.next_char();
                    TokenKind::Op("==".to_string())
                } else {
                    TokenKind::Equal
                }
            }
            '!' | '<' | '>' => {
                let mut op = c.to_string();
                if self.peek_char() == Some('=') {
                    self.next_char();
                    op.push('=');
                }
                TokenKind::Op(op)
            }
            '+' | '-' | '*' | '/' | '%' | '&' | '|' | '^' => TokenKind::Op(c.to_string()),
            _ => return Err(ParseError::UnexpectedChar { pos: start, ch: c }),
        };

        Ok(Token::new(start, kind))
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let mut s = String::new();
        while let Some(c) = self.peek_char() {
            if !pred(c) {
                break;
            }
            s.push(c);
            self.next_char();
        }
        s
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(src);
        let mut kinds = Vec::new();
        loop {
            let token = lexer.next_token().unwrap();
            if token.kind == TokenKind::Eof {
                break;
            }
            kinds.push(token.kind);
        }
        kinds
    }

    #[test]
    fn test_lex_line() {
        assert_eq!(
            kinds("t = x <= -12 # compare\n"),
            vec![
                TokenKind::Ident("t".to_string()),
                TokenKind::Equal,
                TokenKind::Ident("x".to_string()),
                TokenKind::Op("<=".to_string()),
                TokenKind::Op("-".to_string()),
                TokenKind::Int("12".to_string()),
                TokenKind::Newline,
            ]
        );
    }

    #[test]
    fn test_lex_keywords() {
        assert_eq!(
            kinds("if c goto L1"),
            vec![
                TokenKind::Keyword(KeywordKind::If),
                TokenKind::Ident("c".to_string()),
                TokenKind::Keyword(KeywordKind::Goto),
                TokenKind::Ident("L1".to_string()),
            ]
        );
    }

    #[test]
    fn test_lex_position() {
        let mut lexer = Lexer::new("x = 1\n  y @");
        for _ in 0..5 {
            lexer.next_token().unwrap();
        }
        match lexer.next_token() {
            Err(ParseError::UnexpectedChar { pos, ch }) => {
                assert_eq!(ch, '@');
                assert_eq!((pos.row(), pos.col()), (2, 5));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
