// Module: Parser
// Recursive-descent parser with two tokens of lookahead.
//
// Grammar:
//   program  = { "." call } EOF .
//   call     = IDENTIFIER "(" [ arg { "," arg } ] ")" .
//   arg      = call | NUMBER | STRING .
//
// The first error wins; there is no recovery.

use crate::matcher::MatchError;

use super::ast::{Call, Node};
use super::lexer::Lexer;
use super::token::{Token, TokenKind};

pub struct Parser {
    lexer: Lexer,
    current: Token,
    next: Token,
}

impl Parser {
    pub fn new(mut lexer: Lexer) -> Self {
        let current = lexer.next_token();
        let next = lexer.next_token();
        Self {
            lexer,
            current,
            next,
        }
    }

    pub fn parse(mut self) -> Result<Vec<Call>, MatchError> {
        let mut program = Vec::new();
        while self.current.kind != TokenKind::Eof {
            if self.current.kind == TokenKind::Illegal {
                return Err(MatchError::IllegalToken {
                    literal: self.current.literal.clone(),
                });
            }
            if self.current.kind != TokenKind::Dot {
                return Err(bad_token(TokenKind::Dot.to_string(), &self.current));
            }
            self.advance();
            program.push(self.parse_call()?);
            self.advance();
        }
        Ok(program)
    }

    fn parse_call(&mut self) -> Result<Call, MatchError> {
        if self.current.kind != TokenKind::Identifier {
            return Err(bad_token(TokenKind::Identifier.to_string(), &self.current));
        }
        let name = self.current.clone();
        self.expect_next(TokenKind::LParen)?;

        let mut args = Vec::new();
        while self.next.kind != TokenKind::RParen {
            match self.next.kind {
                TokenKind::Identifier => {
                    self.advance();
                    args.push(Node::Call(self.parse_call()?));
                }
                TokenKind::Number | TokenKind::Str => {
                    self.advance();
                    args.push(Node::Value(self.current.clone()));
                }
                _ => {
                    return Err(bad_token(
                        format!(
                            "{}, {} or {}",
                            TokenKind::Identifier,
                            TokenKind::Number,
                            TokenKind::Str
                        ),
                        &self.next,
                    ));
                }
            }
            match self.next.kind {
                TokenKind::Comma => self.advance(),
                TokenKind::RParen => {}
                _ => {
                    return Err(bad_token(
                        format!("{} or {}", TokenKind::Comma, TokenKind::RParen),
                        &self.next,
                    ));
                }
            }
        }
        self.advance();
        Ok(Call { name, args })
    }

    fn advance(&mut self) {
        self.current = std::mem::replace(&mut self.next, self.lexer.next_token());
    }

    fn expect_next(&mut self, kind: TokenKind) -> Result<(), MatchError> {
        if self.next.kind != kind {
            return Err(bad_token(kind.to_string(), &self.next));
        }
        self.advance();
        Ok(())
    }
}

fn bad_token(expected: String, got: &Token) -> MatchError {
    MatchError::BadToken {
        expected,
        got: got.kind.to_string(),
    }
}
