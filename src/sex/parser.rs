//! # Selection-Expression Parser
//!
//! Recursive descent over the expression grammar, one function per
//! precedence tier:
//!
//! ```text
//! expr     := ternary
//! ternary  := implies ('?' ternary ':' ternary)?
//! implies  := or   ('=>' or)*              right-associative
//! or       := and  ('||' and)*
//! and      := not  ('&&' not)*
//! not      := '!' not | compare
//! compare  := concat ((=|!=|<|<=|>|>=|~|!~) concat)?
//! concat   := addsub ('&' addsub)*
//! addsub   := muldiv (('+'|'-') muldiv)*
//! muldiv   := unary  (('*'|'/'|'%') unary)*
//! unary    := '-' unary | primary
//! primary  := INT | REAL | STRING | fieldref | '#' IDENT | '(' expr ')'
//! fieldref := IDENT ('[' INT ']')?
//! ```
//!
//! Comparison is deliberately non-associative: `a = b = c` is a compile
//! error rather than a surprise. All nodes are allocated in the arena the
//! parser is constructed with.

use bumpalo::Bump;

use super::ast::{BinaryOp, Expr, UnaryOp};
use super::error::{SexError, SexErrorKind};
use super::lexer::Lexer;
use super::token::Token;

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    arena: &'a Bump,
    current: Token<'a>,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str, arena: &'a Bump) -> Result<Self, SexError> {
        let mut lexer = Lexer::new(input, arena);
        let current = lexer.next_token()?;
        Ok(Self {
            lexer,
            arena,
            current,
        })
    }

    /// Parses the whole input as one expression.
    pub fn parse(mut self) -> Result<&'a Expr<'a>, SexError> {
        let expr = self.ternary()?;
        if self.current != Token::Eof {
            return Err(self.unexpected());
        }
        Ok(expr)
    }

    fn advance(&mut self) -> Result<Token<'a>, SexError> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn consume(&mut self, token: Token<'a>) -> Result<bool, SexError> {
        if self.current == token {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, token: Token<'a>) -> Result<(), SexError> {
        if self.current == token {
            self.advance()?;
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn unexpected(&self) -> SexError {
        SexError::new(
            SexErrorKind::UnexpectedToken(self.current.to_string()),
            self.lexer.token_start(),
        )
    }

    fn alloc(&self, expr: Expr<'a>) -> &'a Expr<'a> {
        self.arena.alloc(expr)
    }

    fn binary(&self, op: BinaryOp, left: &'a Expr<'a>, right: &'a Expr<'a>) -> &'a Expr<'a> {
        self.alloc(Expr::Binary { op, left, right })
    }

    fn ternary(&mut self) -> Result<&'a Expr<'a>, SexError> {
        let cond = self.implies()?;
        if !self.consume(Token::Question)? {
            return Ok(cond);
        }
        let then_branch = self.ternary()?;
        self.expect(Token::Colon)?;
        let else_branch = self.ternary()?;
        Ok(self.alloc(Expr::Ternary {
            cond,
            then_branch,
            else_branch,
        }))
    }

    fn implies(&mut self) -> Result<&'a Expr<'a>, SexError> {
        let left = self.or_expr()?;
        if self.consume(Token::Implies)? {
            let right = self.implies()?;
            return Ok(self.binary(BinaryOp::Implies, left, right));
        }
        Ok(left)
    }

    fn or_expr(&mut self) -> Result<&'a Expr<'a>, SexError> {
        let mut left = self.and_expr()?;
        while self.consume(Token::Or)? {
            let right = self.and_expr()?;
            left = self.binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<&'a Expr<'a>, SexError> {
        let mut left = self.not_expr()?;
        while self.consume(Token::And)? {
            let right = self.not_expr()?;
            left = self.binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> Result<&'a Expr<'a>, SexError> {
        if self.consume(Token::Not)? {
            let expr = self.not_expr()?;
            return Ok(self.alloc(Expr::Unary {
                op: UnaryOp::Not,
                expr,
            }));
        }
        self.compare()
    }

    fn compare(&mut self) -> Result<&'a Expr<'a>, SexError> {
        let left = self.concat()?;
        let op = match self.current {
            Token::Eq => BinaryOp::Eq,
            Token::Neq => BinaryOp::Neq,
            Token::Lt => BinaryOp::Lt,
            Token::Le => BinaryOp::Le,
            Token::Gt => BinaryOp::Gt,
            Token::Ge => BinaryOp::Ge,
            Token::Match => BinaryOp::Match,
            Token::NotMatch => BinaryOp::NotMatch,
            _ => return Ok(left),
        };
        self.advance()?;
        let right = self.concat()?;
        Ok(self.binary(op, left, right))
    }

    fn concat(&mut self) -> Result<&'a Expr<'a>, SexError> {
        let mut left = self.addsub()?;
        while self.consume(Token::Concat)? {
            let right = self.addsub()?;
            left = self.binary(BinaryOp::Concat, left, right);
        }
        Ok(left)
    }

    fn addsub(&mut self) -> Result<&'a Expr<'a>, SexError> {
        let mut left = self.muldiv()?;
        loop {
            let op = match self.current {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.advance()?;
            let right = self.muldiv()?;
            left = self.binary(op, left, right);
        }
    }

    fn muldiv(&mut self) -> Result<&'a Expr<'a>, SexError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.current {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                Token::Percent => BinaryOp::Rem,
                _ => return Ok(left),
            };
            self.advance()?;
            let right = self.unary()?;
            left = self.binary(op, left, right);
        }
    }

    fn unary(&mut self) -> Result<&'a Expr<'a>, SexError> {
        if self.consume(Token::Minus)? {
            let expr = self.unary()?;
            return Ok(self.alloc(Expr::Unary {
                op: UnaryOp::Neg,
                expr,
            }));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<&'a Expr<'a>, SexError> {
        match self.current {
            Token::Int(i) => {
                self.advance()?;
                Ok(self.alloc(Expr::Int(i)))
            }
            Token::Real(f) => {
                self.advance()?;
                Ok(self.alloc(Expr::Real(f)))
            }
            Token::Str(s) => {
                self.advance()?;
                Ok(self.alloc(Expr::Str(s)))
            }
            Token::Ident(name) => {
                self.advance()?;
                let index = if self.consume(Token::LBracket)? {
                    let k = match self.current {
                        Token::Int(k) if k >= 0 => k as usize,
                        _ => return Err(self.unexpected()),
                    };
                    self.advance()?;
                    self.expect(Token::RBracket)?;
                    Some(k)
                } else {
                    None
                };
                Ok(self.alloc(Expr::Field { name, index }))
            }
            Token::Hash => {
                self.advance()?;
                match self.current {
                    Token::Ident(name) => {
                        self.advance()?;
                        Ok(self.alloc(Expr::Count(name)))
                    }
                    _ => Err(self.unexpected()),
                }
            }
            Token::LParen => {
                self.advance()?;
                let expr = self.ternary()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            _ => Err(self.unexpected()),
        }
    }
}
