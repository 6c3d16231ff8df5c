//! Compile-time errors for selection expressions.
//!
//! These cover lexing and parsing only. Once an expression compiles,
//! evaluation cannot fail: runtime problems surface as
//! [`Value::Error`](crate::types::Value) values.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SexErrorKind {
    #[error("unexpected {0}")]
    UnexpectedToken(String),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unknown operator '{0}'")]
    UnknownOperator(char),
}

/// A selection-expression compile error with the byte offset it points at.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at offset {offset}")]
pub struct SexError {
    pub kind: SexErrorKind,
    pub offset: usize,
}

impl SexError {
    pub fn new(kind: SexErrorKind, offset: usize) -> Self {
        Self { kind, offset }
    }
}
