//! # Selection Expressions
//!
//! The small expression language evaluated against a single record:
//! recsel's `-e` filter. An expression compiles once into an
//! arena-allocated tree and then evaluates against any number of records:
//!
//! ```ignore
//! use bumpalo::Bump;
//!
//! let arena = Bump::new();
//! let expr = recq::sex::compile("Age > 18 && Status = 'active'", &arena)?;
//! for record in set.records() {
//!     let value = recq::sex::evaluate(expr, record, set.descriptor_of(record));
//! }
//! ```
//!
//! Compilation reports syntax problems as [`SexError`]; evaluation is total
//! and reports runtime problems in-band as [`Value::Error`](crate::types::Value)
//! values.

pub mod ast;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod token;

use bumpalo::Bump;

pub use ast::{BinaryOp, Expr, UnaryOp};
pub use error::{SexError, SexErrorKind};
pub use eval::{evaluate, Evaluator};
pub use lexer::Lexer;
pub use parser::Parser;
pub use token::{Span, Token};

/// Compiles a selection expression into the given arena.
pub fn compile<'a>(input: &'a str, arena: &'a Bump) -> Result<&'a Expr<'a>, SexError> {
    Parser::new(input, arena)?.parse()
}
