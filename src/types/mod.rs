//! # Type System
//!
//! Shared value and type machinery used by the expression evaluator and the
//! descriptor checker.
//!
//! - `value`: runtime `Value<'a>` with in-band evaluation errors
//! - `field_type`: `%type` type-specs and their value checks

mod field_type;
mod value;

pub use field_type::{FieldType, NumericKind};
pub use value::{EvalError, Value};
