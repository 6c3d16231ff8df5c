//! # Runtime Value Representation
//!
//! This module provides `Value<'a>`, the runtime representation for values
//! produced by selection-expression evaluation. Values use `Cow` for text so
//! that evaluation can borrow field values directly out of a `Record` and
//! only allocates when an expression builds a new string (concatenation,
//! stringified numbers).
//!
//! ## Value Variants
//!
//! | Variant | Rust Type | Description |
//! |---------|-----------|-------------|
//! | Int | i64 | 64-bit signed integer |
//! | Real | f64 | 64-bit floating point |
//! | Text | Cow<str> | UTF-8 string |
//! | Bool | bool | boolean |
//! | Error | EvalError | in-band evaluation error |
//!
//! ## Error Values
//!
//! Evaluation is total: a type mismatch, a missing field, a bad regex or a
//! division by zero produces `Value::Error(kind)` rather than unwinding.
//! `EvalError::MissingField` is special at the boolean boundary: it coerces
//! to `false` so that `!#Fixed`-style tests work on records that lack the
//! field. Every other error kind propagates outward through operators.
//!
//! ## Coercion
//!
//! Binary operators ask both operands for a numeric rendering via
//! [`Value::numeric`]. Integers and reals pass through; text parses as a
//! decimal or `0x`-hex integer first and as a float second; booleans never
//! coerce numerically. The truthiness used by `&&`, `||`, `!` and the
//! top-level filter boundary lives in [`Value::truthy`].

use std::borrow::Cow;
use std::fmt;
use thiserror::Error;

/// In-band evaluation error kinds. These are values, not exceptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("field not present in record")]
    MissingField,
    #[error("operand cannot be coerced to the required type")]
    TypeMismatch,
    #[error("regular expression failed to compile")]
    BadRegex,
    #[error("division by zero")]
    DivideByZero,
}

/// Runtime value for selection-expression evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    Int(i64),
    Real(f64),
    Text(Cow<'a, str>),
    Bool(bool),
    Error(EvalError),
}

impl<'a> Value<'a> {
    pub fn text(s: &'a str) -> Self {
        Value::Text(Cow::Borrowed(s))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    pub fn error_kind(&self) -> Option<EvalError> {
        match self {
            Value::Error(e) => Some(*e),
            _ => None,
        }
    }

    /// Parses a string as a numeric value, integer first.
    ///
    /// Accepts an optional sign, decimal digits, `0x`/`0X` hexadecimal, and
    /// anything `f64` accepts for the real fallback except the textual
    /// `inf`/`nan` spellings, which stay strings.
    pub fn from_numeric_str(s: &str) -> Option<Value<'static>> {
        let t = s.trim();
        if t.is_empty() {
            return None;
        }
        if let Some(i) = parse_int(t) {
            return Some(Value::Int(i));
        }
        let looks_numeric = t
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'));
        if looks_numeric {
            if let Ok(f) = t.parse::<f64>() {
                return Some(Value::Real(f));
            }
        }
        None
    }

    /// Coerces this value to `Int` or `Real`, or reports why it cannot.
    pub fn numeric(&self) -> Result<Value<'static>, EvalError> {
        match self {
            Value::Int(i) => Ok(Value::Int(*i)),
            Value::Real(f) => Ok(Value::Real(*f)),
            Value::Text(s) => Value::from_numeric_str(s).ok_or(EvalError::TypeMismatch),
            Value::Bool(_) => Err(EvalError::TypeMismatch),
            Value::Error(e) => Err(*e),
        }
    }

    /// Boolean coercion for `&&`, `||`, `!`, the ternary condition, and the
    /// top-level filter boundary.
    ///
    /// Numbers are true iff non-zero; text that parses numerically follows
    /// the numeric rule, other text is true iff non-empty. A missing field
    /// is simply false; any other error propagates.
    pub fn truthy(&self) -> Result<bool, EvalError> {
        match self {
            Value::Bool(b) => Ok(*b),
            Value::Int(i) => Ok(*i != 0),
            Value::Real(f) => Ok(*f != 0.0),
            Value::Text(s) => match Value::from_numeric_str(s) {
                Some(Value::Int(i)) => Ok(i != 0),
                Some(Value::Real(f)) => Ok(f != 0.0),
                _ => Ok(!s.is_empty()),
            },
            Value::Error(EvalError::MissingField) => Ok(false),
            Value::Error(e) => Err(*e),
        }
    }

    /// Renders this value as text, for `&` concatenation and regex operands.
    pub fn stringify(&self) -> Result<Cow<'a, str>, EvalError> {
        match self {
            Value::Text(s) => Ok(s.clone()),
            Value::Int(i) => Ok(Cow::Owned(i.to_string())),
            Value::Real(f) => Ok(Cow::Owned(f.to_string())),
            Value::Bool(b) => Ok(Cow::Borrowed(if *b { "true" } else { "false" })),
            Value::Error(e) => Err(*e),
        }
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::Text(s) => write!(f, "{}", s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Error(e) => write!(f, "<error: {}>", e),
        }
    }
}

/// Parses a signed integer, accepting decimal and `0x` hexadecimal.
pub(crate) fn parse_int(s: &str) -> Option<i64> {
    let (neg, rest) = match s.as_bytes().first()? {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };
    if rest.is_empty() {
        return None;
    }
    let magnitude = if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X"))
    {
        i64::from_str_radix(hex, 16).ok()?
    } else {
        if !rest.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        rest.parse::<i64>().ok()?
    };
    Some(if neg { -magnitude } else { magnitude })
}
