//! # Selection-Expression Evaluator
//!
//! Evaluates a compiled expression against one record, producing a
//! [`Value`]. Evaluation is **total**: there is no error path out of this
//! module: every failure mode is a `Value::Error` that flows through the
//! operator semantics.
//!
//! ## Semantics
//!
//! - A bare `Name` reads the first occurrence of the field; `Name[k]` the
//!   k-th; both yield `Error(MissingField)` when absent. `#Name` is always
//!   defined and counts occurrences.
//! - When the record's descriptor types a field `int`/`range` or `real`,
//!   the field value is coerced on read; a value that does not parse is
//!   `Error(TypeMismatch)`.
//! - Arithmetic coerces both sides to numbers; two ints stay int (`/`
//!   truncates), any real makes the result real, and zero divisors yield
//!   `Error(DivideByZero)`.
//! - Ordered comparison is numeric when both sides coerce, lexicographic
//!   otherwise. Equality additionally folds case when the evaluator runs in
//!   case-insensitive mode.
//! - `~` treats its right side as a regex pattern with unanchored find
//!   semantics; a pattern that fails to compile is `Error(BadRegex)`, not a
//!   panic, because patterns arrive at query time.
//! - `&&`/`||` short-circuit, `=>` is `!A || B`, and the ternary evaluates
//!   only the chosen branch. `Error(MissingField)` is false at every
//!   boolean boundary; other errors propagate.

use regex::RegexBuilder;
use std::borrow::Cow;
use std::cmp::Ordering;

use super::ast::{BinaryOp, Expr, UnaryOp};
use crate::rec::{Descriptor, Record};
use crate::types::{EvalError, NumericKind, Value};

/// Evaluates `expr` against `record` with default options.
pub fn evaluate<'a>(
    expr: &'a Expr<'a>,
    record: &'a Record,
    descriptor: Option<&Descriptor>,
) -> Value<'a> {
    Evaluator::new(descriptor).eval(expr, record)
}

/// Expression evaluator carrying the descriptor in scope and the driver's
/// comparison options.
pub struct Evaluator<'d> {
    descriptor: Option<&'d Descriptor>,
    case_insensitive: bool,
}

impl<'d> Evaluator<'d> {
    pub fn new(descriptor: Option<&'d Descriptor>) -> Self {
        Self {
            descriptor,
            case_insensitive: false,
        }
    }

    pub fn case_insensitive(mut self, yes: bool) -> Self {
        self.case_insensitive = yes;
        self
    }

    /// Top-level filter predicate: true iff the expression evaluates truthy.
    /// `Error(MissingField)` makes the record non-matching; other errors are
    /// returned so the driver can report them.
    pub fn matches<'a>(&self, expr: &'a Expr<'a>, record: &'a Record) -> Result<bool, EvalError> {
        self.eval(expr, record).truthy()
    }

    pub fn eval<'a>(&self, expr: &'a Expr<'a>, record: &'a Record) -> Value<'a> {
        match *expr {
            Expr::Int(i) => Value::Int(i),
            Expr::Real(f) => Value::Real(f),
            Expr::Str(s) => Value::text(s),
            Expr::Field { name, index } => self.field(record, name, index.unwrap_or(0)),
            Expr::Count(name) => Value::Int(record.count(name) as i64),
            Expr::Unary { op, expr } => self.unary(op, expr, record),
            Expr::Binary { op, left, right } => self.binary(op, left, right, record),
            Expr::Ternary {
                cond,
                then_branch,
                else_branch,
            } => match self.eval(cond, record).truthy() {
                Err(e) => Value::Error(e),
                Ok(true) => self.eval(then_branch, record),
                Ok(false) => self.eval(else_branch, record),
            },
        }
    }

    /// Reads occurrence `k` of a field, coercing through the descriptor's
    /// declared type.
    fn field<'a>(&self, record: &'a Record, name: &str, k: usize) -> Value<'a> {
        let Some(raw) = record.nth(name, k) else {
            return Value::Error(EvalError::MissingField);
        };
        let kind = self
            .descriptor
            .and_then(|d| d.type_of(name))
            .and_then(|t| t.numeric_kind());
        match kind {
            None => Value::text(raw),
            Some(NumericKind::Int) => match Value::from_numeric_str(raw) {
                Some(Value::Int(i)) => Value::Int(i),
                _ => Value::Error(EvalError::TypeMismatch),
            },
            Some(NumericKind::Real) => match Value::from_numeric_str(raw) {
                Some(Value::Int(i)) => Value::Real(i as f64),
                Some(Value::Real(f)) => Value::Real(f),
                _ => Value::Error(EvalError::TypeMismatch),
            },
        }
    }

    fn unary<'a>(&self, op: UnaryOp, expr: &'a Expr<'a>, record: &'a Record) -> Value<'a> {
        match op {
            UnaryOp::Not => match self.eval(expr, record).truthy() {
                Ok(b) => Value::Bool(!b),
                Err(e) => Value::Error(e),
            },
            UnaryOp::Neg => match self.eval(expr, record).numeric() {
                Ok(Value::Int(i)) => Value::Int(i.wrapping_neg()),
                Ok(Value::Real(f)) => Value::Real(-f),
                Ok(_) => unreachable!("numeric() yields Int or Real"),
                Err(e) => Value::Error(e),
            },
        }
    }

    fn binary<'a>(
        &self,
        op: BinaryOp,
        left: &'a Expr<'a>,
        right: &'a Expr<'a>,
        record: &'a Record,
    ) -> Value<'a> {
        match op {
            BinaryOp::And => match self.eval(left, record).truthy() {
                Err(e) => Value::Error(e),
                Ok(false) => Value::Bool(false),
                Ok(true) => truth(self.eval(right, record).truthy()),
            },
            BinaryOp::Or => match self.eval(left, record).truthy() {
                Err(e) => Value::Error(e),
                Ok(true) => Value::Bool(true),
                Ok(false) => truth(self.eval(right, record).truthy()),
            },
            // A => B is !A || B with the same short-circuit shape.
            BinaryOp::Implies => match self.eval(left, record).truthy() {
                Err(e) => Value::Error(e),
                Ok(false) => Value::Bool(true),
                Ok(true) => truth(self.eval(right, record).truthy()),
            },
            _ => {
                let l = self.eval(left, record);
                if let Some(e) = l.error_kind() {
                    return Value::Error(e);
                }
                let r = self.eval(right, record);
                if let Some(e) = r.error_kind() {
                    return Value::Error(e);
                }
                match op {
                    BinaryOp::Eq => Value::Bool(self.values_equal(&l, &r)),
                    BinaryOp::Neq => Value::Bool(!self.values_equal(&l, &r)),
                    BinaryOp::Lt => Value::Bool(compare(&l, &r) == Ordering::Less),
                    BinaryOp::Le => Value::Bool(compare(&l, &r) != Ordering::Greater),
                    BinaryOp::Gt => Value::Bool(compare(&l, &r) == Ordering::Greater),
                    BinaryOp::Ge => Value::Bool(compare(&l, &r) != Ordering::Less),
                    BinaryOp::Match => self.regex_match(&l, &r, false),
                    BinaryOp::NotMatch => self.regex_match(&l, &r, true),
                    BinaryOp::Concat => {
                        let (ls, rs) = match (l.stringify(), r.stringify()) {
                            (Ok(ls), Ok(rs)) => (ls, rs),
                            _ => unreachable!("errors were propagated above"),
                        };
                        let mut out = ls.into_owned();
                        out.push_str(&rs);
                        Value::Text(Cow::Owned(out))
                    }
                    _ => arithmetic(op, &l, &r),
                }
            }
        }
    }

    fn values_equal(&self, l: &Value<'_>, r: &Value<'_>) -> bool {
        if let (Ok(ln), Ok(rn)) = (l.numeric(), r.numeric()) {
            return match (ln, rn) {
                (Value::Int(a), Value::Int(b)) => a == b,
                (a, b) => as_real(&a) == as_real(&b),
            };
        }
        let (Ok(ls), Ok(rs)) = (l.stringify(), r.stringify()) else {
            return false;
        };
        if self.case_insensitive {
            ls.to_lowercase() == rs.to_lowercase()
        } else {
            ls == rs
        }
    }

    fn regex_match<'a>(&self, l: &Value<'a>, r: &Value<'a>, negate: bool) -> Value<'a> {
        let (Ok(subject), Ok(pattern)) = (l.stringify(), r.stringify()) else {
            return Value::Error(EvalError::TypeMismatch);
        };
        let regex = RegexBuilder::new(&pattern)
            .case_insensitive(self.case_insensitive)
            .build();
        match regex {
            Ok(re) => Value::Bool(re.is_match(&subject) != negate),
            Err(_) => Value::Error(EvalError::BadRegex),
        }
    }
}

fn truth(result: Result<bool, EvalError>) -> Value<'static> {
    match result {
        Ok(b) => Value::Bool(b),
        Err(e) => Value::Error(e),
    }
}

fn as_real(v: &Value<'_>) -> f64 {
    match v {
        Value::Int(i) => *i as f64,
        Value::Real(f) => *f,
        _ => 0.0,
    }
}

/// Ordered comparison: numeric when both sides coerce, lexicographic on the
/// string renderings otherwise.
fn compare(l: &Value<'_>, r: &Value<'_>) -> Ordering {
    if let (Ok(ln), Ok(rn)) = (l.numeric(), r.numeric()) {
        return match (ln, rn) {
            (Value::Int(a), Value::Int(b)) => a.cmp(&b),
            (a, b) => as_real(&a)
                .partial_cmp(&as_real(&b))
                .unwrap_or(Ordering::Equal),
        };
    }
    match (l.stringify(), r.stringify()) {
        (Ok(ls), Ok(rs)) => ls.cmp(&rs),
        _ => Ordering::Equal,
    }
}

fn arithmetic<'a>(op: BinaryOp, l: &Value<'a>, r: &Value<'a>) -> Value<'a> {
    let (ln, rn) = match (l.numeric(), r.numeric()) {
        (Ok(a), Ok(b)) => (a, b),
        (Err(e), _) | (_, Err(e)) => return Value::Error(e),
    };
    match (ln, rn) {
        (Value::Int(a), Value::Int(b)) => match op {
            BinaryOp::Add => Value::Int(a.wrapping_add(b)),
            BinaryOp::Sub => Value::Int(a.wrapping_sub(b)),
            BinaryOp::Mul => Value::Int(a.wrapping_mul(b)),
            BinaryOp::Div if b == 0 => Value::Error(EvalError::DivideByZero),
            BinaryOp::Div => Value::Int(a.wrapping_div(b)),
            BinaryOp::Rem if b == 0 => Value::Error(EvalError::DivideByZero),
            BinaryOp::Rem => Value::Int(a.wrapping_rem(b)),
            _ => unreachable!("non-arithmetic operator"),
        },
        (a, b) => {
            let (a, b) = (as_real(&a), as_real(&b));
            match op {
                BinaryOp::Add => Value::Real(a + b),
                BinaryOp::Sub => Value::Real(a - b),
                BinaryOp::Mul => Value::Real(a * b),
                BinaryOp::Div if b == 0.0 => Value::Error(EvalError::DivideByZero),
                BinaryOp::Div => Value::Real(a / b),
                BinaryOp::Rem if b == 0.0 => Value::Error(EvalError::DivideByZero),
                BinaryOp::Rem => Value::Real(a % b),
                _ => unreachable!("non-arithmetic operator"),
            }
        }
    }
}
