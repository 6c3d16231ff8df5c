//! Field type-specs declared by `%type` and `%typedef` descriptor entries.
//!
//! A type-spec is parsed from the text after the field list, e.g. the
//! `enum loaned home unknown` part of `%type: Location enum loaned home
//! unknown`. The checker enforces `int`, `real`, `bool`, `range`, `regexp`,
//! `enum` and `line`; the remaining specs (`date`, `email`, `uuid`, `size`,
//! `field`) are recognized so descriptors round-trip, but their values check
//! as plain strings.

use eyre::{bail, Result};
use regex::Regex;
use std::fmt;

use super::value::parse_int;

/// Numeric interpretation a type-spec imposes on field values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericKind {
    Int,
    Real,
}

/// A parsed `%type` specification.
#[derive(Debug, Clone)]
pub enum FieldType {
    Int,
    Bool,
    Real,
    Line,
    Date,
    Email,
    Field,
    Uuid,
    Range(i64, i64),
    Size(usize),
    Regexp(Regex),
    Enum(Vec<String>),
}

impl FieldType {
    /// Parses the type-spec text following the field list of a `%type` entry.
    pub fn parse(spec: &str) -> Result<FieldType> {
        let spec = spec.trim();
        let mut tokens = spec.split_whitespace();
        let keyword = match tokens.next() {
            Some(k) => k,
            None => bail!("empty type specification"),
        };
        let rest = spec[keyword.len()..].trim();

        let simple = |ty: FieldType| -> Result<FieldType> {
            if rest.is_empty() {
                Ok(ty)
            } else {
                bail!("unexpected text '{}' after '{}'", rest, keyword)
            }
        };

        match keyword {
            "int" => simple(FieldType::Int),
            "bool" => simple(FieldType::Bool),
            "real" => simple(FieldType::Real),
            "line" => simple(FieldType::Line),
            "date" => simple(FieldType::Date),
            "email" => simple(FieldType::Email),
            "field" => simple(FieldType::Field),
            "uuid" => simple(FieldType::Uuid),
            "range" => {
                let bounds: Vec<&str> = rest.split_whitespace().collect();
                match bounds.as_slice() {
                    [max] => Ok(FieldType::Range(0, parse_bound(max)?)),
                    [min, max] => Ok(FieldType::Range(parse_bound(min)?, parse_bound(max)?)),
                    _ => bail!("range takes one or two bounds, got '{}'", rest),
                }
            }
            "size" => match rest.parse::<usize>() {
                Ok(n) => Ok(FieldType::Size(n)),
                Err(_) => bail!("size takes a non-negative integer, got '{}'", rest),
            },
            "regexp" => {
                let pat = rest
                    .strip_prefix('/')
                    .and_then(|p| p.strip_suffix('/'))
                    .ok_or_else(|| eyre::eyre!("regexp pattern must be delimited as /pat/"))?;
                match Regex::new(pat) {
                    Ok(re) => Ok(FieldType::Regexp(re)),
                    Err(e) => bail!("invalid regexp pattern: {}", e),
                }
            }
            "enum" => {
                let variants: Vec<String> = rest.split_whitespace().map(String::from).collect();
                if variants.is_empty() {
                    bail!("enum needs at least one variant");
                }
                Ok(FieldType::Enum(variants))
            }
            other => bail!("unknown type '{}'", other),
        }
    }

    /// Checks a field value against this type. Unenforced specs accept
    /// anything.
    pub fn check(&self, value: &str) -> bool {
        match self {
            FieldType::Int => is_int(value.trim()),
            FieldType::Real => is_real(value.trim()),
            FieldType::Bool => {
                let v = value.trim();
                ["yes", "no", "true", "false", "0", "1"]
                    .iter()
                    .any(|b| v.eq_ignore_ascii_case(b))
            }
            FieldType::Range(lo, hi) => {
                matches!(parse_int(value.trim()), Some(n) if n >= *lo && n <= *hi)
            }
            FieldType::Regexp(re) => re.is_match(value),
            FieldType::Enum(variants) => variants.iter().any(|v| v == value.trim()),
            FieldType::Line => !value.contains('\n'),
            FieldType::Date
            | FieldType::Email
            | FieldType::Field
            | FieldType::Uuid
            | FieldType::Size(_) => true,
        }
    }

    /// The numeric coercion the evaluator applies to fields of this type.
    pub fn numeric_kind(&self) -> Option<NumericKind> {
        match self {
            FieldType::Int | FieldType::Range(_, _) => Some(NumericKind::Int),
            FieldType::Real => Some(NumericKind::Real),
            _ => None,
        }
    }
}

fn parse_bound(token: &str) -> Result<i64> {
    match token {
        "MIN" => Ok(i64::MIN),
        "MAX" => Ok(i64::MAX),
        _ => match parse_int(token) {
            Some(n) => Ok(n),
            None => bail!("invalid range bound '{}'", token),
        },
    }
}

/// An optional sign followed by decimal digits only. Stricter than the
/// evaluator's numeric coercion, which also takes hexadecimal.
fn is_int(s: &str) -> bool {
    let bytes = s.as_bytes();
    let digits = match bytes.first() {
        Some(b'+') | Some(b'-') => &bytes[1..],
        _ => bytes,
    };
    !digits.is_empty() && digits.iter().all(|b| b.is_ascii_digit())
}

fn is_real(s: &str) -> bool {
    let b = s.as_bytes();
    let mut i = 0;
    if i < b.len() && (b[i] == b'+' || b[i] == b'-') {
        i += 1;
    }
    let mut digits = 0;
    while i < b.len() && b[i].is_ascii_digit() {
        i += 1;
        digits += 1;
    }
    if i < b.len() && b[i] == b'.' {
        i += 1;
        while i < b.len() && b[i].is_ascii_digit() {
            i += 1;
            digits += 1;
        }
    }
    if digits == 0 {
        return false;
    }
    if i < b.len() && (b[i] == b'e' || b[i] == b'E') {
        i += 1;
        if i < b.len() && (b[i] == b'+' || b[i] == b'-') {
            i += 1;
        }
        let mut exp_digits = 0;
        while i < b.len() && b[i].is_ascii_digit() {
            i += 1;
            exp_digits += 1;
        }
        if exp_digits == 0 {
            return false;
        }
    }
    i == b.len()
}

impl PartialEq for FieldType {
    fn eq(&self, other: &Self) -> bool {
        use FieldType::*;
        match (self, other) {
            (Int, Int) | (Bool, Bool) | (Real, Real) | (Line, Line) | (Date, Date)
            | (Email, Email) | (Field, Field) | (Uuid, Uuid) => true,
            (Range(a, b), Range(c, d)) => a == c && b == d,
            (Size(a), Size(b)) => a == b,
            (Regexp(a), Regexp(b)) => a.as_str() == b.as_str(),
            (Enum(a), Enum(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Int => write!(f, "int"),
            FieldType::Bool => write!(f, "bool"),
            FieldType::Real => write!(f, "real"),
            FieldType::Line => write!(f, "line"),
            FieldType::Date => write!(f, "date"),
            FieldType::Email => write!(f, "email"),
            FieldType::Field => write!(f, "field"),
            FieldType::Uuid => write!(f, "uuid"),
            FieldType::Range(lo, hi) => write!(f, "range {} {}", lo, hi),
            FieldType::Size(n) => write!(f, "size {}", n),
            FieldType::Regexp(re) => write!(f, "regexp /{}/", re.as_str()),
            FieldType::Enum(vs) => write!(f, "enum {}", vs.join(" ")),
        }
    }
}
