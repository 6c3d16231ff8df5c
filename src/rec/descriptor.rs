//! # Record Descriptors
//!
//! A descriptor is a meta-record whose first field is `%rec: <TypeName>`.
//! It declares the schema for every subsequent record of that type:
//! mandatory fields, typed fields, key/uniqueness rules, allowed and
//! prohibited field sets, a bound on the number of records, and arbitrary
//! selection-expression constraints.
//!
//! ## Recognized meta-fields
//!
//! | Field | Effect |
//! |-------|--------|
//! | `%rec` | record type name (required, first) |
//! | `%mandatory` | fields that must be present |
//! | `%type` | field list + type-spec |
//! | `%typedef` | named type alias for later `%type` entries |
//! | `%key` | at most one occurrence per record, value unique across the set |
//! | `%unique` | at most one occurrence per record |
//! | `%singular` | value unique across the set |
//! | `%allowed` | when present, the only data fields permitted |
//! | `%prohibit` | fields that must not appear |
//! | `%size` | bound on the record count (`< N`, `>= N`, bare `N`, …) |
//! | `%constraint` | selection expression every record must satisfy |
//! | `%sort` | default sort order for the query driver |
//! | `%doc` | documentation text |
//!
//! Unknown `%`-fields (including `%auto` and `%confidential`, which belong
//! to editing tools) are preserved verbatim and carry no semantics here.
//!
//! ## Validation
//!
//! `validate` checks a single record against the per-record rules and
//! returns violations as values. `validate_set` additionally runs the
//! cross-record checks: `%key`/`%singular` value collisions and `%size`.
//! Validation never fails hard: a record that violates everything just
//! yields a longer list.

use bumpalo::Bump;
use phf::phf_map;
use std::fmt;
use thiserror::Error;

use super::error::ParseError;
use super::record::Record;
use crate::sex;
use crate::types::FieldType;
use hashbrown::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MetaField {
    Rec,
    Mandatory,
    Type,
    Typedef,
    Key,
    Unique,
    Singular,
    Allowed,
    Prohibit,
    Size,
    Constraint,
    Sort,
    Doc,
}

static META_FIELDS: phf::Map<&'static str, MetaField> = phf_map! {
    "%rec" => MetaField::Rec,
    "%mandatory" => MetaField::Mandatory,
    "%type" => MetaField::Type,
    "%typedef" => MetaField::Typedef,
    "%key" => MetaField::Key,
    "%unique" => MetaField::Unique,
    "%singular" => MetaField::Singular,
    "%allowed" => MetaField::Allowed,
    "%prohibit" => MetaField::Prohibit,
    "%size" => MetaField::Size,
    "%constraint" => MetaField::Constraint,
    "%sort" => MetaField::Sort,
    "%doc" => MetaField::Doc,
};

/// A single schema violation, reported as a value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Violation {
    #[error("missing mandatory field '{field}'")]
    MissingMandatory { field: String },
    #[error("field '{field}': value '{value}' does not match type {expected}")]
    TypeMismatch {
        field: String,
        value: String,
        expected: String,
    },
    #[error("prohibited field '{field}' is present")]
    ProhibitedField { field: String },
    #[error("field '{field}' is not in the allowed set")]
    FieldNotAllowed { field: String },
    #[error("field '{field}' appears more than once")]
    DuplicateKey { field: String },
    #[error("duplicate value '{value}' for field '{field}'")]
    UniquenessViolation { field: String, value: String },
    #[error("record count {actual} violates size constraint '{bound}'")]
    SizeViolation { bound: String, actual: usize },
    #[error("constraint violated: {expression}")]
    ConstraintViolation { expression: String },
}

/// A violation found by [`Descriptor::validate_set`], with the index of the
/// offending record when one applies (`%size` violations have none).
#[derive(Debug, Clone, PartialEq)]
pub struct SetViolation {
    pub record: Option<usize>,
    pub violation: Violation,
}

/// Comparison operator of a `%size` bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SizeOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
}

/// A parsed `%size` bound on the number of records of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeBound {
    op: SizeOp,
    limit: usize,
}

impl SizeBound {
    fn parse(spec: &str) -> Result<SizeBound, String> {
        let spec = spec.trim();
        let (op, rest) = if let Some(r) = spec.strip_prefix("<=") {
            (SizeOp::Le, r)
        } else if let Some(r) = spec.strip_prefix(">=") {
            (SizeOp::Ge, r)
        } else if let Some(r) = spec.strip_prefix('<') {
            (SizeOp::Lt, r)
        } else if let Some(r) = spec.strip_prefix('>') {
            (SizeOp::Gt, r)
        } else if let Some(r) = spec.strip_prefix('=') {
            (SizeOp::Eq, r)
        } else {
            (SizeOp::Eq, spec)
        };
        match rest.trim().parse::<usize>() {
            Ok(limit) => Ok(SizeBound { op, limit }),
            Err(_) => Err(format!("invalid size bound '{}'", spec)),
        }
    }

    pub fn check(&self, count: usize) -> bool {
        match self.op {
            SizeOp::Lt => count < self.limit,
            SizeOp::Le => count <= self.limit,
            SizeOp::Gt => count > self.limit,
            SizeOp::Ge => count >= self.limit,
            SizeOp::Eq => count == self.limit,
        }
    }
}

impl fmt::Display for SizeBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.op {
            SizeOp::Lt => "< ",
            SizeOp::Le => "<= ",
            SizeOp::Gt => "> ",
            SizeOp::Ge => ">= ",
            SizeOp::Eq => "",
        };
        write!(f, "{}{}", op, self.limit)
    }
}

/// Schema rules for one record type, derived from a descriptor record.
#[derive(Debug, Clone)]
pub struct Descriptor {
    record: Record,
    rec_type: String,
    mandatory: Vec<String>,
    types: HashMap<String, FieldType>,
    key: Option<String>,
    unique: Vec<String>,
    singular: Vec<String>,
    allowed: Vec<String>,
    prohibited: Vec<String>,
    size: Option<SizeBound>,
    constraints: Vec<String>,
    sort: Vec<String>,
    doc: Option<String>,
}

impl Descriptor {
    /// Derives the rule tables from a raw meta-record. The record's first
    /// field must be `%rec:` with a non-empty type name.
    pub fn from_record(record: Record) -> Result<Descriptor, ParseError> {
        let line = record.line();
        let bad = |detail: String| ParseError::BadDescriptorSyntax { line, detail };

        match record.fields().first() {
            Some(f) if f.name() == "%rec" => {}
            _ => return Err(ParseError::MissingRecField { line }),
        }
        let rec_type = record
            .get("%rec")
            .and_then(|v| v.split_whitespace().next())
            .map(String::from)
            .ok_or_else(|| bad("empty %rec record type".to_string()))?;

        let mut descriptor = Descriptor {
            rec_type,
            record: Record::new(Vec::new()),
            mandatory: Vec::new(),
            types: HashMap::new(),
            key: None,
            unique: Vec::new(),
            singular: Vec::new(),
            allowed: Vec::new(),
            prohibited: Vec::new(),
            size: None,
            constraints: Vec::new(),
            sort: Vec::new(),
            doc: None,
        };
        let mut typedefs: HashMap<String, FieldType> = HashMap::new();

        for field in record.fields().iter().skip(1) {
            match META_FIELDS.get(field.name()).copied() {
                Some(MetaField::Rec) => {
                    return Err(bad("repeated %rec field".to_string()));
                }
                Some(MetaField::Mandatory) => {
                    descriptor.mandatory.extend(name_list(field.value()));
                }
                Some(MetaField::Type) => {
                    let (names, ty) = parse_type_entry(field.value(), &typedefs)
                        .map_err(|d| bad(d))?;
                    for name in names {
                        descriptor.types.insert(name, ty.clone());
                    }
                }
                Some(MetaField::Typedef) => {
                    let value = field.value().trim();
                    let (name, spec) = value
                        .split_once(char::is_whitespace)
                        .ok_or_else(|| bad(format!("incomplete %typedef '{}'", value)))?;
                    let ty = resolve_type(spec, &typedefs).map_err(|d| bad(d))?;
                    typedefs.insert(name.to_string(), ty);
                }
                Some(MetaField::Key) => {
                    if descriptor.key.is_some() {
                        return Err(bad("more than one %key field".to_string()));
                    }
                    let name = field
                        .value()
                        .split_whitespace()
                        .next()
                        .ok_or_else(|| bad("empty %key field".to_string()))?;
                    descriptor.key = Some(name.to_string());
                }
                Some(MetaField::Unique) => {
                    descriptor.unique.extend(name_list(field.value()));
                }
                Some(MetaField::Singular) => {
                    descriptor.singular.extend(name_list(field.value()));
                }
                Some(MetaField::Allowed) => {
                    descriptor.allowed.extend(name_list(field.value()));
                }
                Some(MetaField::Prohibit) => {
                    descriptor.prohibited.extend(name_list(field.value()));
                }
                Some(MetaField::Size) => {
                    let bound = SizeBound::parse(field.value()).map_err(|d| bad(d))?;
                    descriptor.size = Some(bound);
                }
                Some(MetaField::Constraint) => {
                    let src = field.value().trim().to_string();
                    let arena = Bump::new();
                    sex::compile(&src, &arena)
                        .map_err(|e| bad(format!("bad %constraint expression: {}", e)))?;
                    descriptor.constraints.push(src);
                }
                Some(MetaField::Sort) => {
                    descriptor.sort.extend(name_list(field.value()));
                }
                Some(MetaField::Doc) => {
                    descriptor.doc = Some(field.value().to_string());
                }
                None => {}
            }
        }

        descriptor.record = record;
        Ok(descriptor)
    }

    pub fn rec_type(&self) -> &str {
        &self.rec_type
    }

    /// The raw meta-record, all fields preserved verbatim.
    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn mandatory(&self) -> &[String] {
        &self.mandatory
    }

    pub fn type_of(&self, field: &str) -> Option<&FieldType> {
        self.types.get(field)
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn size(&self) -> Option<SizeBound> {
        self.size
    }

    /// Default sort order declared with `%sort`, for the query driver.
    pub fn sort_fields(&self) -> &[String] {
        &self.sort
    }

    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    /// Checks one record against the per-record rules.
    pub fn validate(&self, record: &Record) -> Vec<Violation> {
        let mut violations = Vec::new();

        for name in &self.mandatory {
            if record.count(name) == 0 {
                violations.push(Violation::MissingMandatory { field: name.clone() });
            }
        }

        let mut flagged: HashSet<&str> = HashSet::new();
        for field in record.fields() {
            if field.is_meta() {
                continue;
            }
            if let Some(ty) = self.types.get(field.name()) {
                if !ty.check(field.value()) {
                    violations.push(Violation::TypeMismatch {
                        field: field.name().to_string(),
                        value: field.value().to_string(),
                        expected: ty.to_string(),
                    });
                }
            }
            if !flagged.insert(field.name()) {
                continue;
            }
            if self.prohibited.iter().any(|p| p == field.name()) {
                violations.push(Violation::ProhibitedField {
                    field: field.name().to_string(),
                });
            }
            if !self.allowed.is_empty() && !self.allowed.iter().any(|a| a == field.name()) {
                violations.push(Violation::FieldNotAllowed {
                    field: field.name().to_string(),
                });
            }
        }

        for name in self.key.iter().chain(self.unique.iter()) {
            if record.count(name) > 1 {
                violations.push(Violation::DuplicateKey { field: name.clone() });
            }
        }

        let arena = Bump::new();
        for src in &self.constraints {
            // Syntax was checked at descriptor build time.
            let Ok(expr) = sex::compile(src, &arena) else {
                continue;
            };
            let value = sex::evaluate(expr, record, Some(self));
            if !matches!(value.truthy(), Ok(true)) {
                violations.push(Violation::ConstraintViolation {
                    expression: src.clone(),
                });
            }
        }

        violations
    }

    /// Checks a sequence of records: per-record rules plus the cross-record
    /// ones (`%key`/`%singular` value uniqueness, `%size`).
    pub fn validate_set<'r, I>(&self, records: I) -> Vec<SetViolation>
    where
        I: IntoIterator<Item = &'r Record>,
    {
        let records: Vec<&Record> = records.into_iter().collect();
        let mut violations = Vec::new();

        for (index, record) in records.iter().enumerate() {
            violations.extend(self.validate(record).into_iter().map(|violation| {
                SetViolation {
                    record: Some(index),
                    violation,
                }
            }));
        }

        for name in self.key.iter().chain(self.singular.iter()) {
            let mut seen: HashMap<&str, usize> = HashMap::new();
            for (index, record) in records.iter().enumerate() {
                for value in record.get_all(name) {
                    if seen.insert(value, index).is_some() {
                        violations.push(SetViolation {
                            record: Some(index),
                            violation: Violation::UniquenessViolation {
                                field: name.clone(),
                                value: value.to_string(),
                            },
                        });
                    }
                }
            }
        }

        if let Some(bound) = self.size {
            if !bound.check(records.len()) {
                violations.push(SetViolation {
                    record: None,
                    violation: Violation::SizeViolation {
                        bound: bound.to_string(),
                        actual: records.len(),
                    },
                });
            }
        }

        violations
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.record)
    }
}

/// Splits a whitespace- or comma-separated field-name list.
fn name_list(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Parses a `%type` value: a comma-separated field list followed by a
/// type-spec or the name of an earlier `%typedef`.
fn parse_type_entry(
    value: &str,
    typedefs: &HashMap<String, FieldType>,
) -> Result<(Vec<String>, FieldType), String> {
    let value = value.trim();
    let (list, spec) = value
        .split_once(char::is_whitespace)
        .ok_or_else(|| format!("incomplete %type '{}'", value))?;
    let names: Vec<String> = list
        .split(',')
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();
    if names.is_empty() {
        return Err(format!("no field names in %type '{}'", value));
    }
    let ty = resolve_type(spec, typedefs)?;
    Ok((names, ty))
}

fn resolve_type(
    spec: &str,
    typedefs: &HashMap<String, FieldType>,
) -> Result<FieldType, String> {
    let spec = spec.trim();
    if let Some(ty) = typedefs.get(spec) {
        return Ok(ty.clone());
    }
    FieldType::parse(spec).map_err(|e| e.to_string())
}
