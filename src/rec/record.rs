//! # Record Data Model
//!
//! `Field`, `Record` and `RecordSet`: the structured form of a parsed
//! recfile. A record is an ordered multiset of named fields: the same name
//! may appear any number of times and insertion order is authoritative, so
//! `nth(name, k)` addresses the k-th occurrence exactly as `Name[k]` does in
//! a selection expression.
//!
//! Records are immutable once the parser has produced them; the query
//! driver only ever clones and projects them. `Display` renders the rec
//! format back out, folding multi-line values into `+ ` continuations, which
//! is what gives `parse` → `format` its round-trip property.

use hashbrown::HashMap;
use std::fmt;

use super::descriptor::Descriptor;

/// A single `name: value` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    name: String,
    value: String,
}

impl Field {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// True for `%`-prefixed descriptor meta-fields.
    pub fn is_meta(&self) -> bool {
        self.name.starts_with('%')
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.value.is_empty() {
            return write!(f, "{}:", self.name);
        }
        let mut lines = self.value.split('\n');
        write!(f, "{}: {}", self.name, lines.next().unwrap_or(""))?;
        for line in lines {
            write!(f, "\n+ {}", line)?;
        }
        Ok(())
    }
}

/// An ordered multiset of fields, tagged with the record type in scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    fields: Vec<Field>,
    rec_type: Option<String>,
    line: usize,
}

impl Record {
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            fields,
            rec_type: None,
            line: 0,
        }
    }

    pub(crate) fn with_scope(fields: Vec<Field>, rec_type: Option<String>, line: usize) -> Self {
        Self {
            fields,
            rec_type,
            line,
        }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// The record type this record belongs to, if a descriptor was in scope.
    pub fn rec_type(&self) -> Option<&str> {
        self.rec_type.as_deref()
    }

    /// 1-based physical line where the record started (0 for built records).
    pub fn line(&self) -> usize {
        self.line
    }

    /// Value of the first occurrence of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.nth(name, 0)
    }

    /// Value of the k-th occurrence of `name`, zero-based.
    pub fn nth(&self, name: &str, k: usize) -> Option<&str> {
        self.fields
            .iter()
            .filter(|f| f.name == name)
            .nth(k)
            .map(|f| f.value.as_str())
    }

    /// All values of `name`, in insertion order.
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.name == name)
            .map(|f| f.value.as_str())
            .collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.fields.iter().filter(|f| f.name == name).count()
    }

    pub fn has(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    /// A copy keeping only fields named in `names`, all occurrences, in
    /// record order.
    pub fn project(&self, names: &[String]) -> Record {
        Record {
            fields: self
                .fields
                .iter()
                .filter(|f| names.iter().any(|n| n == &f.name))
                .cloned()
                .collect(),
            rec_type: self.rec_type.clone(),
            line: self.line,
        }
    }

    pub(crate) fn push(&mut self, field: Field) {
        self.fields.push(field);
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", field)?;
        }
        Ok(())
    }
}

/// An ordered sequence of records plus the descriptors that scope them,
/// keyed by record-type name.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    descriptors: Vec<Descriptor>,
    by_type: HashMap<String, usize>,
    records: Vec<Record>,
}

impl RecordSet {
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Descriptors in declaration order.
    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }

    pub fn descriptor(&self, rec_type: &str) -> Option<&Descriptor> {
        self.by_type.get(rec_type).map(|&i| &self.descriptors[i])
    }

    /// The descriptor scoping `record`, if any.
    pub fn descriptor_of(&self, record: &Record) -> Option<&Descriptor> {
        record.rec_type().and_then(|t| self.descriptor(t))
    }

    /// Record-type names in declaration order.
    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.descriptors.iter().map(|d| d.rec_type())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub(crate) fn push_record(&mut self, record: Record) {
        self.records.push(record);
    }

    /// Installs a descriptor; returns false when the type is already taken.
    pub(crate) fn push_descriptor(&mut self, descriptor: Descriptor) -> bool {
        if self.by_type.contains_key(descriptor.rec_type()) {
            return false;
        }
        self.by_type
            .insert(descriptor.rec_type().to_string(), self.descriptors.len());
        self.descriptors.push(descriptor);
        true
    }
}
