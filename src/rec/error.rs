//! Parse errors for the recfile reader.
//!
//! Parse errors are fatal: they abort the parse with the 1-based physical
//! line where the problem was found. Everything downstream of parsing
//! (evaluation, validation) reports problems as values instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("line {line}: expected 'name: value', comment, or blank line")]
    MalformedField { line: usize },
    #[error("line {line}: continuation line with no preceding field")]
    StrayContinuation { line: usize },
    #[error("line {line}: duplicate descriptor for record type '{rec_type}'")]
    DuplicateDescriptor { line: usize, rec_type: String },
    #[error("line {line}: descriptor record does not start with a %rec field")]
    MissingRecField { line: usize },
    #[error("line {line}: bad descriptor syntax: {detail}")]
    BadDescriptorSyntax { line: usize, detail: String },
    #[error("error reading recfile: {0}")]
    Io(#[from] std::io::Error),
}

impl ParseError {
    /// The 1-based physical line the error points at, when one applies.
    pub fn line(&self) -> Option<usize> {
        match self {
            ParseError::MalformedField { line }
            | ParseError::StrayContinuation { line }
            | ParseError::DuplicateDescriptor { line, .. }
            | ParseError::MissingRecField { line }
            | ParseError::BadDescriptorSyntax { line, .. } => Some(*line),
            ParseError::Io(_) => None,
        }
    }
}
