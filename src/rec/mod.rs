//! # Recfile Parsing
//!
//! This module turns an octet stream in the rec format into a structured
//! `RecordSet`. Parsing is two staged:
//!
//! - `lexer`: physical lines → logical lines (comments, blanks, folded
//!   `name: value` fields)
//! - `parser`: logical lines → records and descriptors with scope attached
//!
//! The data model (`record`) and the schema rules (`descriptor`) live here
//! too. Parse errors are fatal and carry the offending physical line;
//! everything after parsing reports problems as values.

pub mod descriptor;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod record;

pub use descriptor::{Descriptor, SetViolation, SizeBound, Violation};
pub use error::ParseError;
pub use parser::{parse, parse_file, parse_reader};
pub use record::{Field, Record, RecordSet};
