//! # recq - Recfile Reading and Querying
//!
//! recq reads and queries **recfiles**, the line-oriented, human-editable,
//! plain-text database format of GNU recutils. A recfile is a sequence of
//! records (ordered multisets of named string fields), optionally schemed
//! by *descriptor* records (`%rec:`, `%mandatory:`, `%type:` …).
//!
//! ## Quick Start
//!
//! ```ignore
//! use recq::{parse, query, format_default, QuerySpec};
//!
//! let set = parse(std::fs::read_to_string("books.rec")?.as_str())?;
//!
//! let result = query(
//!     &set,
//!     &QuerySpec::new()
//!         .record_type("Book")
//!         .expression("Location = 'home'")
//!         .print_fields("Title"),
//! )?;
//!
//! println!("{}", format_default(&result));
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │      Query Driver (query/)           │
//! ├──────────────────┬──────────────────┤
//! │ Recfile Parser   │ Selection Exprs  │
//! │ (rec/)           │ (sex/)           │
//! ├──────────────────┴──────────────────┤
//! │      Value & Type System (types/)    │
//! └─────────────────────────────────────┘
//! ```
//!
//! - [`rec`]: streaming tokenizer and record builder, the `Record`/
//!   `RecordSet` model, and descriptor schema validation
//! - [`sex`]: the selection-expression language (lexer, recursive-descent
//!   parser over an arena-allocated AST, and a total evaluator)
//! - [`query`]: the recsel pipeline (filters, sorting, grouping,
//!   projection, and rec-format output)
//! - [`types`]: the `Value` runtime representation and `%type` type-specs
//!
//! ## Error Model
//!
//! Only malformed *inputs* fail hard: recfile syntax errors abort the parse
//! with a line-annotated [`ParseError`], and expression syntax errors
//! surface as [`SexError`](sex::SexError) at compile time. Everything at
//! evaluation time is a value: a missing field, a type mismatch, a bad
//! regex or a zero divisor becomes `Value::Error(kind)`, filters treat it
//! per the truthiness rules, and the query driver reports non-trivial
//! errors through its diagnostics channel instead of aborting.
//!
//! A `RecordSet` is immutable once parsed and safe to share across threads
//! for concurrent read-only queries.

pub mod query;
pub mod rec;
pub mod sex;
pub mod types;

pub use query::{format_default, query, Diagnostic, QueryResult, QuerySpec};
pub use rec::{
    parse, parse_file, parse_reader, Descriptor, Field, ParseError, Record, RecordSet,
    SetViolation, Violation,
};
pub use types::{EvalError, FieldType, Value};
