//! # Query Driver
//!
//! The recsel pipeline over a parsed `RecordSet`: type/index/expression/
//! quick-search/random filters, sorting, grouping, uniquing, projection,
//! and rec-format output.
//!
//! - `spec`: [`QuerySpec`] options
//! - `driver`: the filter pipeline and [`QueryResult`]
//! - `output`: [`format_default`] rendering

pub mod driver;
pub mod output;
pub mod spec;

pub use driver::{query, Diagnostic, QueryResult};
pub use output::format_default;
pub use spec::QuerySpec;
