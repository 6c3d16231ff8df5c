//! # Record Builder
//!
//! Second stage of the recfile parser: groups logical lines into records
//! and assembles the `RecordSet`.
//!
//! A blank line flushes the record under construction. A record whose
//! *first* field is `%`-named is a descriptor: it is derived into rule
//! tables and installed into the set's per-type map, and its `%rec:` type
//! becomes the scope for the data records that follow. Descriptor scoping
//! is a per-type map, not a stack: a record belongs to the most recent
//! `%rec:` declaration, and two descriptors for the same type are a fatal
//! `DuplicateDescriptor` error.
//!
//! The builder never rejects data records; schema enforcement is the
//! descriptor's `validate`/`validate_set`, applied lazily by callers.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

use super::descriptor::Descriptor;
use super::error::ParseError;
use super::lexer::{LineLexer, LogicalLine};
use super::record::{Field, Record, RecordSet};

/// Parses a complete recfile from a string.
pub fn parse(input: &str) -> Result<RecordSet, ParseError> {
    parse_reader(input.as_bytes())
}

/// Parses a recfile from any buffered reader, streaming line by line.
pub fn parse_reader<R: BufRead>(reader: R) -> Result<RecordSet, ParseError> {
    let mut lexer = LineLexer::new(reader);
    let mut builder = Builder::default();
    while let Some(line) = lexer.next_logical()? {
        builder.push_line(line)?;
    }
    builder.finish()
}

/// Parses a recfile from disk.
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<RecordSet, ParseError> {
    parse_reader(BufReader::new(File::open(path)?))
}

#[derive(Default)]
struct Builder {
    set: RecordSet,
    fields: Vec<Field>,
    start_line: usize,
    current_type: Option<String>,
}

impl Builder {
    fn push_line(&mut self, line: LogicalLine) -> Result<(), ParseError> {
        match line {
            LogicalLine::Blank { .. } => self.flush(),
            LogicalLine::Comment { .. } => Ok(()),
            LogicalLine::Field { name, value, line } => {
                if self.fields.is_empty() {
                    self.start_line = line;
                }
                self.fields.push(Field::new(name, value));
                Ok(())
            }
        }
    }

    fn flush(&mut self) -> Result<(), ParseError> {
        if self.fields.is_empty() {
            return Ok(());
        }
        let fields = std::mem::take(&mut self.fields);
        let start = self.start_line;

        if fields[0].is_meta() {
            let descriptor = Descriptor::from_record(Record::with_scope(fields, None, start))?;
            let rec_type = descriptor.rec_type().to_string();
            if !self.set.push_descriptor(descriptor) {
                return Err(ParseError::DuplicateDescriptor {
                    line: start,
                    rec_type,
                });
            }
            self.current_type = Some(rec_type);
        } else {
            self.set
                .push_record(Record::with_scope(fields, self.current_type.clone(), start));
        }
        Ok(())
    }

    fn finish(mut self) -> Result<RecordSet, ParseError> {
        self.flush()?;
        debug!(
            records = self.set.len(),
            descriptors = self.set.descriptors().len(),
            "parsed record set"
        );
        Ok(self.set)
    }
}
