//! # Logical-Line Tokenizer
//!
//! First stage of the recfile parser: turns a stream of physical lines into
//! *logical lines*, each classified as blank, comment, or a complete
//! `name: value` field. Folding happens here, so downstream stages never see
//! continuation syntax:
//!
//! - A line whose first character is `+` continues the previous field's
//!   value after a newline; one space after the `+` is a separator and is
//!   consumed.
//! - A line ending in `\` concatenates the next physical line with no
//!   intervening newline.
//!
//! The tokenizer reads from any `BufRead` one line at a time (with a single
//! line of lookahead for `+` folding) and never materializes the input, so
//! memory cost is bounded by the largest logical line. Physical line numbers
//! are 1-based and attached to every logical line for error reporting.

use std::io::BufRead;

use super::error::ParseError;

/// A classified, fully folded line of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogicalLine {
    Blank { line: usize },
    Comment { line: usize },
    Field { name: String, value: String, line: usize },
}

pub struct LineLexer<R> {
    reader: R,
    line: usize,
    lookahead: Option<(usize, String)>,
}

impl<R: BufRead> LineLexer<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            lookahead: None,
        }
    }

    /// Next logical line, or `None` at end of input.
    pub fn next_logical(&mut self) -> Result<Option<LogicalLine>, ParseError> {
        let Some((lineno, raw)) = self.read_physical()? else {
            return Ok(None);
        };

        if raw.starts_with('#') {
            return Ok(Some(LogicalLine::Comment { line: lineno }));
        }
        if raw.trim().is_empty() {
            return Ok(Some(LogicalLine::Blank { line: lineno }));
        }
        if raw.starts_with('+') {
            return Err(ParseError::StrayContinuation { line: lineno });
        }

        let (name, first) =
            split_field_line(&raw).ok_or(ParseError::MalformedField { line: lineno })?;
        let name = name.to_string();
        let mut value = first.to_string();
        self.fold_backslash(&mut value)?;

        loop {
            match self.read_physical()? {
                Some((_, next)) if next.starts_with('+') => {
                    let rest = &next[1..];
                    let rest = rest.strip_prefix(' ').unwrap_or(rest);
                    value.push('\n');
                    value.push_str(rest);
                    self.fold_backslash(&mut value)?;
                }
                Some(other) => {
                    self.lookahead = Some(other);
                    break;
                }
                None => break,
            }
        }

        Ok(Some(LogicalLine::Field {
            name,
            value,
            line: lineno,
        }))
    }

    /// While the value ends in `\`, splice the next physical line on with no
    /// newline. A trailing `\` at end of input is dropped.
    fn fold_backslash(&mut self, value: &mut String) -> Result<(), ParseError> {
        while value.ends_with('\\') {
            value.pop();
            match self.read_physical()? {
                Some((_, next)) => value.push_str(&next),
                None => break,
            }
        }
        Ok(())
    }

    fn read_physical(&mut self) -> Result<Option<(usize, String)>, ParseError> {
        if let Some(item) = self.lookahead.take() {
            return Ok(Some(item));
        }
        let mut buf = String::new();
        if self.reader.read_line(&mut buf)? == 0 {
            return Ok(None);
        }
        self.line += 1;
        while buf.ends_with('\n') || buf.ends_with('\r') {
            buf.pop();
        }
        Ok(Some((self.line, buf)))
    }
}

/// Splits `name : value` per the field-line grammar
/// `^(%?[A-Za-z_][A-Za-z0-9_]*)\s*:\s?(.*)$`.
fn split_field_line(raw: &str) -> Option<(&str, &str)> {
    let bytes = raw.as_bytes();
    let mut i = 0;
    if bytes.first() == Some(&b'%') {
        i = 1;
    }
    match bytes.get(i) {
        Some(b) if b.is_ascii_alphabetic() || *b == b'_' => i += 1,
        _ => return None,
    }
    while matches!(bytes.get(i), Some(b) if b.is_ascii_alphanumeric() || *b == b'_') {
        i += 1;
    }
    let name = &raw[..i];
    while matches!(bytes.get(i), Some(b' ') | Some(b'\t')) {
        i += 1;
    }
    if bytes.get(i) != Some(&b':') {
        return None;
    }
    i += 1;
    if matches!(bytes.get(i), Some(b' ') | Some(b'\t')) {
        i += 1;
    }
    Some((name, &raw[i..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_all(input: &str) -> Vec<LogicalLine> {
        let mut lexer = LineLexer::new(input.as_bytes());
        let mut out = Vec::new();
        while let Some(line) = lexer.next_logical().unwrap() {
            out.push(line);
        }
        out
    }

    fn field(input: &str) -> (String, String) {
        match lex_all(input).into_iter().next().unwrap() {
            LogicalLine::Field { name, value, .. } => (name, value),
            other => panic!("expected field, got {:?}", other),
        }
    }

    #[test]
    fn simple_field() {
        let (name, value) = field("Name: Ada Lovelace");
        assert_eq!(name, "Name");
        assert_eq!(value, "Ada Lovelace");
    }

    #[test]
    fn empty_value() {
        assert_eq!(field("Name:"), ("Name".into(), "".into()));
        assert_eq!(field("Name: "), ("Name".into(), "".into()));
    }

    #[test]
    fn only_one_space_after_colon_is_consumed() {
        assert_eq!(field("Name:  padded"), ("Name".into(), " padded".into()));
    }

    #[test]
    fn tab_after_colon_is_a_separator_too() {
        assert_eq!(field("Name:\tAda"), ("Name".into(), "Ada".into()));
        assert_eq!(field("Name:\t\tAda"), ("Name".into(), "\tAda".into()));
    }

    #[test]
    fn colon_in_value() {
        assert_eq!(field("Time: 12:30:00"), ("Time".into(), "12:30:00".into()));
    }

    #[test]
    fn meta_field_name_keeps_percent() {
        assert_eq!(field("%rec: Book"), ("%rec".into(), "Book".into()));
    }

    #[test]
    fn space_before_colon_allowed() {
        assert_eq!(field("Name : x"), ("Name".into(), "x".into()));
    }

    #[test]
    fn plus_continuation_appends_after_newline() {
        let (_, value) = field("Address: 123 Main St\n+ Apt 4B\n+ New York, NY");
        assert_eq!(value, "123 Main St\nApt 4B\nNew York, NY");
    }

    #[test]
    fn plus_without_space_appends_verbatim() {
        let (_, value) = field("Name: A\n+line2");
        assert_eq!(value, "A\nline2");
    }

    #[test]
    fn plus_with_extra_whitespace_keeps_it() {
        let (_, value) = field("Name: A\n+   indented");
        assert_eq!(value, "A\n  indented");
    }

    #[test]
    fn backslash_joins_without_newline() {
        let (_, value) = field("LongLine: This is a \\\nsingle logical line");
        assert_eq!(value, "This is a single logical line");
    }

    #[test]
    fn backslash_inside_continuation() {
        let (_, value) = field("Name: A\n+ b\\\nc");
        assert_eq!(value, "A\nbc");
    }

    #[test]
    fn backslash_at_eof_is_dropped() {
        let (_, value) = field("Name: A\\");
        assert_eq!(value, "A");
    }

    #[test]
    fn comment_and_blank_classification() {
        let lines = lex_all("# a comment\n\nName: x");
        assert!(matches!(lines[0], LogicalLine::Comment { line: 1 }));
        assert!(matches!(lines[1], LogicalLine::Blank { line: 2 }));
        assert!(matches!(lines[2], LogicalLine::Field { line: 3, .. }));
    }

    #[test]
    fn whitespace_only_line_is_blank() {
        let lines = lex_all("   \t ");
        assert!(matches!(lines[0], LogicalLine::Blank { .. }));
    }

    #[test]
    fn stray_continuation_is_fatal() {
        let mut lexer = LineLexer::new("+ orphan".as_bytes());
        assert!(matches!(
            lexer.next_logical(),
            Err(ParseError::StrayContinuation { line: 1 })
        ));
    }

    #[test]
    fn continuation_after_blank_is_stray() {
        let mut lexer = LineLexer::new("Name: x\n\n+ orphan".as_bytes());
        lexer.next_logical().unwrap();
        lexer.next_logical().unwrap();
        assert!(matches!(
            lexer.next_logical(),
            Err(ParseError::StrayContinuation { line: 3 })
        ));
    }

    #[test]
    fn malformed_line_is_fatal() {
        let mut lexer = LineLexer::new("no colon here".as_bytes());
        assert!(matches!(
            lexer.next_logical(),
            Err(ParseError::MalformedField { line: 1 })
        ));
        let mut lexer = LineLexer::new("9Name: x".as_bytes());
        assert!(matches!(
            lexer.next_logical(),
            Err(ParseError::MalformedField { line: 1 })
        ));
    }

    #[test]
    fn line_numbers_follow_physical_lines() {
        let lines = lex_all("A: 1\n+ cont\nB: 2");
        match &lines[1] {
            LogicalLine::Field { name, line, .. } => {
                assert_eq!(name, "B");
                assert_eq!(*line, 3);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn crlf_input_is_tolerated() {
        let (_, value) = field("Name: A\r\n+ b\r\n");
        assert_eq!(value, "A\nb");
    }
}
