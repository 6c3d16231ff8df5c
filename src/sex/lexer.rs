//! # Selection-Expression Lexer
//!
//! Byte-wise tokenizer for the selection-expression language. Tokens borrow
//! directly from the input string; only string literals containing escapes
//! are copied, and those are unescaped into the caller's arena so the token
//! still hands out a plain `&'a str`.
//!
//! ## Literal classes
//!
//! - **Integers**: decimal (`42`), hex (`0xFF`), and leading-zero octal
//!   (`012` = 10)
//! - **Reals**: `3.14`, `.5`, `1.`, `1e10`, `1.5e-3`
//! - **Strings**: single- or double-quoted with `\\`, `\'`, `\"`, `\n`,
//!   `\t` escapes
//! - **Identifiers**: field names, `%`-prefixed meta names included
//!
//! Whitespace is insignificant outside strings. An unknown character is an
//! `UnknownOperator` error; an unclosed quote is `UnterminatedString`.

use bumpalo::Bump;

use super::error::{SexError, SexErrorKind};
use super::token::{Span, Token};

pub struct Lexer<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
    token_start: usize,
    arena: &'a Bump,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str, arena: &'a Bump) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
            token_start: 0,
            arena,
        }
    }

    pub fn token_start(&self) -> usize {
        self.token_start
    }

    pub fn span(&self) -> Span {
        Span::new(self.token_start, self.pos - self.token_start)
    }

    pub fn next_token(&mut self) -> Result<Token<'a>, SexError> {
        self.skip_whitespace();
        self.token_start = self.pos;

        if self.is_eof() {
            return Ok(Token::Eof);
        }

        let ch = self.current();

        if ch.is_ascii_digit() {
            return self.scan_number();
        }
        if ch == b'.' && matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
            return self.scan_number();
        }
        if ch.is_ascii_alphabetic() || ch == b'_' {
            return Ok(self.scan_identifier(self.pos));
        }

        match ch {
            b'\'' | b'"' => self.scan_string(ch),
            b'%' => {
                // A meta identifier like %rec, otherwise the modulo operator.
                if matches!(self.peek_char(), Some(c) if c.is_ascii_alphabetic() || c == b'_') {
                    let start = self.pos;
                    self.advance();
                    Ok(self.scan_identifier(start))
                } else {
                    self.advance();
                    Ok(Token::Percent)
                }
            }
            b'=' => {
                self.advance();
                if self.current_is(b'>') {
                    self.advance();
                    Ok(Token::Implies)
                } else {
                    Ok(Token::Eq)
                }
            }
            b'!' => {
                self.advance();
                match self.bytes.get(self.pos) {
                    Some(b'=') => {
                        self.advance();
                        Ok(Token::Neq)
                    }
                    Some(b'~') => {
                        self.advance();
                        Ok(Token::NotMatch)
                    }
                    _ => Ok(Token::Not),
                }
            }
            b'<' => {
                self.advance();
                if self.current_is(b'=') {
                    self.advance();
                    Ok(Token::Le)
                } else {
                    Ok(Token::Lt)
                }
            }
            b'>' => {
                self.advance();
                if self.current_is(b'=') {
                    self.advance();
                    Ok(Token::Ge)
                } else {
                    Ok(Token::Gt)
                }
            }
            b'&' => {
                self.advance();
                if self.current_is(b'&') {
                    self.advance();
                    Ok(Token::And)
                } else {
                    Ok(Token::Concat)
                }
            }
            b'|' => {
                self.advance();
                if self.current_is(b'|') {
                    self.advance();
                    Ok(Token::Or)
                } else {
                    Err(self.unknown('|'))
                }
            }
            b'~' => {
                self.advance();
                Ok(Token::Match)
            }
            b'?' => {
                self.advance();
                Ok(Token::Question)
            }
            b':' => {
                self.advance();
                Ok(Token::Colon)
            }
            b'+' => {
                self.advance();
                Ok(Token::Plus)
            }
            b'-' => {
                self.advance();
                Ok(Token::Minus)
            }
            b'*' => {
                self.advance();
                Ok(Token::Star)
            }
            b'/' => {
                self.advance();
                Ok(Token::Slash)
            }
            b'#' => {
                self.advance();
                Ok(Token::Hash)
            }
            b'[' => {
                self.advance();
                Ok(Token::LBracket)
            }
            b']' => {
                self.advance();
                Ok(Token::RBracket)
            }
            b'(' => {
                self.advance();
                Ok(Token::LParen)
            }
            b')' => {
                self.advance();
                Ok(Token::RParen)
            }
            other => Err(self.unknown(other as char)),
        }
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn current(&self) -> u8 {
        self.bytes[self.pos]
    }

    fn current_is(&self, b: u8) -> bool {
        self.bytes.get(self.pos) == Some(&b)
    }

    fn peek_char(&self) -> Option<u8> {
        self.bytes.get(self.pos + 1).copied()
    }

    fn advance(&mut self) {
        if !self.is_eof() {
            self.pos += 1;
        }
    }

    fn skip_whitespace(&mut self) {
        while !self.is_eof() && matches!(self.current(), b' ' | b'\t' | b'\r' | b'\n') {
            self.advance();
        }
    }

    fn unknown(&self, ch: char) -> SexError {
        SexError::new(SexErrorKind::UnknownOperator(ch), self.token_start)
    }

    fn scan_identifier(&mut self, start: usize) -> Token<'a> {
        while !self.is_eof() && (self.current().is_ascii_alphanumeric() || self.current() == b'_')
        {
            self.advance();
        }
        Token::Ident(&self.input[start..self.pos])
    }

    fn scan_number(&mut self) -> Result<Token<'a>, SexError> {
        let start = self.pos;

        if self.current() == b'0' && matches!(self.peek_char(), Some(b'x') | Some(b'X')) {
            return self.scan_hex();
        }

        let mut is_real = false;
        while !self.is_eof() && self.current().is_ascii_digit() {
            self.advance();
        }
        if !self.is_eof() && self.current() == b'.' {
            is_real = true;
            self.advance();
            while !self.is_eof() && self.current().is_ascii_digit() {
                self.advance();
            }
        }
        if !self.is_eof() && (self.current() == b'e' || self.current() == b'E') {
            if matches!(self.peek_char(), Some(c) if c.is_ascii_digit() || c == b'+' || c == b'-')
            {
                is_real = true;
                self.advance();
                if matches!(self.current(), b'+' | b'-') {
                    self.advance();
                }
                while !self.is_eof() && self.current().is_ascii_digit() {
                    self.advance();
                }
            }
        }

        let text = &self.input[start..self.pos];
        if is_real {
            match text.parse::<f64>() {
                Ok(f) => Ok(Token::Real(f)),
                Err(_) => Err(SexError::new(
                    SexErrorKind::UnexpectedToken(format!("number '{}'", text)),
                    start,
                )),
            }
        } else if text.len() > 1
            && text.starts_with('0')
            && text.bytes().all(|b| (b'0'..=b'7').contains(&b))
        {
            let value = i64::from_str_radix(&text[1..], 8).map_err(|_| {
                SexError::new(
                    SexErrorKind::UnexpectedToken(format!("number '{}'", text)),
                    start,
                )
            })?;
            Ok(Token::Int(value))
        } else {
            match text.parse::<i64>() {
                Ok(i) => Ok(Token::Int(i)),
                Err(_) => Err(SexError::new(
                    SexErrorKind::UnexpectedToken(format!("number '{}'", text)),
                    start,
                )),
            }
        }
    }

    fn scan_hex(&mut self) -> Result<Token<'a>, SexError> {
        let start = self.pos;
        self.advance();
        self.advance();
        let digits_start = self.pos;
        while !self.is_eof() && self.current().is_ascii_hexdigit() {
            self.advance();
        }
        if self.pos == digits_start {
            return Err(SexError::new(
                SexErrorKind::UnexpectedToken("number '0x'".to_string()),
                start,
            ));
        }
        let value = i64::from_str_radix(&self.input[digits_start..self.pos], 16).map_err(|_| {
            SexError::new(
                SexErrorKind::UnexpectedToken(format!(
                    "number '{}'",
                    &self.input[start..self.pos]
                )),
                start,
            )
        })?;
        Ok(Token::Int(value))
    }

    fn scan_string(&mut self, quote: u8) -> Result<Token<'a>, SexError> {
        let open = self.pos;
        self.advance();
        let start = self.pos;
        let mut escaped: Option<String> = None;

        loop {
            if self.is_eof() {
                return Err(SexError::new(SexErrorKind::UnterminatedString, open));
            }
            let ch = self.current();
            if ch == quote {
                let end = self.pos;
                self.advance();
                return Ok(Token::Str(match escaped {
                    Some(s) => self.arena.alloc_str(&s),
                    None => &self.input[start..end],
                }));
            }
            if ch == b'\\' {
                let buf = escaped.get_or_insert_with(|| self.input[start..self.pos].to_string());
                self.advance();
                if self.is_eof() {
                    return Err(SexError::new(SexErrorKind::UnterminatedString, open));
                }
                match self.current() {
                    b'\\' => buf.push('\\'),
                    b'\'' => buf.push('\''),
                    b'"' => buf.push('"'),
                    b'n' => buf.push('\n'),
                    b't' => buf.push('\t'),
                    other => {
                        buf.push('\\');
                        buf.push(other as char);
                    }
                }
                self.advance();
            } else {
                if let Some(buf) = escaped.as_mut() {
                    let c_start = self.pos;
                    self.advance();
                    while !self.is_eof() && !self.input.is_char_boundary(self.pos) {
                        self.advance();
                    }
                    buf.push_str(&self.input[c_start..self.pos]);
                } else {
                    self.advance();
                }
            }
        }
    }
}
