//! Recursive-descent JSON reader.
//!
//! Besides standard JSON the reader accepts `//` line comments, `/* */`
//! block comments and single-quoted strings. Trailing commas and empty
//! array slots (`[1,,2]`) are rejected.

use std::sync::Arc;

use crate::error::{JsonError, Result};
use crate::factory::{self, Factory};
use crate::number::Number;
use crate::value::Json;

/// Characters of context shown on each side of a parse error.
const EXCERPT_RADIUS: usize = 10;

/// Bidirectional cursor over a character source.
pub trait CharCursor {
    /// Character under the cursor, `None` past the end.
    fn current(&self) -> Option<char>;
    /// Moves forward one character and returns the new current one.
    fn advance(&mut self) -> Option<char>;
    /// Moves back one character (never before the start) and returns the
    /// new current one.
    fn retreat(&mut self) -> Option<char>;
    /// Characters consumed so far.
    fn offset(&self) -> usize;
    /// Text around the cursor, for diagnostics.
    fn excerpt(&self) -> String;
}

pub struct StrCursor {
    chars: Vec<char>,
    x: usize,
}

impl StrCursor {
    pub fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            x: 0,
        }
    }
}

impl CharCursor for StrCursor {
    fn current(&self) -> Option<char> {
        self.chars.get(self.x).copied()
    }

    fn advance(&mut self) -> Option<char> {
        if self.x < self.chars.len() {
            self.x += 1;
        }
        self.current()
    }

    fn retreat(&mut self) -> Option<char> {
        self.x = self.x.saturating_sub(1);
        self.current()
    }

    fn offset(&self) -> usize {
        self.x
    }

    fn excerpt(&self) -> String {
        let from = self.x.saturating_sub(EXCERPT_RADIUS);
        let to = (self.x + EXCERPT_RADIUS).min(self.chars.len());
        self.chars[from..to].iter().collect()
    }
}

/// Parses exactly one value; anything but whitespace and comments after it
/// is an error.
pub fn parse(text: &str) -> Result<Json> {
    let mut parser = Parser::new(StrCursor::new(text));
    let value = parser.read_value()?;
    parser.skip_whitespace()?;
    match parser.cursor.current() {
        None => Ok(value),
        Some(c) => Err(parser.malformed(format!("unexpected `{c}` after the value"))),
    }
}

pub struct Parser<C> {
    cursor: C,
    factory: Arc<dyn Factory>,
}

impl<C: CharCursor> Parser<C> {
    /// Reader that builds nodes with the factory active on this thread.
    pub fn new(cursor: C) -> Self {
        Self::with_factory(cursor, factory::current())
    }

    pub fn with_factory(cursor: C, factory: Arc<dyn Factory>) -> Self {
        Self { cursor, factory }
    }

    pub fn cursor(&self) -> &C {
        &self.cursor
    }

    pub fn into_cursor(self) -> C {
        self.cursor
    }

    /// Reads the next value and leaves the cursor right after it.
    pub fn read_value(&mut self) -> Result<Json> {
        self.skip_whitespace()?;
        match self.cursor.current() {
            None => Err(self.unexpected_end("a value")),
            Some('{') => self.read_object(),
            Some('[') => self.read_array(),
            Some(quote @ ('"' | '\'')) => {
                let text = self.read_string(quote)?;
                Ok(self.factory.string(text))
            }
            Some('t') => {
                self.read_keyword("true")?;
                Ok(self.factory.boolean(true))
            }
            Some('f') => {
                self.read_keyword("false")?;
                Ok(self.factory.boolean(false))
            }
            Some('n') => {
                self.read_keyword("null")?;
                Ok(self.factory.nil())
            }
            Some(c) if c == '-' || c.is_ascii_digit() => {
                let number = self.read_number()?;
                Ok(self.factory.number(number))
            }
            Some(c) => Err(self.malformed(format!("unexpected `{c}`"))),
        }
    }

    /// Skips whitespace and comments.
    pub fn skip_whitespace(&mut self) -> Result<()> {
        loop {
            match self.cursor.current() {
                Some(' ' | '\t' | '\n' | '\r') => {
                    self.cursor.advance();
                }
                Some('/') => match self.cursor.advance() {
                    Some('/') => {
                        while !matches!(self.cursor.advance(), None | Some('\n')) {}
                    }
                    Some('*') => self.skip_block_comment()?,
                    _ => {
                        self.cursor.retreat();
                        return Err(self.malformed("stray `/`"));
                    }
                },
                _ => return Ok(()),
            }
        }
    }

    fn skip_block_comment(&mut self) -> Result<()> {
        let mut star = false;
        loop {
            match self.cursor.advance() {
                None => return Err(self.unexpected_end("`*/`")),
                Some('/') if star => {
                    self.cursor.advance();
                    return Ok(());
                }
                Some(c) => star = c == '*',
            }
        }
    }

    fn read_keyword(&mut self, word: &str) -> Result<()> {
        for expected in word.chars() {
            match self.cursor.current() {
                None => return Err(self.unexpected_end(format!("`{word}`"))),
                Some(c) if c == expected => {
                    self.cursor.advance();
                }
                Some(_) => return Err(self.malformed(format!("expected `{word}`"))),
            }
        }
        match self.cursor.current() {
            Some(c) if c.is_alphanumeric() || c == '_' => {
                Err(self.malformed(format!("expected `{word}`")))
            }
            _ => Ok(()),
        }
    }

    fn read_object(&mut self) -> Result<Json> {
        self.cursor.advance();
        let object = self.factory.object();
        self.skip_whitespace()?;
        if self.cursor.current() == Some('}') {
            self.cursor.advance();
            return Ok(object);
        }
        loop {
            self.skip_whitespace()?;
            let key = match self.cursor.current() {
                Some(quote @ ('"' | '\'')) => self.read_string(quote)?,
                None => return Err(self.unexpected_end("a property name")),
                Some('}') => return Err(self.malformed("trailing comma in object")),
                Some(_) => return Err(self.malformed("expected a quoted property name")),
            };
            self.skip_whitespace()?;
            match self.cursor.current() {
                Some(':') => {
                    self.cursor.advance();
                }
                None => return Err(self.unexpected_end("`:`")),
                Some(_) => return Err(self.malformed("expected `:` after property name")),
            }
            let value = self.read_value()?;
            object.set(key, value)?;
            self.skip_whitespace()?;
            match self.cursor.current() {
                Some(',') => {
                    self.cursor.advance();
                }
                Some('}') => {
                    self.cursor.advance();
                    return Ok(object);
                }
                None => return Err(self.unexpected_end("`,` or `}`")),
                Some(_) => return Err(self.malformed("expected `,` or `}` in object")),
            }
        }
    }

    fn read_array(&mut self) -> Result<Json> {
        self.cursor.advance();
        let array = self.factory.array();
        self.skip_whitespace()?;
        if self.cursor.current() == Some(']') {
            self.cursor.advance();
            return Ok(array);
        }
        loop {
            self.skip_whitespace()?;
            match self.cursor.current() {
                Some(']') => return Err(self.malformed("trailing comma in array")),
                Some(',') => return Err(self.malformed("missing array element")),
                _ => {}
            }
            let value = self.read_value()?;
            array.add(value)?;
            self.skip_whitespace()?;
            match self.cursor.current() {
                Some(',') => {
                    self.cursor.advance();
                }
                Some(']') => {
                    self.cursor.advance();
                    return Ok(array);
                }
                None => return Err(self.unexpected_end("`,` or `]`")),
                Some(_) => return Err(self.malformed("expected `,` or `]` in array")),
            }
        }
    }

    /// Reads a string delimited by `quote`. Consecutive `\u` escapes are
    /// decoded together as UTF-16, so surrogate pairs combine; unpaired
    /// surrogates become U+FFFD.
    fn read_string(&mut self, quote: char) -> Result<String> {
        let mut out = String::new();
        let mut units: Vec<u16> = Vec::new();
        let mut c = self.cursor.advance();
        loop {
            match c {
                None => return Err(self.unexpected_end(format!("closing `{quote}`"))),
                Some(q) if q == quote => {
                    flush_units(&mut units, &mut out);
                    self.cursor.advance();
                    return Ok(out);
                }
                Some('\n' | '\r') => {
                    return Err(self.malformed("unescaped line break in string"));
                }
                Some('\\') => {
                    let escaped = match self.cursor.advance() {
                        None => return Err(self.unexpected_end("an escape sequence")),
                        Some('u') => {
                            units.push(self.read_hex4()?);
                            c = self.cursor.current();
                            continue;
                        }
                        Some('"') => '"',
                        Some('\'') => '\'',
                        Some('\\') => '\\',
                        Some('/') => '/',
                        Some('b') => '\u{8}',
                        Some('f') => '\u{c}',
                        Some('n') => '\n',
                        Some('r') => '\r',
                        Some('t') => '\t',
                        Some(other) => {
                            return Err(self.malformed(format!("invalid escape `\\{other}`")))
                        }
                    };
                    flush_units(&mut units, &mut out);
                    out.push(escaped);
                }
                Some(other) => {
                    flush_units(&mut units, &mut out);
                    out.push(other);
                }
            }
            c = self.cursor.advance();
        }
    }

    /// Reads the four hex digits after `\u`, leaving the cursor after them.
    fn read_hex4(&mut self) -> Result<u16> {
        let mut unit: u16 = 0;
        for _ in 0..4 {
            let digit = match self.cursor.advance() {
                None => return Err(self.unexpected_end("four hex digits")),
                Some(c) => c
                    .to_digit(16)
                    .ok_or_else(|| self.malformed("invalid `\\u` escape"))?,
            };
            unit = unit * 16 + digit as u16;
        }
        self.cursor.advance();
        Ok(unit)
    }

    fn read_number(&mut self) -> Result<Number> {
        let mut literal = String::new();
        let mut digits = 0;
        let mut fractional = false;
        if self.cursor.current() == Some('-') {
            literal.push('-');
            self.cursor.advance();
        }
        match self.cursor.current() {
            Some('0') => {
                literal.push('0');
                digits += 1;
                self.cursor.advance();
            }
            _ => digits += self.read_digits(&mut literal)?,
        }
        if self.cursor.current() == Some('.') {
            fractional = true;
            literal.push('.');
            self.cursor.advance();
            digits += self.read_digits(&mut literal)?;
        }
        if let Some(e @ ('e' | 'E')) = self.cursor.current() {
            fractional = true;
            literal.push(e);
            if let Some(sign @ ('+' | '-')) = self.cursor.advance() {
                literal.push(sign);
                self.cursor.advance();
            }
            self.read_digits(&mut literal)?;
        }
        Number::from_scanned(&literal, digits, fractional)
            .ok_or_else(|| self.malformed(format!("unrepresentable number `{literal}`")))
    }

    /// Appends a non-empty digit run to `literal` and returns its length.
    fn read_digits(&mut self, literal: &mut String) -> Result<usize> {
        let mut count = 0;
        while let Some(c) = self.cursor.current().filter(char::is_ascii_digit) {
            literal.push(c);
            count += 1;
            self.cursor.advance();
        }
        if count > 0 {
            return Ok(count);
        }
        match self.cursor.current() {
            None => Err(self.unexpected_end("a digit")),
            Some(_) => Err(self.malformed("expected a digit")),
        }
    }

    fn malformed(&self, message: impl Into<String>) -> JsonError {
        JsonError::MalformedInput {
            offset: self.cursor.offset(),
            message: message.into(),
            excerpt: self.cursor.excerpt(),
        }
    }

    fn unexpected_end(&self, expected: impl Into<String>) -> JsonError {
        JsonError::UnexpectedEnd {
            offset: self.cursor.offset(),
            expected: expected.into(),
        }
    }
}

fn flush_units(units: &mut Vec<u16>, out: &mut String) {
    if units.is_empty() {
        return;
    }
    out.extend(
        char::decode_utf16(units.drain(..)).map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER)),
    );
}
