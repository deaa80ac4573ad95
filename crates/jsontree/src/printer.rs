//! JSON text output.
//!
//! Strings always have their control characters escaped, along with `"`,
//! `\` and U+2028/U+2029. HTML-significant characters and characters
//! outside Latin-1 are escaped on request.
//!
//! Containers reached again while they are still being printed (only
//! possible after reference expansion) are printed as `{...}` / `[...]`.
//! A node shared by two branches without forming a cycle prints in full
//! each time.

use std::collections::HashSet;

use crate::value::{Data, Json};

const HEX: &[u8; 16] = b"0123456789abcdef";
const ELLIPSIS: &str = "...";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrintOptions {
    /// Escape `<`, `>`, `&`, `=` and `'`.
    pub escape_html: bool,
    /// Escape every character above U+00FF.
    pub escape_non_latin1: bool,
    /// Stop adding children once the text would exceed this many
    /// characters. Tokens are never cut: the first child that does not fit
    /// is replaced by `...` and the container is closed.
    pub max_chars: Option<usize>,
}

pub fn print(json: &Json, options: &PrintOptions) -> String {
    let mut printer = Printer {
        options,
        active: HashSet::new(),
    };
    let mut out = String::new();
    printer.write(json, &mut out, options.max_chars);
    out
}

/// Escapes `text` for use between double quotes.
pub fn escape(text: &str, options: &PrintOptions) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    escape_into(&mut out, text, options);
    out
}

pub fn escape_into(out: &mut String, text: &str, options: &PrintOptions) {
    for c in text.chars() {
        match c {
            '\u{8}' => out.push_str("\\b"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\u{c}' => out.push_str("\\f"),
            '\r' => out.push_str("\\r"),
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            c if is_control(c) => push_unicode_escape(out, c),
            '<' | '>' | '&' | '=' | '\'' if options.escape_html => push_unicode_escape(out, c),
            c if options.escape_non_latin1 && u32::from(c) > 0xff => push_unicode_escape(out, c),
            c => out.push(c),
        }
    }
}

/// Characters JSON or JavaScript cannot carry raw inside a string literal.
fn is_control(c: char) -> bool {
    matches!(c, '\u{0}'..='\u{1f}' | '\u{7f}'..='\u{9f}' | '\u{2028}' | '\u{2029}')
}

/// `\uXXXX`, as a surrogate pair outside the BMP.
fn push_unicode_escape(out: &mut String, c: char) {
    let mut units = [0u16; 2];
    for unit in c.encode_utf16(&mut units) {
        out.push_str("\\u");
        for shift in [12, 8, 4, 0] {
            out.push(HEX[usize::from((*unit >> shift) & 0xf)] as char);
        }
    }
}

struct Printer<'a> {
    options: &'a PrintOptions,
    /// Containers on the path from the root to the node being printed.
    active: HashSet<usize>,
}

impl Printer<'_> {
    fn write(&mut self, json: &Json, out: &mut String, limit: Option<usize>) {
        match json.snapshot() {
            Data::Null => out.push_str("null"),
            Data::Bool(value) => out.push_str(if value { "true" } else { "false" }),
            Data::Number(number) => out.push_str(&number.to_string()),
            Data::String(text) => self.write_string(&text, out),
            Data::Array(items) => {
                let children = items.iter().map(|item| (None, item));
                self.write_container(json, ('[', ']'), children, out, limit);
            }
            Data::Object(map) => {
                let children = map.iter().map(|(key, value)| (Some(key.as_str()), value));
                self.write_container(json, ('{', '}'), children, out, limit);
            }
        }
    }

    fn write_string(&self, text: &str, out: &mut String) {
        out.push('"');
        escape_into(out, text, self.options);
        out.push('"');
    }

    fn write_container<'c>(
        &mut self,
        json: &Json,
        (open, close): (char, char),
        children: impl Iterator<Item = (Option<&'c str>, &'c Json)>,
        out: &mut String,
        limit: Option<usize>,
    ) {
        let id = json.node_id();
        if !self.active.insert(id) {
            out.push(open);
            out.push_str(ELLIPSIS);
            out.push(close);
            return;
        }
        out.push(open);
        match limit {
            None => {
                for (at, (key, child)) in children.enumerate() {
                    if at > 0 {
                        out.push(',');
                    }
                    if let Some(key) = key {
                        self.write_string(key, out);
                        out.push(':');
                    }
                    self.write(child, out, None);
                }
            }
            Some(max) => {
                // Room for both brackets and a trailing `,...`.
                let mut used = 2 + 1 + ELLIPSIS.len();
                for (at, (key, child)) in children.enumerate() {
                    let mut piece = String::new();
                    if at > 0 {
                        piece.push(',');
                    }
                    if let Some(key) = key {
                        self.write_string(key, &mut piece);
                        piece.push(':');
                    }
                    let prefix = piece.chars().count();
                    let budget = max.saturating_sub(used + prefix);
                    self.write(child, &mut piece, Some(budget));
                    let len = piece.chars().count();
                    if used + len > max {
                        if at > 0 {
                            out.push(',');
                        }
                        out.push_str(ELLIPSIS);
                        break;
                    }
                    out.push_str(&piece);
                    used += len;
                }
            }
        }
        out.push(close);
        self.active.remove(&id);
    }
}
