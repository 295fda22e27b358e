//! Entry and field scanning over raw text
//!
//! The scanner does not build a full BibTeX syntax tree. It locates
//! `@kind{` markers, finds the brace that closes each one, and then pulls
//! `name = value` pairs out of the entry body. Values may be braced, quoted
//! or bare. Braces nest, and a backslash escapes the character after it.
//!
//! Unbalanced delimiters are reported as errors with the line they start on.
//! They are never silently truncated.

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use crate::entry::{Entry, Field, Span};
use crate::text::line_at;

lazy_static! {
    static ref ENTRY_MARKER: Regex = Regex::new(r"(?i)@([a-z]+)\s*\{").unwrap();
    static ref FIELD_DEFINITION: Regex = Regex::new(r"\s*=\s*").unwrap();
}

/// Structural scan failure: the document cannot be processed as a whole
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("No matching braces for entry at line {line} found")]
    UnmatchedDelimiter { line: usize },
    #[error("Field definition at line {line} is not complete")]
    IncompleteField { line: usize },
}

impl ScanError {
    /// Line the malformed construct starts on
    pub fn line(&self) -> usize {
        match self {
            Self::UnmatchedDelimiter { line } | Self::IncompleteField { line } => *line,
        }
    }
}

/// Find the delimiter closing the one just before `begin`.
///
/// Scans `text[begin..end]` with a depth counter starting at 1. A backslash
/// skips the following character. The closing character is checked before
/// the opening one, so `open == close` (quotes) closes on the first hit.
/// Returns the byte offset of the closing delimiter.
pub fn find_matching(text: &str, begin: usize, end: usize, open: char, close: char) -> Option<usize> {
    let mut depth = 1usize;
    let mut chars = text[begin..end].char_indices();

    while let Some((offset, c)) = chars.next() {
        if c == '\\' {
            chars.next();
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                return Some(begin + offset);
            }
        } else if c == open {
            depth += 1;
        }
    }

    None
}

/// Lazy iterator over the entries of a document.
///
/// Restart from any offset with [`EntryScanner::from_offset`]. The iterator
/// ends after the first error.
#[derive(Debug, Clone)]
pub struct EntryScanner<'a> {
    text: &'a str,
    point: usize,
    done: bool,
}

impl<'a> EntryScanner<'a> {
    pub fn new(text: &'a str) -> Self {
        Self::from_offset(text, 0)
    }

    pub fn from_offset(text: &'a str, offset: usize) -> Self {
        Self {
            text,
            point: offset.min(text.len()),
            done: false,
        }
    }

    /// Offset where the next search starts
    pub fn offset(&self) -> usize {
        self.point
    }

    fn scan_next(&mut self) -> Option<Result<Entry, ScanError>> {
        let text = self.text;
        let marker = ENTRY_MARKER.captures_at(text, self.point)?;
        let whole = marker.get(0)?;
        let kind = marker.get(1)?.as_str().to_lowercase();

        let body_start = whole.end();
        let close = match find_matching(text, body_start, text.len(), '{', '}') {
            Some(close) => close,
            None => {
                return Some(Err(ScanError::UnmatchedDelimiter {
                    line: line_at(text, body_start),
                }))
            }
        };

        let label_start = body_start + leading_whitespace(&text[body_start..close]);
        let label_end = label_start
            + text[label_start..close]
                .find(|c: char| c.is_whitespace() || c == ',')
                .unwrap_or(close - label_start);

        let entry = Entry {
            kind,
            label: text[label_start..label_end].to_string(),
            span: Span::new(whole.start(), close + 1),
        };

        tracing::debug!(
            "Found @{}{{{}}} at lines {}-{}",
            entry.kind,
            entry.label,
            line_at(text, entry.span.start),
            line_at(text, close)
        );

        self.point = entry.span.end;
        Some(Ok(entry))
    }
}

impl Iterator for EntryScanner<'_> {
    type Item = Result<Entry, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let next = self.scan_next();
        if !matches!(next, Some(Ok(_))) {
            self.done = true;
        }
        next
    }
}

/// Scan every entry of a document, stopping at the first structural error
pub fn scan_entries(text: &str) -> Result<Vec<Entry>, ScanError> {
    EntryScanner::new(text).collect()
}

/// Extract the fields of `entry`, in document order
pub fn scan_fields(text: &str, entry: &Entry) -> Result<Vec<Field>, ScanError> {
    let mut fields = Vec::new();
    let entry_close = entry.close();
    let mut point = entry.span.start;

    while point < entry_close {
        let definition = match FIELD_DEFINITION.find_at(text, point) {
            Some(m) if m.start() < entry_close => m,
            _ => break,
        };

        let name_start = name_start(text, point, definition.start());
        let name = &text[name_start..definition.start()];
        let value_start = definition.end().min(entry_close);

        let (value, field_end) = match text[value_start..entry_close].chars().next() {
            Some(open @ ('{' | '"')) => {
                let close = if open == '{' { '}' } else { '"' };
                let inner_start = value_start + 1;
                let Some(value_end) = find_matching(text, inner_start, entry_close, open, close)
                else {
                    return Err(ScanError::IncompleteField {
                        line: line_at(text, name_start),
                    });
                };
                let inner = strip_redundant_braces(text, Span::new(inner_start, value_end));
                (inner, value_end + 1)
            }
            _ => {
                let value_end = value_start
                    + text[value_start..entry_close]
                        .find(|c: char| c.is_whitespace() || c == ',' || c == '}')
                        .unwrap_or(entry_close - value_start);
                (Span::new(value_start, value_end), value_end)
            }
        };

        fields.push(Field {
            name: name.to_string(),
            value: value.slice(text).to_string(),
            span: Span::new(name_start, field_end),
        });

        // Bare empty values leave the cursor on the `=`
        point = field_end.max(definition.end());
    }

    Ok(fields)
}

/// Drop enclosing brace pairs while they wrap the whole value
pub fn strip_redundant_braces(text: &str, mut value: Span) -> Span {
    while value.len() >= 2
        && text[value.start..].starts_with('{')
        && text[..value.end].ends_with('}')
    {
        match find_matching(text, value.start + 1, value.end, '{', '}') {
            Some(close) if close + 1 == value.end => {
                value = Span::new(value.start + 1, value.end - 1);
            }
            _ => break,
        }
    }
    value
}

/// Start of the field name ending at `end`: the run of characters that are
/// not whitespace, `,` or `{`, never reaching back before `floor`
fn name_start(text: &str, floor: usize, end: usize) -> usize {
    text[floor..end]
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace() || *c == ',' || *c == '{')
        .map(|(offset, c)| floor + offset + c.len_utf8())
        .unwrap_or(floor)
}

fn leading_whitespace(s: &str) -> usize {
    s.len() - s.trim_start().len()
}
