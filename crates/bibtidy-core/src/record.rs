//! Parsing of BibTeX records returned by DOI resolvers
//!
//! Resolvers answer with one entry. Multi-line answers are read line by line
//! (`name = {value},`); anything else goes through the entry scanner.

use lazy_static::lazy_static;
use regex::Regex;

use bibtidy_bibtex::{scan_entries, scan_fields, FieldValue};

use crate::fetch::FetchError;

lazy_static! {
    static ref HEADER: Regex = Regex::new(r"(?i)@([a-z]+)\s*\{([^\s,]+)").unwrap();
    static ref FIELD_LINE: Regex = Regex::new(r"^([a-z]+) = \{(.+)\},?$").unwrap();
    static ref YEAR_LINE: Regex = Regex::new(r"^([a-z]+) = \{?([0-9]+)\}?,?$").unwrap();
}

/// A fetched entry before normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedRecord {
    /// Lowercased entry kind
    pub kind: String,
    /// Citation label with underscores removed
    pub label: String,
    /// Raw field values in record order
    pub fields: Vec<FieldValue>,
}

impl FetchedRecord {
    /// Parse a complete record
    pub fn parse(text: &str) -> Result<Self, FetchError> {
        Self::from_parts(text, text)
    }

    /// Take kind and label from `header` and the fields from `body`
    pub fn from_parts(header: &str, body: &str) -> Result<Self, FetchError> {
        let (kind, label) = parse_header(header)?;
        let fields = parse_fields(body)?;
        Ok(Self {
            kind,
            label,
            fields,
        })
    }
}

fn parse_header(text: &str) -> Result<(String, String), FetchError> {
    let caps = HEADER.captures(text).ok_or_else(|| {
        FetchError::MalformedRecord(format!(
            "no entry header in {:?}",
            text.lines().next().unwrap_or_default()
        ))
    })?;

    Ok((caps[1].to_lowercase(), caps[2].replace('_', "")))
}

fn parse_fields(text: &str) -> Result<Vec<FieldValue>, FetchError> {
    let fields = parse_field_lines(text);
    if !fields.is_empty() {
        return Ok(fields);
    }

    tracing::debug!("Record is not line oriented, scanning it as BibTeX");
    let entries = scan_entries(text).map_err(|e| FetchError::MalformedRecord(e.to_string()))?;
    let Some(entry) = entries.first() else {
        return Err(FetchError::MalformedRecord("no entry in record".to_string()));
    };

    let fields = scan_fields(text, entry).map_err(|e| FetchError::MalformedRecord(e.to_string()))?;
    Ok(fields
        .into_iter()
        .map(|f| FieldValue {
            name: f.name.to_lowercase(),
            value: f.value,
        })
        .collect())
}

/// `name = {value}` lines between the header line and the last line
fn parse_field_lines(text: &str) -> Vec<FieldValue> {
    let lines: Vec<&str> = text.split('\n').collect();
    if lines.len() < 3 {
        return Vec::new();
    }

    lines[1..lines.len() - 1]
        .iter()
        .filter_map(|line| {
            let line = line.trim();
            let pattern: &Regex = if line.starts_with("year") {
                &*YEAR_LINE
            } else {
                &*FIELD_LINE
            };
            let caps = pattern.captures(line)?;
            Some(FieldValue {
                name: caps[1].to_string(),
                value: caps[2].to_string(),
            })
        })
        .collect()
}
