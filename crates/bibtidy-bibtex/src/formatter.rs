//! BibTeX formatting module
//!
//! Converts entries back to text with one field per line, names padded to a
//! common column and every value braced.

use super::entry::NormalizedEntry;

/// Format a single entry. Fields with empty values are left out.
pub fn format_entry(entry: &NormalizedEntry, indentation: &str) -> String {
    let fields: Vec<_> = entry.fields.iter().filter(|f| !f.value.is_empty()).collect();
    let align = fields
        .iter()
        .map(|f| f.name.chars().count())
        .max()
        .unwrap_or(0);

    let mut result = String::new();
    result.push('@');
    result.push_str(&entry.kind);
    result.push('{');
    result.push_str(&entry.label);
    result.push(',');

    for field in fields {
        result.push('\n');
        result.push_str(indentation);
        result.push_str(&format!("{:<align$} = {{{}}},", field.name, field.value));
    }

    result.push_str("\n}");
    result
}

/// Format entries in the given order, separated by blank lines
pub fn format_entries<'a, I>(entries: I, indentation: &str) -> String
where
    I: IntoIterator<Item = &'a NormalizedEntry>,
{
    entries
        .into_iter()
        .map(|entry| format_entry(entry, indentation))
        .collect::<Vec<_>>()
        .join("\n\n")
}
