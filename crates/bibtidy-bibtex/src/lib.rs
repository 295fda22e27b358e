//! BibTeX scanning and normalization
//!
//! This crate provides the text-level pieces of bibtidy:
//! - Brace and quote aware scanning of `@kind{label, name = value}` blocks
//! - Field normalization (whitespace, accents, case protection, page ranges)
//! - ISO 4 style journal title abbreviation
//! - Canonical, aligned formatting of entries

mod abbreviations;
mod entry;
mod formatter;
mod normalizer;
pub mod scanner;
pub mod text;

pub use abbreviations::{AbbreviationRule, Abbreviations};
pub use entry::{Entry, Field, FieldValue, NormalizedEntry, Span};
pub use formatter::{format_entries, format_entry};
pub use normalizer::{FieldNormalizer, FieldSchema};
pub use scanner::{
    find_matching, scan_entries, scan_fields, strip_redundant_braces, EntryScanner, ScanError,
};
