//! Document operations
//!
//! Format and Sort rewrite a whole document: every entry is scanned first and
//! nothing is produced when any entry is malformed. Duplicate labels are
//! reported after the scan and the last occurrence wins.

use std::collections::BTreeMap;
use thiserror::Error;

use bibtidy_bibtex::text::line_at;
use bibtidy_bibtex::{
    format_entries, format_entry, scan_entries, scan_fields, Abbreviations, Entry,
    FieldNormalizer, NormalizedEntry, ScanError,
};
use bibtidy_identifiers::{doi_url, Doi, DEFAULT_RESOLVER};

use crate::fetch::FetchError;
use crate::record::FetchedRecord;
use crate::settings::{ConfigError, Settings};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("Entry type `{kind}` of {label} at line {line} has no field list in the settings")]
    UnknownEntryKind {
        kind: String,
        label: String,
        line: usize,
    },
}

impl OperationError {
    /// 1-based line the error refers to
    pub fn line(&self) -> usize {
        match self {
            Self::Scan(e) => e.line(),
            Self::UnknownEntryKind { line, .. } => *line,
        }
    }
}

/// A label seen more than once for the same entry kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Duplicate {
    pub kind: String,
    pub label: String,
    /// Line of the occurrence that replaced the earlier one
    pub line: usize,
}

/// Result of a document operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// The rewritten document
    pub output: String,
    /// Number of entries written
    pub entries: usize,
    pub duplicates: Vec<Duplicate>,
}

/// Normalization and the overlays applied after it
#[derive(Debug, Clone)]
pub struct Pipeline {
    normalizer: FieldNormalizer,
    abbreviations: Abbreviations,
    indentation: String,
    replace_url: bool,
    abbreviate_journal: bool,
}

impl Pipeline {
    pub fn new(settings: &Settings, abbreviations: Abbreviations) -> Result<Self, ConfigError> {
        Ok(Self {
            normalizer: settings.normalizer()?,
            abbreviations,
            indentation: settings.indentation.clone(),
            replace_url: settings.replace_url,
            abbreviate_journal: settings.abbreviate_journal,
        })
    }

    pub fn abbreviations(&self) -> &Abbreviations {
        &self.abbreviations
    }

    /// Build a schema-ordered entry from raw `(name, value)` pairs.
    ///
    /// Returns `None` when `kind` has no field list. Fields outside the
    /// schema are dropped and a repeated field keeps its last value. The
    /// journal is abbreviated here, when enabled.
    pub fn normalize_entry<'a, I>(&self, kind: &str, label: &str, fields: I) -> Option<NormalizedEntry>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let schema = self.normalizer.fields_for(kind)?;
        let mut entry = NormalizedEntry::with_schema(kind, label, schema);

        for (name, raw) in fields {
            let name = name.to_lowercase();
            if !self.normalizer.accepts(kind, &name) {
                continue;
            }

            let value = if name == "journal" && self.abbreviate_journal {
                // Abbreviate before accent encoding, LaTeX codes would split the words
                let title = raw.split_whitespace().collect::<Vec<_>>().join(" ");
                let abbreviated = self.abbreviations.abbreviate(&title);
                self.normalizer.normalize(kind, &name, &abbreviated)
            } else {
                self.normalizer.normalize(kind, &name, raw)
            };
            entry.set_field(&name, value);
        }

        Some(entry)
    }

    /// Rewrite `url` from `doi`, when enabled
    pub fn link_doi(&self, entry: &mut NormalizedEntry, doi: Option<&str>) {
        if !self.replace_url {
            return;
        }

        if let Some(doi) = doi {
            // Values that are not valid DOIs are still linked verbatim
            let url = match Doi::parse(doi) {
                Some(doi) => doi_url(&doi),
                None => format!("{}{}", DEFAULT_RESOLVER, doi.trim()),
            };
            entry.set_field("url", url);
        }
    }

    /// Normalize every entry of `text` and emit them sorted by kind, then label
    pub fn format_document(&self, text: &str) -> Result<Report, OperationError> {
        let mut entries = BTreeMap::new();
        let mut duplicates = Vec::new();

        for entry in scan_entries(text)? {
            let fields = scan_fields(text, &entry)?;
            let Some(mut normalized) = self.normalize_entry(
                &entry.kind,
                &entry.label,
                fields.iter().map(|f| (f.name.as_str(), f.value.as_str())),
            ) else {
                return Err(OperationError::UnknownEntryKind {
                    kind: entry.kind.clone(),
                    label: entry.label.clone(),
                    line: line_at(text, entry.span.start),
                });
            };

            let doi = normalized.doi().map(str::to_string);
            self.link_doi(&mut normalized, doi.as_deref());

            record_entry(&mut entries, &mut duplicates, text, &entry, normalized);
        }

        Ok(Report {
            output: format_entries(entries.values(), &self.indentation),
            entries: entries.len(),
            duplicates,
        })
    }

    /// Normalize a fetched record; `url` is derived from the DOI it was fetched for
    pub fn fetched_entry(&self, record: &FetchedRecord, doi: &Doi) -> Result<NormalizedEntry, FetchError> {
        let mut entry = self
            .normalize_entry(
                &record.kind,
                &record.label,
                record.fields.iter().map(|f| (f.name.as_str(), f.value.as_str())),
            )
            .ok_or_else(|| FetchError::UnknownEntryKind(record.kind.clone()))?;

        self.link_doi(&mut entry, Some(doi.as_str()));
        Ok(entry)
    }

    /// Serialize one entry with the configured indentation
    pub fn serialize(&self, entry: &NormalizedEntry) -> String {
        format_entry(entry, &self.indentation)
    }
}

/// Reorder the entries of `text` by kind, then label, keeping their text as is
pub fn sort_document(text: &str) -> Result<Report, OperationError> {
    let mut entries = BTreeMap::new();
    let mut duplicates = Vec::new();

    for entry in scan_entries(text)? {
        let raw = entry.span.slice(text);
        record_entry(&mut entries, &mut duplicates, text, &entry, raw);
    }

    Ok(Report {
        output: entries.values().copied().collect::<Vec<_>>().join("\n\n"),
        entries: entries.len(),
        duplicates,
    })
}

fn record_entry<T>(
    entries: &mut BTreeMap<(String, String), T>,
    duplicates: &mut Vec<Duplicate>,
    text: &str,
    entry: &Entry,
    value: T,
) {
    let key = (entry.kind.clone(), entry.label.clone());
    if entries.insert(key, value).is_some() {
        let line = line_at(text, entry.span.start);
        tracing::warn!("Duplicate entry {} at line {}", entry.label, line);
        duplicates.push(Duplicate {
            kind: entry.kind.clone(),
            label: entry.label.clone(),
            line,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::AbbreviationConfig;

    fn pipeline() -> Pipeline {
        Pipeline::new(&Settings::default(), AbbreviationConfig::default().build()).unwrap()
    }

    #[test]
    fn test_format_orders_by_kind_then_label() {
        let text = "@misc{b, title={B}}\n@article{z, title={Z}}\n@misc{a, title={A}}";
        let report = pipeline().format_document(text).unwrap();
        assert_eq!(
            report.output,
            "@article{z,\n  title = {{Z}},\n}\n\n@misc{a,\n  title = {{A}},\n}\n\n@misc{b,\n  title = {{B}},\n}"
        );
        assert_eq!(report.entries, 3);
        assert!(report.duplicates.is_empty());
    }

    #[test]
    fn test_format_uses_schema_order_and_drops_unknown_fields() {
        let text = "@article{x, year = 2001, abstract = {long}, author = {A. Author}}";
        let report = pipeline().format_document(text).unwrap();
        assert_eq!(
            report.output,
            "@article{x,\n  author = {A. Author},\n  year   = {2001},\n}"
        );
    }

    #[test]
    fn test_format_overlays() {
        let text = "@article{x,\n  journal = {Physical Review Letters},\n  doi = {10.1103/PhysRevLett.116.061102},\n  url = {http://example.com}\n}";
        let report = pipeline().format_document(text).unwrap();
        assert!(report.output.contains("journal = {Phys. Rev. Lett.},"));
        assert!(report
            .output
            .contains("url     = {https://doi.org/10.1103/PhysRevLett.116.061102},"));
    }

    #[test]
    fn test_format_abbreviates_accented_journal() {
        let text = "@article{a, journal = {Zeitschrift für Physik}}\n\
                    @article{b, journal = {Bulletin de la Société Chimique de France}}\n\
                    @article{c, journal = {Revue Générale des   Sciences}}";
        let output = pipeline().format_document(text).unwrap().output;
        assert_eq!(
            output,
            "@article{a,\n  journal = {Zeitschrift Physik},\n}\n\n\
             @article{b,\n  journal = {Bull. Soc. Chimique France},\n}\n\n\
             @article{c,\n  journal = {Revue G{\\'e}n{\\'e}rale Sci.},\n}"
        );
    }

    #[test]
    fn test_format_links_doi_field_verbatim() {
        let text = "@misc{x, doi = {doi:10.1000/abc}, url = {http://example.com}}";
        let report = pipeline().format_document(text).unwrap();
        assert!(report.output.contains("url = {https://doi.org/10.1000/abc},"));

        let text = "@misc{x, doi = {unregistered}, url = {http://example.com}}";
        let report = pipeline().format_document(text).unwrap();
        assert!(report.output.contains("url = {https://doi.org/unregistered},"));
    }

    #[test]
    fn test_format_policies_disabled() {
        let settings = Settings {
            replace_url: false,
            abbreviate_journal: false,
            ..Settings::default()
        };
        let pipeline = Pipeline::new(&settings, AbbreviationConfig::default().build()).unwrap();
        let text = "@article{x, journal = {Physical Review}, doi = {10.1000/x}, url = {http://a.b}}";
        let output = pipeline.format_document(text).unwrap().output;
        assert!(output.contains("journal = {Physical Review},"));
        assert!(output.contains("url     = {http://a.b},"));
    }

    #[test]
    fn test_format_last_duplicate_wins() {
        let text = "@misc{dup, note = {first}}\n\n@misc{dup, note = {second}}";
        let report = pipeline().format_document(text).unwrap();
        assert_eq!(report.output, "@misc{dup,\n  note = {second},\n}");
        assert_eq!(
            report.duplicates,
            vec![Duplicate {
                kind: "misc".to_string(),
                label: "dup".to_string(),
                line: 3,
            }]
        );
    }

    #[test]
    fn test_same_label_different_kind_is_not_duplicate() {
        let text = "@misc{x, note = {a}}\n@book{x, note = {b}}";
        let report = pipeline().format_document(text).unwrap();
        assert_eq!(report.entries, 2);
        assert!(report.duplicates.is_empty());
    }

    #[test]
    fn test_format_unknown_kind_aborts() {
        let text = "@misc{ok, note = {a}}\n@dataset{d, title = {T}}";
        let err = pipeline().format_document(text).unwrap_err();
        assert_eq!(
            err,
            OperationError::UnknownEntryKind {
                kind: "dataset".to_string(),
                label: "d".to_string(),
                line: 2,
            }
        );
    }

    #[test]
    fn test_format_empty_document() {
        let report = pipeline().format_document("no entries here").unwrap();
        assert_eq!(report.output, "");
        assert_eq!(report.entries, 0);
    }

    #[test]
    fn test_sort_keeps_raw_text() {
        let text = "@misc{b,\n   note={ B }}\n% comment\n@article{a, title = \"A\"}";
        let report = sort_document(text).unwrap();
        assert_eq!(
            report.output,
            "@article{a, title = \"A\"}\n\n@misc{b,\n   note={ B }}"
        );
    }

    #[test]
    fn test_sort_malformed_is_error() {
        let err = sort_document("@misc{a, note = {x}}\n@misc{b, note = {").unwrap_err();
        assert_eq!(err.line(), 2);
    }
}
