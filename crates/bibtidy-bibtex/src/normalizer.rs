//! Per-field value normalization
//!
//! * collapses whitespace
//! * replaces accented characters with LaTeX codes
//! * protects case-sensitive fields with an extra pair of braces
//! * turns page ranges into `--` ranges

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::collections::{HashMap, HashSet};

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref PAGE_RANGE: Regex = Regex::new(r"([a-zA-Z0-9])\s*[-–—]+\s*([a-zA-Z0-9])").unwrap();
}

/// Field schema per entry kind, in output order
pub type FieldSchema = HashMap<String, Vec<String>>;

/// Normalizes raw field values against a schema and an accent table
#[derive(Debug, Clone)]
pub struct FieldNormalizer {
    schema: FieldSchema,
    accents: HashMap<String, String>,
    accent_pattern: Option<Regex>,
    case_sensitive: HashSet<String>,
}

impl FieldNormalizer {
    /// Build a normalizer. Fails only if the combined accent pattern does not compile.
    pub fn new(
        schema: FieldSchema,
        accents: HashMap<String, String>,
        case_sensitive: HashSet<String>,
    ) -> Result<Self, regex::Error> {
        let accent_pattern = if accents.is_empty() {
            None
        } else {
            // Longest keys first so multi-character sequences win
            let mut keys: Vec<&String> = accents.keys().collect();
            keys.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
            let alternation = keys
                .iter()
                .map(|k| regex::escape(k))
                .collect::<Vec<_>>()
                .join("|");
            Some(Regex::new(&alternation)?)
        };

        Ok(Self {
            schema,
            accents,
            accent_pattern,
            case_sensitive,
        })
    }

    /// Ordered field names for an entry kind
    pub fn fields_for(&self, kind: &str) -> Option<&[String]> {
        self.schema.get(kind).map(Vec::as_slice)
    }

    /// Whether `name` belongs to the schema of `kind`
    pub fn accepts(&self, kind: &str, name: &str) -> bool {
        self.fields_for(kind)
            .is_some_and(|fields| fields.iter().any(|f| f == name))
    }

    /// Normalize one value.
    ///
    /// Returns an empty string when the field is not part of the kind's
    /// schema or the value is blank.
    pub fn normalize(&self, kind: &str, name: &str, raw: &str) -> String {
        let name = name.to_lowercase();
        if !self.accepts(kind, &name) {
            return String::new();
        }

        let collapsed = WHITESPACE.replace_all(raw, " ");
        let mut value = match &self.accent_pattern {
            Some(pattern) => pattern
                .replace_all(&collapsed, |caps: &Captures| {
                    self.accents
                        .get(&caps[0])
                        .cloned()
                        .unwrap_or_else(|| caps[0].to_string())
                })
                .into_owned(),
            None => collapsed.into_owned(),
        };

        if value.trim().is_empty() {
            return String::new();
        }

        if self.case_sensitive.contains(&name) {
            value = format!("{{{}}}", value.trim());
        }

        if name == "pages" {
            value = PAGE_RANGE.replace_all(&value, "${1}--${2}").into_owned();
        }

        value.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn normalizer() -> FieldNormalizer {
        let schema = HashMap::from([(
            "article".to_string(),
            ["author", "title", "journal", "pages", "year"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )]);
        let accents = HashMap::from([
            ("ä".to_string(), "{\\\"a}".to_string()),
            ("é".to_string(), "{\\'e}".to_string()),
        ]);
        let case_sensitive = HashSet::from(["title".to_string()]);
        FieldNormalizer::new(schema, accents, case_sensitive).unwrap()
    }

    #[rstest]
    #[case("123 - 145", "123--145")]
    #[case("123–145", "123--145")]
    #[case("123--145", "123--145")]
    #[case("e123 -- e145", "e123--e145")]
    #[case("123", "123")]
    fn test_page_ranges(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalizer().normalize("article", "pages", raw), expected);
    }

    #[test]
    fn test_unknown_field_is_empty() {
        let n = normalizer();
        assert_eq!(n.normalize("article", "abstract", "Some text"), "");
        assert_eq!(n.normalize("book", "title", "Some text"), "");
    }

    #[test]
    fn test_whitespace_collapsed() {
        assert_eq!(
            normalizer().normalize("article", "author", "  John\n   Smith  "),
            "John Smith"
        );
    }

    #[test]
    fn test_accents_replaced() {
        assert_eq!(
            normalizer().normalize("article", "author", "Jäger and Dupré"),
            "J{\\\"a}ger and Dupr{\\'e}"
        );
    }

    #[test]
    fn test_case_sensitive_field_wrapped() {
        assert_eq!(
            normalizer().normalize("article", "title", "The {LaTeX} Guide "),
            "{The {LaTeX} Guide}"
        );
    }

    #[test]
    fn test_field_name_case_insensitive() {
        assert_eq!(normalizer().normalize("article", "YEAR", "2020"), "2020");
    }

    #[test]
    fn test_blank_value_is_empty() {
        assert_eq!(normalizer().normalize("article", "title", "  \n "), "");
    }
}
