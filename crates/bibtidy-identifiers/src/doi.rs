//! DOI validation

use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;

lazy_static! {
    // Crossref's recommended pattern for modern DOIs, anchored at the start
    static ref DOI_REGEX: Regex =
        Regex::new(r#"^10\.\d{4,}(?:\.\d+)*/[^"&'<>\s]+\b"#).unwrap();

    // `doi:` labels and resolver URLs people paste along with the DOI
    static ref DOI_PREFIX: Regex =
        Regex::new(r"(?i)^(?:doi:\s*|https?://(?:dx\.)?doi\.org/)").unwrap();
}

/// A validated DOI such as `10.1103/PhysRevLett.116.061102`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Doi(String);

impl Doi {
    /// Validate a string as a DOI.
    ///
    /// Surrounding whitespace and a `doi:` or resolver URL prefix are removed
    /// first. Returns `None` when the rest does not start with a DOI.
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        let candidate = DOI_PREFIX.replace(trimmed, "");
        DOI_REGEX
            .find(&candidate)
            .map(|m| Self(m.as_str().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Registrant prefix, e.g. `10.1103`
    pub fn prefix(&self) -> &str {
        self.0.split('/').next().unwrap_or(&self.0)
    }

    /// Whether the DOI was issued under `prefix`
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.prefix() == prefix
    }
}

impl fmt::Display for Doi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Doi {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_doi() {
        let doi = Doi::parse("10.1038/nature12373").unwrap();
        assert_eq!(doi.as_str(), "10.1038/nature12373");
        assert_eq!(doi.prefix(), "10.1038");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let doi = Doi::parse("  10.1103/PhysRevLett.116.061102\n").unwrap();
        assert_eq!(doi.as_str(), "10.1103/PhysRevLett.116.061102");
        assert!(doi.has_prefix("10.1103"));
    }

    #[test]
    fn test_parse_strips_labels_and_urls() {
        assert_eq!(
            Doi::parse("doi: 10.1126/science.1234567").unwrap().as_str(),
            "10.1126/science.1234567"
        );
        assert_eq!(
            Doi::parse("https://doi.org/10.1038/nature12373").unwrap().as_str(),
            "10.1038/nature12373"
        );
        assert_eq!(
            Doi::parse("http://dx.doi.org/10.1038/nature12373").unwrap().as_str(),
            "10.1038/nature12373"
        );
    }

    #[test]
    fn test_parse_subdivided_registrant() {
        let doi = Doi::parse("10.1000.10/123456").unwrap();
        assert_eq!(doi.prefix(), "10.1000.10");
    }

    #[test]
    fn test_parse_drops_trailing_punctuation() {
        assert_eq!(
            Doi::parse("10.1038/nature12373.").unwrap().as_str(),
            "10.1038/nature12373"
        );
    }

    #[test]
    fn test_rejects_invalid() {
        assert_eq!(Doi::parse("not-a-doi"), None);
        assert_eq!(Doi::parse(""), None);
        assert_eq!(Doi::parse("10.12/short-registrant"), None);
        assert_eq!(Doi::parse("see 10.1038/nature12373"), None);
    }
}
