//! Journal title abbreviation
//!
//! Approximates ISO 4 abbreviations from an LTWA-style word list:
//! * articles, conjunctions and prepositions are omitted (except at the beginning)
//! * commas are removed, other punctuation is preserved
//! * words like Part, Series, Section are omitted
//! * single word titles are not abbreviated
//! * abbreviated words are capitalized unless they are uppercase
//!
//! Table patterns are word stems (`chem-` covers chemistry and chemical), so
//! a word is matched by taking the closest table keys and accepting the first
//! one that actually occurs inside the word. Closeness is the character diff
//! ratio `2 * matches / (len(a) + len(b))`, so a short stem buried in a long
//! word (`chem` in `geochemical`) stays below the cutoff.

use lazy_static::lazy_static;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use similar::TextDiff;

use crate::text::{capitalize, is_upper, remove_accents, strip_punct};

lazy_static! {
    static ref WORD_SEPARATOR: Regex = Regex::new(r"[^\w'’\-–&:.]+").unwrap();
}

/// Words dropped from titles regardless of the table
const IGNORED_WORDS: &[&str] = &["Series", "Serie", "Ser", "Part", "Section", "Sect", "Sec"];

/// Upper bound on fuzzy candidates examined per word
const MAX_CANDIDATES: usize = 100;

/// Minimum similarity for a table key to be considered
const SIMILARITY_CUTOFF: f32 = 0.6;

/// One LTWA line: a pattern with optional `-` stem markers and its replacement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbbreviationRule {
    pub pattern: String,
    pub replacement: String,
}

/// Immutable abbreviation table plus the article and short-word lists.
///
/// Build it once at startup and share it by reference.
#[derive(Debug, Clone, Default)]
pub struct Abbreviations {
    rules: BTreeMap<String, AbbreviationRule>,
    articles: HashSet<String>,
    shortwords: HashSet<String>,
}

impl Abbreviations {
    pub fn new<I, P, R>(rules: I, articles: &[String], shortwords: &[String]) -> Self
    where
        I: IntoIterator<Item = (P, R)>,
        P: Into<String>,
        R: Into<String>,
    {
        let rules = rules
            .into_iter()
            .map(|(pattern, replacement)| AbbreviationRule {
                pattern: pattern.into(),
                replacement: replacement.into(),
            })
            .filter_map(|rule| {
                let key = prepare_pattern(&rule.pattern);
                (!key.is_empty()).then_some((key, rule))
            })
            .collect();

        Self {
            rules,
            articles: articles.iter().map(|w| w.to_lowercase()).collect(),
            shortwords: shortwords.iter().map(|w| w.to_lowercase()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Abbreviate a journal title
    pub fn abbreviate(&self, title: &str) -> String {
        let words: Vec<&str> = WORD_SEPARATOR
            .split(title)
            .filter(|w| !w.is_empty())
            .collect();

        // The "arXiv e-prints" journal title is never abbreviated
        if words.contains(&"arXiv") || words.len() <= 1 {
            return title.to_string();
        }

        let mut abbreviated = Vec::with_capacity(words.len());
        for (pos, word) in words.iter().enumerate() {
            let word = word.replace(',', "");
            let plain = remove_accents(&word);
            let lowered = plain.to_lowercase();

            let is_article = self.articles.contains(&lowered);
            let is_shortword = self.shortwords.contains(&lowered);
            if (pos == 0 && is_article)
                || (pos > 0 && (is_article || is_shortword) && !is_upper(&plain))
            {
                continue;
            }

            let bare = strip_punct(&plain);
            if bare.is_empty() || IGNORED_WORDS.contains(&bare) {
                continue;
            }

            if word.ends_with('.') {
                // Already abbreviated
                abbreviated.push(word);
            } else {
                abbreviated.push(self.abbreviate_word(&word));
            }
        }

        if abbreviated.is_empty() {
            return title.to_string();
        }
        abbreviated.join(" ")
    }

    fn abbreviate_word(&self, word: &str) -> String {
        let lowered = word.to_lowercase();
        let plain = remove_accents(&lowered);

        for key in self.closest_keys(&plain) {
            if !plain.contains(key) {
                continue;
            }
            let rule = &self.rules[key];

            let pattern = strip_punct(&rule.pattern).to_lowercase();
            let Some((left, right)) = lowered
                .split_once(pattern.as_str())
                .or_else(|| plain.split_once(key))
            else {
                continue;
            };

            let mut abbrev = rule.replacement.clone();
            if let Some(rest) = abbrev.strip_prefix('-') {
                abbrev = format!("{left}{rest}");
            }
            if let Some(rest) = abbrev.strip_suffix('-') {
                abbrev = format!("{rest}{right}");
            }
            return capitalize(&abbrev);
        }

        capitalize(word)
    }

    /// Table keys ordered by similarity to `word`, best first
    fn closest_keys(&self, word: &str) -> Vec<&str> {
        let mut scored: Vec<(f32, &str)> = self
            .rules
            .keys()
            .map(|key| (similarity(word, key), key.as_str()))
            .filter(|(score, _)| *score >= SIMILARITY_CUTOFF)
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
        scored
            .into_iter()
            .take(MAX_CANDIDATES)
            .map(|(_, key)| key)
            .collect()
    }
}

/// Character diff ratio in `[0, 1]`
fn similarity(a: &str, b: &str) -> f32 {
    TextDiff::from_chars(a, b).ratio()
}

/// Lowercase, strip accents and drop one leading and one trailing stem marker
pub(crate) fn prepare_pattern(pattern: &str) -> String {
    let pattern = remove_accents(&pattern.to_lowercase());
    let pattern = pattern.strip_prefix('-').unwrap_or(&pattern);
    let pattern = pattern.strip_suffix('-').unwrap_or(pattern);
    pattern.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Abbreviations {
        let words = |ws: &[&str]| ws.iter().map(|w| w.to_string()).collect::<Vec<_>>();
        Abbreviations::new(
            [
                ("physic-", "phys."),
                ("review", "rev."),
                ("journal", "j."),
                ("chem-", "chem."),
                ("-ology", "-ol."),
                ("société", "soc."),
                ("international", "int."),
            ],
            &words(&["a", "an", "the"]),
            &words(&["of", "and", "for", "in", "de", "la"]),
        )
    }

    #[test]
    fn test_prepare_pattern() {
        assert_eq!(prepare_pattern("Physic-"), "physic");
        assert_eq!(prepare_pattern("-ology"), "ology");
        assert_eq!(prepare_pattern("Société"), "societe");
        assert_eq!(prepare_pattern("-"), "");
    }

    #[test]
    fn test_physical_review_letters() {
        assert_eq!(
            table().abbreviate("Physical Review Letters"),
            "Phys. Rev. Letters"
        );
    }

    #[test]
    fn test_single_word_title_unchanged() {
        assert_eq!(table().abbreviate("Nature"), "Nature");
    }

    #[test]
    fn test_arxiv_unchanged() {
        assert_eq!(table().abbreviate("arXiv e-prints"), "arXiv e-prints");
    }

    #[test]
    fn test_articles_and_shortwords_dropped() {
        assert_eq!(
            table().abbreviate("The Journal of Chemical Physics"),
            "J. Chem. Phys."
        );
    }

    #[test]
    fn test_uppercase_shortword_kept() {
        assert_eq!(table().abbreviate("Physical Review A"), "Phys. Rev. A");
    }

    #[test]
    fn test_ignored_words_dropped() {
        assert_eq!(
            table().abbreviate("Journal of Physics, Part B"),
            "J. Phys. B"
        );
    }

    #[test]
    fn test_period_words_kept_verbatim() {
        assert_eq!(table().abbreviate("Phys. Rev. Lett."), "Phys. Rev. Lett.");
    }

    #[test]
    fn test_leading_stem_marker_splices_prefix() {
        assert_eq!(table().abbreviate("Journal of Biology"), "J. Biol.");
    }

    #[test]
    fn test_accented_pattern_matches() {
        assert_eq!(
            table().abbreviate("Bulletin de la Société Chimique"),
            "Bulletin Soc. Chimique"
        );
    }

    #[test]
    fn test_never_empty() {
        assert_eq!(table().abbreviate("The Of"), "The Of");
    }

    #[test]
    fn test_similarity_is_length_normalized() {
        assert_eq!(similarity("review", "review"), 1.0);
        // 2 * 4 / 15
        assert!(similarity("geochemical", "chem") < SIMILARITY_CUTOFF);
        assert!(similarity("chemistry", "chem") >= SIMILARITY_CUTOFF);
        assert!(similarity("chemical", "chem") >= SIMILARITY_CUTOFF);
    }

    #[test]
    fn test_stem_inside_long_word_not_matched() {
        assert_eq!(
            table().abbreviate("Journal of Geochemical Exploration"),
            "J. Geochemical Exploration"
        );
        assert_eq!(table().abbreviate("Chemistry Letters"), "Chem. Letters");
    }

    #[test]
    fn test_empty_table_capitalizes() {
        let empty = Abbreviations::default();
        assert!(empty.is_empty());
        assert_eq!(empty.abbreviate("annals mathematics"), "Annals Mathematics");
    }
}
