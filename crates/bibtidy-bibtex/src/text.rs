//! Small string helpers shared by the scanner, normalizer and abbreviation engine

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Remove diacritics by decomposing and dropping combining marks
pub fn remove_accents(input: &str) -> String {
    input.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Trim leading and trailing non-word characters
pub fn strip_punct(input: &str) -> &str {
    input.trim_matches(|c: char| !is_word_char(c))
}

/// True if the string has at least one cased character and no lowercase ones
pub fn is_upper(input: &str) -> bool {
    input.chars().any(char::is_uppercase) && !input.chars().any(char::is_lowercase)
}

/// Uppercase the first character unless the whole word is already uppercase
pub fn capitalize(word: &str) -> String {
    if is_upper(word) {
        return word.to_string();
    }

    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// 1-based line number of a byte offset
pub fn line_at(text: &str, offset: usize) -> usize {
    let offset = offset.min(text.len());
    text.as_bytes()[..offset]
        .iter()
        .filter(|&&b| b == b'\n')
        .count()
        + 1
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
