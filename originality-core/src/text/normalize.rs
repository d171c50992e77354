//! Text normalisation and word shingling.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

/// Words per shingle.
pub const SHINGLE_SIZE: usize = 3;

#[allow(clippy::expect_used)]
static PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("static pattern is valid"));

/// Lowercase `text` and strip every character that is neither a word
/// character nor whitespace.
pub fn normalize(text: &str) -> String {
    PUNCTUATION
        .replace_all(&text.to_lowercase(), "")
        .into_owned()
}

/// Set of contiguous word triples of already-normalised text.
///
/// A text shorter than [`SHINGLE_SIZE`] words yields a single shingle equal
/// to the whole text, so short documents still produce a comparable set.
pub fn shingles(normalized: &str) -> BTreeSet<String> {
    let words: Vec<&str> = normalized.split_whitespace().collect();
    if words.len() < SHINGLE_SIZE {
        return BTreeSet::from([normalized.to_string()]);
    }
    words
        .windows(SHINGLE_SIZE)
        .map(|window| window.join(" "))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_punctuation() {
        assert_eq!(normalize("Hello, World! It's 2024."), "hello world its 2024");
    }

    #[test]
    fn test_normalize_keeps_unicode_letters_and_underscores() {
        assert_eq!(normalize("Café_au_lait — Ünïcode?"), "café_au_lait  ünïcode");
    }

    #[test]
    fn test_shingles_of_sentence() {
        let set = shingles("the quick brown fox jumps");
        let expected: BTreeSet<String> = ["the quick brown", "quick brown fox", "brown fox jumps"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(set, expected);
    }

    #[test]
    fn test_repeated_shingles_collapse() {
        assert_eq!(shingles("a b c a b c").len(), 3);
    }

    #[test]
    fn test_short_text_is_single_shingle() {
        assert_eq!(shingles("two  words"), BTreeSet::from(["two  words".to_string()]));
        assert_eq!(shingles(""), BTreeSet::from([String::new()]));
    }
}
