//! Keyword normalization.
//!
//! Turns free text into the canonical keyword form used everywhere else:
//! tokens are split on non-alphanumeric runes, stemmed with the Snowball
//! English stemmer, filtered against its stop-word list and deduplicated in
//! first-occurrence order.

mod stopwords;

use std::collections::HashSet;

use rust_stemmers::{Algorithm, Stemmer};
use thiserror::Error;

pub use stopwords::is_stop_word;

/// Maximum accepted phrase length in bytes (1 MiB).
pub const MAX_PHRASE_BYTES: usize = 1 << 20;

/// Errors for normalization.
#[derive(Debug, Error)]
pub enum WordsError {
    #[error("input of {0} bytes exceeds the {MAX_PHRASE_BYTES} byte limit")]
    InputTooLarge(usize),
}

/// Port for keyword normalization.
pub trait Normalizer: Send + Sync {
    /// Normalize a phrase into an ordered list of unique keywords.
    fn norm(&self, phrase: &str) -> Result<Vec<String>, WordsError>;
}

/// Snowball-based normalizer for English text.
pub struct SnowballNormalizer {
    stemmer: Stemmer,
}

impl SnowballNormalizer {
    pub fn new() -> Self {
        Self {
            stemmer: Stemmer::create(Algorithm::English),
        }
    }
}

impl Default for SnowballNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer for SnowballNormalizer {
    fn norm(&self, phrase: &str) -> Result<Vec<String>, WordsError> {
        if phrase.len() > MAX_PHRASE_BYTES {
            return Err(WordsError::InputTooLarge(phrase.len()));
        }

        let mut keywords = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        let tokens = phrase
            .split(|c: char| !c.is_alphabetic() && !c.is_numeric())
            .filter(|t| !t.is_empty());

        for token in tokens {
            let stemmed = self.stemmer.stem(&token.to_lowercase()).into_owned();
            if is_stop_word(&stemmed) || seen.contains(&stemmed) {
                continue;
            }
            seen.insert(stemmed.clone());
            keywords.push(stemmed);
        }

        Ok(keywords)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(phrase: &str) -> Vec<String> {
        SnowballNormalizer::new().norm(phrase).unwrap()
    }

    #[test]
    fn test_stems_and_deduplicates() {
        assert_eq!(norm("I follow followers"), vec!["follow"]);
    }

    #[test]
    fn test_strips_punctuation_and_stop_words() {
        assert_eq!(
            norm("I shouted: 'give me your car!!!"),
            vec!["shout", "give", "car"]
        );
    }

    #[test]
    fn test_mixed_separators_and_numbers() {
        assert_eq!(
            norm("Moscow!123'check-it'or   123, man,that,difficult:heck"),
            vec!["moscow", "123", "check", "man", "difficult", "heck"]
        );
    }

    #[test]
    fn test_stop_words_only() {
        assert!(norm("I and you or me or them, who will?").is_empty());
    }

    #[test]
    fn test_mixed_case_collapses() {
        assert_eq!(norm("GoLang GOLANG golang"), vec!["golang"]);
    }

    #[test]
    fn test_special_characters() {
        assert_eq!(
            norm("test@email.com #hashtag $100"),
            vec!["test", "email", "com", "hashtag", "100"]
        );
    }

    #[test]
    fn test_single_characters() {
        // "a" is a stop word, lone consonants are not
        assert_eq!(norm("a b c"), vec!["b", "c"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(norm("").is_empty());
    }

    #[test]
    fn test_only_separators() {
        assert!(norm("..,,!!  --  ::").is_empty());
    }

    #[test]
    fn test_numbers_pass_through() {
        assert_eq!(norm("404 1024"), vec!["404", "1024"]);
    }

    #[test]
    fn test_deterministic() {
        let phrase = "Quick brown foxes are jumping over lazy dogs, again and again";
        assert_eq!(norm(phrase), norm(phrase));
    }

    #[test]
    fn test_idempotent_on_keywords() {
        let first = norm("The weathered sailors were navigating treacherous waters");
        let second = norm(&first.join(" "));
        assert_eq!(first, second);
    }

    #[test]
    fn test_no_stop_words_in_output() {
        let words = norm("this is the one that they were looking for");
        for word in &words {
            assert!(!is_stop_word(word), "stop word {word:?} leaked through");
        }
    }

    #[test]
    fn test_unicode_separators() {
        assert_eq!(
            norm("hello\u{2014}world\u{00a0}planet"),
            vec!["hello", "world", "planet"]
        );
    }

    #[test]
    fn test_input_too_large() {
        let big = "a".repeat(MAX_PHRASE_BYTES + 1);
        let err = SnowballNormalizer::new().norm(&big).unwrap_err();
        assert!(matches!(err, WordsError::InputTooLarge(_)));
    }

    #[test]
    fn test_input_at_limit_accepted() {
        let phrase = "b".repeat(MAX_PHRASE_BYTES);
        assert!(SnowballNormalizer::new().norm(&phrase).is_ok());
    }
}
