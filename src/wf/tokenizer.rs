//! Splits raw text into lowercase word tokens.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// One or more Unicode word characters (letters, digits, underscore)
    static ref WORD: Regex = Regex::new(r"\w+").unwrap();
}

/// Lowercase the text and return every maximal run of word characters, in order.
///
/// Everything that is not a word character is a separator and gets dropped, so
/// empty input (or input that is all punctuation) yields no tokens at all.
/// Tokens never contain whitespace, which the map-reduce backend relies on when
/// it re-joins a chunk with single spaces.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    WORD.find_iter(&lowered)
        .map(|m| m.as_str().to_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_punctuation_and_lowercases() {
        assert_eq!(tokenize("Hello, world! 123"), vec!["hello", "world", "123"]);
    }

    #[test]
    fn empty_and_punctuation_only_yield_nothing() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("!!!").is_empty());
        assert!(tokenize(" \n\t-- ... ").is_empty());
    }

    #[test]
    fn keeps_underscores_and_unicode_letters() {
        assert_eq!(tokenize("snake_case Ünïcode"), vec!["snake_case", "ünïcode"]);
    }

    #[test]
    fn apostrophes_split_words() {
        assert_eq!(tokenize("Don't stop"), vec!["don", "t", "stop"]);
    }
}
