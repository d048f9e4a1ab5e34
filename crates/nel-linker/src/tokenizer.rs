//! Label tokenization
//!
//! Splits labels and span texts into comparable word tokens. Languages
//! written with whitespace-delimited words use a Unicode word pattern; any
//! other language falls back to plain whitespace splitting.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use nel_core::{primary_subtag, LabelTokenizer};

static WORD_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\p{L}\p{N}][\p{L}\p{N}\p{M}]*").expect("valid word pattern"));

const DEFAULT_LANGUAGES: &[&str] = &[
    "en", "de", "fr", "es", "it", "nl", "pt", "sv", "da", "no", "fi", "pl", "cs", "ru",
];

/// Tokenizer used when no language-specific tokenizer is configured
#[derive(Debug, Clone)]
pub struct DefaultLabelTokenizer {
    /// Primary language subtags tokenized with the word pattern
    languages: HashSet<String>,
}

impl DefaultLabelTokenizer {
    /// Create a tokenizer for the default set of languages
    pub fn new() -> Self {
        Self::with_languages(DEFAULT_LANGUAGES.iter().copied())
    }

    /// Create a tokenizer for the given languages
    pub fn with_languages<I, S>(languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            languages: languages
                .into_iter()
                .map(|l| primary_subtag(l.as_ref()).to_lowercase())
                .collect(),
        }
    }

    /// Whether `language` uses the word pattern
    pub fn supports(&self, language: &str) -> bool {
        self.languages
            .contains(&primary_subtag(language).to_lowercase())
    }
}

impl Default for DefaultLabelTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl LabelTokenizer for DefaultLabelTokenizer {
    fn tokenize(&self, text: &str, language: &str) -> Vec<String> {
        if self.supports(language) {
            WORD_PATTERN
                .find_iter(text)
                .map(|m| m.as_str().to_string())
                .collect()
        } else {
            text.split_whitespace().map(str::to_string).collect()
        }
    }
}
