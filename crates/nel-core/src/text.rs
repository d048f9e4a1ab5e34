//! Annotated input text
//!
//! An [`AnalysedText`] is produced by an upstream NLP stage and is read-only
//! to the linker. It is stored as flat, offset-sorted arrays: sentences own
//! their tokens and chunks. All offsets are character offsets into the text.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{NelError, Result};

// ============================================================================
// Lexical Categories
// ============================================================================

/// Coarse lexical category of a POS tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LexicalCategory {
    Noun,
    Verb,
    Adjective,
    Adposition,
    Adverb,
    Conjunction,
    Interjection,
    PronounOrDeterminer,
    Punctuation,
    Quantifier,
    Residual,
    Unique,
}

impl LexicalCategory {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Noun => "noun",
            Self::Verb => "verb",
            Self::Adjective => "adjective",
            Self::Adposition => "adposition",
            Self::Adverb => "adverb",
            Self::Conjunction => "conjunction",
            Self::Interjection => "interjection",
            Self::PronounOrDeterminer => "pronoun_or_determiner",
            Self::Punctuation => "punctuation",
            Self::Quantifier => "quantifier",
            Self::Residual => "residual",
            Self::Unique => "unique",
        }
    }
}

impl std::fmt::Display for LexicalCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LexicalCategory {
    type Err = NelError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "noun" => Ok(Self::Noun),
            "verb" => Ok(Self::Verb),
            "adjective" => Ok(Self::Adjective),
            "adposition" => Ok(Self::Adposition),
            "adverb" => Ok(Self::Adverb),
            "conjunction" => Ok(Self::Conjunction),
            "interjection" => Ok(Self::Interjection),
            "pronounordeterminer" => Ok(Self::PronounOrDeterminer),
            "punctuation" => Ok(Self::Punctuation),
            "quantifier" => Ok(Self::Quantifier),
            "residual" => Ok(Self::Residual),
            "unique" => Ok(Self::Unique),
            _ => Err(NelError::InvalidText(format!(
                "unknown lexical category: {s}"
            ))),
        }
    }
}

// ============================================================================
// Annotations
// ============================================================================

fn default_probability() -> f32 {
    1.0
}

/// A weighted part-of-speech annotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PosTag {
    /// Tag as emitted by the tagger (e.g. "NNP")
    pub tag: String,

    /// Lexical categories the tag belongs to
    #[serde(default)]
    pub categories: BTreeSet<LexicalCategory>,

    /// Tagger probability (0.0 - 1.0)
    #[serde(default = "default_probability")]
    pub probability: f32,
}

impl PosTag {
    /// Create a new POS annotation without categories
    pub fn new(tag: impl Into<String>, probability: f32) -> Self {
        Self {
            tag: tag.into(),
            categories: BTreeSet::new(),
            probability,
        }
    }

    /// Add a lexical category
    pub fn with_category(mut self, category: LexicalCategory) -> Self {
        self.categories.insert(category);
        self
    }
}

/// A weighted phrase annotation of a chunk (e.g. "NP")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseTag {
    pub tag: String,
    #[serde(default = "default_probability")]
    pub probability: f32,
}

// ============================================================================
// Tokens, Chunks, Sentences
// ============================================================================

/// A token with its POS annotations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub start: usize,
    pub end: usize,

    /// Alternative POS annotations
    #[serde(default)]
    pub pos: Vec<PosTag>,
}

impl Token {
    /// Create an unannotated token
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            pos: Vec::new(),
        }
    }

    /// Add a POS annotation
    pub fn with_pos(mut self, pos: PosTag) -> Self {
        self.pos.push(pos);
        self
    }

    /// Highest-probability POS annotation; the first one wins on ties
    pub fn best_pos(&self) -> Option<&PosTag> {
        self.pos.iter().fold(None, |best: Option<&PosTag>, pos| match best {
            Some(b) if b.probability >= pos.probability => Some(b),
            _ => Some(pos),
        })
    }
}

/// A phrase chunk (e.g. a noun phrase)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub start: usize,
    pub end: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phrase: Option<PhraseTag>,
}

impl Chunk {
    /// Create a chunk without phrase annotation
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            phrase: None,
        }
    }

    /// Set the phrase annotation
    pub fn with_phrase(mut self, tag: impl Into<String>, probability: f32) -> Self {
        self.phrase = Some(PhraseTag {
            tag: tag.into(),
            probability,
        });
        self
    }

    /// Whether the token lies completely inside this chunk
    pub fn contains(&self, token: &Token) -> bool {
        token.start >= self.start && token.end <= self.end
    }
}

/// A sentence with its tokens and chunks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentence {
    pub start: usize,
    pub end: usize,

    #[serde(default)]
    pub tokens: Vec<Token>,

    #[serde(default)]
    pub chunks: Vec<Chunk>,
}

impl Sentence {
    /// Create an empty sentence
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            tokens: Vec::new(),
            chunks: Vec::new(),
        }
    }

    /// Add a token
    pub fn with_token(mut self, token: Token) -> Self {
        self.tokens.push(token);
        self
    }

    /// Add a chunk
    pub fn with_chunk(mut self, chunk: Chunk) -> Self {
        self.chunks.push(chunk);
        self
    }
}

// ============================================================================
// Analysed Text
// ============================================================================

/// Linguistically annotated text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysedText {
    pub text: String,

    #[serde(default)]
    pub sentences: Vec<Sentence>,
}

impl AnalysedText {
    /// Create annotated text without sentences
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sentences: Vec::new(),
        }
    }

    /// Add a sentence
    pub fn with_sentence(mut self, sentence: Sentence) -> Self {
        self.sentences.push(sentence);
        self
    }

    /// Length of the text in characters
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Text between two character offsets.
    ///
    /// Scans the text on every call; use [`AnalysedText::view`] for
    /// repeated lookups.
    pub fn span_text(&self, start: usize, end: usize) -> Option<&str> {
        self.view().span(start, end)
    }

    /// Character offset table over the text, built in one pass
    pub fn view(&self) -> TextView<'_> {
        TextView::new(&self.text)
    }

    /// Check the structural invariants of the annotations.
    ///
    /// Sentences, tokens and chunks must be non-empty, sorted and
    /// non-overlapping; tokens and chunks must lie inside their sentence;
    /// probabilities must lie in `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        let len = self.char_len();
        let mut prev_sentence_end = 0;

        for (idx, sentence) in self.sentences.iter().enumerate() {
            if sentence.start >= sentence.end || sentence.end > len {
                return Err(invalid(format!(
                    "sentence {idx} has invalid bounds [{}, {}) for text of length {len}",
                    sentence.start, sentence.end
                )));
            }
            if sentence.start < prev_sentence_end {
                return Err(invalid(format!(
                    "sentence {idx} overlaps the previous sentence"
                )));
            }
            prev_sentence_end = sentence.end;

            let mut prev_token_end = sentence.start;
            for token in &sentence.tokens {
                if token.start >= token.end
                    || token.start < sentence.start
                    || token.end > sentence.end
                {
                    return Err(invalid(format!(
                        "token [{}, {}) lies outside sentence {idx} [{}, {})",
                        token.start, token.end, sentence.start, sentence.end
                    )));
                }
                if token.start < prev_token_end {
                    return Err(invalid(format!(
                        "token [{}, {}) overlaps or precedes the previous token in sentence {idx}",
                        token.start, token.end
                    )));
                }
                prev_token_end = token.end;

                if let Some(pos) = token.pos.iter().find(|p| !valid_probability(p.probability)) {
                    return Err(invalid(format!(
                        "token [{}, {}) has POS tag {} with probability {}",
                        token.start, token.end, pos.tag, pos.probability
                    )));
                }
            }

            let mut prev_chunk_end = sentence.start;
            for chunk in &sentence.chunks {
                if chunk.start >= chunk.end
                    || chunk.start < sentence.start
                    || chunk.end > sentence.end
                {
                    return Err(invalid(format!(
                        "chunk [{}, {}) lies outside sentence {idx} [{}, {})",
                        chunk.start, chunk.end, sentence.start, sentence.end
                    )));
                }
                if chunk.start < prev_chunk_end {
                    return Err(invalid(format!(
                        "chunk [{}, {}) overlaps or precedes the previous chunk in sentence {idx}",
                        chunk.start, chunk.end
                    )));
                }
                prev_chunk_end = chunk.end;

                if let Some(phrase) = &chunk.phrase {
                    if !valid_probability(phrase.probability) {
                        return Err(invalid(format!(
                            "chunk [{}, {}) has phrase probability {}",
                            chunk.start, chunk.end, phrase.probability
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}

/// Text with a character-to-byte offset table for constant-time slicing
#[derive(Debug, Clone)]
pub struct TextView<'a> {
    text: &'a str,
    /// Byte offset of every character, plus the text length
    bytes: Vec<usize>,
}

impl<'a> TextView<'a> {
    pub fn new(text: &'a str) -> Self {
        let bytes = text
            .char_indices()
            .map(|(b, _)| b)
            .chain(std::iter::once(text.len()))
            .collect();
        Self { text, bytes }
    }

    /// Length of the text in characters
    pub fn char_len(&self) -> usize {
        self.bytes.len() - 1
    }

    /// Text between two character offsets
    pub fn span(&self, start: usize, end: usize) -> Option<&'a str> {
        if start > end {
            return None;
        }
        let (&b_start, &b_end) = (self.bytes.get(start)?, self.bytes.get(end)?);
        Some(&self.text[b_start..b_end])
    }
}

fn valid_probability(p: f32) -> bool {
    p.is_finite() && (0.0..=1.0).contains(&p)
}

fn invalid(message: String) -> NelError {
    NelError::InvalidText(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AnalysedText {
        // "New Zealand is far."
        AnalysedText::new("New Zealand is far.").with_sentence(
            Sentence::new(0, 19)
                .with_token(Token::new(0, 3).with_pos(PosTag::new("NNP", 0.9)))
                .with_token(Token::new(4, 11).with_pos(PosTag::new("NNP", 0.95)))
                .with_token(Token::new(12, 14).with_pos(PosTag::new("VBZ", 0.99)))
                .with_token(Token::new(15, 18).with_pos(PosTag::new("RB", 0.8)))
                .with_token(Token::new(18, 19).with_pos(PosTag::new(".", 1.0)))
                .with_chunk(Chunk::new(0, 11).with_phrase("NP", 0.9)),
        )
    }

    #[test]
    fn test_valid_text() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_span_text_uses_char_offsets() {
        let text = AnalysedText::new("Zürich liegt am See");
        assert_eq!(text.span_text(0, 6), Some("Zürich"));
        assert_eq!(text.span_text(16, 19), Some("See"));
        assert_eq!(text.span_text(7, 12), Some("liegt"));
        assert_eq!(text.span_text(16, 20), None);
        assert_eq!(text.span_text(5, 3), None);
    }

    #[test]
    fn test_view_matches_span_text() {
        let text = AnalysedText::new("Zürich liegt am See.");
        let view = text.view();

        assert_eq!(view.char_len(), text.char_len());
        assert_eq!(view.span(0, 6), Some("Zürich"));
        assert_eq!(view.span(16, 20), Some("See."));
        assert_eq!(view.span(20, 20), Some(""));
        assert_eq!(view.span(16, 21), None);
        assert_eq!(view.span(6, 2), None);
    }

    #[test]
    fn test_span_text_at_end() {
        let text = sample();
        assert_eq!(text.span_text(18, 19), Some("."));
        assert_eq!(text.span_text(19, 19), Some(""));
    }

    #[test]
    fn test_best_pos_prefers_highest_probability() {
        let token = Token::new(0, 4)
            .with_pos(PosTag::new("VB", 0.3))
            .with_pos(PosTag::new("NN", 0.6))
            .with_pos(PosTag::new("JJ", 0.6));

        assert_eq!(token.best_pos().map(|p| p.tag.as_str()), Some("NN"));
        assert!(Token::new(0, 1).best_pos().is_none());
    }

    #[test]
    fn test_overlapping_tokens_rejected() {
        let mut text = sample();
        text.sentences[0].tokens[1].start = 2;

        let err = text.validate().unwrap_err();
        assert!(matches!(err, NelError::InvalidText(_)));
    }

    #[test]
    fn test_chunk_outside_sentence_rejected() {
        let mut text = sample();
        text.sentences[0].chunks.push(Chunk::new(15, 25));

        assert!(matches!(
            text.validate(),
            Err(NelError::InvalidText(_))
        ));
    }

    #[test]
    fn test_invalid_probability_rejected() {
        let mut text = sample();
        text.sentences[0].tokens[0].pos[0].probability = 1.5;

        assert!(text.validate().is_err());
    }

    #[test]
    fn test_lexical_category_parse() {
        assert_eq!(
            "Noun".parse::<LexicalCategory>().unwrap(),
            LexicalCategory::Noun
        );
        assert_eq!(
            "pronoun-or-determiner".parse::<LexicalCategory>().unwrap(),
            LexicalCategory::PronounOrDeterminer
        );
        assert!("gerund".parse::<LexicalCategory>().is_err());
        assert_eq!(LexicalCategory::Adposition.to_string(), "adposition");
    }

    #[test]
    fn test_deserialize_annotations() {
        let json = r#"{
            "text": "Otago",
            "sentences": [{
                "start": 0, "end": 5,
                "tokens": [{"start": 0, "end": 5, "pos": [{"tag": "NNP", "categories": ["noun"]}]}]
            }]
        }"#;

        let text: AnalysedText = serde_json::from_str(json).unwrap();
        let pos = &text.sentences[0].tokens[0].pos[0];
        assert_eq!(pos.probability, 1.0);
        assert!(pos.categories.contains(&LexicalCategory::Noun));
        assert!(text.sentences[0].chunks.is_empty());
    }
}
