//! NEL Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout the NEL workspace:
//! - Annotated input text (sentences, tokens, chunks, POS annotations)
//! - Knowledge base entities and their labels
//! - Common error types
//! - Collaborator traits for entity search and label tokenization
//! - Configuration management

pub mod config;
pub mod text;

pub use config::{
    AppConfig, ConfigError, EntityLinkerConfig, LanguageProcessingConfig, LoggingConfig,
    ProcessingConfig, RedirectProcessingMode, SearchConfig,
};
pub use text::{
    AnalysedText, Chunk, LexicalCategory, PhraseTag, PosTag, Sentence, TextView, Token,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for NEL operations
#[derive(Error, Debug)]
pub enum NelError {
    #[error("Search backend unavailable: {0}")]
    SearchUnavailable(String),

    #[error("Invalid analysed text: {0}")]
    InvalidText(String),

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, NelError>;

// ============================================================================
// Knowledge Base Entities
// ============================================================================

/// A label of an entity, optionally tagged with a language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    /// Label text
    pub text: String,

    /// Language tag (e.g. "en", "de-AT"); `None` for language-neutral labels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl Label {
    /// Create a language-neutral label
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language: None,
        }
    }

    /// Create a label in the given language
    pub fn in_language(text: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language: Some(language.into()),
        }
    }

    /// Whether this label can be used for text in `language`.
    ///
    /// Language-neutral labels match every language. Tagged labels match on
    /// the primary subtag, so an "en" label matches "en-GB" text.
    pub fn matches_language(&self, language: &str) -> bool {
        match &self.language {
            None => true,
            Some(lang) => primary_subtag(lang).eq_ignore_ascii_case(primary_subtag(language)),
        }
    }
}

/// An entity record returned by a search backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique identifier (usually a URI)
    pub id: String,

    /// Labels of the entity
    #[serde(default)]
    pub labels: Vec<Label>,

    /// Type references (e.g. "dbpedia:Person")
    #[serde(default)]
    pub types: Vec<String>,

    /// Id of the entity this one redirects to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,

    /// Backend relevance score (higher is better)
    #[serde(default)]
    pub score: f32,
}

impl Entity {
    /// Create a new entity without labels
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            labels: Vec::new(),
            types: Vec::new(),
            redirect: None,
            score: 0.0,
        }
    }

    /// Add a language-neutral label
    pub fn with_label(mut self, text: impl Into<String>) -> Self {
        self.labels.push(Label::new(text));
        self
    }

    /// Add a label in the given language
    pub fn with_language_label(
        mut self,
        text: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        self.labels.push(Label::in_language(text, language));
        self
    }

    /// Add a type reference
    pub fn with_type(mut self, entity_type: impl Into<String>) -> Self {
        self.types.push(entity_type.into());
        self
    }

    /// Set the redirect target
    pub fn with_redirect(mut self, target: impl Into<String>) -> Self {
        self.redirect = Some(target.into());
        self
    }

    /// Set the backend score
    pub fn with_score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }

    /// Labels usable for text in `language`
    pub fn labels_for<'a>(&'a self, language: &'a str) -> impl Iterator<Item = &'a Label> + 'a {
        self.labels
            .iter()
            .filter(move |label| label.matches_language(language))
    }
}

/// Primary subtag of a BCP 47 language tag ("en-GB" -> "en")
pub fn primary_subtag(language: &str) -> &str {
    language
        .split(['-', '_'])
        .next()
        .unwrap_or(language)
}

// ============================================================================
// Traits
// ============================================================================

/// Trait for entity search backends
#[async_trait::async_trait]
pub trait EntitySearcher: Send + Sync {
    /// Find candidate entities for the query tokens.
    ///
    /// Results are ordered by backend relevance, best first, and contain at
    /// most `limit` entities. Fails with [`NelError::SearchUnavailable`] when
    /// the backend cannot be reached.
    async fn find(&self, query_tokens: &[String], language: &str, limit: usize)
        -> Result<Vec<Entity>>;

    /// Look up a single entity by id
    async fn get(&self, id: &str) -> Result<Option<Entity>>;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Trait for label tokenizers
///
/// Tokenization is total: unsupported languages fall back to whitespace
/// splitting instead of failing.
pub trait LabelTokenizer: Send + Sync {
    fn tokenize(&self, text: &str, language: &str) -> Vec<String>;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSearcher(Vec<Entity>);

    #[async_trait::async_trait]
    impl EntitySearcher for FixedSearcher {
        async fn find(&self, _: &[String], _: &str, limit: usize) -> Result<Vec<Entity>> {
            Ok(self.0.iter().take(limit).cloned().collect())
        }

        async fn get(&self, id: &str) -> Result<Option<Entity>> {
            Ok(self.0.iter().find(|e| e.id == id).cloned())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    #[test]
    fn test_entity_builder() {
        let entity = Entity::new("urn:test:Geologe")
            .with_language_label("Geologe", "de")
            .with_label("geologist")
            .with_type("dbpedia:Profession")
            .with_redirect("urn:test:redirect:Geologist")
            .with_score(0.8);

        assert_eq!(entity.labels.len(), 2);
        assert_eq!(entity.types, vec!["dbpedia:Profession".to_string()]);
        assert_eq!(
            entity.redirect.as_deref(),
            Some("urn:test:redirect:Geologist")
        );
    }

    #[test]
    fn test_labels_for_language() {
        let entity = Entity::new("urn:test:Vienna")
            .with_language_label("Wien", "de")
            .with_language_label("Vienna", "en")
            .with_label("Vindobona");

        let de: Vec<&str> = entity.labels_for("de-AT").map(|l| l.text.as_str()).collect();
        assert_eq!(de, vec!["Wien", "Vindobona"]);

        let fr: Vec<&str> = entity.labels_for("fr").map(|l| l.text.as_str()).collect();
        assert_eq!(fr, vec!["Vindobona"]);
    }

    #[test]
    fn test_primary_subtag() {
        assert_eq!(primary_subtag("en-GB"), "en");
        assert_eq!(primary_subtag("pt_BR"), "pt");
        assert_eq!(primary_subtag("de"), "de");
        assert_eq!(primary_subtag(""), "");
    }

    #[test]
    fn test_entity_deserialize_defaults() {
        let entity: Entity = serde_json::from_str(r#"{"id": "urn:test:X"}"#).unwrap();
        assert!(entity.labels.is_empty());
        assert!(entity.redirect.is_none());
        assert_eq!(entity.score, 0.0);
    }

    #[test]
    fn test_searcher_trait_object() {
        let searcher: Box<dyn EntitySearcher> = Box::new(FixedSearcher(vec![
            Entity::new("a").with_label("A"),
            Entity::new("b").with_label("B"),
        ]));

        let found = tokio_test::block_on(searcher.find(&["a".to_string()], "en", 1)).unwrap();
        assert_eq!(found.len(), 1);

        let missing = tokio_test::block_on(searcher.get("c")).unwrap();
        assert!(missing.is_none());
        assert_eq!(searcher.name(), "fixed");
    }

    #[test]
    fn test_error_display() {
        let err = NelError::SearchUnavailable("connection refused".to_string());
        assert_eq!(
            err.to_string(),
            "Search backend unavailable: connection refused"
        );
    }
}
