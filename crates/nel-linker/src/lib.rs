//! NEL Linker - Entity linking pipeline
//!
//! Links mentions in an [`AnalysedText`](nel_core::AnalysedText) to entities
//! of a knowledge base:
//! - Span selection from POS tags, lexical categories and chunks
//! - Candidate scoring with order-independent token matching
//! - Redirect resolution
//! - Ranking, deduplication and truncation of suggestions

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use nel_core::{Entity, Token};

pub mod linker;
pub mod ranker;
pub mod redirect;
pub mod scorer;
pub mod span;
pub mod tokenizer;
pub mod types;

pub use linker::{EntityLinker, LinkingState};
pub use ranker::rank;
pub use redirect::RedirectResolver;
pub use scorer::CandidateScorer;
pub use span::{select_spans, select_spans_in};
pub use tokenizer::DefaultLabelTokenizer;
pub use types::TypeMapper;

// ============================================================================
// Spans
// ============================================================================

/// A contiguous run of tokens selected as mention candidate
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    /// Character offset of the first token
    pub start: usize,
    /// Character offset after the last token
    pub end: usize,
    /// Covered text
    pub text: String,
    /// Constituent tokens in text order
    pub tokens: Vec<Token>,
    /// Index of the enclosing sentence
    pub sentence: usize,
    /// Whether the span was grouped by a chunk
    pub from_chunk: bool,
}

// ============================================================================
// Suggestions
// ============================================================================

/// How well a label matched the span text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    /// Some query tokens were found in the label
    Partial,
    /// All query and label tokens were found, in any order
    Full,
    /// The span text equals the label
    Exact,
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Partial => write!(f, "partial"),
            Self::Full => write!(f, "full"),
            Self::Exact => write!(f, "exact"),
        }
    }
}

/// A scored candidate entity for a span
#[derive(Debug, Clone, Serialize)]
pub struct Suggestion {
    /// Suggested entity (shared with the searcher result)
    pub entity: Arc<Entity>,
    /// Normalized score (0.0 - 1.0)
    pub score: f32,
    pub match_type: MatchType,
    /// Label the span matched; for a redirect, the target's label
    pub matched_label: String,
    /// Number of query tokens found in the label
    pub found_tokens: usize,
    /// Number of comparable label tokens
    pub label_tokens: usize,
    /// Alias label the span matched when reached through a redirect
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias_label: Option<String>,
    /// Id of the alias entity when reached through a redirect
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirected_from: Option<String>,
    /// Position in the backend result list
    #[serde(skip)]
    pub backend_rank: usize,
}

impl Suggestion {
    pub fn is_exact(&self) -> bool {
        self.match_type == MatchType::Exact
    }
}

// ============================================================================
// Linked Entities
// ============================================================================

/// One mention of a linked entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Occurrence {
    pub start: usize,
    pub end: usize,
    /// Index of the enclosing sentence
    pub sentence: usize,
    /// Text of the enclosing sentence, shared by its occurrences
    pub context: Arc<str>,
}

/// A selected text with its ranked candidate entities
#[derive(Debug, Clone, Serialize)]
pub struct LinkedEntity {
    /// Surface form of the first occurrence
    pub selected_text: String,
    /// All mentions sharing the normalized text, in text order
    pub occurrences: Vec<Occurrence>,
    /// Suggestions by descending score
    pub suggestions: Vec<Suggestion>,
    /// Score of the best suggestion
    pub confidence: f32,
    /// Mapped types of the best suggestion
    pub types: Vec<String>,
}

impl LinkedEntity {
    /// Best suggestion, if any
    pub fn best(&self) -> Option<&Suggestion> {
        self.suggestions.first()
    }
}

/// Counters of one linking run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkingStats {
    /// Spans produced by the selector
    pub spans_selected: usize,
    /// Distinct spans sent to the searcher
    pub spans_searched: usize,
    /// Spans whose search failed
    pub spans_failed: usize,
    /// Linked entities in the result
    pub spans_linked: usize,
}

/// Result of linking one document
#[derive(Debug, Clone, Default, Serialize)]
pub struct LinkingResult {
    /// Normalized selected text -> linked entity
    pub entities: HashMap<String, LinkedEntity>,
    pub stats: LinkingStats,
}

impl LinkingResult {
    /// Linked entity by normalized selected text
    pub fn get(&self, normalized_text: &str) -> Option<&LinkedEntity> {
        self.entities.get(normalized_text)
    }

    /// Linked entities ordered by their first occurrence
    pub fn in_document_order(&self) -> Vec<&LinkedEntity> {
        let mut entities: Vec<&LinkedEntity> = self.entities.values().collect();
        entities.sort_by_key(|e| e.occurrences.first().map(|o| o.start).unwrap_or(usize::MAX));
        entities
    }

    /// Output records for an annotation writer, in document order
    pub fn to_annotations(&self) -> Vec<EntityAnnotation> {
        self.in_document_order()
            .into_iter()
            .map(EntityAnnotation::from)
            .collect()
    }
}

// ============================================================================
// Output Records
// ============================================================================

/// Serializable record of a linked entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityAnnotation {
    pub selected_text: String,
    pub occurrences: Vec<Occurrence>,
    pub confidence: f32,
    pub types: Vec<String>,
    pub suggestions: Vec<SuggestionAnnotation>,
}

/// Serializable record of a suggestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionAnnotation {
    pub entity_id: String,
    pub label: String,
    pub score: f32,
    pub match_type: MatchType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirected_from: Option<String>,
}

impl From<&LinkedEntity> for EntityAnnotation {
    fn from(linked: &LinkedEntity) -> Self {
        Self {
            selected_text: linked.selected_text.clone(),
            occurrences: linked.occurrences.clone(),
            confidence: linked.confidence,
            types: linked.types.clone(),
            suggestions: linked
                .suggestions
                .iter()
                .map(|s| SuggestionAnnotation {
                    entity_id: s.entity.id.clone(),
                    label: s.matched_label.clone(),
                    score: s.score,
                    match_type: s.match_type,
                    alias_label: s.alias_label.clone(),
                    redirected_from: s.redirected_from.clone(),
                })
                .collect(),
        }
    }
}
