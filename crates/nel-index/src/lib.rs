//! NEL Index - Entity search backends
//!
//! Provides an [`EntitySearcher`] over an in-memory entity list, plus
//! decorators that can wrap any searcher:
//! - [`CachingSearcher`]: caches lookups with a bounded, expiring cache
//! - [`TimeoutSearcher`]: bounds the duration of each lookup

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;

use nel_core::{Entity, EntitySearcher, LabelTokenizer, NelError, Result};

pub mod cache;
pub mod timeout;

pub use cache::{CacheStats, CacheStatsReport, CachingSearcher};
pub use timeout::TimeoutSearcher;

/// Language used to tokenize labels without a language tag
const DEFAULT_LABEL_LANGUAGE: &str = "en";

// ============================================================================
// In-Memory Index
// ============================================================================

/// Entity searcher over entities held in memory.
///
/// Entities are found through any case-folded label token and ranked by the
/// token overlap (Jaccard similarity) of their best label with the query.
/// Lookups ignore the document language.
pub struct InMemoryEntityIndex {
    /// Entities in insertion order
    entities: Vec<Entity>,

    /// Entity id -> position in `entities`
    by_id: HashMap<String, usize>,

    /// Case-folded label token -> entity positions
    postings: HashMap<String, Vec<usize>>,

    tokenizer: Arc<dyn LabelTokenizer>,

    /// Language for labels without a language tag
    label_language: String,
}

impl InMemoryEntityIndex {
    /// Create an empty index
    pub fn new(tokenizer: Arc<dyn LabelTokenizer>) -> Self {
        Self {
            entities: Vec::new(),
            by_id: HashMap::new(),
            postings: HashMap::new(),
            tokenizer,
            label_language: DEFAULT_LABEL_LANGUAGE.to_string(),
        }
    }

    /// Set the language used for language-neutral labels
    pub fn with_label_language(mut self, language: impl Into<String>) -> Self {
        self.label_language = language.into();
        self
    }

    /// Build an index from entities
    pub fn from_entities(
        tokenizer: Arc<dyn LabelTokenizer>,
        entities: impl IntoIterator<Item = Entity>,
    ) -> Self {
        let mut index = Self::new(tokenizer);
        for entity in entities {
            index.insert(entity);
        }
        index
    }

    /// Build an index from a JSON array of entities
    pub fn from_json_str(tokenizer: Arc<dyn LabelTokenizer>, json: &str) -> Result<Self> {
        let entities: Vec<Entity> =
            serde_json::from_str(json).context("Failed to parse entity list")?;
        Ok(Self::from_entities(tokenizer, entities))
    }

    /// Build an index from a JSON file holding an array of entities
    pub fn from_json_file(
        tokenizer: Arc<dyn LabelTokenizer>,
        path: impl AsRef<Path>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => NelError::NotFound(path.display().to_string()),
            _ => anyhow::Error::new(e)
                .context(format!("Failed to read entity index {}", path.display()))
                .into(),
        })?;
        let index = Self::from_json_str(tokenizer, &json)?;

        tracing::info!("Loaded {} entities from {}", index.len(), path.display());
        Ok(index)
    }

    /// Add an entity, replacing any entity with the same id
    pub fn insert(&mut self, entity: Entity) {
        let position = match self.by_id.get(&entity.id) {
            Some(&position) => {
                for ids in self.postings.values_mut() {
                    ids.retain(|&p| p != position);
                }
                self.entities[position] = entity;
                position
            }
            None => {
                self.by_id.insert(entity.id.clone(), self.entities.len());
                self.entities.push(entity);
                self.entities.len() - 1
            }
        };

        let tokens: HashSet<String> = self.entities[position]
            .labels
            .iter()
            .flat_map(|label| self.label_tokens(&label.text, label.language.as_deref()))
            .collect();
        for token in tokens {
            self.postings.entry(token).or_default().push(position);
        }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    fn label_tokens(&self, text: &str, language: Option<&str>) -> Vec<String> {
        let language = language.unwrap_or(self.label_language.as_str());
        self.tokenizer
            .tokenize(text, language)
            .into_iter()
            .map(|t| t.to_lowercase())
            .collect()
    }

    /// Best Jaccard similarity between the query and any label of an entity
    fn similarity(&self, entity: &Entity, query: &HashSet<String>) -> f32 {
        entity
            .labels
            .iter()
            .map(|label| {
                let tokens: HashSet<String> = self
                    .label_tokens(&label.text, label.language.as_deref())
                    .into_iter()
                    .collect();
                let matched = tokens.intersection(query).count();
                let union = query.len() + tokens.len() - matched;
                if union == 0 {
                    0.0
                } else {
                    matched as f32 / union as f32
                }
            })
            .fold(0.0, f32::max)
    }
}

#[async_trait]
impl EntitySearcher for InMemoryEntityIndex {
    async fn find(
        &self,
        query_tokens: &[String],
        _language: &str,
        limit: usize,
    ) -> Result<Vec<Entity>> {
        let query: HashSet<String> = query_tokens.iter().map(|t| t.to_lowercase()).collect();

        let candidates: HashSet<usize> = query
            .iter()
            .filter_map(|token| self.postings.get(token))
            .flatten()
            .copied()
            .collect();

        let mut scored: Vec<(usize, f32)> = candidates
            .into_iter()
            .map(|p| (p, self.similarity(&self.entities[p], &query)))
            .filter(|(_, score)| *score > 0.0)
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(limit);

        Ok(scored
            .into_iter()
            .map(|(p, score)| {
                let mut entity = self.entities[p].clone();
                entity.score = score;
                entity
            })
            .collect())
    }

    async fn get(&self, id: &str) -> Result<Option<Entity>> {
        Ok(self.by_id.get(id).map(|&p| self.entities[p].clone()))
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}
