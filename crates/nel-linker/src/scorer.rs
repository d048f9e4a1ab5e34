//! Candidate scoring
//!
//! Queries the searcher for one span and scores every candidate by the
//! overlap between the span tokens and the candidate's labels. Token order
//! is irrelevant for matching: "Marshall Patrick" matches "Patrick Marshall".

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use nel_core::{Entity, EntityLinkerConfig, EntitySearcher, Label, LabelTokenizer, Result};

use crate::{MatchType, Span, Suggestion};

/// Upper bound of non-exact scores; exact scores start above it
const NON_EXACT_CEILING: f32 = 0.49;

/// Match of the span against one label
#[derive(Debug, Clone)]
struct LabelMatch {
    label: String,
    match_type: MatchType,
    found: usize,
    label_tokens: usize,
}

impl LabelMatch {
    fn coverage(&self) -> f32 {
        self.found as f32 / self.label_tokens.max(1) as f32
    }

    /// Whether `self` is a better match than `other`
    fn beats(&self, other: &LabelMatch) -> bool {
        (self.match_type, self.found)
            .cmp(&(other.match_type, other.found))
            .then(self.coverage().total_cmp(&other.coverage()))
            .is_gt()
    }
}

/// Scores search results for spans
pub struct CandidateScorer<'a> {
    searcher: &'a dyn EntitySearcher,
    tokenizer: &'a dyn LabelTokenizer,
    config: &'a EntityLinkerConfig,
}

impl<'a> CandidateScorer<'a> {
    pub fn new(
        searcher: &'a dyn EntitySearcher,
        tokenizer: &'a dyn LabelTokenizer,
        config: &'a EntityLinkerConfig,
    ) -> Self {
        Self {
            searcher,
            tokenizer,
            config,
        }
    }

    /// Comparable tokens of a text: short tokens dropped, case folded
    /// unless matching is case-sensitive
    fn comparable_tokens(&self, text: &str, language: &str) -> Vec<String> {
        self.tokenizer
            .tokenize(text, language)
            .into_iter()
            .filter(|t| t.chars().count() >= self.config.min_search_token_length)
            .map(|t| {
                if self.config.case_sensitive {
                    t
                } else {
                    t.to_lowercase()
                }
            })
            .collect()
    }

    /// Query tokens for a span text, without duplicates
    pub fn query_tokens(&self, text: &str, language: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.comparable_tokens(text, language)
            .into_iter()
            .filter(|t| seen.insert(t.clone()))
            .collect()
    }

    /// Search and score candidates for a span.
    ///
    /// Fails only if the searcher fails. The result is unordered.
    pub async fn score(&self, span: &Span, language: &str) -> Result<Vec<Suggestion>> {
        let query = self.query_tokens(&span.text, language);
        if query.is_empty() {
            tracing::debug!("No query tokens for span '{}'", span.text);
            return Ok(Vec::new());
        }

        let candidates = self
            .searcher
            .find(&query, language, self.config.search_limit())
            .await?;
        tracing::debug!(
            "Searcher {} returned {} candidates for '{}'",
            self.searcher.name(),
            candidates.len(),
            span.text
        );

        let max_backend = candidates
            .iter()
            .map(backend_score)
            .fold(f32::NEG_INFINITY, f32::max);
        let span_norm = self.config.normalize(&span.text);

        let mut suggestions = Vec::new();
        let mut exact_matches = 0;

        for (rank, entity) in candidates.into_iter().enumerate() {
            let Some(best) = self.best_label(&entity, &span_norm, &query, language) else {
                continue;
            };

            let norm = if max_backend.is_finite() && max_backend > 0.0 {
                (backend_score(&entity) / max_backend).clamp(0.0, 1.0)
            } else {
                1.0
            };

            let score = if best.match_type == MatchType::Exact {
                exact_matches += 1;
                0.5 + 0.5 * norm
            } else {
                let text_ratio = best.found as f32 / query.len() as f32;
                NON_EXACT_CEILING * norm * text_ratio * best.coverage()
            };

            suggestions.push(Suggestion {
                entity: Arc::new(entity),
                score,
                match_type: best.match_type,
                matched_label: best.label,
                found_tokens: best.found,
                label_tokens: best.label_tokens,
                alias_label: None,
                redirected_from: None,
                backend_rank: rank,
            });

            if exact_matches >= self.config.max_suggestions {
                tracing::debug!("Found {exact_matches} exact matches, stopping");
                break;
            }
        }

        Ok(suggestions)
    }

    /// Best matching label of an entity for the span
    fn best_label(
        &self,
        entity: &Entity,
        span_norm: &str,
        query: &[String],
        language: &str,
    ) -> Option<LabelMatch> {
        let mut labels: Vec<&Label> = entity.labels_for(language).collect();
        if labels.is_empty() {
            if let Some(fallback) = &self.config.default_language {
                labels = entity.labels_for(fallback).collect();
            }
        }

        labels
            .into_iter()
            .filter_map(|label| self.match_label(span_norm, query, label, language))
            .fold(None, |best: Option<LabelMatch>, m| match best {
                Some(b) if !m.beats(&b) => Some(b),
                _ => Some(m),
            })
    }

    fn match_label(
        &self,
        span_norm: &str,
        query: &[String],
        label: &Label,
        language: &str,
    ) -> Option<LabelMatch> {
        let label_language = label.language.as_deref().unwrap_or(language);
        let label_tokens = self.comparable_tokens(&label.text, label_language);
        if label_tokens.is_empty() {
            return None;
        }

        // Each label token can satisfy one query token
        let mut remaining: HashMap<&str, usize> = HashMap::new();
        for token in &label_tokens {
            *remaining.entry(token.as_str()).or_default() += 1;
        }
        let found = query
            .iter()
            .filter(|q| match remaining.get_mut(q.as_str()) {
                Some(count) if *count > 0 => {
                    *count -= 1;
                    true
                }
                _ => false,
            })
            .count();

        let required = self.config.min_found_tokens.min(query.len());
        if found == 0 || found < required {
            return None;
        }

        let match_type = if span_norm == self.config.normalize(&label.text) {
            MatchType::Exact
        } else if found == query.len() && found == label_tokens.len() {
            MatchType::Full
        } else {
            MatchType::Partial
        };

        Some(LabelMatch {
            label: label.text.clone(),
            match_type,
            found,
            label_tokens: label_tokens.len(),
        })
    }
}

/// Backend score of a candidate; non-finite scores count as 0
fn backend_score(entity: &Entity) -> f32 {
    if entity.score.is_finite() {
        entity.score
    } else {
        0.0
    }
}
