//! Entity linking orchestrator
//!
//! Drives one document through span selection, candidate scoring, redirect
//! resolution and ranking. The linker holds only immutable configuration and
//! shared collaborators, so one instance can process documents concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use nel_core::{
    AnalysedText, EntityLinkerConfig, EntitySearcher, LabelTokenizer, LanguageProcessingConfig,
    Result, TextView,
};

use crate::{
    rank, select_spans_in, CandidateScorer, LinkedEntity, LinkingResult, LinkingStats, Occurrence,
    RedirectResolver, Span, Suggestion, TypeMapper,
};

/// Processing stage of one document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkingState {
    Created,
    Selecting,
    Scoring,
    Ranking,
    Done,
}

impl std::fmt::Display for LinkingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Selecting => write!(f, "selecting"),
            Self::Scoring => write!(f, "scoring"),
            Self::Ranking => write!(f, "ranking"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// Distinct selected text collected during scoring
struct Candidate {
    selected_text: String,
    occurrences: Vec<Occurrence>,
    suggestions: Vec<Suggestion>,
    failed: bool,
}

/// Links mentions in analysed text to knowledge base entities
pub struct EntityLinker {
    searcher: Arc<dyn EntitySearcher>,
    tokenizer: Arc<dyn LabelTokenizer>,
    config: EntityLinkerConfig,
    type_mapper: TypeMapper,
}

impl EntityLinker {
    /// Create a linker; fails if the configuration is invalid
    pub fn new(
        searcher: Arc<dyn EntitySearcher>,
        tokenizer: Arc<dyn LabelTokenizer>,
        config: EntityLinkerConfig,
    ) -> Result<Self> {
        config.validate()?;
        let type_mapper = TypeMapper::new(&config.type_mappings);

        Ok(Self {
            searcher,
            tokenizer,
            config,
            type_mapper,
        })
    }

    pub fn config(&self) -> &EntityLinkerConfig {
        &self.config
    }

    /// Link the mentions of one document.
    ///
    /// Fails only on invalid input or configuration. Searcher failures are
    /// isolated per span and counted in [`LinkingStats::spans_failed`].
    pub async fn process(
        &self,
        text: &AnalysedText,
        language: &str,
        language_config: &LanguageProcessingConfig,
    ) -> Result<LinkingResult> {
        language_config.validate()?;
        text.validate()?;

        let mut state = LinkingState::Created;
        let mut stats = LinkingStats::default();

        let view = text.view();

        advance(&mut state, LinkingState::Selecting);
        let spans = select_spans_in(text, &view, language_config);
        stats.spans_selected = spans.len();

        advance(&mut state, LinkingState::Scoring);
        let contexts = sentence_contexts(text, &view);
        let candidates = self
            .score_spans(&spans, &contexts, language, &mut stats)
            .await;

        advance(&mut state, LinkingState::Ranking);
        let mut entities = HashMap::new();
        for (key, candidate) in candidates {
            let suggestions = rank(candidate.suggestions, self.config.max_suggestions);
            if suggestions.is_empty() && !candidate.failed {
                continue;
            }

            let confidence = suggestions.first().map(|s| s.score).unwrap_or(0.0);
            let types = suggestions
                .first()
                .map(|s| self.type_mapper.map(&s.entity.types))
                .unwrap_or_default();

            entities.insert(
                key,
                LinkedEntity {
                    selected_text: candidate.selected_text,
                    occurrences: candidate.occurrences,
                    suggestions,
                    confidence,
                    types,
                },
            );
        }
        stats.spans_linked = entities.len();

        advance(&mut state, LinkingState::Done);
        tracing::info!(
            "Linked {} of {} spans ({} searched, {} failed)",
            stats.spans_linked,
            stats.spans_selected,
            stats.spans_searched,
            stats.spans_failed
        );

        Ok(LinkingResult { entities, stats })
    }

    /// Score every distinct span text once, in selection order
    async fn score_spans(
        &self,
        spans: &[Span],
        contexts: &[Arc<str>],
        language: &str,
        stats: &mut LinkingStats,
    ) -> Vec<(String, Candidate)> {
        let scorer = CandidateScorer::new(
            self.searcher.as_ref(),
            self.tokenizer.as_ref(),
            &self.config,
        );
        let mut resolver = RedirectResolver::new(self.searcher.as_ref(), &self.config, language);

        let mut candidates: Vec<(String, Candidate)> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for span in spans {
            let key = EntityLinkerConfig::result_key(&span.text);
            let occurrence = Occurrence {
                start: span.start,
                end: span.end,
                sentence: span.sentence,
                context: contexts
                    .get(span.sentence)
                    .cloned()
                    .unwrap_or_else(|| Arc::from("")),
            };

            if let Some(&i) = index.get(&key) {
                candidates[i].1.occurrences.push(occurrence);
                continue;
            }

            let mut candidate = Candidate {
                selected_text: span.text.clone(),
                occurrences: vec![occurrence],
                suggestions: Vec::new(),
                failed: false,
            };

            if !scorer.query_tokens(&span.text, language).is_empty() {
                stats.spans_searched += 1;
                match scorer.score(span, language).await {
                    Ok(suggestions) => {
                        candidate.suggestions = resolver.resolve(suggestions).await;
                    }
                    Err(e) => {
                        tracing::warn!("Search for '{}' failed: {}", span.text, e);
                        stats.spans_failed += 1;
                        candidate.failed = true;
                    }
                }
            }
            tracing::debug!(
                "Span '{}' produced {} suggestions",
                span.text,
                candidate.suggestions.len()
            );

            index.insert(key.clone(), candidates.len());
            candidates.push((key, candidate));
        }

        candidates
    }
}

fn advance(state: &mut LinkingState, next: LinkingState) {
    tracing::debug!("Linking state: {} -> {}", state, next);
    *state = next;
}

/// Text of every sentence, indexed like `text.sentences`
fn sentence_contexts(text: &AnalysedText, view: &TextView<'_>) -> Vec<Arc<str>> {
    text.sentences
        .iter()
        .map(|s| Arc::from(view.span(s.start, s.end).unwrap_or_default()))
        .collect()
}
