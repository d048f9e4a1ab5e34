//! Redirect resolution
//!
//! Replaces or complements alias candidates with the entity they redirect
//! to. Only one hop is followed. A redirected suggestion keeps the alias
//! score but carries the target's label and types.

use std::collections::HashMap;
use std::sync::Arc;

use nel_core::{Entity, EntityLinkerConfig, EntitySearcher, RedirectProcessingMode};

use crate::Suggestion;

/// Resolves redirects of suggestions for one document.
///
/// Target lookups are cached, so a resolver should not outlive the document
/// it was created for.
pub struct RedirectResolver<'a> {
    searcher: &'a dyn EntitySearcher,
    mode: RedirectProcessingMode,
    language: &'a str,
    default_language: Option<&'a str>,
    targets: HashMap<String, Option<Arc<Entity>>>,
}

impl<'a> RedirectResolver<'a> {
    /// Create a resolver for a document in `language`
    pub fn new(
        searcher: &'a dyn EntitySearcher,
        config: &'a EntityLinkerConfig,
        language: &'a str,
    ) -> Self {
        Self {
            searcher,
            mode: config.redirect_mode,
            language,
            default_language: config.default_language.as_deref(),
            targets: HashMap::new(),
        }
    }

    pub fn mode(&self) -> RedirectProcessingMode {
        self.mode
    }

    /// Number of distinct redirect targets looked up so far
    pub fn lookups(&self) -> usize {
        self.targets.len()
    }

    /// Apply the redirect mode to a list of suggestions
    pub async fn resolve(&mut self, suggestions: Vec<Suggestion>) -> Vec<Suggestion> {
        if self.mode == RedirectProcessingMode::Ignore {
            return suggestions;
        }

        let mut resolved = Vec::with_capacity(suggestions.len());
        for suggestion in suggestions {
            let target = match suggestion.entity.redirect.as_deref() {
                Some(target) if target != suggestion.entity.id => target.to_string(),
                _ => {
                    resolved.push(suggestion);
                    continue;
                }
            };

            let Some(entity) = self.target(&target, &suggestion.entity.id).await else {
                resolved.push(suggestion);
                continue;
            };

            let label = self
                .display_label(&entity)
                .unwrap_or_else(|| suggestion.matched_label.clone());
            let redirected = Suggestion {
                entity,
                matched_label: label,
                alias_label: Some(suggestion.matched_label.clone()),
                redirected_from: Some(suggestion.entity.id.clone()),
                ..suggestion.clone()
            };

            if self.mode == RedirectProcessingMode::Add {
                resolved.push(suggestion);
            }
            resolved.push(redirected);
        }

        resolved
    }

    /// Label of a target for the document language, falling back to the
    /// default language and then to its first label
    fn display_label(&self, entity: &Entity) -> Option<String> {
        entity
            .labels_for(self.language)
            .next()
            .or_else(|| {
                self.default_language
                    .and_then(|fallback| entity.labels_for(fallback).next())
            })
            .or_else(|| entity.labels.first())
            .map(|label| label.text.clone())
    }

    /// Look up a redirect target, remembering the outcome
    async fn target(&mut self, id: &str, alias: &str) -> Option<Arc<Entity>> {
        if let Some(cached) = self.targets.get(id) {
            return cached.clone();
        }

        let entity = match self.searcher.get(id).await {
            Ok(Some(entity)) => Some(Arc::new(entity)),
            Ok(None) => {
                tracing::warn!("Redirect target {id} of {alias} not found, keeping alias");
                None
            }
            Err(e) => {
                tracing::warn!("Redirect lookup of {id} failed: {e}, keeping {alias}");
                None
            }
        };

        self.targets.insert(id.to_string(), entity.clone());
        entity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StaticSearcher;
    use crate::MatchType;

    fn suggestion(entity: Entity, score: f32) -> Suggestion {
        Suggestion {
            matched_label: entity
                .labels
                .first()
                .map(|l| l.text.clone())
                .unwrap_or_default(),
            entity: Arc::new(entity),
            score,
            match_type: MatchType::Exact,
            found_tokens: 1,
            label_tokens: 1,
            alias_label: None,
            redirected_from: None,
            backend_rank: 0,
        }
    }

    fn config(mode: RedirectProcessingMode) -> EntityLinkerConfig {
        EntityLinkerConfig {
            redirect_mode: mode,
            ..Default::default()
        }
    }

    fn searcher() -> StaticSearcher {
        StaticSearcher::new(vec![
            Entity::new("urn:test:Geologe")
                .with_language_label("Geologe", "de")
                .with_redirect("urn:test:redirect:Geologist"),
            Entity::new("urn:test:redirect:Geologist").with_language_label("Geologist", "en"),
        ])
    }

    fn alias() -> Suggestion {
        suggestion(
            Entity::new("urn:test:Geologe")
                .with_language_label("Geologe", "de")
                .with_redirect("urn:test:redirect:Geologist"),
            0.8,
        )
    }

    #[tokio::test]
    async fn test_ignore_keeps_alias() {
        let searcher = searcher();
        let config = config(RedirectProcessingMode::Ignore);
        let mut resolver = RedirectResolver::new(&searcher, &config, "de");
        let resolved = resolver.resolve(vec![alias()]).await;

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].entity.id, "urn:test:Geologe");
        assert_eq!(resolver.lookups(), 0);
    }

    #[tokio::test]
    async fn test_follow_replaces_alias() {
        let searcher = searcher();
        let config = config(RedirectProcessingMode::Follow);
        let mut resolver = RedirectResolver::new(&searcher, &config, "de");
        let resolved = resolver.resolve(vec![alias()]).await;

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].entity.id, "urn:test:redirect:Geologist");
        assert_eq!(resolved[0].redirected_from.as_deref(), Some("urn:test:Geologe"));
        assert_eq!(resolved[0].score, 0.8);
        assert_eq!(resolved[0].matched_label, "Geologist");
        assert_eq!(resolved[0].alias_label.as_deref(), Some("Geologe"));
    }

    #[tokio::test]
    async fn test_follow_uses_target_label_for_language() {
        let searcher = StaticSearcher::new(vec![Entity::new("urn:test:redirect:Geologist")
            .with_language_label("Geologe", "de")
            .with_language_label("Geologist", "en")]);
        let follow = config(RedirectProcessingMode::Follow);
        let mut resolver = RedirectResolver::new(&searcher, &follow, "en");
        let resolved = resolver.resolve(vec![alias()]).await;
        assert_eq!(resolved[0].matched_label, "Geologist");

        let fallback = EntityLinkerConfig {
            default_language: Some("de".to_string()),
            ..config(RedirectProcessingMode::Follow)
        };
        let mut resolver = RedirectResolver::new(&searcher, &fallback, "fr");
        let resolved = resolver.resolve(vec![alias()]).await;
        assert_eq!(resolved[0].matched_label, "Geologe");
    }

    #[tokio::test]
    async fn test_add_keeps_both() {
        let searcher = searcher();
        let config = config(RedirectProcessingMode::Add);
        let mut resolver = RedirectResolver::new(&searcher, &config, "de");
        let resolved = resolver.resolve(vec![alias()]).await;

        let ids: Vec<_> = resolved.iter().map(|s| s.entity.id.as_str()).collect();
        assert_eq!(ids, vec!["urn:test:Geologe", "urn:test:redirect:Geologist"]);
        assert_eq!(resolved[0].score, resolved[1].score);
        assert_eq!(resolved[0].matched_label, "Geologe");
        assert!(resolved[0].alias_label.is_none());
        assert_eq!(resolved[1].matched_label, "Geologist");
    }

    #[tokio::test]
    async fn test_dangling_redirect_keeps_alias() {
        let searcher = StaticSearcher::default();
        let config = config(RedirectProcessingMode::Follow);
        let mut resolver = RedirectResolver::new(&searcher, &config, "de");
        let resolved = resolver.resolve(vec![alias()]).await;

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].entity.id, "urn:test:Geologe");
        assert!(resolved[0].redirected_from.is_none());
    }

    #[tokio::test]
    async fn test_self_redirect_ignored() {
        let searcher = searcher();
        let config = config(RedirectProcessingMode::Follow);
        let mut resolver = RedirectResolver::new(&searcher, &config, "de");
        let looped = suggestion(Entity::new("urn:test:Loop").with_redirect("urn:test:Loop"), 0.4);
        let resolved = resolver.resolve(vec![looped]).await;

        assert_eq!(resolved[0].entity.id, "urn:test:Loop");
        assert_eq!(resolver.lookups(), 0);
    }

    #[tokio::test]
    async fn test_single_hop() {
        let searcher = StaticSearcher::new(vec![
            Entity::new("urn:test:b").with_redirect("urn:test:c"),
            Entity::new("urn:test:c"),
        ]);
        let config = config(RedirectProcessingMode::Follow);
        let mut resolver = RedirectResolver::new(&searcher, &config, "de");
        let first = suggestion(Entity::new("urn:test:a").with_redirect("urn:test:b"), 0.7);
        let resolved = resolver.resolve(vec![first]).await;

        assert_eq!(resolved[0].entity.id, "urn:test:b");
        assert_eq!(resolved[0].entity.redirect.as_deref(), Some("urn:test:c"));
    }

    #[tokio::test]
    async fn test_targets_cached() {
        let searcher = searcher();
        let config = config(RedirectProcessingMode::Follow);
        let mut resolver = RedirectResolver::new(&searcher, &config, "de");
        resolver.resolve(vec![alias(), alias()]).await;
        resolver.resolve(vec![alias()]).await;

        assert_eq!(resolver.lookups(), 1);
    }
}
