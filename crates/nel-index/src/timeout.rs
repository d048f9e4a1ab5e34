//! Timeout searcher decorator

use std::time::Duration;

use async_trait::async_trait;

use nel_core::{Entity, EntitySearcher, NelError, Result, SearchConfig};

/// Searcher that fails calls of another searcher taking longer than a limit
pub struct TimeoutSearcher<S> {
    inner: S,
    timeout: Duration,
}

impl<S: EntitySearcher> TimeoutSearcher<S> {
    pub fn new(inner: S, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    /// Wrap a searcher using the timeout of the search settings
    pub fn from_config(inner: S, config: &SearchConfig) -> Self {
        Self::new(inner, Duration::from_secs(config.timeout_secs))
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn elapsed(&self, operation: &str) -> NelError {
        let message = format!(
            "{} {} timed out after {:?}",
            self.inner.name(),
            operation,
            self.timeout
        );
        tracing::warn!("{message}");
        NelError::SearchUnavailable(message)
    }
}

#[async_trait]
impl<S: EntitySearcher> EntitySearcher for TimeoutSearcher<S> {
    async fn find(
        &self,
        query_tokens: &[String],
        language: &str,
        limit: usize,
    ) -> Result<Vec<Entity>> {
        tokio::time::timeout(self.timeout, self.inner.find(query_tokens, language, limit))
            .await
            .map_err(|_| self.elapsed("find"))?
    }

    async fn get(&self, id: &str) -> Result<Option<Entity>> {
        tokio::time::timeout(self.timeout, self.inner.get(id))
            .await
            .map_err(|_| self.elapsed("get"))?
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
