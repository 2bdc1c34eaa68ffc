// Search Manager - Owns the upstream adapters and routes endpoint calls to them
use super::deep::{deep_search, DeepSearchQuery};
use super::service_trait::{FaceSearch, PageSummarizer, TextSearch, TrustScorer};
use super::{
    ClaudeTrustScorer, CustomSearchService, DeepSearchReport, FaceCheckService, GeminiSummarizer,
    SearchResult, SummaryRecord, TrustScore,
};
use crate::{
    config::BouncerConfig,
    errors::{ApiError, ApiResult, UpstreamError},
};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;

/// Request-independent limits applied by the manager.
#[derive(Debug, Clone)]
pub struct SearchLimits {
    pub max_text_results: usize,
    pub default_text_results: usize,
    pub summary_concurrency: usize,
    pub deep_search_timeout: Duration,
    pub max_upload_bytes: usize,
}

impl SearchLimits {
    pub fn from_config(config: &BouncerConfig) -> Self {
        Self {
            max_text_results: config.max_text_results,
            default_text_results: config.default_text_results,
            summary_concurrency: config.summary_concurrency,
            deep_search_timeout: config.deep_search_timeout(),
            max_upload_bytes: config.max_upload_bytes,
        }
    }

    /// Requested count, defaulted and clamped to `1..=max_text_results`.
    pub fn text_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_text_results)
            .clamp(1, self.max_text_results.max(1))
    }
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self::from_config(&BouncerConfig::default())
    }
}

pub struct SearchManager {
    face: Arc<dyn FaceSearch>,
    text: Arc<dyn TextSearch>,
    summarizer: Arc<dyn PageSummarizer>,
    scorer: Arc<dyn TrustScorer>,
    limits: SearchLimits,
}

impl SearchManager {
    /// Wire the production adapters from configuration.
    pub fn new(config: &BouncerConfig) -> anyhow::Result<Self> {
        let config = config.clone().validated()?;
        Ok(Self::with_services(
            Arc::new(FaceCheckService::new(&config)?),
            Arc::new(CustomSearchService::new(&config)?),
            Arc::new(GeminiSummarizer::new(&config)?),
            Arc::new(ClaudeTrustScorer::new(&config)?),
            SearchLimits::from_config(&config),
        ))
    }

    pub fn with_services(
        face: Arc<dyn FaceSearch>,
        text: Arc<dyn TextSearch>,
        summarizer: Arc<dyn PageSummarizer>,
        scorer: Arc<dyn TrustScorer>,
        limits: SearchLimits,
    ) -> Self {
        Self {
            face,
            text,
            summarizer,
            scorer,
            limits,
        }
    }

    pub fn limits(&self) -> &SearchLimits {
        &self.limits
    }

    pub fn service_ids(&self) -> [&'static str; 4] {
        [
            self.face.id(),
            self.text.id(),
            self.summarizer.id(),
            self.scorer.id(),
        ]
    }

    pub async fn text_search(
        &self,
        query: &str,
        requested: Option<usize>,
    ) -> Result<Vec<SearchResult>, UpstreamError> {
        let limit = self.limits.text_limit(requested);
        let mut results = self.text.search(query, limit).await?;
        results.truncate(limit);
        Ok(results)
    }

    pub async fn face_search(&self, image: Bytes) -> Result<Vec<SearchResult>, UpstreamError> {
        self.face.search(image).await
    }

    /// Fan out to face and text search, then summarize every unique link.
    /// Adapter failures are partial; only the overall deadline fails the call.
    pub async fn deep_search(
        &self,
        text: Option<String>,
        image: Option<Bytes>,
        requested: Option<usize>,
    ) -> ApiResult<DeepSearchReport> {
        let text = text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
        let image = image.filter(|i| !i.is_empty());
        if text.is_none() && image.is_none() {
            return Err(ApiError::validation(
                "Must provide either 'text' query or 'image' file (or both)",
            ));
        }

        let query = DeepSearchQuery {
            text,
            image,
            text_limit: self.limits.text_limit(requested),
        };
        let deadline = self.limits.deep_search_timeout;

        tokio::time::timeout(
            deadline,
            deep_search(
                self.face.as_ref(),
                self.text.as_ref(),
                self.summarizer.as_ref(),
                query,
                self.limits.summary_concurrency,
            ),
        )
        .await
        .map_err(|_| {
            ApiError::DeadlineExceeded(format!(
                "Deep search did not finish within {}s",
                deadline.as_secs()
            ))
        })
    }

    pub async fn analyze(
        &self,
        prompt: &str,
        records: &[SummaryRecord],
    ) -> Result<TrustScore, UpstreamError> {
        self.scorer.score(prompt, records).await
    }
}
