// Adapter Traits - Common interface for every upstream service
use crate::errors::UpstreamError;
use crate::search::{SearchResult, SummaryRecord, TrustScore};
use async_trait::async_trait;
use bytes::Bytes;

/// Reverse face search over an uploaded image.
#[async_trait]
pub trait FaceSearch: Send + Sync {
    /// Service identifier used in logs and error messages
    fn id(&self) -> &'static str;

    /// Matches for the face in `image`, best first, capped by the adapter
    async fn search(&self, image: Bytes) -> Result<Vec<SearchResult>, UpstreamError>;
}

/// Free-text web search.
#[async_trait]
pub trait TextSearch: Send + Sync {
    fn id(&self) -> &'static str;

    /// At most `limit` hits, in engine rank order
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, UpstreamError>;
}

/// Fetches a page and produces an abstractive summary of it.
#[async_trait]
pub trait PageSummarizer: Send + Sync {
    fn id(&self) -> &'static str;

    async fn summarize(&self, url: &str) -> Result<String, UpstreamError>;

    /// Like [`PageSummarizer::summarize`], but a failed page yields a record
    /// with a null summary instead of an error.
    async fn summarize_record(&self, result: SearchResult) -> SummaryRecord {
        match self.summarize(&result.link).await {
            Ok(summary) => SummaryRecord::summarized(result, summary),
            Err(err) => {
                tracing::warn!(
                    service = self.id(),
                    link = %result.link,
                    kind = ?err.kind,
                    error = %err.message,
                    "could not summarize page"
                );
                SummaryRecord::unsummarized(result, err.to_string())
            }
        }
    }
}

/// Scores the credibility of a bundle of summarized results.
#[async_trait]
pub trait TrustScorer: Send + Sync {
    fn id(&self) -> &'static str;

    async fn score(
        &self,
        prompt: &str,
        records: &[SummaryRecord],
    ) -> Result<TrustScore, UpstreamError>;
}
