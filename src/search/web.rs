//! Web search connector (Google Custom Search JSON API).

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use super::http::{build_client, read_json};
use super::normalize::{normalize, RawHit, WebItem};
use super::service_trait::TextSearch;
use super::{SearchResult, Source};
use crate::config::BouncerConfig;
use crate::errors::UpstreamError;

const SERVICE: &str = "text_search";

/// The engine never returns more than this many items per request.
const PAGE_SIZE: usize = 10;

pub struct CustomSearchService {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    engine_id: Option<String>,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct CustomSearchResponse {
    #[serde(default)]
    items: Vec<WebItem>,
}

impl CustomSearchService {
    pub fn new(config: &BouncerConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: build_client(config.request_timeout())?,
            endpoint: config.custom_search_url.clone(),
            api_key: config.custom_search_api_key.clone(),
            engine_id: config.search_engine_id.clone(),
            max_results: config.max_text_results,
        })
    }

    async fn fetch_page(
        &self,
        key: &str,
        cx: &str,
        query: &str,
        start: usize,
        num: usize,
    ) -> Result<Vec<WebItem>, UpstreamError> {
        let num = num.to_string();
        let start = start.to_string();
        let request = self.client.get(self.endpoint.as_str()).query(&[
            ("key", key),
            ("cx", cx),
            ("q", query),
            ("num", num.as_str()),
            ("start", start.as_str()),
        ]);
        let response: CustomSearchResponse = read_json(SERVICE, request).await?;
        Ok(response.items)
    }
}

/// Queries match pages whose body text contains the phrase.
fn intext_query(text: &str) -> String {
    format!("intext:{}", text.trim())
}

#[async_trait]
impl TextSearch for CustomSearchService {
    fn id(&self) -> &'static str {
        SERVICE
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, UpstreamError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| UpstreamError::missing_credential(SERVICE, "CUSTOM_SEARCH_API_KEY"))?;
        let cx = self
            .engine_id
            .as_deref()
            .ok_or_else(|| UpstreamError::missing_credential(SERVICE, "SEARCH_ENGINE_ID"))?;

        let wanted = limit.clamp(1, self.max_results.max(1));
        let q = intext_query(query);
        let mut results: Vec<SearchResult> = Vec::with_capacity(wanted);

        while results.len() < wanted {
            let start = results.len() + 1;
            let num = (wanted - results.len()).min(PAGE_SIZE);
            let items = self.fetch_page(key, cx, &q, start, num).await?;
            let received = items.len();
            debug!(start, num, received, "custom search page");

            results.extend(
                items
                    .into_iter()
                    .take(num)
                    .map(|item| normalize(RawHit::Web(item), Source::TextSearch)),
            );
            if received < num {
                break;
            }
        }

        info!(query = %query, returned = results.len(), "text search completed");
        Ok(results)
    }
}
