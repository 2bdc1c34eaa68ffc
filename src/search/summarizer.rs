//! Page summarization connector
//!
//! Fetches a result page, extracts its visible text, and asks a Gemini
//! model for a one-paragraph summary.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::content::excerpt;
use super::http::{build_client, read_json, read_page, truncate_chars};
use super::service_trait::PageSummarizer;
use crate::config::BouncerConfig;
use crate::errors::UpstreamError;

const SERVICE: &str = "summarizer";
const EMPTY_SUMMARY: &str = "No summary generated";

pub struct GeminiSummarizer {
    page_client: reqwest::Client,
    model_client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    excerpt_lines: usize,
    excerpt_chars: usize,
    max_summary_chars: usize,
    max_page_bytes: usize,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

impl GeminiSummarizer {
    pub fn new(config: &BouncerConfig) -> anyhow::Result<Self> {
        Ok(Self {
            page_client: build_client(config.page_fetch_timeout())?,
            model_client: build_client(config.request_timeout())?,
            base_url: config.gemini_base_url.trim_end_matches('/').to_string(),
            model: config.gemini_model.clone(),
            api_key: config.gemini_api_key.clone(),
            excerpt_lines: config.page_excerpt_lines,
            excerpt_chars: config.page_excerpt_chars,
            max_summary_chars: config.max_summary_chars,
            max_page_bytes: config.max_page_bytes,
        })
    }

    async fn fetch_page(&self, link: &str) -> Result<String, UpstreamError> {
        let url = url::Url::parse(link)
            .map_err(|e| UpstreamError::malformed(SERVICE, format!("invalid link {link:?}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(UpstreamError::malformed(
                SERVICE,
                format!("unsupported link scheme {:?}", url.scheme()),
            ));
        }
        read_page(SERVICE, self.page_client.get(url), self.max_page_bytes).await
    }

    async fn generate(&self, key: &str, prompt: String) -> Result<String, UpstreamError> {
        let request = self
            .model_client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            ))
            .query(&[("key", key)])
            .json(&GenerateRequest {
                contents: vec![Content {
                    parts: vec![Part { text: Some(prompt) }],
                }],
            });

        let response: GenerateResponse = read_json(SERVICE, request).await?;
        Ok(response_text(response))
    }
}

fn summary_prompt(excerpt: &str) -> String {
    format!(
        "Here is some page content:\n\n{excerpt}\n\nPlease write a concise, one-paragraph summary of the above."
    )
}

fn response_text(response: GenerateResponse) -> String {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .unwrap_or_default()
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect::<Vec<_>>()
        .join("")
}

#[async_trait]
impl PageSummarizer for GeminiSummarizer {
    fn id(&self) -> &'static str {
        SERVICE
    }

    async fn summarize(&self, link: &str) -> Result<String, UpstreamError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| UpstreamError::missing_credential(SERVICE, "GEMINI_API_KEY"))?;

        let html = self.fetch_page(link).await?;
        let page_text = excerpt(&html, self.excerpt_lines, self.excerpt_chars);
        debug!(link, chars = page_text.len(), "page text extracted");

        let summary = self.generate(key, summary_prompt(&page_text)).await?;
        let summary = summary.trim();
        if summary.is_empty() {
            return Ok(EMPTY_SUMMARY.to_string());
        }
        Ok(truncate_chars(summary, self.max_summary_chars))
    }
}
