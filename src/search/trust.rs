//! Trust scoring connector (Anthropic Messages API).
//!
//! Serializes a bundle of summarized results into one analyst prompt and
//! expects the model to answer with nothing but a score between 0 and 1.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::http::{build_client, read_json};
use super::service_trait::TrustScorer;
use super::{SummaryRecord, TrustScore};
use crate::config::BouncerConfig;
use crate::errors::UpstreamError;

const SERVICE: &str = "trust_scorer";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const TEMPERATURE: f32 = 0.1;

pub struct ClaudeTrustScorer {
    client: reqwest::Client,
    base_url: String,
    model: String,
    max_tokens: u32,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl ClaudeTrustScorer {
    pub fn new(config: &BouncerConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: build_client(config.request_timeout())?,
            base_url: config.anthropic_base_url.trim_end_matches('/').to_string(),
            model: config.claude_model.clone(),
            max_tokens: config.claude_max_tokens,
            api_key: config.claude_api_key.clone(),
        })
    }
}

fn or_na(value: &str) -> &str {
    if value.trim().is_empty() {
        "N/A"
    } else {
        value
    }
}

/// One block per record, numbered from 1.
fn render_context(records: &[SummaryRecord]) -> String {
    let mut context = String::new();
    for (i, record) in records.iter().enumerate() {
        let r = &record.result;
        context.push_str(&format!(
            "\nResult {} (Source: {}):\n- Title: {}\n- Link: {}\n- Original Snippet: {}\n- AI Summary: {}\n---\n",
            i + 1,
            r.source,
            or_na(&r.title),
            or_na(&r.link),
            or_na(&r.snippet),
            or_na(record.summary.as_deref().unwrap_or_default()),
        ));
    }
    context
}

pub(crate) fn analysis_prompt(prompt: &str, records: &[SummaryRecord]) -> String {
    format!(
        "\nYou are an expert analyst reviewing the trustworthiness of a person based on the search results \
where 0 is least trustworthy and 1 is most trustworthy. Only output a floating point number rounded to \
2 decimal places between 0 and 1 and no other text.\n\
As for strict guidelines, you must base your output number on the User's Analysis Request based on what \
the user deems more risky and less risky pieces of information.\n{}\n\nUser's Analysis Request:\n{}\n",
        render_context(records),
        prompt.trim()
    )
}

fn reply_text(response: MessagesResponse) -> Option<String> {
    response
        .content
        .into_iter()
        .find(|block| block.kind == "text")
        .and_then(|block| block.text)
}

#[async_trait]
impl TrustScorer for ClaudeTrustScorer {
    fn id(&self) -> &'static str {
        SERVICE
    }

    async fn score(
        &self,
        prompt: &str,
        records: &[SummaryRecord],
    ) -> Result<TrustScore, UpstreamError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| UpstreamError::missing_credential(SERVICE, "CLAUDE_API_KEY"))?;

        let request = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&MessagesRequest {
                model: &self.model,
                max_tokens: self.max_tokens,
                temperature: TEMPERATURE,
                messages: vec![Message {
                    role: "user",
                    content: analysis_prompt(prompt, records),
                }],
            });

        let response: MessagesResponse = read_json(SERVICE, request).await?;
        let text = reply_text(response)
            .ok_or_else(|| UpstreamError::malformed(SERVICE, "response has no text block"))?;
        let score = TrustScore::parse(&text).map_err(|e| UpstreamError::malformed(SERVICE, e))?;

        info!(records = records.len(), score = %score, "trust score computed");
        Ok(score)
    }
}
