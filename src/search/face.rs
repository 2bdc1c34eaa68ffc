//! Face search connector
//!
//! Uploads an image to the face-similarity service, polls the search job
//! until it finishes, and returns the best-scoring matches.
//!
//! In testing mode searches run as demos: results are less accurate and the
//! queue is slower, but no credits are spent.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::http::{build_client, read_json};
use super::normalize::{normalize, FaceMatch, RawHit};
use super::service_trait::FaceSearch;
use super::{SearchResult, Source};
use crate::config::BouncerConfig;
use crate::errors::{UpstreamError, UpstreamErrorKind};

const SERVICE: &str = "face_search";

pub struct FaceCheckService {
    client: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
    testing_mode: bool,
    poll_interval: Duration,
    search_timeout: Duration,
    result_limit: usize,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    id_search: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    id_search: &'a str,
    with_progress: bool,
    status_only: bool,
    demo: bool,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    progress: Option<u32>,
    #[serde(default)]
    output: Option<SearchOutput>,
}

#[derive(Debug, Deserialize)]
struct SearchOutput {
    #[serde(default)]
    items: Vec<FaceMatch>,
}

impl FaceCheckService {
    pub fn new(config: &BouncerConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: build_client(config.request_timeout())?,
            base_url: config.facecheck_base_url.trim_end_matches('/').to_string(),
            api_token: config.facecheck_api_token.clone(),
            testing_mode: config.facecheck_testing_mode,
            poll_interval: config.face_poll_interval(),
            search_timeout: config.face_search_timeout(),
            result_limit: config.face_result_limit,
        })
    }

    async fn upload(&self, token: &str, image: Bytes) -> Result<String, UpstreamError> {
        let part = reqwest::multipart::Part::bytes(image.to_vec())
            .file_name("upload.jpg")
            .mime_str("application/octet-stream")
            .map_err(|e| UpstreamError::from_reqwest(SERVICE, e))?;
        let form = reqwest::multipart::Form::new().part("images", part);

        let request = self
            .client
            .post(format!("{}/api/upload_pic", self.base_url))
            .header("accept", "application/json")
            .header("Authorization", token)
            .multipart(form);

        let response: UploadResponse = read_json(SERVICE, request).await?;
        if let Some(error) = response.error.filter(|e| !e.is_empty()) {
            return Err(service_error(&error, response.code.as_deref()));
        }

        let id_search = response
            .id_search
            .filter(|id| !id.is_empty())
            .ok_or_else(|| UpstreamError::malformed(SERVICE, "upload response has no id_search"))?;

        info!(
            id_search = %id_search,
            message = response.message.as_deref().unwrap_or_default(),
            "face image uploaded"
        );
        Ok(id_search)
    }

    async fn poll(&self, token: &str, id_search: &str) -> Result<Vec<FaceMatch>, UpstreamError> {
        let started = Instant::now();
        let body = SearchRequest {
            id_search,
            with_progress: true,
            status_only: false,
            demo: self.testing_mode,
        };

        loop {
            let request = self
                .client
                .post(format!("{}/api/search", self.base_url))
                .header("accept", "application/json")
                .header("Authorization", token)
                .json(&body);

            let response: SearchResponse = read_json(SERVICE, request).await?;
            if let Some(error) = response.error.filter(|e| !e.is_empty()) {
                return Err(service_error(&error, response.code.as_deref()));
            }
            if let Some(output) = response.output {
                return Ok(output.items);
            }

            debug!(
                id_search,
                progress = response.progress.unwrap_or(0),
                message = response.message.as_deref().unwrap_or_default(),
                "face search in progress"
            );

            if started.elapsed() + self.poll_interval > self.search_timeout {
                return Err(UpstreamError::new(
                    SERVICE,
                    UpstreamErrorKind::Timeout,
                    format!(
                        "search {id_search} did not finish within {}s",
                        self.search_timeout.as_secs()
                    ),
                ));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

/// The service reports failures in-band as `{error, code}`.
fn service_error(error: &str, code: Option<&str>) -> UpstreamError {
    let code = code.unwrap_or_default();
    let upper = code.to_ascii_uppercase();
    let kind = if upper.contains("TOKEN") || upper.contains("AUTH") || upper.contains("CREDIT") {
        UpstreamErrorKind::Auth
    } else if upper.contains("LIMIT") {
        UpstreamErrorKind::RateLimit
    } else {
        UpstreamErrorKind::Unavailable
    };
    UpstreamError::new(SERVICE, kind, format!("{error} ({code})"))
}

/// Best matches first, capped at `limit`. Matches without a page URL are
/// dropped before the cap.
fn rank_matches(mut matches: Vec<FaceMatch>, limit: usize) -> Vec<SearchResult> {
    matches.retain(|m| m.url.as_deref().is_some_and(|url| !url.trim().is_empty()));
    matches.sort_by(|a, b| {
        let a = a.score.unwrap_or(0.0);
        let b = b.score.unwrap_or(0.0);
        b.partial_cmp(&a).unwrap_or(std::cmp::Ordering::Equal)
    });
    matches
        .into_iter()
        .take(limit)
        .map(|m| normalize(RawHit::Face(m), Source::FaceSearch))
        .collect()
}

#[async_trait]
impl FaceSearch for FaceCheckService {
    fn id(&self) -> &'static str {
        SERVICE
    }

    async fn search(&self, image: Bytes) -> Result<Vec<SearchResult>, UpstreamError> {
        let token = self
            .api_token
            .as_deref()
            .ok_or_else(|| UpstreamError::missing_credential(SERVICE, "FACECHECK_API_TOKEN"))?;

        if self.testing_mode {
            warn!("face search running in testing mode: results are inaccurate, no credits are deducted");
        }

        let id_search = self.upload(token, image).await?;
        let matches = self.poll(token, &id_search).await?;
        let total = matches.len();
        let ranked = rank_matches(matches, self.result_limit);

        info!(id_search = %id_search, total, returned = ranked.len(), "face search completed");
        Ok(ranked)
    }
}
