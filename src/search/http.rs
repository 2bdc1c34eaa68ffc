//! Shared HTTP plumbing for upstream adapters.
//!
//! Every adapter owns a [`reqwest::Client`] with a bounded timeout and funnels
//! responses through [`read_json`] / [`read_text`] / [`read_page`] so status
//! codes and decode failures map onto the same [`UpstreamError`] kinds.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::errors::UpstreamError;

const USER_AGENT: &str = concat!("bouncer-api/", env!("CARGO_PKG_VERSION"));

/// Build a client whose every request is bounded by `timeout`.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .context("failed to build HTTP client")
}

/// Send a request and decode a JSON body, mapping failures for `service`.
pub async fn read_json<T: DeserializeOwned>(
    service: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<T, UpstreamError> {
    let body = read_text(service, request).await?;
    serde_json::from_str(&body)
        .map_err(|e| UpstreamError::malformed(service, format!("unexpected response shape: {e}")))
}

/// Send a request and return the body of a successful response as text.
pub async fn read_text(
    service: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<String, UpstreamError> {
    let response = request
        .send()
        .await
        .map_err(|e| UpstreamError::from_reqwest(service, e))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(UpstreamError::from_status(service, status.as_u16(), &body));
    }

    response
        .text()
        .await
        .map_err(|e| UpstreamError::from_reqwest(service, e))
}

/// Fetch a web page for text extraction. Bodies that are not HTML or text are
/// rejected, and reading stops once `max_bytes` have arrived.
pub async fn read_page(
    service: &'static str,
    request: reqwest::RequestBuilder,
    max_bytes: usize,
) -> Result<String, UpstreamError> {
    let mut response = request
        .send()
        .await
        .map_err(|e| UpstreamError::from_reqwest(service, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(UpstreamError::from_status(service, status.as_u16(), ""));
    }

    if let Some(content_type) = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    {
        if !is_textual(content_type) {
            return Err(UpstreamError::malformed(
                service,
                format!("unsupported content type {content_type:?}"),
            ));
        }
    }

    let mut body: Vec<u8> = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| UpstreamError::from_reqwest(service, e))?
    {
        body.extend_from_slice(&chunk);
        if body.len() >= max_bytes {
            body.truncate(max_bytes);
            debug!(service, max_bytes, "page body truncated");
            break;
        }
    }
    Ok(String::from_utf8_lossy(&body).into_owned())
}

fn is_textual(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime.is_empty() || mime.starts_with("text/") || mime.contains("html") || mime.contains("xml")
}

/// Cut `text` to at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}
