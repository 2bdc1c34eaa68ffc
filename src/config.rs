// Bouncer API Configuration
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BouncerConfig {
    pub service_port: u16,
    pub host: String,

    // Upstream credentials
    pub custom_search_api_key: Option<String>,
    pub search_engine_id: Option<String>,
    pub gemini_api_key: Option<String>,
    pub claude_api_key: Option<String>,
    pub facecheck_api_token: Option<String>,

    /// Demo searches on the face service: no credits spent, lower accuracy.
    pub facecheck_testing_mode: bool,

    // Upstream endpoints
    pub facecheck_base_url: String,
    pub custom_search_url: String,
    pub gemini_base_url: String,
    pub anthropic_base_url: String,

    // Models
    pub gemini_model: String,
    pub claude_model: String,
    pub claude_max_tokens: u32,

    // Limits
    pub max_upload_bytes: usize,
    pub max_text_results: usize,
    pub default_text_results: usize,
    pub face_result_limit: usize,
    pub summary_concurrency: usize,
    pub max_summary_chars: usize,
    pub page_excerpt_lines: usize,
    pub page_excerpt_chars: usize,
    pub max_page_bytes: usize,

    // Timeouts
    pub request_timeout_secs: u64,
    pub page_fetch_timeout_secs: u64,
    pub face_poll_interval_ms: u64,
    pub face_search_timeout_secs: u64,
    pub deep_search_timeout_secs: u64,
}

impl Default for BouncerConfig {
    fn default() -> Self {
        Self {
            service_port: 5001,
            host: "0.0.0.0".to_string(),

            custom_search_api_key: None,
            search_engine_id: None,
            gemini_api_key: None,
            claude_api_key: None,
            facecheck_api_token: None,

            facecheck_testing_mode: true,

            facecheck_base_url: "https://facecheck.id".to_string(),
            custom_search_url: "https://www.googleapis.com/customsearch/v1".to_string(),
            gemini_base_url: "https://generativelanguage.googleapis.com".to_string(),
            anthropic_base_url: "https://api.anthropic.com".to_string(),

            gemini_model: "gemini-2.0-flash".to_string(),
            claude_model: "claude-sonnet-4-20250514".to_string(),
            claude_max_tokens: 64,

            max_upload_bytes: 16 * 1024 * 1024,
            max_text_results: 20,
            default_text_results: 10,
            face_result_limit: 3,
            summary_concurrency: 4,
            max_summary_chars: 2000,
            page_excerpt_lines: 500,
            page_excerpt_chars: 100_000,
            max_page_bytes: 2 * 1024 * 1024,

            request_timeout_secs: 30,
            page_fetch_timeout_secs: 10,
            face_poll_interval_ms: 1000,
            face_search_timeout_secs: 180,
            deep_search_timeout_secs: 300,
        }
    }
}

impl BouncerConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            service_port: env_or("BOUNCER_PORT", defaults.service_port)?,
            host: std::env::var("BOUNCER_HOST").unwrap_or(defaults.host),

            custom_search_api_key: env_opt("CUSTOM_SEARCH_API_KEY"),
            search_engine_id: env_opt("SEARCH_ENGINE_ID"),
            gemini_api_key: env_opt("GEMINI_API_KEY"),
            claude_api_key: env_opt("CLAUDE_API_KEY"),
            facecheck_api_token: env_opt("FACECHECK_API_TOKEN"),

            facecheck_testing_mode: env_or("FACECHECK_TESTING_MODE", defaults.facecheck_testing_mode)?,

            facecheck_base_url: std::env::var("FACECHECK_BASE_URL")
                .unwrap_or(defaults.facecheck_base_url),
            custom_search_url: std::env::var("CUSTOM_SEARCH_URL")
                .unwrap_or(defaults.custom_search_url),
            gemini_base_url: std::env::var("GEMINI_BASE_URL").unwrap_or(defaults.gemini_base_url),
            anthropic_base_url: std::env::var("ANTHROPIC_BASE_URL")
                .unwrap_or(defaults.anthropic_base_url),

            gemini_model: std::env::var("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            claude_model: std::env::var("CLAUDE_MODEL").unwrap_or(defaults.claude_model),
            claude_max_tokens: env_or("CLAUDE_MAX_TOKENS", defaults.claude_max_tokens)?,

            max_upload_bytes: env_or("MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            max_text_results: env_or("MAX_TEXT_RESULTS", defaults.max_text_results)?,
            default_text_results: env_or("DEFAULT_TEXT_RESULTS", defaults.default_text_results)?,
            face_result_limit: env_or("FACE_RESULT_LIMIT", defaults.face_result_limit)?,
            summary_concurrency: env_or("SUMMARY_CONCURRENCY", defaults.summary_concurrency)?,
            max_summary_chars: env_or("MAX_SUMMARY_CHARS", defaults.max_summary_chars)?,
            page_excerpt_lines: env_or("PAGE_EXCERPT_LINES", defaults.page_excerpt_lines)?,
            page_excerpt_chars: env_or("PAGE_EXCERPT_CHARS", defaults.page_excerpt_chars)?,
            max_page_bytes: env_or("MAX_PAGE_BYTES", defaults.max_page_bytes)?,

            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs)?,
            page_fetch_timeout_secs: env_or(
                "PAGE_FETCH_TIMEOUT_SECS",
                defaults.page_fetch_timeout_secs,
            )?,
            face_poll_interval_ms: env_or("FACE_POLL_INTERVAL_MS", defaults.face_poll_interval_ms)?,
            face_search_timeout_secs: env_or(
                "FACE_SEARCH_TIMEOUT_SECS",
                defaults.face_search_timeout_secs,
            )?,
            deep_search_timeout_secs: env_or(
                "DEEP_SEARCH_TIMEOUT_SECS",
                defaults.deep_search_timeout_secs,
            )?,
        };
        config.validated()
    }

    /// Reject limits that would make every request fail, and clamp the
    /// default text result count under the cap.
    pub fn validated(mut self) -> Result<Self> {
        if self.max_upload_bytes == 0 {
            bail!("MAX_UPLOAD_BYTES must be greater than zero");
        }
        if self.max_text_results == 0 {
            bail!("MAX_TEXT_RESULTS must be greater than zero");
        }
        if self.face_result_limit == 0 {
            bail!("FACE_RESULT_LIMIT must be greater than zero");
        }
        if self.max_page_bytes == 0 {
            bail!("MAX_PAGE_BYTES must be greater than zero");
        }
        if self.summary_concurrency == 0 {
            bail!("SUMMARY_CONCURRENCY must be greater than zero");
        }
        self.default_text_results = self.default_text_results.clamp(1, self.max_text_results);
        Ok(self)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn page_fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.page_fetch_timeout_secs)
    }

    pub fn face_poll_interval(&self) -> Duration {
        Duration::from_millis(self.face_poll_interval_ms)
    }

    pub fn face_search_timeout(&self) -> Duration {
        Duration::from_secs(self.face_search_timeout_secs)
    }

    pub fn deep_search_timeout(&self) -> Duration {
        Duration::from_secs(self.deep_search_timeout_secs)
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        Err(_) => Ok(default),
    }
}
