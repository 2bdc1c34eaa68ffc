// Bouncer API Error Types
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

/// Failure category shared by every upstream adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpstreamErrorKind {
    Auth,
    RateLimit,
    Timeout,
    MalformedResponse,
    Unavailable,
}

impl fmt::Display for UpstreamErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            UpstreamErrorKind::Auth => "authentication failed",
            UpstreamErrorKind::RateLimit => "rate limited",
            UpstreamErrorKind::Timeout => "timed out",
            UpstreamErrorKind::MalformedResponse => "malformed response",
            UpstreamErrorKind::Unavailable => "unavailable",
        };
        f.write_str(label)
    }
}

/// An external service call that did not produce usable data.
#[derive(Debug, Clone, Error)]
#[error("{service} {kind}: {message}")]
pub struct UpstreamError {
    pub service: &'static str,
    pub kind: UpstreamErrorKind,
    pub message: String,
}

impl UpstreamError {
    pub fn new(service: &'static str, kind: UpstreamErrorKind, message: impl Into<String>) -> Self {
        Self {
            service,
            kind,
            message: message.into(),
        }
    }

    pub fn missing_credential(service: &'static str, variable: &str) -> Self {
        Self::new(
            service,
            UpstreamErrorKind::Auth,
            format!("{variable} is not configured"),
        )
    }

    pub fn malformed(service: &'static str, message: impl Into<String>) -> Self {
        Self::new(service, UpstreamErrorKind::MalformedResponse, message)
    }

    /// Classify a transport-level reqwest failure.
    pub fn from_reqwest(service: &'static str, err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::from_status(service, status.as_u16(), &err.to_string());
        }
        let kind = if err.is_timeout() {
            UpstreamErrorKind::Timeout
        } else if err.is_decode() || err.is_body() {
            UpstreamErrorKind::MalformedResponse
        } else {
            UpstreamErrorKind::Unavailable
        };
        Self::new(service, kind, err.to_string())
    }

    /// Classify a non-success HTTP status returned by a service.
    pub fn from_status(service: &'static str, status: u16, body: &str) -> Self {
        let kind = match status {
            401 | 403 => UpstreamErrorKind::Auth,
            429 => UpstreamErrorKind::RateLimit,
            408 | 504 => UpstreamErrorKind::Timeout,
            500..=599 => UpstreamErrorKind::Unavailable,
            _ => UpstreamErrorKind::MalformedResponse,
        };
        let snippet: String = body.chars().take(256).collect();
        Self::new(service, kind, format!("HTTP {status}: {snippet}"))
    }
}

/// Errors surfaced at the HTTP boundary.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    DeadlineExceeded(String),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::DeadlineExceeded(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Upstream(err) if err.kind == UpstreamErrorKind::Timeout => {
                StatusCode::GATEWAY_TIMEOUT
            }
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            ApiError::Internal(err) => {
                tracing::error!(error = ?err, "internal error while handling request");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(ErrorBody { error: message })
    }
}
