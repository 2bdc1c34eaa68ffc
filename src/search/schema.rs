// Search Schema - Normalized records shared by every adapter and endpoint
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Which adapter produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    FaceSearch,
    TextSearch,
    /// Only appears in caller-supplied bundles with an unrecognized source.
    #[default]
    #[serde(other)]
    Unknown,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::FaceSearch => "face_search",
            Source::TextSearch => "text_search",
            Source::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One search hit, normalized across face and text search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub link: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub snippet: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub source: Source,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>, // face matches only, 0..=100
}

// Caller-supplied bundles may carry explicit nulls for any field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A search hit plus the page summary produced during deep search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    #[serde(flatten)]
    pub result: SearchResult,
    #[serde(default)]
    pub summary: Option<String>, // null when the page could not be summarized
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_error: Option<String>,
}

impl SummaryRecord {
    pub fn summarized(result: SearchResult, summary: String) -> Self {
        Self {
            result,
            summary: Some(summary),
            summary_error: None,
        }
    }

    pub fn unsummarized(result: SearchResult, reason: String) -> Self {
        Self {
            result,
            summary: None,
            summary_error: Some(reason),
        }
    }
}

/// Adapter failure recorded in a deep search response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFailure {
    pub source: Source,
    pub kind: crate::errors::UpstreamErrorKind,
    pub message: String,
}

/// Deep search response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeepSearchReport {
    pub total_results: usize,     // face_search_count + text_search_count, before dedup
    pub face_search_count: usize,
    pub text_search_count: usize,
    pub summaries: Vec<SummaryRecord>,
    #[serde(default)]
    pub failures: Vec<SourceFailure>,
}

/// Credibility score in [0.00, 1.00].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct TrustScore(f64);

impl TrustScore {
    /// Parse a model reply. The whole trimmed reply must be one finite
    /// number inside [0, 1].
    pub fn parse(reply: &str) -> Result<Self, String> {
        let trimmed = reply.trim();
        let value: f64 = trimmed
            .parse()
            .map_err(|_| format!("expected a number between 0 and 1, got {trimmed:?}"))?;
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(format!("score {value} is outside [0, 1]"));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for TrustScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}
