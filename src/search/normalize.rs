//! Result normalization
//!
//! Maps the raw payloads of each upstream service onto [`SearchResult`].
//! Missing optional fields become empty strings so clients always see the
//! same schema.

use serde::Deserialize;

use super::schema::{SearchResult, Source};

/// A face match as returned by the face-similarity service.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FaceMatch {
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub url: Option<String>,
}

/// A web hit as returned by the search engine.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebItem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
}

/// Heterogeneous upstream payloads accepted by [`normalize`].
#[derive(Debug, Clone)]
pub enum RawHit {
    Face(FaceMatch),
    Web(WebItem),
}

/// Convert one raw upstream hit into the common schema.
pub fn normalize(raw: RawHit, source: Source) -> SearchResult {
    match raw {
        RawHit::Face(hit) => {
            let score = clamp_similarity(hit.score.unwrap_or(0.0));
            SearchResult {
                title: format!("Face Match (Score: {score}%)"),
                link: hit.url.unwrap_or_default(),
                snippet: format!("Face similarity score: {score}% - Found on webpage"),
                source,
                similarity: Some(score),
            }
        }
        RawHit::Web(item) => SearchResult {
            title: item.title.unwrap_or_default(),
            link: item.link.unwrap_or_default(),
            snippet: item.snippet.unwrap_or_default(),
            source,
            similarity: None,
        },
    }
}

fn clamp_similarity(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 100.0)
    }
}
