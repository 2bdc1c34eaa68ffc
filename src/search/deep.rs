//! Deep search aggregation
//!
//! Runs face and text search side by side, keeps whatever succeeded, drops
//! repeated links (first occurrence wins), and summarizes every remaining page.
//!
//! Reported counts are the per-source tallies *before* deduplication, so
//! `total_results` can exceed the number of summaries when both sources found
//! the same page.

use std::collections::HashSet;

use bytes::Bytes;
use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use super::service_trait::{FaceSearch, PageSummarizer, TextSearch};
use super::{DeepSearchReport, SearchResult, Source, SourceFailure};
use crate::errors::UpstreamError;

/// Inputs for one deep search. At least one of `text` or `image` is set.
#[derive(Debug, Clone, Default)]
pub struct DeepSearchQuery {
    pub text: Option<String>,
    pub image: Option<Bytes>,
    pub text_limit: usize,
}

/// Outcome of one adapter inside the fan-out.
enum Branch {
    Skipped,
    Found(Vec<SearchResult>),
    Failed(UpstreamError),
}

async fn run_face(face: &dyn FaceSearch, image: Option<Bytes>) -> Branch {
    match image {
        None => Branch::Skipped,
        Some(image) => match face.search(image).await {
            Ok(results) => Branch::Found(results),
            Err(err) => Branch::Failed(err),
        },
    }
}

async fn run_text(text: &dyn TextSearch, query: Option<&str>, limit: usize) -> Branch {
    match query {
        None => Branch::Skipped,
        Some(query) => match text.search(query, limit).await {
            Ok(results) => Branch::Found(results),
            Err(err) => Branch::Failed(err),
        },
    }
}

/// Keep the first result for every link, preserving order.
pub fn dedup_by_link(results: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut seen: HashSet<String> = HashSet::new();
    results
        .into_iter()
        .filter(|r| seen.insert(r.link.clone()))
        .collect()
}

pub async fn deep_search(
    face: &dyn FaceSearch,
    text: &dyn TextSearch,
    summarizer: &dyn PageSummarizer,
    query: DeepSearchQuery,
    summary_concurrency: usize,
) -> DeepSearchReport {
    let (face_branch, text_branch) = tokio::join!(
        run_face(face, query.image),
        run_text(text, query.text.as_deref(), query.text_limit),
    );

    let mut merged: Vec<SearchResult> = Vec::new();
    let mut failures: Vec<SourceFailure> = Vec::new();
    let mut face_search_count = 0;
    let mut text_search_count = 0;

    for (source, branch) in [(Source::FaceSearch, face_branch), (Source::TextSearch, text_branch)] {
        match branch {
            Branch::Skipped => {}
            Branch::Found(results) => {
                info!(%source, count = results.len(), "deep search source returned results");
                match source {
                    Source::FaceSearch => face_search_count = results.len(),
                    _ => text_search_count = results.len(),
                }
                merged.extend(results.into_iter().map(|mut r| {
                    r.source = source;
                    r
                }));
            }
            Branch::Failed(err) => {
                warn!(%source, kind = ?err.kind, error = %err.message, "deep search source failed");
                failures.push(SourceFailure {
                    source,
                    kind: err.kind,
                    message: err.to_string(),
                });
            }
        }
    }

    let unique = dedup_by_link(merged);
    info!(unique = unique.len(), "summarizing unique links");

    let summaries = stream::iter(unique)
        .map(|result| summarizer.summarize_record(result))
        .buffered(summary_concurrency.max(1))
        .collect::<Vec<_>>()
        .await;

    DeepSearchReport {
        total_results: face_search_count + text_search_count,
        face_search_count,
        text_search_count,
        summaries,
        failures,
    }
}
