//! Endpoint tests
//!
//! Drive the actix routes end to end with stub adapters standing in for the
//! upstream services.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use async_trait::async_trait;
use bouncer_api::api::{self, ResultsResponse};
use bouncer_api::errors::{UpstreamError, UpstreamErrorKind};
use bouncer_api::search::{
    DeepSearchReport, FaceSearch, PageSummarizer, SearchLimits, SearchManager, SearchResult,
    Source, SummaryRecord, TextSearch, TrustScore, TrustScorer,
};
use bytes::Bytes;
use serde_json::{json, Value};

// ────────────────────────────────────────────────────────────────────────────
// Stub adapters
// ────────────────────────────────────────────────────────────────────────────

fn face_hit(link: &str, score: f64) -> SearchResult {
    SearchResult {
        title: format!("Face Match (Score: {score}%)"),
        link: link.to_string(),
        snippet: format!("Face similarity score: {score}% - Found on webpage"),
        source: Source::FaceSearch,
        similarity: Some(score),
    }
}

fn text_hit(link: &str) -> SearchResult {
    SearchResult {
        title: format!("Page {link}"),
        link: link.to_string(),
        snippet: "snippet".to_string(),
        source: Source::TextSearch,
        similarity: None,
    }
}

struct StubFace {
    outcome: Result<Vec<SearchResult>, UpstreamError>,
}

#[async_trait]
impl FaceSearch for StubFace {
    fn id(&self) -> &'static str {
        "stub_face"
    }

    async fn search(&self, _image: Bytes) -> Result<Vec<SearchResult>, UpstreamError> {
        self.outcome.clone()
    }
}

struct StubText {
    outcome: Result<Vec<SearchResult>, UpstreamError>,
    delay: Duration,
}

#[async_trait]
impl TextSearch for StubText {
    fn id(&self) -> &'static str {
        "stub_text"
    }

    async fn search(&self, _query: &str, limit: usize) -> Result<Vec<SearchResult>, UpstreamError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.outcome
            .clone()
            .map(|results| results.into_iter().take(limit).collect())
    }
}

struct StubSummarizer {
    failing: HashSet<String>,
}

#[async_trait]
impl PageSummarizer for StubSummarizer {
    fn id(&self) -> &'static str {
        "stub_summarizer"
    }

    async fn summarize(&self, url: &str) -> Result<String, UpstreamError> {
        if self.failing.contains(url) {
            return Err(UpstreamError::from_status("stub_summarizer", 404, "not found"));
        }
        Ok(format!("Summary of {url}"))
    }
}

struct StubScorer {
    reply: &'static str,
}

#[async_trait]
impl TrustScorer for StubScorer {
    fn id(&self) -> &'static str {
        "stub_scorer"
    }

    async fn score(
        &self,
        _prompt: &str,
        _records: &[SummaryRecord],
    ) -> Result<TrustScore, UpstreamError> {
        TrustScore::parse(self.reply).map_err(|e| UpstreamError::malformed("stub_scorer", e))
    }
}

struct Stubs {
    face: Result<Vec<SearchResult>, UpstreamError>,
    text: Result<Vec<SearchResult>, UpstreamError>,
    text_delay: Duration,
    failing_pages: Vec<&'static str>,
    score_reply: &'static str,
    limits: SearchLimits,
}

impl Default for Stubs {
    fn default() -> Self {
        Self {
            face: Ok(vec![
                face_hit("https://a.example", 91.0),
                face_hit("https://b.example", 77.0),
            ]),
            text: Ok(vec![
                text_hit("https://b.example"),
                text_hit("https://c.example"),
                text_hit("https://d.example"),
            ]),
            text_delay: Duration::ZERO,
            failing_pages: Vec::new(),
            score_reply: "0.73",
            limits: SearchLimits::default(),
        }
    }
}

impl Stubs {
    fn manager(self) -> SearchManager {
        SearchManager::with_services(
            Arc::new(StubFace { outcome: self.face }),
            Arc::new(StubText {
                outcome: self.text,
                delay: self.text_delay,
            }),
            Arc::new(StubSummarizer {
                failing: self.failing_pages.iter().map(|s| s.to_string()).collect(),
            }),
            Arc::new(StubScorer {
                reply: self.score_reply,
            }),
            self.limits,
        )
    }
}

macro_rules! app {
    ($stubs:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($stubs.manager()))
                .configure(api::configure),
        )
        .await
    };
}

// ────────────────────────────────────────────────────────────────────────────
// Multipart helpers
// ────────────────────────────────────────────────────────────────────────────

const BOUNDARY: &str = "bouncer-test-boundary";

fn multipart_body(fields: &[(&str, &str)], image: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, data)) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn multipart_request(uri: &str, fields: &[(&str, &str)], image: Option<(&str, &[u8])>) -> test::TestRequest {
    test::TestRequest::post()
        .uri(uri)
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        ))
        .set_payload(multipart_body(fields, image))
}

fn many_text_hits(n: usize) -> Vec<SearchResult> {
    (0..n).map(|i| text_hit(&format!("https://site{i}.example"))).collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Basic routes
// ────────────────────────────────────────────────────────────────────────────

#[actix_web::test]
async fn health_reports_healthy() {
    let app = app!(Stubs::default());
    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({"status": "healthy"}));
}

#[actix_web::test]
async fn home_returns_welcome_message() {
    let app = app!(Stubs::default());
    let req = test::TestRequest::get().uri("/").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["message"], "Welcome to the Bouncer API");
}

// ────────────────────────────────────────────────────────────────────────────
// /rs
// ────────────────────────────────────────────────────────────────────────────

#[actix_web::test]
async fn text_search_returns_results() {
    let app = app!(Stubs::default());
    let req = test::TestRequest::post()
        .uri("/rs")
        .set_json(json!({"text": "jane@example.com"}))
        .to_request();
    let body: ResultsResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.results.len(), 3);
    assert_eq!(body.results[0].link, "https://b.example");
    assert!(body.results.iter().all(|r| r.source == Source::TextSearch));
}

#[actix_web::test]
async fn text_search_caps_at_twenty() {
    let app = app!(Stubs {
        text: Ok(many_text_hits(30)),
        ..Stubs::default()
    });
    let req = test::TestRequest::post()
        .uri("/rs")
        .set_json(json!({"text": "jane", "num_results": 50}))
        .to_request();
    let body: ResultsResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.results.len(), 20);
}

#[actix_web::test]
async fn text_search_defaults_to_ten() {
    let app = app!(Stubs {
        text: Ok(many_text_hits(30)),
        ..Stubs::default()
    });
    let req = test::TestRequest::post()
        .uri("/rs")
        .set_json(json!({"text": "jane"}))
        .to_request();
    let body: ResultsResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.results.len(), 10);
}

#[actix_web::test]
async fn repeated_text_search_is_identical() {
    let app = app!(Stubs {
        text: Ok(many_text_hits(12)),
        ..Stubs::default()
    });
    let mut responses = Vec::new();
    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri("/rs")
            .set_json(json!({"text": "jane", "num_results": 12}))
            .to_request();
        let body: ResultsResponse = test::call_and_read_body_json(&app, req).await;
        responses.push(body.results);
    }
    assert_eq!(responses[0], responses[1]);
    assert_eq!(responses[0][0].link, "https://site0.example");
}

#[actix_web::test]
async fn text_search_requires_text() {
    let app = app!(Stubs::default());
    let req = test::TestRequest::post()
        .uri("/rs")
        .set_json(json!({"query": "jane"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Request JSON must include 'text'");
}

#[actix_web::test]
async fn text_search_rejects_invalid_json() {
    let app = app!(Stubs::default());
    let req = test::TestRequest::post()
        .uri("/rs")
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn text_search_upstream_failure_is_bad_gateway() {
    let app = app!(Stubs {
        text: Err(UpstreamError::new(
            "stub_text",
            UpstreamErrorKind::RateLimit,
            "quota exceeded"
        )),
        ..Stubs::default()
    });
    let req = test::TestRequest::post()
        .uri("/rs")
        .set_json(json!({"text": "jane"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().contains("rate limited"));
}

// ────────────────────────────────────────────────────────────────────────────
// /face-search
// ────────────────────────────────────────────────────────────────────────────

#[actix_web::test]
async fn face_search_returns_scored_matches() {
    let app = app!(Stubs::default());
    let req = multipart_request("/face-search", &[], Some(("me.jpg", &b"\xff\xd8\xff\xe0fake"[..]))).to_request();
    let body: ResultsResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.results.len(), 2);
    for result in &body.results {
        let score = result.similarity.unwrap();
        assert!((0.0..=100.0).contains(&score));
        assert!(result.title.starts_with("Face Match (Score: "));
    }
}

#[actix_web::test]
async fn face_search_requires_image_field() {
    let app = app!(Stubs::default());
    let req = multipart_request("/face-search", &[("text", "jane")], None).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body["error"],
        "Request must include an image file with key 'image'"
    );
}

#[actix_web::test]
async fn face_search_rejects_unsupported_type() {
    let app = app!(Stubs::default());
    let req = multipart_request("/face-search", &[], Some(("me.tiff", &b"data"[..]))).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn face_search_rejects_oversized_upload() {
    let app = app!(Stubs {
        limits: SearchLimits {
            max_upload_bytes: 16,
            ..SearchLimits::default()
        },
        ..Stubs::default()
    });
    let req = multipart_request("/face-search", &[], Some(("me.png", &[7u8; 64][..]))).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[actix_web::test]
async fn face_search_timeout_is_gateway_timeout() {
    let app = app!(Stubs {
        face: Err(UpstreamError::new(
            "stub_face",
            UpstreamErrorKind::Timeout,
            "queue too slow"
        )),
        ..Stubs::default()
    });
    let req = multipart_request("/face-search", &[], Some(("me.png", &b"img"[..]))).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
}

// ────────────────────────────────────────────────────────────────────────────
// /deep-search
// ────────────────────────────────────────────────────────────────────────────

#[actix_web::test]
async fn deep_search_counts_before_dedup() {
    let app = app!(Stubs::default());
    let req = multipart_request("/deep-search", &[("text", "jane doe")], Some(("me.jpg", &b"img"[..]))).to_request();
    let report: DeepSearchReport = test::call_and_read_body_json(&app, req).await;

    assert_eq!(report.face_search_count, 2);
    assert_eq!(report.text_search_count, 3);
    assert_eq!(report.total_results, 5);
    // https://b.example was found by both sources
    assert_eq!(report.summaries.len(), 4);
    assert!(report.summaries.len() < report.total_results);
    assert!(report.failures.is_empty());

    let links: Vec<_> = report.summaries.iter().map(|s| s.result.link.as_str()).collect();
    assert_eq!(
        links,
        vec![
            "https://a.example",
            "https://b.example",
            "https://c.example",
            "https://d.example"
        ]
    );
    assert_eq!(report.summaries[1].result.source, Source::FaceSearch);
    assert_eq!(
        report.summaries[2].summary.as_deref(),
        Some("Summary of https://c.example")
    );
}

#[actix_web::test]
async fn deep_search_without_duplicates_summarizes_everything() {
    let app = app!(Stubs {
        face: Ok(vec![face_hit("https://x.example", 80.0)]),
        ..Stubs::default()
    });
    let req = multipart_request("/deep-search", &[("text", "jane doe")], Some(("me.jpg", &b"img"[..]))).to_request();
    let report: DeepSearchReport = test::call_and_read_body_json(&app, req).await;
    assert_eq!(report.total_results, 4);
    assert_eq!(report.summaries.len(), report.total_results);
}

#[actix_web::test]
async fn deep_search_survives_face_timeout() {
    let app = app!(Stubs {
        face: Err(UpstreamError::new(
            "stub_face",
            UpstreamErrorKind::Timeout,
            "poll exceeded"
        )),
        ..Stubs::default()
    });
    let req = multipart_request("/deep-search", &[("text", "jane doe")], Some(("me.jpg", &b"img"[..]))).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let report: DeepSearchReport = test::read_body_json(resp).await;
    assert_eq!(report.face_search_count, 0);
    assert_eq!(report.text_search_count, 3);
    assert_eq!(report.total_results, 3);
    assert_eq!(report.summaries.len(), 3);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].source, Source::FaceSearch);
    assert_eq!(report.failures[0].kind, UpstreamErrorKind::Timeout);
}

#[actix_web::test]
async fn deep_search_text_only_skips_face() {
    let app = app!(Stubs {
        face: Err(UpstreamError::new("stub_face", UpstreamErrorKind::Unavailable, "down")),
        ..Stubs::default()
    });
    let req = multipart_request("/deep-search", &[("text", "jane doe")], None).to_request();
    let report: DeepSearchReport = test::call_and_read_body_json(&app, req).await;
    assert_eq!(report.face_search_count, 0);
    assert_eq!(report.text_search_count, 3);
    assert!(report.failures.is_empty());
}

#[actix_web::test]
async fn deep_search_keeps_pages_that_fail_to_summarize() {
    let app = app!(Stubs {
        failing_pages: vec!["https://c.example"],
        ..Stubs::default()
    });
    let req = multipart_request("/deep-search", &[("text", "jane doe")], None).to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    let summaries = body["summaries"].as_array().unwrap();
    assert_eq!(summaries.len(), 3);
    assert_eq!(summaries[1]["link"], "https://c.example");
    assert!(summaries[1]["summary"].is_null());
    assert!(summaries[1]["summary_error"].as_str().unwrap().contains("404"));
    assert_eq!(summaries[0]["summary"], "Summary of https://b.example");
}

#[actix_web::test]
async fn deep_search_caps_text_results() {
    let app = app!(Stubs {
        text: Ok(many_text_hits(30)),
        ..Stubs::default()
    });
    let req = multipart_request(
        "/deep-search",
        &[("text", "jane"), ("num_text_results", "40")],
        None,
    )
    .to_request();
    let report: DeepSearchReport = test::call_and_read_body_json(&app, req).await;
    assert_eq!(report.text_search_count, 20);
}

#[actix_web::test]
async fn deep_search_requires_text_or_image() {
    let app = app!(Stubs::default());
    let req = multipart_request("/deep-search", &[("text", "   ")], None).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body["error"],
        "Must provide either 'text' query or 'image' file (or both)"
    );
}

#[actix_web::test]
async fn deep_search_rejects_bad_result_count() {
    let app = app!(Stubs::default());
    let req = multipart_request(
        "/deep-search",
        &[("text", "jane"), ("num_text_results", "many")],
        None,
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn deep_search_with_no_results_is_empty_report() {
    let app = app!(Stubs {
        text: Ok(Vec::new()),
        ..Stubs::default()
    });
    let req = multipart_request("/deep-search", &[("text", "nobody")], None).to_request();
    let report: DeepSearchReport = test::call_and_read_body_json(&app, req).await;
    assert_eq!(report.total_results, 0);
    assert!(report.summaries.is_empty());
}

#[actix_web::test]
async fn deep_search_with_both_sources_failing_is_empty_report() {
    let app = app!(Stubs {
        face: Err(UpstreamError::new("stub_face", UpstreamErrorKind::Unavailable, "down")),
        text: Err(UpstreamError::new("stub_text", UpstreamErrorKind::RateLimit, "quota")),
        ..Stubs::default()
    });
    let req = multipart_request("/deep-search", &[("text", "jane doe")], Some(("me.png", &b"img"[..]))).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let report: DeepSearchReport = test::read_body_json(resp).await;
    assert_eq!(report.total_results, 0);
    assert_eq!(report.face_search_count, 0);
    assert_eq!(report.text_search_count, 0);
    assert!(report.summaries.is_empty());
    assert_eq!(report.failures.len(), 2);
    let sources: HashSet<_> = report.failures.iter().map(|f| f.source).collect();
    assert!(sources.contains(&Source::FaceSearch));
    assert!(sources.contains(&Source::TextSearch));
}

#[actix_web::test]
async fn deep_search_deadline_is_gateway_timeout() {
    let app = app!(Stubs {
        text_delay: Duration::from_millis(500),
        limits: SearchLimits {
            deep_search_timeout: Duration::from_millis(50),
            ..SearchLimits::default()
        },
        ..Stubs::default()
    });
    let req = multipart_request("/deep-search", &[("text", "jane")], None).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
}

// ────────────────────────────────────────────────────────────────────────────
// /analyze-summaries
// ────────────────────────────────────────────────────────────────────────────

fn analysis_body() -> Value {
    json!({
        "prompt": "Would you rent an apartment to this person?",
        "summaries_data": {
            "total_results": 1,
            "face_search_count": 0,
            "text_search_count": 1,
            "summaries": [{
                "title": "Jane Doe",
                "link": "https://b.example",
                "snippet": "snippet",
                "source": "text_search",
                "summary": "Jane volunteers at a shelter."
            }]
        }
    })
}

#[actix_web::test]
async fn analyze_returns_plain_text_score() {
    let app = app!(Stubs::default());
    let req = test::TestRequest::post()
        .uri("/analyze-summaries")
        .set_json(analysis_body())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let content_type = resp.headers().get(header::CONTENT_TYPE).unwrap().to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));

    let body = test::read_body(resp).await;
    let text = std::str::from_utf8(&body).unwrap();
    assert_eq!(text, "0.73");
    let value: f64 = text.parse().unwrap();
    assert!((0.0..=1.0).contains(&value));
}

#[actix_web::test]
async fn analyze_accepts_null_fields_in_records() {
    let app = app!(Stubs::default());
    let mut body = analysis_body();
    body["summaries_data"]["summaries"][0]["title"] = Value::Null;
    body["summaries_data"]["summaries"][0]["snippet"] = Value::Null;
    let req = test::TestRequest::post()
        .uri("/analyze-summaries")
        .set_json(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(test::read_body(resp).await, "0.73");
}

#[actix_web::test]
async fn analyze_malformed_reply_is_server_error() {
    let app = app!(Stubs {
        score_reply: "This person seems trustworthy.",
        ..Stubs::default()
    });
    let req = test::TestRequest::post()
        .uri("/analyze-summaries")
        .set_json(analysis_body())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_server_error());
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().contains("malformed response"));
}

#[actix_web::test]
async fn analyze_requires_prompt() {
    let app = app!(Stubs::default());
    let mut body = analysis_body();
    body["prompt"] = json!("   ");
    let req = test::TestRequest::post()
        .uri("/analyze-summaries")
        .set_json(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Prompt cannot be empty");
}

#[actix_web::test]
async fn analyze_requires_summaries() {
    let app = app!(Stubs::default());
    let req = test::TestRequest::post()
        .uri("/analyze-summaries")
        .set_json(json!({"prompt": "trust?", "summaries_data": {"total_results": 0}}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/analyze-summaries")
        .set_json(json!({"prompt": "trust?"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
