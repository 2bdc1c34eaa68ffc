//! HTTP handlers for the search, deep search and analysis endpoints

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::upload::{read_form, unsupported_type_message, IMAGE_FIELD};
use crate::errors::{ApiError, ApiResult};
use crate::search::{SearchManager, SearchResult, SummaryRecord};

/// JSON bodies carry at most a deep search bundle.
const JSON_LIMIT_BYTES: usize = 4 * 1024 * 1024;

/// Text search request
#[derive(Debug, Deserialize)]
pub struct TextSearchRequest {
    pub text: Option<String>,
    pub num_results: Option<usize>,
}

/// Face and text search response
#[derive(Debug, Serialize, Deserialize)]
pub struct ResultsResponse {
    pub results: Vec<SearchResult>,
}

/// Trust analysis request
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub prompt: Option<String>,
    pub summaries_data: Option<SummariesData>,
}

/// A deep search response echoed back by the client
#[derive(Debug, Deserialize)]
pub struct SummariesData {
    pub summaries: Option<Vec<SummaryRecord>>,
}

async fn home() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "message": "Welcome to the Bouncer API"
    }))
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy"
    }))
}

async fn text_search(
    manager: web::Data<SearchManager>,
    body: web::Json<TextSearchRequest>,
) -> ApiResult<HttpResponse> {
    let req = body.into_inner();
    let text = req
        .text
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::validation("Request JSON must include 'text'"))?;

    let results = manager.text_search(&text, req.num_results).await?;
    info!(returned = results.len(), "text search request served");
    Ok(HttpResponse::Ok().json(ResultsResponse { results }))
}

async fn face_search(
    manager: web::Data<SearchManager>,
    payload: Multipart,
) -> ApiResult<HttpResponse> {
    let form = read_form(payload, manager.limits().max_upload_bytes).await?;
    let image = form.image.ok_or_else(|| {
        ApiError::validation(format!(
            "Request must include an image file with key '{IMAGE_FIELD}'"
        ))
    })?;
    if !image.has_filename() {
        return Err(ApiError::validation("No image file selected"));
    }
    if !image.has_supported_extension() {
        return Err(ApiError::validation(unsupported_type_message()));
    }
    if image.data.is_empty() {
        return Err(ApiError::validation("Uploaded image is empty"));
    }

    let results = manager.face_search(image.data).await?;
    info!(returned = results.len(), "face search request served");
    Ok(HttpResponse::Ok().json(ResultsResponse { results }))
}

async fn deep_search(
    manager: web::Data<SearchManager>,
    payload: Multipart,
) -> ApiResult<HttpResponse> {
    let form = read_form(payload, manager.limits().max_upload_bytes).await?;

    let image = match form.image.as_ref() {
        Some(upload) if upload.has_filename() => {
            if !upload.has_supported_extension() {
                return Err(ApiError::validation(unsupported_type_message()));
            }
            Some(upload.data.clone())
        }
        _ => None,
    };

    let requested = form
        .field("num_text_results")
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| {
            v.parse::<usize>().map_err(|_| {
                ApiError::validation("'num_text_results' must be a non-negative integer")
            })
        })
        .transpose()?;

    let report = manager
        .deep_search(form.field("text").map(str::to_string), image, requested)
        .await?;

    info!(
        total = report.total_results,
        face = report.face_search_count,
        text = report.text_search_count,
        summaries = report.summaries.len(),
        failures = report.failures.len(),
        "deep search request served"
    );
    Ok(HttpResponse::Ok().json(report))
}

async fn analyze_summaries(
    manager: web::Data<SearchManager>,
    body: web::Json<AnalyzeRequest>,
) -> ApiResult<HttpResponse> {
    let req = body.into_inner();
    let prompt = req
        .prompt
        .ok_or_else(|| ApiError::validation("Request JSON must include 'prompt' field"))?;
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(ApiError::validation("Prompt cannot be empty"));
    }

    let summaries = req
        .summaries_data
        .ok_or_else(|| ApiError::validation("Request JSON must include 'summaries_data' field"))?
        .summaries
        .ok_or_else(|| {
            ApiError::validation("summaries_data must be a valid deep search result object")
        })?;

    let score = manager.analyze(prompt, &summaries).await?;
    Ok(HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body(score.to_string()))
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_LIMIT_BYTES)
        .error_handler(|err, _req| ApiError::validation(format!("Invalid JSON body: {err}")).into())
}

/// Register every endpoint. The caller provides `web::Data<SearchManager>`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .route("/", web::get().to(home))
        .route("/health", web::get().to(health))
        .route("/rs", web::post().to(text_search))
        .route("/face-search", web::post().to(face_search))
        .route("/deep-search", web::post().to(deep_search))
        .route("/analyze-summaries", web::post().to(analyze_summaries));
}
