// Bouncer API - person lookup over face search, web search and LLM summaries
// Forwards requests to upstream services and reshapes their answers into one JSON contract

pub mod api;
pub mod config;
pub mod errors;
pub mod search;
pub mod telemetry;

pub use config::BouncerConfig;
pub use errors::{ApiError, ApiResult, UpstreamError, UpstreamErrorKind};
pub use search::SearchManager;
