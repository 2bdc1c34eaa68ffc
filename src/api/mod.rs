//! REST API endpoints
//!
//! Thin request boundary: validates inputs, reads uploads, and hands off
//! to the [`SearchManager`](crate::search::SearchManager).

pub mod routes;
pub mod upload;

pub use routes::{configure, AnalyzeRequest, ResultsResponse, SummariesData, TextSearchRequest};
