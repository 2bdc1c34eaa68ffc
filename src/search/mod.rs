// Search Module - upstream adapters, normalization and deep search aggregation
pub mod content;
pub mod deep;
pub mod face;
pub mod http;
pub mod manager;
pub mod normalize;
pub mod schema;
pub mod service_trait;
pub mod summarizer;
pub mod trust;
pub mod web;

pub use manager::{SearchLimits, SearchManager};
pub use schema::*;
pub use service_trait::{FaceSearch, PageSummarizer, TextSearch, TrustScorer};

// Re-export all upstream adapters
pub use face::FaceCheckService;
pub use summarizer::GeminiSummarizer;
pub use trust::ClaudeTrustScorer;
pub use web::CustomSearchService;
