//! ShareTunes Server Library
//!
//! Music recommendations generated by LLM providers, personalized from the
//! user's catalog listening history and enriched with catalog metadata.

pub mod catalog;
pub mod config;
pub mod llm;
pub mod recommendation;
pub mod server;
pub mod sqlite_persistence;
pub mod store;

// Re-export commonly used types for convenience
pub use catalog::{CatalogApi, CatalogToken, SpotifyCatalogClient};
pub use config::AppConfig;
pub use recommendation::{RecommendationPipeline, RecommendationRequest, RecommendationResult};
pub use server::{make_app, run_server, RequestsLoggingLevel, ServerConfig, ServerState};
pub use store::{CatalogTokenStore, RecommendationStore, SqliteRecommendationStore};
