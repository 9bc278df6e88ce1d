use axum::extract::FromRef;

use crate::recommendation::RecommendationPipeline;
use crate::store::{CatalogTokenStore, RecommendationStore};
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedPipeline = Arc<RecommendationPipeline>;
pub type GuardedRecommendationStore = Arc<dyn RecommendationStore>;
pub type GuardedCatalogTokenStore = Arc<dyn CatalogTokenStore>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub pipeline: GuardedPipeline,
    pub recommendation_store: GuardedRecommendationStore,
    pub token_store: GuardedCatalogTokenStore,
    pub hash: String,
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

impl FromRef<ServerState> for GuardedPipeline {
    fn from_ref(input: &ServerState) -> Self {
        input.pipeline.clone()
    }
}

impl FromRef<ServerState> for GuardedRecommendationStore {
    fn from_ref(input: &ServerState) -> Self {
        input.recommendation_store.clone()
    }
}

impl FromRef<ServerState> for GuardedCatalogTokenStore {
    fn from_ref(input: &ServerState) -> Self {
        input.token_store.clone()
    }
}
