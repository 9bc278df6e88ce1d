//! Persistence of finished recommendations and of users' catalog tokens.

mod models;
mod schema;
mod sqlite_store;

pub use models::{FeedbackType, RecommendationSummary, StoredRecommendation, TrackFeedback};
pub use schema::RECOMMENDATION_VERSIONED_SCHEMAS;
pub use sqlite_store::SqliteRecommendationStore;

use crate::catalog::CatalogToken;
use crate::recommendation::RecommendationResult;
use anyhow::Result;

pub trait RecommendationStore: Send + Sync {
    /// Stores a recommendation and its tracks in one transaction.
    fn save_recommendation(
        &self,
        user_id: usize,
        result: &RecommendationResult,
    ) -> Result<StoredRecommendation>;
    fn get_recommendation(&self, user_id: usize, id: &str) -> Result<Option<StoredRecommendation>>;
    /// Newest first.
    fn list_recommendations(
        &self,
        user_id: usize,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<RecommendationSummary>>;
    /// Returns false when the recommendation does not exist for this user.
    fn delete_recommendation(&self, user_id: usize, id: &str) -> Result<bool>;

    /// Creates or replaces the user's feedback on one track of a recommendation.
    /// Returns None when the user has no such recommendation or position.
    fn set_track_feedback(
        &self,
        user_id: usize,
        recommendation_id: &str,
        position: usize,
        feedback_type: FeedbackType,
        comment: Option<&str>,
    ) -> Result<Option<TrackFeedback>>;
    fn get_track_feedback(
        &self,
        user_id: usize,
        recommendation_id: &str,
        position: usize,
    ) -> Result<Option<TrackFeedback>>;
    /// Most recently updated first.
    fn list_track_feedback(&self, user_id: usize) -> Result<Vec<TrackFeedback>>;
}

pub trait CatalogTokenStore: Send + Sync {
    fn get_catalog_token(&self, user_id: usize) -> Result<Option<CatalogToken>>;
    fn set_catalog_token(&self, user_id: usize, token: &CatalogToken) -> Result<()>;
}
