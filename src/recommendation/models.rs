use crate::catalog::CatalogToken;
use crate::llm::RawProviderResponse;
use serde::{Deserialize, Serialize};

/// Input of one pipeline run.
#[derive(Debug, Clone)]
pub struct RecommendationRequest {
    pub user_id: usize,
    /// The user's catalog authorization, if they linked an account.
    pub auth_token: Option<CatalogToken>,
    /// Free-text mood or situation supplied by the user.
    pub mood_context: Option<String>,
}

/// A recommended track as declared by the LLM, optionally enriched with
/// catalog metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedRecommendationItem {
    pub track_name: String,
    pub artist_name: String,
    pub album_name: Option<String>,
    pub explanation: String,
    pub position: usize,
    pub spotify_id: Option<String>,
    pub preview_url: Option<String>,
    pub image_url: Option<String>,
}

impl ParsedRecommendationItem {
    pub fn is_enriched(&self) -> bool {
        self.spotify_id.is_some()
    }
}

/// Output of a successful pipeline run, handed to the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationResult {
    pub prompt_text: String,
    pub raw_provider_response: RawProviderResponse,
    /// Provider that produced the response.
    pub provider: String,
    pub context_description: Option<String>,
    /// Non-empty, in the order the LLM declared.
    pub tracks: Vec<ParsedRecommendationItem>,
}
