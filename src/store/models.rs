use crate::recommendation::ParsedRecommendationItem;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredRecommendation {
    pub id: String,
    pub user_id: usize,
    pub prompt_text: String,
    /// The provider response as it was received, normalized to the common envelope.
    pub llm_response: serde_json::Value,
    pub provider: String,
    pub context_description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub tracks: Vec<ParsedRecommendationItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationSummary {
    pub id: String,
    pub provider: String,
    pub context_description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub track_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackType {
    Like,
    Dislike,
    #[default]
    Neutral,
}

impl FeedbackType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackType::Like => "like",
            FeedbackType::Dislike => "dislike",
            FeedbackType::Neutral => "neutral",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "like" => Some(FeedbackType::Like),
            "dislike" => Some(FeedbackType::Dislike),
            "neutral" => Some(FeedbackType::Neutral),
            _ => None,
        }
    }
}

/// A user's reaction to one recommended track, addressed by the
/// recommendation id and the track's position in it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackFeedback {
    pub recommendation_id: String,
    pub position: usize,
    pub track_name: String,
    pub artist_name: String,
    pub feedback_type: FeedbackType,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
