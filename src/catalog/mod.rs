//! Music catalog access.
//!
//! The pipeline reads a user's listening history through the user's own
//! authorization token and resolves recommended tracks through an
//! application-level token the client obtains itself.

mod models;
mod spotify;

pub use models::{
    CatalogAlbum, CatalogArtist, CatalogImage, CatalogTrack, RecentPlay, SimplifiedArtist,
    TrackDetail,
};
pub use spotify::{
    SpotifyCatalogClient, SpotifyClientSettings, DEFAULT_API_URL, DEFAULT_TOKEN_URL,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from the catalog API.
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    /// The authorization token was rejected. The caller must refresh it.
    #[error("Catalog authorization expired")]
    AuthExpired,
    #[error("Catalog unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("Invalid catalog response: {0}")]
    InvalidResponse(String),
    /// The catalog client has no credentials for the requested operation.
    #[error("Catalog not configured: {0}")]
    NotConfigured(String),
}

impl CatalogError {
    /// Short label used in metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            CatalogError::AuthExpired => "auth_expired",
            CatalogError::UpstreamUnavailable(_) => "unavailable",
            CatalogError::InvalidResponse(_) => "invalid_response",
            CatalogError::NotConfigured(_) => "not_configured",
        }
    }
}

/// A user's catalog authorization, supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogToken {
    pub access_token: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl CatalogToken {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at: None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }
}

/// Read access to the music catalog.
///
/// History calls take the user's token. `search_track` uses credentials the
/// implementation owns.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn fetch_recent_plays(
        &self,
        token: &CatalogToken,
        limit: usize,
    ) -> Result<Vec<RecentPlay>, CatalogError>;

    async fn fetch_top_artists(
        &self,
        token: &CatalogToken,
        limit: usize,
    ) -> Result<Vec<CatalogArtist>, CatalogError>;

    async fn fetch_top_tracks(
        &self,
        token: &CatalogToken,
        limit: usize,
    ) -> Result<Vec<CatalogTrack>, CatalogError>;

    /// Looks up the best match for a track name and artist name.
    async fn search_track(
        &self,
        track_name: &str,
        artist_name: &str,
    ) -> Result<Option<TrackDetail>, CatalogError>;
}
