//! HTTP client for the Spotify Web API.

use super::models::{
    AppTokenResponse, CatalogArtist, CatalogTrack, Paging, RecentPlay, SearchResponse, TrackDetail,
};
use super::{CatalogApi, CatalogError, CatalogToken};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// App tokens are refreshed this long before the server-reported expiry.
const APP_TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);
const DEFAULT_APP_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

const TOP_ITEMS_TIME_RANGE: &str = "medium_term";

#[derive(Debug, Clone)]
pub struct SpotifyClientSettings {
    pub api_url: String,
    pub token_url: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub timeout: Duration,
}

impl Default for SpotifyClientSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            client_id: None,
            client_secret: None,
            timeout: Duration::from_secs(30),
        }
    }
}

struct AppToken {
    access_token: String,
    refresh_at: Instant,
}

pub struct SpotifyCatalogClient {
    client: reqwest::Client,
    api_url: String,
    token_url: String,
    credentials: Option<(String, String)>,
    app_token: Mutex<Option<AppToken>>,
}

impl SpotifyCatalogClient {
    pub fn new(settings: SpotifyClientSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .context("Failed to create catalog HTTP client")?;

        let credentials = match (settings.client_id, settings.client_secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => Some((id, secret)),
            _ => None,
        };

        Ok(Self {
            client,
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            token_url: settings.token_url,
            credentials,
            app_token: Mutex::new(None),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        bearer: &str,
        query: &[(&str, String)],
    ) -> Result<T, CatalogError> {
        let url = format!("{}{}", self.api_url, path);
        debug!(url = %url, "Catalog request");

        let response = self
            .client
            .get(&url)
            .bearer_auth(bearer)
            .query(query)
            .send()
            .await
            .map_err(|e| CatalogError::UpstreamUnavailable(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(CatalogError::AuthExpired);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::UpstreamUnavailable(format!(
                "{} returned {}: {}",
                path, status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| CatalogError::InvalidResponse(format!("{}: {}", path, e)))
    }

    /// Returns a cached client-credentials token, requesting a new one when
    /// the cached token is missing or about to expire.
    async fn app_token(&self) -> Result<String, CatalogError> {
        let (client_id, client_secret) = self.credentials.as_ref().ok_or_else(|| {
            CatalogError::NotConfigured("client credentials are not set".to_string())
        })?;

        let mut cached = self.app_token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.access_token.clone());
            }
        }

        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(client_id, Some(client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| CatalogError::UpstreamUnavailable(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::BAD_REQUEST {
            warn!(status = %status, "Catalog rejected client credentials");
            return Err(CatalogError::AuthExpired);
        }
        if !status.is_success() {
            return Err(CatalogError::UpstreamUnavailable(format!(
                "token endpoint returned {}",
                status
            )));
        }

        let body: AppTokenResponse = response
            .json()
            .await
            .map_err(|e| CatalogError::InvalidResponse(format!("token response: {}", e)))?;

        let lifetime = body
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_APP_TOKEN_LIFETIME);
        let refresh_at = Instant::now() + lifetime.saturating_sub(APP_TOKEN_EXPIRY_MARGIN);

        *cached = Some(AppToken {
            access_token: body.access_token.clone(),
            refresh_at,
        });
        debug!(expires_in_secs = lifetime.as_secs(), "Obtained catalog app token");
        Ok(body.access_token)
    }

    async fn search_with_token(
        &self,
        bearer: &str,
        track_name: &str,
        artist_name: &str,
    ) -> Result<Option<TrackDetail>, CatalogError> {
        let query = [
            ("q", format!("track:{} artist:{}", track_name, artist_name)),
            ("type", "track".to_string()),
            ("limit", "1".to_string()),
        ];
        let response: SearchResponse = self.get_json("/search", bearer, &query).await?;
        Ok(response
            .tracks
            .and_then(|paging| paging.items.into_iter().next())
            .map(TrackDetail::from))
    }
}

#[async_trait]
impl CatalogApi for SpotifyCatalogClient {
    async fn fetch_recent_plays(
        &self,
        token: &CatalogToken,
        limit: usize,
    ) -> Result<Vec<RecentPlay>, CatalogError> {
        let paging: Paging<RecentPlay> = self
            .get_json(
                "/me/player/recently-played",
                &token.access_token,
                &[("limit", limit.to_string())],
            )
            .await?;
        Ok(paging.items)
    }

    async fn fetch_top_artists(
        &self,
        token: &CatalogToken,
        limit: usize,
    ) -> Result<Vec<CatalogArtist>, CatalogError> {
        let paging: Paging<CatalogArtist> = self
            .get_json(
                "/me/top/artists",
                &token.access_token,
                &[
                    ("limit", limit.to_string()),
                    ("time_range", TOP_ITEMS_TIME_RANGE.to_string()),
                ],
            )
            .await?;
        Ok(paging.items)
    }

    async fn fetch_top_tracks(
        &self,
        token: &CatalogToken,
        limit: usize,
    ) -> Result<Vec<CatalogTrack>, CatalogError> {
        let paging: Paging<CatalogTrack> = self
            .get_json(
                "/me/top/tracks",
                &token.access_token,
                &[
                    ("limit", limit.to_string()),
                    ("time_range", TOP_ITEMS_TIME_RANGE.to_string()),
                ],
            )
            .await?;
        Ok(paging.items)
    }

    async fn search_track(
        &self,
        track_name: &str,
        artist_name: &str,
    ) -> Result<Option<TrackDetail>, CatalogError> {
        let bearer = self.app_token().await?;
        match self.search_with_token(&bearer, track_name, artist_name).await {
            Err(CatalogError::AuthExpired) => {
                // The cached app token was revoked early; retry once with a fresh one.
                *self.app_token.lock().await = None;
                let bearer = self.app_token().await?;
                self.search_with_token(&bearer, track_name, artist_name)
                    .await
            }
            other => other,
        }
    }
}
