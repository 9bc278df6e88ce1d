//! Bounded summary of a user's listening history.

use crate::catalog::{
    CatalogApi, CatalogArtist, CatalogError, CatalogImage, CatalogToken, CatalogTrack, RecentPlay,
    SimplifiedArtist,
};
use chrono::Utc;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// The catalog returns up to this many recent plays; only the newest
/// `MAX_RECENT_TRACKS` are kept.
pub const RECENT_PLAYS_FETCH_LIMIT: usize = 20;
pub const TOP_ITEMS_FETCH_LIMIT: usize = 10;

pub const MAX_RECENT_TRACKS: usize = 10;
pub const MAX_TOP_ARTISTS: usize = 10;
pub const MAX_TOP_TRACKS: usize = 10;
pub const MAX_GENRES_PER_ARTIST: usize = 3;
pub const MAX_IMAGES: usize = 1;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AlbumRef {
    pub id: String,
    pub name: String,
    pub images: Vec<CatalogImage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrackRef {
    pub id: String,
    pub name: String,
    pub artists: Vec<SimplifiedArtist>,
    pub album: AlbumRef,
}

impl TrackRef {
    pub fn artist_names(&self) -> String {
        self.artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl From<&CatalogTrack> for TrackRef {
    fn from(track: &CatalogTrack) -> Self {
        TrackRef {
            id: track.id.clone(),
            name: track.name.clone(),
            artists: track.artists.clone(),
            album: AlbumRef {
                id: track.album.id.clone(),
                name: track.album.name.clone(),
                images: track.album.images.iter().take(MAX_IMAGES).cloned().collect(),
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArtistRef {
    pub id: String,
    pub name: String,
    pub genres: Vec<String>,
    pub images: Vec<CatalogImage>,
    pub popularity: u32,
}

impl From<&CatalogArtist> for ArtistRef {
    fn from(artist: &CatalogArtist) -> Self {
        ArtistRef {
            id: artist.id.clone(),
            name: artist.name.clone(),
            genres: artist
                .genres
                .iter()
                .take(MAX_GENRES_PER_ARTIST)
                .cloned()
                .collect(),
            images: artist.images.iter().take(MAX_IMAGES).cloned().collect(),
            popularity: artist.popularity,
        }
    }
}

/// Listening history small enough to embed in a prompt. Built once per
/// request and never grown afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserMusicContext {
    pub recent_tracks: Vec<TrackRef>,
    pub top_artists: Vec<ArtistRef>,
    pub top_tracks: Vec<TrackRef>,
}

impl UserMusicContext {
    pub fn is_empty(&self) -> bool {
        self.recent_tracks.is_empty() && self.top_artists.is_empty() && self.top_tracks.is_empty()
    }
}

/// Reduces raw catalog data to a bounded context. Never fails.
pub fn summarize(
    recent: &[RecentPlay],
    top_artists: &[CatalogArtist],
    top_tracks: &[CatalogTrack],
) -> UserMusicContext {
    UserMusicContext {
        recent_tracks: recent
            .iter()
            .take(MAX_RECENT_TRACKS)
            .map(|play| TrackRef::from(&play.track))
            .collect(),
        top_artists: top_artists
            .iter()
            .take(MAX_TOP_ARTISTS)
            .map(ArtistRef::from)
            .collect(),
        top_tracks: top_tracks
            .iter()
            .take(MAX_TOP_TRACKS)
            .map(TrackRef::from)
            .collect(),
    }
}

/// Fetches and summarizes the user's history.
///
/// Returns `None` when personalization is not possible: no catalog client,
/// no usable token, any catalog failure, cancellation, or an empty history.
pub async fn fetch_context(
    catalog: Option<&dyn CatalogApi>,
    token: Option<&CatalogToken>,
    cancel: &CancellationToken,
) -> Option<UserMusicContext> {
    let catalog = catalog?;
    let Some(token) = token.filter(|t| !t.is_expired(Utc::now())) else {
        info!("No valid catalog token, skipping personalization");
        return None;
    };

    let history = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            debug!("Context fetch cancelled");
            return None;
        }
        history = fetch_history(catalog, token) => history,
    };

    match history {
        Ok((recent, artists, tracks)) => {
            let context = summarize(&recent, &artists, &tracks);
            if context.is_empty() {
                info!("Catalog history is empty, skipping personalization");
                return None;
            }
            debug!(
                recent = context.recent_tracks.len(),
                artists = context.top_artists.len(),
                tracks = context.top_tracks.len(),
                "Built user music context"
            );
            Some(context)
        }
        Err(CatalogError::AuthExpired) => {
            info!("Catalog token expired, skipping personalization");
            None
        }
        Err(e) => {
            warn!(error = %e, kind = e.kind(), "Failed to fetch listening history");
            None
        }
    }
}

async fn fetch_history(
    catalog: &dyn CatalogApi,
    token: &CatalogToken,
) -> Result<(Vec<RecentPlay>, Vec<CatalogArtist>, Vec<CatalogTrack>), CatalogError> {
    let recent = catalog
        .fetch_recent_plays(token, RECENT_PLAYS_FETCH_LIMIT)
        .await?;
    let artists = catalog
        .fetch_top_artists(token, TOP_ITEMS_FETCH_LIMIT)
        .await?;
    let tracks = catalog
        .fetch_top_tracks(token, TOP_ITEMS_FETCH_LIMIT)
        .await?;
    Ok((recent, artists, tracks))
}
