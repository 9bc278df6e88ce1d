//! Wire models of the music catalog Web API.
//!
//! Only the fields the recommendation pipeline reads are modelled. Fields the
//! API may send as `null` decode to their default value.

use serde::{Deserialize, Deserializer, Serialize};

fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogImage {
    #[serde(default, deserialize_with = "nullable")]
    pub url: String,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub width: Option<u32>,
}

/// Artist as embedded in a track object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimplifiedArtist {
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogAlbum {
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub images: Vec<CatalogImage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogTrack {
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub artists: Vec<SimplifiedArtist>,
    #[serde(default, deserialize_with = "nullable")]
    pub album: CatalogAlbum,
    #[serde(default)]
    pub preview_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogArtist {
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub genres: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub images: Vec<CatalogImage>,
    #[serde(default, deserialize_with = "nullable")]
    pub popularity: u32,
}

/// One entry of the recently-played history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentPlay {
    #[serde(default, deserialize_with = "nullable")]
    pub track: CatalogTrack,
    #[serde(default, deserialize_with = "nullable")]
    pub played_at: String,
}

/// Playback metadata resolved by a track search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackDetail {
    pub id: String,
    pub preview_url: Option<String>,
    pub album_images: Vec<CatalogImage>,
    pub album_name: String,
}

impl From<CatalogTrack> for TrackDetail {
    fn from(track: CatalogTrack) -> Self {
        TrackDetail {
            id: track.id,
            preview_url: track.preview_url.filter(|url| !url.is_empty()),
            album_images: track.album.images,
            album_name: track.album.name,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub(super) struct Paging<T> {
    #[serde(default, deserialize_with = "nullable")]
    pub items: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SearchResponse {
    pub tracks: Option<Paging<CatalogTrack>>,
}

#[derive(Debug, Deserialize)]
pub(super) struct AppTokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}
