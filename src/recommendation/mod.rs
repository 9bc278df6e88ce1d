//! The recommendation pipeline.
//!
//! A run fetches the user's listening history, renders a prompt, asks the
//! configured LLM providers for tracks, parses the answer and resolves each
//! track against the catalog:
//!
//! - `context`: bounded history summary
//! - `prompt`: prompt rendering
//! - `parser`: defensive extraction of the JSON answer
//! - `enricher`: per-track catalog lookups
//! - `pipeline`: sequencing under a wall-clock budget

pub mod context;
pub mod enricher;
mod models;
pub mod parser;
pub mod pipeline;
pub mod prompt;

pub use context::{summarize, ArtistRef, TrackRef, UserMusicContext};
pub use enricher::Enricher;
pub use models::{ParsedRecommendationItem, RecommendationRequest, RecommendationResult};
pub use parser::{parse_response, ParseError, ParseStrategy};
pub use pipeline::{RecommendationError, RecommendationPipeline};
pub use prompt::{build_prompt, SYSTEM_PROMPT};

#[cfg(test)]
pub(crate) mod tests {
    use crate::catalog::{
        CatalogAlbum, CatalogApi, CatalogArtist, CatalogError, CatalogImage, CatalogToken,
        CatalogTrack, RecentPlay, SimplifiedArtist, TrackDetail,
    };
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    pub(crate) fn catalog_track(name: &str, artist: &str) -> CatalogTrack {
        CatalogTrack {
            id: format!("id-{}", name),
            name: name.to_string(),
            artists: vec![SimplifiedArtist {
                id: format!("id-{}", artist),
                name: artist.to_string(),
            }],
            album: CatalogAlbum {
                id: "album".to_string(),
                name: "Album".to_string(),
                images: vec![],
            },
            preview_url: None,
        }
    }

    pub(crate) fn catalog_artist(name: &str) -> CatalogArtist {
        CatalogArtist {
            id: format!("id-{}", name),
            name: name.to_string(),
            genres: vec!["indie".to_string()],
            images: vec![],
            popularity: 50,
        }
    }

    pub(crate) fn track_detail(id: &str) -> TrackDetail {
        TrackDetail {
            id: id.to_string(),
            preview_url: Some(format!("http://preview/{}", id)),
            album_images: vec![CatalogImage {
                url: format!("http://img/{}", id),
                height: Some(300),
                width: Some(300),
            }],
            album_name: format!("Album {}", id),
        }
    }

    /// In-memory catalog. Search matches are keyed by track name.
    #[derive(Default)]
    pub(crate) struct FakeCatalog {
        recent: Vec<RecentPlay>,
        top_artists: Vec<CatalogArtist>,
        top_tracks: Vec<CatalogTrack>,
        history_error: Option<CatalogError>,
        matches: HashMap<String, TrackDetail>,
        search_errors: HashMap<String, CatalogError>,
        history_calls: AtomicUsize,
        searches: Mutex<Vec<(String, String)>>,
    }

    impl FakeCatalog {
        pub(crate) fn empty() -> Self {
            Self::default()
        }

        pub(crate) fn with_history() -> Self {
            Self {
                recent: vec![RecentPlay {
                    track: catalog_track("Recent Song", "Recent Band"),
                    played_at: "2025-04-01T10:00:00Z".to_string(),
                }],
                top_artists: vec![catalog_artist("Top Artist")],
                top_tracks: vec![catalog_track("Top Song", "Top Band")],
                ..Self::default()
            }
        }

        pub(crate) fn failing_history(error: CatalogError) -> Self {
            Self {
                history_error: Some(error),
                ..Self::default()
            }
        }

        pub(crate) fn with_match(mut self, track_name: &str, detail: TrackDetail) -> Self {
            self.matches.insert(track_name.to_string(), detail);
            self
        }

        pub(crate) fn with_search_error(mut self, track_name: &str, error: CatalogError) -> Self {
            self.search_errors.insert(track_name.to_string(), error);
            self
        }

        pub(crate) fn history_calls(&self) -> usize {
            self.history_calls.load(Ordering::SeqCst)
        }

        pub(crate) fn searches(&self) -> Vec<(String, String)> {
            self.searches.lock().unwrap().clone()
        }

        fn history<T: Clone>(&self, items: &[T]) -> Result<Vec<T>, CatalogError> {
            self.history_calls.fetch_add(1, Ordering::SeqCst);
            match &self.history_error {
                Some(e) => Err(e.clone()),
                None => Ok(items.to_vec()),
            }
        }
    }

    #[async_trait]
    impl CatalogApi for FakeCatalog {
        async fn fetch_recent_plays(
            &self,
            _token: &CatalogToken,
            limit: usize,
        ) -> Result<Vec<RecentPlay>, CatalogError> {
            let mut items = self.history(&self.recent)?;
            items.truncate(limit);
            Ok(items)
        }

        async fn fetch_top_artists(
            &self,
            _token: &CatalogToken,
            limit: usize,
        ) -> Result<Vec<CatalogArtist>, CatalogError> {
            let mut items = self.history(&self.top_artists)?;
            items.truncate(limit);
            Ok(items)
        }

        async fn fetch_top_tracks(
            &self,
            _token: &CatalogToken,
            limit: usize,
        ) -> Result<Vec<CatalogTrack>, CatalogError> {
            let mut items = self.history(&self.top_tracks)?;
            items.truncate(limit);
            Ok(items)
        }

        async fn search_track(
            &self,
            track_name: &str,
            artist_name: &str,
        ) -> Result<Option<TrackDetail>, CatalogError> {
            self.searches
                .lock()
                .unwrap()
                .push((track_name.to_string(), artist_name.to_string()));
            if let Some(e) = self.search_errors.get(track_name) {
                return Err(e.clone());
            }
            Ok(self.matches.get(track_name).cloned())
        }
    }
}
