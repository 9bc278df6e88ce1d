//! Attaches catalog identifiers and playback metadata to recommendations.

use super::models::ParsedRecommendationItem;
use crate::catalog::{CatalogApi, CatalogError, TrackDetail};
use crate::server::metrics;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct Enricher {
    catalog: Option<Arc<dyn CatalogApi>>,
}

impl Enricher {
    pub fn new(catalog: Option<Arc<dyn CatalogApi>>) -> Self {
        Self { catalog }
    }

    pub fn is_enabled(&self) -> bool {
        self.catalog.is_some()
    }

    /// Looks up every item in order, one at a time.
    ///
    /// Lookup failures only affect the item being looked up. An
    /// authorization failure or cancellation stops further lookups and the
    /// remaining items pass through unchanged. Positions are re-stamped to
    /// the iteration order, which is never changed.
    pub async fn enrich(
        &self,
        items: Vec<ParsedRecommendationItem>,
        cancel: &CancellationToken,
    ) -> Vec<ParsedRecommendationItem> {
        let Some(catalog) = &self.catalog else {
            return items;
        };

        let total = items.len();
        let mut enriched = 0usize;
        let mut stopped = false;
        let mut out = Vec::with_capacity(total);

        for (position, mut item) in items.into_iter().enumerate() {
            item.position = position;
            if stopped || cancel.is_cancelled() {
                out.push(item);
                continue;
            }

            let lookup = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = catalog.search_track(&item.track_name, &item.artist_name) => Some(result),
            };

            match lookup {
                None => {
                    debug!(position, "Enrichment cancelled");
                    stopped = true;
                }
                Some(Ok(Some(detail))) => {
                    apply_detail(&mut item, detail);
                    enriched += 1;
                    metrics::record_enrichment_lookup("matched");
                }
                Some(Ok(None)) => {
                    debug!(
                        track = %item.track_name,
                        artist = %item.artist_name,
                        "No catalog match for recommendation"
                    );
                    metrics::record_enrichment_lookup("not_found");
                }
                Some(Err(e @ (CatalogError::AuthExpired | CatalogError::NotConfigured(_)))) => {
                    warn!(error = %e, "Catalog lookups unavailable, skipping remaining enrichment");
                    metrics::record_enrichment_lookup(e.kind());
                    stopped = true;
                }
                Some(Err(e)) => {
                    warn!(
                        track = %item.track_name,
                        error = %e,
                        "Catalog lookup failed for recommendation"
                    );
                    metrics::record_enrichment_lookup(e.kind());
                }
            }
            out.push(item);
        }

        info!(enriched, total, "Enriched recommendations");
        out
    }
}

fn apply_detail(item: &mut ParsedRecommendationItem, detail: TrackDetail) {
    if !detail.id.is_empty() {
        item.spotify_id = Some(detail.id);
    }
    item.preview_url = detail.preview_url;
    if let Some(image) = detail.album_images.into_iter().find(|i| !i.url.is_empty()) {
        item.image_url = Some(image.url);
    }
    if item.album_name.is_none() && !detail.album_name.is_empty() {
        item.album_name = Some(detail.album_name);
    }
}
