//! Shared constants for end-to-end tests
//!
//! When canned upstream data changes, update only this file.
#![allow(dead_code)]

// ============================================================================
// Users
// ============================================================================

pub const TEST_USER_ID: usize = 42;
pub const OTHER_USER_ID: usize = 43;

/// Catalog token the fake catalog accepts for history calls.
pub const USER_CATALOG_TOKEN: &str = "user-catalog-token";

/// Application token handed out by the fake catalog's token endpoint.
pub const APP_CATALOG_TOKEN: &str = "app-catalog-token";

// ============================================================================
// Canned catalog data
// ============================================================================

pub const RECENT_TRACK_NAME: &str = "Skinny Love";
pub const RECENT_ARTIST_NAME: &str = "Bon Iver";
pub const TOP_ARTIST_NAME: &str = "Sufjan Stevens";
pub const TOP_ARTIST_GENRE: &str = "chamber folk";
pub const TOP_TRACK_NAME: &str = "Chicago";

/// The only recommended track the fake catalog search knows about.
pub const KNOWN_TRACK_NAME: &str = "Holocene";
pub const KNOWN_TRACK_ID: &str = "trk-holocene";
pub const KNOWN_TRACK_PREVIEW: &str = "https://previews.test/holocene.mp3";
pub const KNOWN_TRACK_IMAGE: &str = "https://images.test/bon-iver.jpg";

// ============================================================================
// Canned LLM replies
// ============================================================================

pub const FIVE_RECOMMENDATIONS: &str = r#"Sure! Here are some picks:
```json
{
  "recommendations": [
    {"track_name": "Holocene", "artist_name": "Bon Iver", "album_name": "Bon Iver, Bon Iver", "explanation": "Wintry and calm"},
    {"track_name": "Mykonos", "artist_name": "Fleet Foxes", "album_name": "Sun Giant", "explanation": "Harmonies"},
    {"track_name": "Flightless Bird, American Mouth", "artist_name": "Iron & Wine", "explanation": "Gentle"},
    {"track_name": "Re: Stacks", "artist_name": "Bon Iver", "album_name": "For Emma, Forever Ago", "explanation": "Closure"},
    {"track_name": "The Funeral", "artist_name": "Band of Horses", "explanation": "Builds slowly"}
  ]
}
```
Enjoy!"#;

pub const UNPARSABLE_REPLY: &str = "I'm sorry, I can't recommend music right now.";

/// Message the fake LLM puts in its error bodies. Must never reach API clients.
pub const UPSTREAM_ERROR_MESSAGE: &str = "upstream exploded: quota key sk-test";

// ============================================================================
// Timeouts
// ============================================================================

/// Request timeout for test client in seconds
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum time to wait for server to be ready in milliseconds
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Interval between server readiness checks in milliseconds
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 20;
