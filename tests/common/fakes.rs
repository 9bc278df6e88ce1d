//! Fake upstream services
//!
//! Small axum apps standing in for an OpenAI-compatible LLM endpoint and for
//! the music catalog, each bound to its own random port.
#![allow(dead_code)]

use super::constants::*;
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind fake service");
    let addr = listener.local_addr().expect("Failed to get local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    format!("http://{}", addr)
}

// ============================================================================
// LLM
// ============================================================================

#[derive(Clone, Debug)]
pub enum LlmBehavior {
    Reply { content: String, delay: Duration },
    Fail { status: u16 },
}

impl LlmBehavior {
    pub fn reply(content: &str) -> Self {
        LlmBehavior::Reply {
            content: content.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn slow_reply(content: &str, delay: Duration) -> Self {
        LlmBehavior::Reply {
            content: content.to_string(),
            delay,
        }
    }

    pub fn fail(status: u16) -> Self {
        LlmBehavior::Fail { status }
    }
}

#[derive(Clone)]
struct LlmState {
    behavior: LlmBehavior,
    requests: Arc<Mutex<Vec<Value>>>,
}

async fn chat_completions(State(state): State<LlmState>, Json(body): Json<Value>) -> Response {
    state.requests.lock().unwrap().push(body);
    match state.behavior {
        LlmBehavior::Reply { content, delay } => {
            tokio::time::sleep(delay).await;
            Json(json!({
                "id": "chatcmpl-test",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": content},
                    "finish_reason": "stop"
                }]
            }))
            .into_response()
        }
        LlmBehavior::Fail { status } => (
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Json(json!({"error": {"message": UPSTREAM_ERROR_MESSAGE}})),
        )
            .into_response(),
    }
}

/// OpenAI-compatible chat-completions endpoint with a fixed behavior.
pub struct FakeLlmServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<Value>>>,
}

impl FakeLlmServer {
    pub async fn spawn(behavior: LlmBehavior) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route("/chat/completions", post(chat_completions))
            .with_state(LlmState {
                behavior,
                requests: requests.clone(),
            });
        let base_url = serve(app).await;
        Self { base_url, requests }
    }

    pub fn api_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Request bodies received so far, oldest first.
    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }
}

// ============================================================================
// Catalog
// ============================================================================

#[derive(Clone, Default)]
struct CatalogState {
    history_calls: Arc<AtomicUsize>,
    searches: Arc<Mutex<Vec<String>>>,
}

fn simplified_artist(name: &str) -> Value {
    json!({"id": format!("art-{}", name.to_lowercase().replace(' ', "-")), "name": name})
}

fn track(id: &str, name: &str, artist: &str, preview: Option<&str>) -> Value {
    json!({
        "id": id,
        "name": name,
        "artists": [simplified_artist(artist)],
        "album": {
            "id": format!("alb-{}", id),
            "name": format!("{} (album)", name),
            "images": [{"url": KNOWN_TRACK_IMAGE, "height": 640, "width": 640}]
        },
        "preview_url": preview
    })
}

fn is_user_authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", USER_CATALOG_TOKEN))
        .unwrap_or(false)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": {"status": 401, "message": "The access token expired"}})),
    )
        .into_response()
}

async fn token() -> Json<Value> {
    Json(json!({
        "access_token": APP_CATALOG_TOKEN,
        "token_type": "Bearer",
        "expires_in": 3600
    }))
}

async fn recently_played(State(state): State<CatalogState>, headers: HeaderMap) -> Response {
    state.history_calls.fetch_add(1, Ordering::SeqCst);
    if !is_user_authorized(&headers) {
        return unauthorized();
    }
    Json(json!({
        "items": [{
            "track": track("trk-recent", RECENT_TRACK_NAME, RECENT_ARTIST_NAME, None),
            "played_at": "2026-10-01T20:15:00Z"
        }]
    }))
    .into_response()
}

async fn top_artists(State(state): State<CatalogState>, headers: HeaderMap) -> Response {
    state.history_calls.fetch_add(1, Ordering::SeqCst);
    if !is_user_authorized(&headers) {
        return unauthorized();
    }
    Json(json!({
        "items": [{
            "id": "art-sufjan",
            "name": TOP_ARTIST_NAME,
            "genres": [TOP_ARTIST_GENRE, "indie folk"],
            "images": [],
            "popularity": 71
        }]
    }))
    .into_response()
}

async fn top_tracks(State(state): State<CatalogState>, headers: HeaderMap) -> Response {
    state.history_calls.fetch_add(1, Ordering::SeqCst);
    if !is_user_authorized(&headers) {
        return unauthorized();
    }
    Json(json!({
        "items": [track("trk-chicago", TOP_TRACK_NAME, TOP_ARTIST_NAME, None)]
    }))
    .into_response()
}

async fn search(
    State(state): State<CatalogState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", APP_CATALOG_TOKEN))
        .unwrap_or(false);
    if !authorized {
        return unauthorized();
    }

    let q = query.get("q").cloned().unwrap_or_default();
    state.searches.lock().unwrap().push(q.clone());

    let items = if q.contains(&format!("track:{}", KNOWN_TRACK_NAME)) {
        vec![track(
            KNOWN_TRACK_ID,
            KNOWN_TRACK_NAME,
            "Bon Iver",
            Some(KNOWN_TRACK_PREVIEW),
        )]
    } else {
        vec![]
    };
    let total = items.len();
    Json(json!({"tracks": {"items": items, "total": total}})).into_response()
}

/// Catalog with one user's history and a search index holding a single track.
pub struct FakeCatalogServer {
    pub base_url: String,
    state: CatalogState,
}

impl FakeCatalogServer {
    pub async fn spawn() -> Self {
        let state = CatalogState::default();
        let app = Router::new()
            .route("/api/token", post(token))
            .route("/v1/me/player/recently-played", get(recently_played))
            .route("/v1/me/top/artists", get(top_artists))
            .route("/v1/me/top/tracks", get(top_tracks))
            .route("/v1/search", get(search))
            .with_state(state.clone());
        let base_url = serve(app).await;
        Self { base_url, state }
    }

    pub fn api_url(&self) -> String {
        format!("{}/v1", self.base_url)
    }

    pub fn token_url(&self) -> String {
        format!("{}/api/token", self.base_url)
    }

    pub fn history_calls(&self) -> usize {
        self.state.history_calls.load(Ordering::SeqCst)
    }

    /// Search queries received so far, oldest first.
    pub fn searches(&self) -> Vec<String> {
        self.state.searches.lock().unwrap().clone()
    }
}
