//! Per-user recommendation routes, nested under `/v1/users/{user_id}`.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use tracing::{debug, error, warn};

use super::metrics::record_error;
use super::state::*;
use crate::catalog::CatalogToken;
use crate::recommendation::{RecommendationError, RecommendationRequest};
use crate::store::FeedbackType;

const DEFAULT_LIST_LIMIT: usize = 20;
const MAX_LIST_LIMIT: usize = 100;

#[derive(Deserialize, Debug, Default)]
struct CreateRecommendationBody {
    #[serde(default)]
    context: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ListRecommendationsQuery {
    limit: Option<usize>,
    offset: Option<usize>,
}

#[derive(Deserialize, Debug)]
struct TrackFeedbackBody {
    #[serde(default)]
    feedback_type: FeedbackType,
    #[serde(default)]
    comment: Option<String>,
}

fn pipeline_failure_response(err: &RecommendationError) -> Response {
    record_error(err.kind(), "recommendations");
    match err {
        RecommendationError::PipelineTimeout(_) => (
            StatusCode::GATEWAY_TIMEOUT,
            "Recommendation took too long, please try again",
        )
            .into_response(),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Could not generate recommendations",
        )
            .into_response(),
    }
}

async fn post_recommendation(
    State(state): State<ServerState>,
    Path(user_id): Path<usize>,
    body: Bytes,
) -> Response {
    // The body is optional; an empty one means no mood context.
    let body: CreateRecommendationBody = if body.is_empty() {
        CreateRecommendationBody::default()
    } else {
        match serde_json::from_slice(&body) {
            Ok(parsed) => parsed,
            Err(err) => {
                return (StatusCode::BAD_REQUEST, format!("Invalid request body: {}", err))
                    .into_response()
            }
        }
    };

    // A broken token store only costs personalization.
    let auth_token = match state.token_store.get_catalog_token(user_id) {
        Ok(token) => token,
        Err(err) => {
            warn!(user_id, error = %err, "Could not read catalog token");
            None
        }
    };

    let request = RecommendationRequest {
        user_id,
        auth_token,
        mood_context: body.context,
    };

    let result = match state.pipeline.run(request).await {
        Ok(result) => result,
        Err(err) => return pipeline_failure_response(&err),
    };

    match state
        .recommendation_store
        .save_recommendation(user_id, &result)
    {
        Ok(stored) => Json(stored).into_response(),
        Err(err) => {
            error!(user_id, error = %err, "Failed to store recommendation");
            record_error("store", "recommendations");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn list_recommendations(
    State(store): State<GuardedRecommendationStore>,
    Path(user_id): Path<usize>,
    Query(query): Query<ListRecommendationsQuery>,
) -> Response {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);
    let offset = query.offset.unwrap_or(0);

    match store.list_recommendations(user_id, limit, offset) {
        Ok(summaries) => Json(summaries).into_response(),
        Err(err) => {
            error!(user_id, error = %err, "Failed to list recommendations");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn get_recommendation(
    State(store): State<GuardedRecommendationStore>,
    Path((user_id, id)): Path<(usize, String)>,
) -> Response {
    match store.get_recommendation(user_id, &id) {
        Ok(Some(stored)) => Json(stored).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!(user_id, id = %id, error = %err, "Failed to load recommendation");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn delete_recommendation(
    State(store): State<GuardedRecommendationStore>,
    Path((user_id, id)): Path<(usize, String)>,
) -> Response {
    match store.delete_recommendation(user_id, &id) {
        Ok(true) => {
            debug!(user_id, id = %id, "Deleted recommendation");
            StatusCode::NO_CONTENT.into_response()
        }
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!(user_id, id = %id, error = %err, "Failed to delete recommendation");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn put_track_feedback(
    State(store): State<GuardedRecommendationStore>,
    Path((user_id, id, position)): Path<(usize, String, usize)>,
    body: Bytes,
) -> Response {
    let body: TrackFeedbackBody = match serde_json::from_slice(&body) {
        Ok(parsed) => parsed,
        Err(err) => {
            return (StatusCode::BAD_REQUEST, format!("Invalid feedback: {}", err)).into_response()
        }
    };
    let comment = body
        .comment
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());

    match store.set_track_feedback(user_id, &id, position, body.feedback_type, comment) {
        Ok(Some(feedback)) => Json(feedback).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!(user_id, id = %id, position, error = %err, "Failed to store track feedback");
            record_error("store", "feedback");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn get_track_feedback(
    State(store): State<GuardedRecommendationStore>,
    Path((user_id, id, position)): Path<(usize, String, usize)>,
) -> Response {
    match store.get_track_feedback(user_id, &id, position) {
        Ok(Some(feedback)) => Json(feedback).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!(user_id, id = %id, position, error = %err, "Failed to load track feedback");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn list_track_feedback(
    State(store): State<GuardedRecommendationStore>,
    Path(user_id): Path<usize>,
) -> Response {
    match store.list_track_feedback(user_id) {
        Ok(feedback) => Json(feedback).into_response(),
        Err(err) => {
            error!(user_id, error = %err, "Failed to list track feedback");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn put_catalog_token(
    State(store): State<GuardedCatalogTokenStore>,
    Path(user_id): Path<usize>,
    Json(token): Json<CatalogToken>,
) -> Response {
    if token.access_token.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "access_token must not be empty").into_response();
    }
    match store.set_catalog_token(user_id, &token) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            error!(user_id, error = %err, "Failed to store catalog token");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub(super) fn make_user_routes(state: ServerState) -> Router {
    Router::new()
        .route(
            "/recommendations",
            get(list_recommendations).post(post_recommendation),
        )
        .route(
            "/recommendations/{id}",
            get(get_recommendation).delete(delete_recommendation),
        )
        .route(
            "/recommendations/{id}/tracks/{position}/feedback",
            get(get_track_feedback).put(put_track_feedback),
        )
        .route("/feedback", get(list_track_feedback))
        .route("/catalog-token", put(put_catalog_token))
        .with_state(state)
}
