//! HTTP client for end-to-end tests
//!
//! This module provides a high-level HTTP client that wraps reqwest
//! and provides methods for all sharetunes-server endpoints.
//!
//! When API routes or request formats change, update only this file.
#![allow(dead_code)]

use super::constants::*;
use reqwest::Response;
use serde_json::json;
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    fn user_url(&self, user_id: usize, path: &str) -> String {
        format!("{}/v1/users/{}{}", self.base_url, user_id, path)
    }

    // ========================================================================
    // Server
    // ========================================================================

    pub async fn get_stats(&self) -> Response {
        self.client
            .get(format!("{}/", self.base_url))
            .send()
            .await
            .expect("Stats request failed")
    }

    // ========================================================================
    // Recommendations
    // ========================================================================

    pub async fn create_recommendation(&self, user_id: usize, context: Option<&str>) -> Response {
        self.client
            .post(self.user_url(user_id, "/recommendations"))
            .json(&json!({ "context": context }))
            .send()
            .await
            .expect("Create recommendation request failed")
    }

    pub async fn list_recommendations(
        &self,
        user_id: usize,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Response {
        let mut query = Vec::new();
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(offset) = offset {
            query.push(("offset", offset.to_string()));
        }
        self.client
            .get(self.user_url(user_id, "/recommendations"))
            .query(&query)
            .send()
            .await
            .expect("List recommendations request failed")
    }

    pub async fn get_recommendation(&self, user_id: usize, id: &str) -> Response {
        self.client
            .get(self.user_url(user_id, &format!("/recommendations/{}", id)))
            .send()
            .await
            .expect("Get recommendation request failed")
    }

    pub async fn delete_recommendation(&self, user_id: usize, id: &str) -> Response {
        self.client
            .delete(self.user_url(user_id, &format!("/recommendations/{}", id)))
            .send()
            .await
            .expect("Delete recommendation request failed")
    }

    // ========================================================================
    // Track feedback
    // ========================================================================

    fn feedback_url(&self, user_id: usize, id: &str, position: usize) -> String {
        self.user_url(
            user_id,
            &format!("/recommendations/{}/tracks/{}/feedback", id, position),
        )
    }

    pub async fn put_track_feedback(
        &self,
        user_id: usize,
        id: &str,
        position: usize,
        feedback_type: &str,
        comment: Option<&str>,
    ) -> Response {
        self.client
            .put(self.feedback_url(user_id, id, position))
            .json(&json!({ "feedback_type": feedback_type, "comment": comment }))
            .send()
            .await
            .expect("Put track feedback request failed")
    }

    pub async fn get_track_feedback(&self, user_id: usize, id: &str, position: usize) -> Response {
        self.client
            .get(self.feedback_url(user_id, id, position))
            .send()
            .await
            .expect("Get track feedback request failed")
    }

    pub async fn list_track_feedback(&self, user_id: usize) -> Response {
        self.client
            .get(self.user_url(user_id, "/feedback"))
            .send()
            .await
            .expect("List track feedback request failed")
    }

    // ========================================================================
    // Catalog token
    // ========================================================================

    pub async fn put_catalog_token(
        &self,
        user_id: usize,
        access_token: &str,
        expires_at: Option<&str>,
    ) -> Response {
        self.client
            .put(self.user_url(user_id, "/catalog-token"))
            .json(&json!({ "access_token": access_token, "expires_at": expires_at }))
            .send()
            .await
            .expect("Put catalog token request failed")
    }
}
