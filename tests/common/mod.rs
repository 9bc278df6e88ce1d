//! Common test infrastructure
//!
//! This module provides all the infrastructure needed for end-to-end tests.
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{FakeLlmServer, LlmBehavior, TestClient, TestServer, FIVE_RECOMMENDATIONS};
//! use reqwest::StatusCode;
//!
//! #[tokio::test]
//! async fn test_recommend() {
//!     let llm = FakeLlmServer::spawn(LlmBehavior::reply(FIVE_RECOMMENDATIONS)).await;
//!     let server = TestServer::builder().provider(&llm).spawn().await;
//!     let client = TestClient::new(server.base_url.clone());
//!
//!     let response = client.create_recommendation(1, Some("sunny")).await;
//!     assert_eq!(response.status(), StatusCode::OK);
//! }
//! ```

mod client;
mod constants;
mod fakes;
mod server;

// Public API - this is what tests import
pub use client::TestClient;
pub use constants::*;
#[allow(unused_imports)]
pub use fakes::{FakeCatalogServer, FakeLlmServer, LlmBehavior};
pub use server::TestServer;
