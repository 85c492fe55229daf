//! Common test infrastructure
//!
//! This module provides all the infrastructure needed for end-to-end tests.
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{MockBackend, TestClient, TestServer};
//!
//! #[tokio::test]
//! async fn test_ping() {
//!     let backend = MockBackend::spawn().await;
//!     let server = TestServer::spawn(&backend).await;
//!     let client = TestClient::new(server.base_url.clone());
//!
//!     let request = serde_json::json!({"jsonrpc": "2.0", "id": 1, "method": "ping"});
//!     let response = client.rpc(request).await;
//!     assert_eq!(response.status(), reqwest::StatusCode::OK);
//! }
//! ```

mod backend;
mod client;
mod constants;
mod server;

// Public API - this is what tests import
#[allow(unused_imports)]
pub use backend::{MockBackend, RecordedCall};
#[allow(unused_imports)]
pub use client::{read_events, TestClient};
#[allow(unused_imports)]
pub use constants::*;
pub use server::TestServer;
