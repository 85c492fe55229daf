//! Test server lifecycle management
//!
//! Each test gets an isolated server bound to a random port, wired to the
//! given mock backend.

use super::backend::MockBackend;
use super::constants::*;
use admin_mcp_server::config::AppConfig;
use admin_mcp_server::server::{make_app, ServerState};
use admin_mcp_server::RequestsLoggingLevel;
use std::time::Duration;
use tokio::net::TcpListener;

/// Test server instance
///
/// When dropped, the server gracefully shuts down.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// Shared state, for inspecting sessions directly
    pub state: ServerState,

    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a server with test defaults against `backend`
    pub async fn spawn(backend: &MockBackend) -> Self {
        Self::spawn_with(backend, |_| {}).await
    }

    /// Spawns a server after letting the caller adjust the configuration
    pub async fn spawn_with(backend: &MockBackend, configure: impl FnOnce(&mut AppConfig)) -> Self {
        let mut config = AppConfig {
            server_name: "test-admin-mcp".to_string(),
            backend_api_url: backend.base_url.clone(),
            api_timeout_sec: 5,
            logging_level: RequestsLoggingLevel::None,
            heartbeat_interval_sec: TEST_HEARTBEAT_SECS,
            ..Default::default()
        };
        configure(&mut config);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        config.port = port;

        let state = ServerState::new(config).expect("Failed to build server state");
        let app = make_app(state.clone());

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url: format!("http://127.0.0.1:{}", port),
            state,
            _shutdown_tx: Some(shutdown_tx),
        };
        server.wait_for_ready().await;
        server
    }

    pub fn mcp_url(&self) -> String {
        format!("{}/mcp", self.base_url)
    }

    /// Polls `/health` until it answers
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/health", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
