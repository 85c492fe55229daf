//! Mock backend REST API
//!
//! A tiny axum server that records every request and answers with a canned
//! status and body per `(method, path)`, or `200 {"ok": true}` otherwise.

use axum::{
    body::Bytes,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::IntoResponse,
    Router,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub body: Option<serde_json::Value>,
}

type CannedResponses = Arc<Mutex<HashMap<(Method, String), (StatusCode, String)>>>;

pub struct MockBackend {
    pub base_url: String,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    canned: CannedResponses,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl MockBackend {
    pub async fn spawn() -> Self {
        let calls: Arc<Mutex<Vec<RecordedCall>>> = Arc::new(Mutex::new(Vec::new()));
        let canned: CannedResponses = Arc::new(Mutex::new(HashMap::new()));

        let sink = calls.clone();
        let answers = canned.clone();
        let app = Router::new().fallback(
            move |method: Method, uri: Uri, headers: HeaderMap, body: Bytes| {
                let sink = sink.clone();
                let answers = answers.clone();
                async move {
                    let path = uri.path().to_string();
                    sink.lock().unwrap().push(RecordedCall {
                        method: method.clone(),
                        path: path.clone(),
                        query: uri.query().map(str::to_string),
                        authorization: headers
                            .get("authorization")
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string),
                        body: serde_json::from_slice(&body).ok(),
                    });

                    let (status, body) = answers
                        .lock()
                        .unwrap()
                        .get(&(method, path))
                        .cloned()
                        .unwrap_or((StatusCode::OK, r#"{"ok":true}"#.to_string()));
                    (
                        status,
                        [("content-type", "application/json")],
                        body,
                    )
                        .into_response()
                }
            },
        );

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock backend");
        let port = listener.local_addr().expect("No local address").port();
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Mock backend failed");
        });

        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            calls,
            canned,
            _shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Answers `method path` with `status` and `body` from now on.
    pub fn respond(&self, method: Method, path: &str, status: StatusCode, body: &str) {
        self.canned
            .lock()
            .unwrap()
            .insert((method, path.to_string()), (status, body.to_string()));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_call(&self) -> RecordedCall {
        self.calls()
            .last()
            .cloned()
            .expect("Mock backend received no calls")
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
