//! In-process HTTP client that drives the router without a socket.

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use ragbot_core::kernel::ServerDeps;
use ragbot_core::server::build_app;
use serde_json::Value;
use tower::ServiceExt;

pub struct TestApp {
    router: Router,
    pub deps: ServerDeps,
}

impl TestApp {
    pub fn new(deps: ServerDeps) -> Self {
        Self {
            router: build_app(deps.clone()),
            deps,
        }
    }

    pub async fn get(&self, path: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    pub async fn post_json(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.post_raw(path, &body.to_string()).await
    }

    pub async fn post_raw(&self, path: &str, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
        };
        (status, value)
    }

    /// Poll the status endpoint until the owner's job stops running
    pub async fn wait_for_job(&self, user_id: &str) -> Value {
        for _ in 0..500 {
            let (_, status) = self.get(&format!("/api/scrape/status/{}", user_id)).await;
            if status["is_scraping"] == Value::Bool(false) {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("scrape job for {} did not finish", user_id);
    }
}
