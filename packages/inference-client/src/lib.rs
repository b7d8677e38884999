//! Client for OpenAI-compatible inference APIs
//!
//! Covers the two calls the chatbot needs: chat completions (Groq by default)
//! and embeddings (OpenAI by default). Any provider exposing the same REST
//! shape works by passing its base URL to [`InferenceClient::new`].
//!
//! # Example
//!
//! ```rust,ignore
//! use inference_client::{ChatRequest, InferenceClient, Message, GROQ_BASE_URL};
//!
//! let client = InferenceClient::new(api_key, GROQ_BASE_URL);
//!
//! let response = client.chat_completion(
//!     ChatRequest::new("llama-3.1-8b-instant")
//!         .message(Message::user("Hello!"))
//!         .max_tokens(100),
//! ).await?;
//!
//! let vectors = client
//!     .create_embeddings(&["a".into(), "b".into()], "text-embedding-3-small")
//!     .await?;
//! ```

pub mod error;
pub mod types;

pub use error::{InferenceError, Result};
pub use types::*;

use std::time::Duration;

use reqwest::{header, Client};
use serde::Serialize;
use tracing::{debug, warn};

pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// HTTP client for an OpenAI-compatible provider.
#[derive(Clone)]
pub struct InferenceClient {
    http_client: Client,
    api_key: String,
    base_url: String,
}

impl InferenceClient {
    /// Create a client against `base_url` with the given API key.
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let http_client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            http_client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response> {
        let response = self
            .http_client
            .post(format!("{}/{}", self.base_url, path))
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(header::CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, path = path, "Inference request failed");
                InferenceError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %message, path = path, "Inference API error");
            return Err(InferenceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    /// Chat completion. Returns the first choice.
    pub async fn chat_completion(&self, request: ChatRequest) -> Result<ChatResponse> {
        let start = std::time::Instant::now();

        let raw: types::ChatResponseRaw = self
            .post_json("chat/completions", &request)
            .await?
            .json()
            .await
            .map_err(|e| InferenceError::Parse(e.to_string()))?;

        let choice = raw
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| InferenceError::EmptyResponse("no choices returned".into()))?;

        debug!(
            model = %request.model,
            duration_ms = start.elapsed().as_millis(),
            finish_reason = ?choice.finish_reason,
            "Chat completion"
        );

        Ok(ChatResponse {
            content: choice.message.content.unwrap_or_default(),
            finish_reason: choice.finish_reason,
            usage: raw.usage,
        })
    }

    /// Embed a batch of texts in a single request. Output order matches `texts`.
    pub async fn create_embeddings(&self, texts: &[String], model: &str) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = types::EmbeddingRequest { model, input: texts };
        let response: types::EmbeddingResponse = self
            .post_json("embeddings", &request)
            .await?
            .json()
            .await
            .map_err(|e| InferenceError::Parse(e.to_string()))?;

        let vectors = response.into_ordered();
        if vectors.len() != texts.len() {
            return Err(InferenceError::EmptyResponse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                vectors.len()
            )));
        }

        debug!(model = model, count = vectors.len(), "Created embeddings");
        Ok(vectors)
    }

    /// Embed a single text.
    pub async fn create_embedding(&self, text: &str, model: &str) -> Result<Vec<f32>> {
        self.create_embeddings(&[text.to_string()], model)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| InferenceError::EmptyResponse("no embedding returned".into()))
    }
}
