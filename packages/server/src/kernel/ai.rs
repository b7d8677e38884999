// AI implementations backed by inference-client
//
// Infrastructure implementations of BaseAI and BaseEmbeddingService.
// Business logic (what to prompt for) lives in domain layers.

use anyhow::{Context, Result};
use async_trait::async_trait;
use inference_client::{ChatRequest, InferenceClient, Message};
use tracing::debug;

use super::{BaseAI, BaseEmbeddingService, CompletionOptions};

/// Chat completions against an OpenAI-compatible provider (Groq by default)
#[derive(Clone)]
pub struct CompletionClient {
    client: InferenceClient,
    model: String,
}

impl CompletionClient {
    pub fn new(client: InferenceClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl BaseAI for CompletionClient {
    async fn complete_with_system(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: CompletionOptions,
    ) -> Result<String> {
        let mut request = ChatRequest::new(&self.model)
            .temperature(options.temperature)
            .max_tokens(options.max_tokens);
        if !system_prompt.is_empty() {
            request = request.message(Message::system(system_prompt));
        }
        request = request.message(Message::user(user_prompt));

        let response = self
            .client
            .chat_completion(request)
            .await
            .context("Completion request failed")?;

        debug!(
            model = %self.model,
            finish_reason = ?response.finish_reason,
            "Completion received"
        );

        Ok(response.content)
    }
}

/// Embeddings against an OpenAI-compatible provider
#[derive(Clone)]
pub struct EmbeddingClient {
    client: InferenceClient,
    model: String,
}

impl EmbeddingClient {
    pub fn new(client: InferenceClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl BaseEmbeddingService for EmbeddingClient {
    async fn generate(&self, text: &str) -> Result<Vec<f32>> {
        self.client
            .create_embedding(text, &self.model)
            .await
            .context("Embedding request failed")
    }

    async fn generate_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let embeddings = self
            .client
            .create_embeddings(texts, &self.model)
            .await
            .context("Batch embedding request failed")?;

        if embeddings.len() != texts.len() {
            anyhow::bail!(
                "Embedding provider returned {} vectors for {} inputs",
                embeddings.len(),
                texts.len()
            );
        }

        Ok(embeddings)
    }
}
