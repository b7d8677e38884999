//! Answer generation over a matched document.
//!
//! Never fails: a missing provider or a provider error becomes a
//! human-readable reply so the search endpoint can still respond with 200.

use tracing::{info, warn};

use crate::kernel::{BaseAI, CompletionOptions};

pub const SYSTEM_PROMPT: &str = "You are a concise blog summarizer. Respond only to the user's prompt based on the provided text, keeping the reply under 50 words.";

pub const MISSING_PROVIDER_REPLY: &str =
    "API Key Missing: Cannot generate reply without GROQ_API_KEY.";

/// Sampling settings for answers (roughly 50 words)
pub const ANSWER_OPTIONS: CompletionOptions = CompletionOptions {
    temperature: 0.7,
    max_tokens: 100,
};

/// User prompt combining the question with the matched content
pub fn build_prompt(question: &str, matched_document: &str) -> String {
    format!(
        "User Question: \"{question}\" \n\n Based on the following relevant content, write a helpful and short reply (under 50 words): \n\n Content: \"{matched_document}\""
    )
}

pub struct AnswerGenerator<'a> {
    ai: Option<&'a dyn BaseAI>,
}

impl<'a> AnswerGenerator<'a> {
    pub fn new(ai: Option<&'a dyn BaseAI>) -> Self {
        Self { ai }
    }

    pub async fn generate(&self, question: &str, matched_document: &str) -> String {
        let Some(ai) = self.ai else {
            warn!("Answer requested without a completion provider");
            return MISSING_PROVIDER_REPLY.to_string();
        };

        let prompt = build_prompt(question, matched_document);
        match ai
            .complete_with_system(SYSTEM_PROMPT, &prompt, ANSWER_OPTIONS)
            .await
        {
            Ok(reply) => {
                let reply = reply.trim().to_string();
                info!(reply_chars = reply.chars().count(), "Answer generated");
                reply
            }
            Err(e) => {
                warn!(error = %e, "Completion provider error");
                format!("Sorry, an API error occurred during generation: {}", e)
            }
        }
    }
}
