//! Search action: corpus -> best match -> answer.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use super::answer::AnswerGenerator;
use super::matcher::{find_best_match, MatchError};
use crate::kernel::ServerDeps;

const PREVIEW_CHARS: usize = 50;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Question field is required")]
    EmptyQuestion,

    #[error("No scraped data found in the database to search against.")]
    NoDocuments,

    #[error(transparent)]
    Match(#[from] MatchError),

    #[error("An internal server error occurred: {0}")]
    Store(anyhow::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchAnswer {
    pub answer: String,
    pub question: String,
    pub matched_content_preview: String,
}

/// First 50 characters of the matched document, always followed by "..."
pub fn preview(content: &str) -> String {
    let head: String = content.chars().take(PREVIEW_CHARS).collect();
    format!("{}...", head)
}

/// Answer a question from the stored corpus.
pub async fn search(question: &str, deps: &ServerDeps) -> Result<SearchAnswer, SearchError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(SearchError::EmptyQuestion);
    }

    let documents = deps
        .entries
        .content_summaries()
        .await
        .map_err(SearchError::Store)?;
    if documents.is_empty() {
        return Err(SearchError::NoDocuments);
    }

    let best_match = find_best_match(question, &documents, deps.embeddings.as_deref()).await?;

    info!(
        corpus_size = documents.len(),
        matched_chars = best_match.chars().count(),
        "Search matched a document"
    );

    let answer = AnswerGenerator::new(deps.ai.as_deref())
        .generate(question, best_match)
        .await;

    Ok(SearchAnswer {
        answer,
        question: question.to_string(),
        matched_content_preview: preview(best_match),
    })
}
