//! Search endpoint over a seeded in-memory corpus.

mod common;

use axum::http::StatusCode;
use ragbot_core::domains::search::answer::{MISSING_PROVIDER_REPLY, SYSTEM_PROMPT};
use ragbot_core::kernel::test_dependencies::{
    InMemoryScrapedEntryStore, MockAI, MockEmbeddingService,
};
use ragbot_core::kernel::TestDependencies;
use serde_json::json;

use common::TestApp;

fn corpus() -> InMemoryScrapedEntryStore {
    InMemoryScrapedEntryStore::new()
        .with_entry("https://a.dev/cats", "cats are mammals that purr and sleep a lot")
        .with_entry(
            "https://a.dev/rust",
            "rust is a language for building reliable and efficient software",
        )
        .with_entry("https://a.dev/paris", "paris is a city on the seine")
}

fn topical_embeddings() -> MockEmbeddingService {
    MockEmbeddingService::new()
        .with_pattern_embedding("language", vec![1.0, 0.0, 0.0])
        .with_pattern_embedding("cats", vec![0.0, 1.0, 0.0])
        .with_pattern_embedding("paris", vec![0.0, 0.0, 1.0])
}

#[tokio::test]
async fn search_answers_from_best_matching_document() {
    let test_deps = TestDependencies::new()
        .mock_store(corpus())
        .mock_embeddings(topical_embeddings())
        .mock_ai(MockAI::new().with_response(" Rust builds reliable software. "));
    let app = TestApp::new(test_deps.clone().into_server_deps());

    let (status, body) = app
        .post_json(
            "/api/search",
            json!({ "question": "Which language should I learn?" }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"], "Rust builds reliable software.");
    assert_eq!(body["question"], "Which language should I learn?");
    assert_eq!(
        body["matched_content_preview"],
        "rust is a language for building reliable and effic..."
    );

    let ai = test_deps.ai.unwrap();
    assert_eq!(ai.call_count(), 1);
    assert_eq!(ai.calls()[0].system_prompt, SYSTEM_PROMPT);
    assert!(ai.was_called_with("rust is a language for building reliable and efficient software"));
}

#[tokio::test]
async fn search_without_completion_provider_still_answers() {
    let test_deps = TestDependencies::new()
        .mock_store(corpus())
        .mock_embeddings(topical_embeddings())
        .without_ai();
    let app = TestApp::new(test_deps.into_server_deps());

    let (status, body) = app
        .post_json("/api/search", json!({ "question": "tell me about cats" }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"], MISSING_PROVIDER_REPLY);
    assert_eq!(
        body["matched_content_preview"],
        "cats are mammals that purr and sleep a lot..."
    );
}

#[tokio::test]
async fn search_provider_error_is_folded_into_answer() {
    let test_deps = TestDependencies::new()
        .mock_store(corpus())
        .mock_embeddings(topical_embeddings())
        .mock_ai(MockAI::new().with_error("rate limit exceeded"));
    let app = TestApp::new(test_deps.into_server_deps());

    let (status, body) = app
        .post_json("/api/search", json!({ "question": "paris" }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["answer"],
        "Sorry, an API error occurred during generation: rate limit exceeded"
    );
}

#[tokio::test]
async fn search_with_empty_corpus_is_unavailable() {
    let test_deps = TestDependencies::new().mock_embeddings(topical_embeddings());
    let app = TestApp::new(test_deps.clone().into_server_deps());

    let (status, body) = app
        .post_json("/api/search", json!({ "question": "anything" }))
        .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        body["error"],
        "No scraped data found in the database to search against."
    );
    assert!(test_deps.embeddings.unwrap().calls().is_empty());
}

#[tokio::test]
async fn search_without_embedding_backend_is_server_error() {
    let test_deps = TestDependencies::new()
        .mock_store(corpus())
        .without_embeddings();
    let app = TestApp::new(test_deps.clone().into_server_deps());

    let (status, body) = app
        .post_json("/api/search", json!({ "question": "anything" }))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body["error"],
        "Embedding model failed to load. Cannot perform vector search."
    );
    assert_eq!(test_deps.ai.unwrap().call_count(), 0);
}

#[tokio::test]
async fn search_store_failure_is_server_error() {
    let test_deps = TestDependencies::new()
        .mock_store(InMemoryScrapedEntryStore::new().failing())
        .mock_embeddings(topical_embeddings());
    let app = TestApp::new(test_deps.into_server_deps());

    let (status, body) = app
        .post_json("/api/search", json!({ "question": "anything" }))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("An internal server error occurred:"));
}

#[tokio::test]
async fn search_rejects_missing_or_blank_question() {
    let app = TestApp::new(
        TestDependencies::new()
            .mock_store(corpus())
            .into_server_deps(),
    );

    for body in [json!({}), json!({ "question": "   " })] {
        let (status, response) = app.post_json("/api/search", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["error"], "Question field is required");
    }
}

#[tokio::test]
async fn search_rejects_malformed_json() {
    let app = TestApp::new(TestDependencies::new().into_server_deps());

    let (status, body) = app.post_raw("/api/search", "question=cats").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid JSON format");
}
