#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

//! HTTP round trips through the router with an in-memory corpus

mod common;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use common::{EchoModel, FailingModel, MemoryIndex, StubEmbedder};
use guruji::config::TutorConfig;
use guruji::embeddings::ChunkingConfig;
use guruji::extractor::{Document, ExtractionReport};
use guruji::indexer::Ingestor;
use guruji::llm::ChatModel;
use guruji::server::{AppState, DEFAULT_SESSION, router};
use guruji::tutor::{Role, Tutor, VectorRetriever};

const OVERFITTING: &str = "Overfitting happens when a model memorizes training data.";

fn seeded_index() -> Arc<MemoryIndex> {
    let index = Arc::new(MemoryIndex::default());
    let report = ExtractionReport {
        documents: vec![Document {
            path: "notes.txt".into(),
            text: OVERFITTING.to_string(),
        }],
        skipped: Vec::new(),
    };
    Ingestor::new(&StubEmbedder, index.as_ref(), ChunkingConfig::default())
        .ingest(&report)
        .expect("seeding should succeed");
    index
}

fn app_state(model: Arc<dyn ChatModel>) -> AppState {
    let retriever = VectorRetriever::new(Arc::new(StubEmbedder), seeded_index());
    AppState::new(Tutor::new(
        Arc::new(retriever),
        model,
        &TutorConfig::default(),
    ))
}

fn ask(body: &str) -> Request<Body> {
    Request::post("/ask")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request should build")
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

#[tokio::test]
async fn question_answered_from_corpus() {
    let model = Arc::new(EchoModel::default());
    let state = app_state(Arc::clone(&model) as Arc<dyn ChatModel>);

    let response = router(state.clone())
        .oneshot(ask(r#"{"question":"What is overfitting?"}"#))
        .await
        .expect("request should complete");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await["answer"],
        "<p><strong>Echo:</strong> What is overfitting?</p>\n"
    );

    let prompts = model.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains(&format!("Context:\n{OVERFITTING}\n\nConversation:")));

    let history = state.tutor.history(DEFAULT_SESSION);
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, Role::Student);
    assert_eq!(history[1].content, "**Echo:** What is overfitting?");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_sessions_stay_isolated() {
    let state = app_state(Arc::new(EchoModel::default()));

    let alice = router(state.clone())
        .oneshot(ask(r#"{"question":"What is a tensor?","session_id":"alice"}"#));
    let bob = router(state.clone())
        .oneshot(ask(r#"{"question":"What is a gradient?","session_id":"bob"}"#));
    let (alice, bob) = tokio::join!(alice, bob);

    assert_eq!(alice.expect("alice request").status(), StatusCode::OK);
    assert_eq!(bob.expect("bob request").status(), StatusCode::OK);

    let alice_history = state.tutor.history("alice");
    let bob_history = state.tutor.history("bob");
    assert_eq!(alice_history.len(), 2);
    assert_eq!(bob_history.len(), 2);
    assert!(alice_history.iter().all(|m| !m.content.contains("gradient")));
    assert!(bob_history.iter().all(|m| !m.content.contains("tensor")));
}

#[tokio::test]
async fn follow_up_sees_earlier_turn() {
    let model = Arc::new(EchoModel::default());
    let state = app_state(Arc::clone(&model) as Arc<dyn ChatModel>);

    for question in ["What is overfitting?", "How do I prevent it?"] {
        let response = router(state.clone())
            .oneshot(ask(&format!(
                r#"{{"question":"{question}","session_id":"s1"}}"#
            )))
            .await
            .expect("request should complete");
        assert_eq!(response.status(), StatusCode::OK);
    }

    let prompts = model.prompts();
    assert!(prompts[1].contains(
        "student: What is overfitting?\nguruji: **Echo:** What is overfitting?\nstudent: How do I prevent it?"
    ));
    assert_eq!(state.tutor.history("s1").len(), 4);
}

#[tokio::test]
async fn model_failure_is_500() {
    let state = app_state(Arc::new(FailingModel));

    let response = router(state)
        .oneshot(ask(r#"{"question":"What is dropout?"}"#))
        .await
        .expect("request should complete");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    let message = body["error"].as_str().expect("error message");
    assert!(!message.contains("429"));
}
