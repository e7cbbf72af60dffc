//! HTTP surface tests
//!
//! The router is exercised in-process with `tower::ServiceExt::oneshot`; the
//! pipeline behind it uses stub collaborators.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use concierge_engine::fetch::{DataSource, DesignSource};
use concierge_engine::intent::Classifier;
use concierge_engine::memory::ConversationMemory;
use concierge_engine::orchestrator::Orchestrator;
use concierge_engine::server::router;
use sdk::types::{DesignResult, FetchResult, IntentLabel, IntentVerdict};

struct KeywordClassifier;

#[async_trait]
impl Classifier for KeywordClassifier {
    async fn classify(&self, text: &str) -> IntentVerdict {
        let labels: Vec<String> = IntentLabel::ALL
            .iter()
            .filter(|label| text.contains(label.as_str()))
            .map(|label| label.as_str().to_string())
            .collect();
        if labels.is_empty() {
            IntentVerdict::conversational("How can I help?", 0.0)
        } else {
            IntentVerdict::from_labels(labels, 1.0)
        }
    }
}

struct EchoData;

#[async_trait]
impl DataSource for EchoData {
    async fn fetch(&self, intent: &str) -> FetchResult {
        FetchResult::success(intent, json!({"intent": intent}))
    }

    fn query_for(&self, intent: &str) -> Option<&'static str> {
        intent.parse::<IntentLabel>().ok().map(|label| label.query())
    }
}

struct EchoDesign;

#[async_trait]
impl DesignSource for EchoDesign {
    async fn fetch_design(&self, intent: &str, content_type: &str, message: &str) -> DesignResult {
        DesignResult::success(intent, content_type, json!({"message": message}))
    }
}

fn app() -> (axum::Router, Arc<Orchestrator>) {
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(KeywordClassifier),
        Arc::new(EchoData),
        Arc::new(EchoDesign),
        Arc::new(ConversationMemory::new(5)),
    ));
    (router(Arc::clone(&orchestrator)), orchestrator)
}

async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health() {
    let (app, _) = app();
    let (status, body) = send(app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_root_lists_version() {
    let (app, _) = app();
    let (status, body) = send(app, get("/")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_query_runs_pipeline() {
    let (app, orchestrator) = app();
    let (status, body) = send(
        app,
        post_json("/query", json!({"message": "usage please", "user_id": "u-1"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"], false);
    assert_eq!(body["message"], "Success");
    assert_eq!(body["results"]["usage"], json!({"intent": "usage"}));
    assert_eq!(body["queries_used"], json!(["usage: usage data"]));
    assert!(body.get("design").is_none());
    assert_eq!(orchestrator.history().api_calls.len(), 1);
}

#[tokio::test]
async fn test_query_with_content_type_attaches_design() {
    let (app, _) = app();
    let (_, body) = send(
        app,
        post_json(
            "/query",
            json!({"message": "plans for me", "content_type": "Plans"}),
        ),
    )
    .await;

    assert_eq!(body["design"]["intent"], "plans");
    assert_eq!(body["design"]["content_type"], "Plans");
    assert_eq!(body["design"]["succeeded"], true);
}

#[tokio::test]
async fn test_blank_query_is_rejected() {
    let (app, orchestrator) = app();
    let (status, body) = send(app, post_json("/query", json!({"message": "   "}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], true);
    assert_eq!(body["message"], "Message cannot be empty");
    assert_eq!(orchestrator.history().count, 0);
}

#[tokio::test]
async fn test_classify_intent() {
    let (app, orchestrator) = app();
    let (status, body) = send(
        app,
        post_json("/classify-intent", json!({"message": "billing and plans"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["context"], "ambiguous");
    assert_eq!(body["labels"], json!(["billing", "plans"]));
    assert_eq!(orchestrator.history().count, 0);
}

#[tokio::test]
async fn test_intents_endpoint() {
    let (app, _) = app();
    let (_, body) = send(app, get("/intents")).await;

    assert_eq!(body["supported_intents"].as_array().unwrap().len(), 9);
    assert_eq!(body["intent_descriptions"][1]["intent"], "usage");
    assert_eq!(
        body["intent_descriptions"][1]["description"],
        "Data usage information"
    );
}

#[tokio::test]
async fn test_system_info_endpoint() {
    let (app, _) = app();
    let (_, body) = send(app, get("/system-info")).await;

    assert_eq!(body["status"], "operational");
    assert_eq!(body["system"]["memory_capacity"], 5);
}

#[tokio::test]
async fn test_design_endpoint() {
    let (app, orchestrator) = app();
    let (status, body) = send(
        app,
        post_json(
            "/design",
            json!({"intent": "events", "type": "Events", "message": "concerts"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["payload"], json!({"message": "concerts"}));
    assert_eq!(orchestrator.history().design_calls.len(), 1);
}

#[tokio::test]
async fn test_design_endpoint_requires_type() {
    let (app, _) = app();
    let (status, _) = send(
        app,
        post_json("/design", json!({"intent": "events", "type": " "})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_conversation_history_get_and_delete() {
    let (app, orchestrator) = app();
    orchestrator.process_query("hello").await;
    orchestrator.process_query("usage").await;

    let (_, body) = send(app.clone(), get("/conversation-history")).await;
    assert_eq!(body["memory_status"]["count"], 2);
    assert_eq!(body["memory_status"]["capacity"], 5);
    assert_eq!(
        body["conversation_history"]["intent_classifications"]
            .as_array()
            .unwrap()
            .len(),
        1
    );

    let delete = Request::builder()
        .method("DELETE")
        .uri("/conversation-history")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app, delete).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(orchestrator.history().count, 0);
}

#[tokio::test]
async fn test_unknown_route_lists_endpoints() {
    let (app, _) = app();
    let (status, body) = send(app, get("/nope")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["available_endpoints"]
        .as_array()
        .unwrap()
        .contains(&json!("POST /query")));
}
