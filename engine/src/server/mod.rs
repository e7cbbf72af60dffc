//! HTTP Server
//!
//! JSON REST surface over the [`Orchestrator`]. Handlers only validate input
//! and shape output; every decision is made by the orchestrator.
//!
//! # Endpoints
//!
//! - GET /                       - Service name, version and links
//! - GET /health                 - Liveness
//! - POST /query                 - Run the pipeline
//! - POST /classify-intent       - Classification only
//! - GET /system-info            - Model, endpoints and memory capacity
//! - GET /intents                - Supported intents with descriptions
//! - POST /design                - Direct design lookup
//! - GET /conversation-history   - Memory snapshot
//! - DELETE /conversation-history - Clear memory

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use sdk::types::QueryResponse;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::orchestrator::Orchestrator;

/// Every route, listed by the 404 fallback
pub const ENDPOINTS: [&str; 9] = [
    "GET /",
    "GET /health",
    "POST /query",
    "POST /classify-intent",
    "GET /system-info",
    "GET /intents",
    "POST /design",
    "GET /conversation-history",
    "DELETE /conversation-history",
];

const EMPTY_MESSAGE: &str = "Message cannot be empty";

type AppState = Arc<Orchestrator>;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub message: String,
    #[serde(default)]
    pub user_id: Option<String>,
    /// When present, the first label's design of this type is attached
    #[serde(default)]
    pub content_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ClassifyRequest {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct DesignRequest {
    pub intent: String,
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default)]
    pub message: String,
}

/// Build the application router
pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/query", post(query_handler))
        .route("/classify-intent", post(classify_handler))
        .route("/system-info", get(system_info_handler))
        .route("/intents", get(intents_handler))
        .route("/design", post(design_handler))
        .route(
            "/conversation-history",
            get(history_handler).delete(clear_history_handler),
        )
        .fallback(not_found_handler)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(orchestrator)
}

/// Bind and serve until Ctrl-C
pub async fn serve(orchestrator: Arc<Orchestrator>, bind: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind to {}", bind))?;

    let addr = listener
        .local_addr()
        .context("Failed to read local address")?;
    tracing::info!("Concierge listening on http://{}", addr);

    axum::serve(listener, router(orchestrator))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Server shutting down gracefully");
        })
        .await
        .context("HTTP server error")
}

async fn root_handler() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Concierge API",
        "version": env!("CARGO_PKG_VERSION"),
        "health": "/health",
        "intents": "/intents",
    }))
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "message": "Concierge is running"
    }))
}

async fn query_handler(
    State(orchestrator): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Response {
    if request.message.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(QueryResponse::message_only(true, EMPTY_MESSAGE)),
        )
            .into_response();
    }

    if let Some(user_id) = request.user_id.as_deref() {
        tracing::debug!(user_id, "Query received");
    }

    let response = match request
        .content_type
        .as_deref()
        .map(str::trim)
        .filter(|ct| !ct.is_empty())
    {
        Some(content_type) => {
            orchestrator
                .process_query_with_design(&request.message, content_type)
                .await
        }
        None => orchestrator.process_query(&request.message).await,
    };

    Json(response).into_response()
}

async fn classify_handler(
    State(orchestrator): State<AppState>,
    Json(request): Json<ClassifyRequest>,
) -> Response {
    if request.message.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": true, "message": EMPTY_MESSAGE})),
        )
            .into_response();
    }

    Json(orchestrator.classify(&request.message).await).into_response()
}

async fn system_info_handler(State(orchestrator): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "error": false,
        "status": "operational",
        "system": orchestrator.system_info(),
    }))
}

async fn intents_handler(State(orchestrator): State<AppState>) -> Json<serde_json::Value> {
    let intents = orchestrator.supported_intents();
    let labels: Vec<&str> = intents.iter().map(|i| i.intent.as_str()).collect();
    Json(json!({
        "error": false,
        "supported_intents": labels,
        "intent_descriptions": intents,
    }))
}

async fn design_handler(
    State(orchestrator): State<AppState>,
    Json(request): Json<DesignRequest>,
) -> Response {
    if request.intent.trim().is_empty() || request.content_type.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": true, "message": "Both 'intent' and 'type' are required"})),
        )
            .into_response();
    }

    let design = orchestrator
        .request_design(
            request.intent.trim(),
            request.content_type.trim(),
            &request.message,
        )
        .await;
    Json(design).into_response()
}

async fn history_handler(State(orchestrator): State<AppState>) -> Json<serde_json::Value> {
    let snapshot = orchestrator.history();
    Json(json!({
        "error": false,
        "memory_status": {
            "count": snapshot.count,
            "capacity": snapshot.capacity,
            "full": snapshot.count >= snapshot.capacity,
        },
        "conversation_history": snapshot,
    }))
}

async fn clear_history_handler(State(orchestrator): State<AppState>) -> Json<serde_json::Value> {
    orchestrator.clear_history();
    Json(json!({
        "error": false,
        "message": "Conversation history cleared",
        "status": "success",
    }))
}

async fn not_found_handler() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": true,
            "message": "Endpoint not found",
            "available_endpoints": ENDPOINTS,
        })),
    )
        .into_response()
}
