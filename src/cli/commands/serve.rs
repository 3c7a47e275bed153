//! HTTP API server for integration with other systems.
//!
//! Provides REST endpoints for answering questions, passage search and
//! template discovery.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::LexragError;
use crate::orchestrator::Orchestrator;
use crate::rag::{QueryOptions, RetrievedChunk};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

/// Shared application state.
struct AppState {
    orchestrator: Orchestrator,
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    let orchestrator = Orchestrator::new(settings)?;
    let app = router(Arc::new(AppState { orchestrator }));

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Lexrag API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Ask (RAG)", "POST /ask");
    Output::kv("Search", "POST /search");
    Output::kv("Templates", "GET  /templates");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/ask", post(ask))
        .route("/search", post(search))
        .route("/templates", get(templates))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct AskRequest {
    query: String,
    #[serde(default)]
    top_k: Option<usize>,
    #[serde(default)]
    use_query_expansion: Option<bool>,
    #[serde(default)]
    rerank_results: Option<bool>,
    #[serde(default)]
    template_type: Option<String>,
    #[serde(default)]
    custom_template: Option<String>,
}

impl AskRequest {
    fn options(&self) -> QueryOptions {
        QueryOptions {
            top_k: self.top_k,
            use_query_expansion: self.use_query_expansion,
            rerank_results: self.rerank_results,
            template_type: self.template_type.clone(),
            custom_template: self.custom_template.clone(),
        }
    }
}

#[derive(Deserialize)]
struct SearchRequest {
    query: String,
    #[serde(default)]
    top_k: Option<usize>,
    #[serde(default)]
    rerank_results: Option<bool>,
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<RetrievedChunk>,
    total: usize,
}

#[derive(Serialize)]
struct TemplatesResponse {
    templates: Vec<String>,
    default: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Map a pipeline error to a status code.
fn error_response(e: LexragError) -> Response {
    let status = match &e {
        LexragError::InvalidInput(_) | LexragError::TemplateValidation(_) => StatusCode::BAD_REQUEST,
        LexragError::Embedding(_)
        | LexragError::IndexQuery(_)
        | LexragError::Generation(_)
        | LexragError::Http(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        warn!("Request failed: {}", e);
    }

    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn ask(State(state): State<Arc<AppState>>, Json(req): Json<AskRequest>) -> Response {
    match state.orchestrator.ask(&req.query, &req.options()).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => error_response(e),
    }
}

async fn search(State(state): State<Arc<AppState>>, Json(req): Json<SearchRequest>) -> Response {
    let options = QueryOptions {
        top_k: req.top_k,
        rerank_results: req.rerank_results,
        ..Default::default()
    };

    match state.orchestrator.search(&req.query, &options).await {
        Ok(results) => Json(SearchResponse {
            total: results.len(),
            results,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn templates(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let registry = state.orchestrator.templates();
    Json(TemplatesResponse {
        templates: registry.names().into_iter().map(String::from).collect(),
        default: state.orchestrator.settings().retrieval.template_type.clone(),
    })
}
