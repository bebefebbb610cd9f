//! HTTP front end for the answer pipeline.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/ask` | Answer `{"query": "..."}` with `{"answer": "..."}` |
//! | `GET`  | `/health` | Status, version, and corpus size |
//!
//! `/ask` answers with the configured apology when the pipeline fails, so
//! the only error response is 400 for an empty query:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```

use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::answer::Answerer;

/// Build the router. Split from [`run_server`] so tests can serve it on an
/// ephemeral port.
pub fn router(answerer: Arc<Answerer>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ask", post(handle_ask))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(answerer)
}

/// Serve until the process is stopped.
pub async fn run_server(bind_addr: &str, answerer: Arc<Answerer>) -> Result<()> {
    let passages = answerer.corpus().len();
    let app = router(answerer);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!(bind = bind_addr, passages, "server started");
    println!("docent listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

// ============ POST /ask ============

#[derive(Deserialize)]
struct AskRequest {
    query: String,
}

#[derive(Serialize)]
struct AskResponse {
    answer: String,
}

async fn handle_ask(
    State(answerer): State<Arc<Answerer>>,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError> {
    if req.query.trim().is_empty() {
        return Err(bad_request("query must not be empty"));
    }
    let answer = answerer.respond(&req.query).await;
    Ok(Json(AskResponse { answer }))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    passages: usize,
}

async fn handle_health(State(answerer): State<Arc<Answerer>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        passages: answerer.corpus().len(),
    })
}
