//! HTTP front end for the resolver.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/gif_metadata?query=...` | Resolve a memory query to one enriched record |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "no metadata record found for paris.gif" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404, covering no
//! candidate, low confidence, and missing record), `collaborator_error`
//! (500, a retriever/store/rewriter failure).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser front ends
//! can call the endpoint directly.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use memory_recall_core::error::RecallError;
use memory_recall_core::models::MetadataRecord;
use memory_recall_core::resolve::Resolver;

use crate::config::Config;
use crate::resolve::build_resolver;

/// Shared state handed to every handler. The resolver holds only
/// read-only settings and thread-safe collaborator handles.
#[derive(Clone)]
struct AppState {
    resolver: Arc<Resolver>,
}

/// Starts the HTTP server on `[server].bind` with collaborators built from
/// configuration. Runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let resolver = build_resolver(config).await?;
    serve(&config.server.bind, Arc::new(resolver)).await
}

/// Serve an already-built resolver on `bind`.
pub async fn serve(bind: &str, resolver: Arc<Resolver>) -> anyhow::Result<()> {
    let app = router(resolver);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(addr = %listener.local_addr()?, "recall server listening");
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the router. Exposed so tests and embedders can mount it with
/// their own collaborators.
pub fn router(resolver: Arc<Resolver>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/gif_metadata", get(handle_gif_metadata))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(AppState { resolver })
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

impl From<RecallError> for AppError {
    fn from(err: RecallError) -> Self {
        if err.is_client_error() {
            AppError {
                status: StatusCode::NOT_FOUND,
                code: "not_found".to_string(),
                message: err.to_string(),
            }
        } else {
            AppError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code: err.code().to_string(),
                message: err.to_string(),
            }
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /gif_metadata ============

#[derive(Deserialize)]
struct RecallParams {
    query: String,
}

/// Handler for `GET /gif_metadata`.
///
/// Returns the enriched record as a bare JSON object on success.
async fn handle_gif_metadata(
    State(state): State<AppState>,
    params: Result<Query<RecallParams>, QueryRejection>,
) -> Result<Json<MetadataRecord>, AppError> {
    let Query(params) = params.map_err(|e| bad_request(e.body_text()))?;
    if params.query.trim().is_empty() {
        return Err(bad_request("query must not be empty"));
    }

    match state.resolver.resolve_memory(&params.query).await {
        Ok(resolved) => Ok(Json(resolved.record)),
        Err(err) => {
            if err.is_client_error() {
                warn!(query = %params.query, kind = err.code(), "no confident match");
            } else {
                error!(query = %params.query, error = %err, "recall failed");
            }
            Err(err.into())
        }
    }
}
