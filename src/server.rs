//! HTTP API server.
//!
//! Exposes the clip service as a JSON API plus static serving of uploaded
//! blobs, so `thumbnail_url` values resolve against this process.
//!
//! # Endpoints
//!
//! | Method   | Path              | Description |
//! |----------|-------------------|-------------|
//! | `GET`    | `/api/clips`      | List clips, optionally filtered by `query` and `type` |
//! | `POST`   | `/api/clips`      | Upload a clip (base64 bytes + AI metadata) |
//! | `DELETE` | `/api/clips/{id}` | Remove a clip and its blob |
//! | `GET`    | `/health`         | Health check (returns version) |
//! | `GET`    | `/uploads/*`      | Raw uploaded blobs |
//!
//! # Error Contract
//!
//! Errors are flat JSON objects:
//!
//! ```json
//! { "error": "Clip not found" }
//! ```
//!
//! Validation failures → 400, missing clips → 404, duplicate ids → 409,
//! analysis failures → 502, storage/database failures → 500.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! capture clients.

use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use std::path::Path as FsPath;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use crate::config::Config;
use crate::error::ClipError;
use crate::models::{Clip, ClipFilter, FileType, IngestRequest};
use crate::service::ClipService;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    service: Arc<ClipService>,
}

/// Starts the HTTP server.
///
/// Binds to the address configured in `[server].bind` and serves until the
/// process is terminated.
pub async fn run_server(config: &Config, service: Arc<ClipService>) -> anyhow::Result<()> {
    let app = router(
        service,
        &config.storage.root,
        config.server.max_body_bytes,
    );

    println!("clipvault listening on http://{}", config.server.bind);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the router. Split out from [`run_server`] so the binary and tests
/// share one route table.
pub fn router(service: Arc<ClipService>, storage_root: &FsPath, max_body_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let state = AppState { service };

    Router::new()
        .route("/api/clips", get(handle_list).post(handle_upload))
        .route("/api/clips/{id}", delete(handle_delete))
        .route("/health", get(handle_health))
        .nest_service("/uploads", ServeDir::new(storage_root))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

/// Internal error type that converts into an HTTP response with a flat
/// `{"error": "..."}` body.
struct AppError {
    status: StatusCode,
    message: String,
}

impl From<ClipError> for AppError {
    fn from(err: ClipError) -> Self {
        let (status, message) = match &err {
            ClipError::Validation(_) => (StatusCode::BAD_REQUEST, err.to_string()),
            // The wire message is fixed; the id is already known to the caller.
            ClipError::NotFound(_) => (StatusCode::NOT_FOUND, "Clip not found".to_string()),
            ClipError::DuplicateId(_) => (StatusCode::CONFLICT, err.to_string()),
            ClipError::Analysis(_) => (StatusCode::BAD_GATEWAY, err.to_string()),
            ClipError::StorageWrite(_) | ClipError::StorageRead(_) | ClipError::Database(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };
        AppError { status, message }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, error = %self.message, "request failed");
        }
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        message: message.into(),
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

// ============ GET /api/clips ============

#[derive(Deserialize)]
struct ListParams {
    query: Option<String>,
    #[serde(rename = "type")]
    file_type: Option<String>,
}

/// Handler for `GET /api/clips?query=&type=`.
///
/// Returns the full matching set as a JSON array, newest first, with
/// `ai_tags` as a structured array rather than its stored encoding.
async fn handle_list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Clip>>, AppError> {
    let file_type = match params.file_type.as_deref() {
        Some(t) if !t.is_empty() => Some(FileType::parse(t)?),
        _ => None,
    };

    let filter = ClipFilter {
        query: params.query.filter(|q| !q.is_empty()),
        file_type,
    };

    let clips = state.service.search(&filter).await?;
    Ok(Json(clips))
}

// ============ POST /api/clips ============

#[derive(Deserialize)]
struct UploadBody {
    /// Generated by the service when absent.
    #[serde(default)]
    id: Option<String>,
    filename: String,
    file_type: String,
    file_size: i64,
    /// Raw file bytes, standard base64.
    data_base64: String,
    ai_summary: String,
    ai_tags: Vec<String>,
    #[serde(default)]
    ai_category: Option<String>,
    #[serde(default)]
    extracted_text: Option<String>,
}

/// Handler for `POST /api/clips`.
///
/// Decodes the payload into an [`IngestRequest`] and runs the ingest
/// pipeline: blob write, thumbnail derivation, row insert with orphan
/// cleanup on failure.
async fn handle_upload(
    State(state): State<AppState>,
    Json(body): Json<UploadBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let file_type = FileType::parse(&body.file_type)?;
    let bytes = BASE64
        .decode(body.data_base64.as_bytes())
        .map_err(|_| bad_request("data_base64 is not valid base64"))?;

    let request = IngestRequest {
        id: body.id,
        filename: body.filename,
        file_type,
        file_size: body.file_size,
        bytes,
        ai_summary: body.ai_summary,
        ai_tags: body.ai_tags,
        ai_category: body.ai_category,
        extracted_text: body.extracted_text,
    };

    state.service.ingest(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "success": true })),
    ))
}

// ============ DELETE /api/clips/{id} ============

/// Handler for `DELETE /api/clips/{id}`.
///
/// Deletes the blob (idempotently) and then the row; a clip that does not
/// exist yields 404 with the fixed `Clip not found` message.
async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.service.remove(&id).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}
