//! REST API endpoints for the equipview-service.
//!
//! # Endpoints
//!
//! - `GET /api/health` - Service health check
//! - `POST /api/datasets` - Upload a CSV file (multipart part `file`)
//! - `GET /api/datasets` - Summaries of retained datasets, newest first
//! - `GET /api/datasets/latest` - Newest dataset with freshly computed stats
//! - `GET /api/datasets/{id}` - One dataset with rows and stats
//! - `DELETE /api/datasets/{id}` - Delete a dataset
//! - `GET /api/datasets/{id}/csv` - Export a dataset's rows as CSV
//!
//! The collection and latest routes also answer with a trailing slash.
//!
//! ## Timeouts
//!
//! Each upload gets a deadline of `ingest.timeout_ms`, shortened by an
//! optional `X-Timeout-Ms` request header. An upload whose deadline passes
//! before it reaches the store is answered with 503 and nothing is stored.
//!
//! ## Error Handling
//!
//! All endpoints return structured JSON errors via [`AppError`]. Storage
//! failures are logged and answered with a generic 500; their text never
//! reaches the client.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State, multipart::MultipartError},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use time::OffsetDateTime;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

use equipview_core::{DatasetRecord, DatasetSummary, SchemaError};

use crate::pipeline::PipelineError;
use crate::state::AppState;

/// Request header that shortens the ingest deadline, in milliseconds.
pub const TIMEOUT_HEADER: &str = "x-timeout-ms";

/// Filename used when the upload part carries none.
const DEFAULT_FILENAME: &str = "upload.csv";

/// Create the API router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/datasets", get(list_datasets).post(upload_dataset))
        .route("/api/datasets/", get(list_datasets).post(upload_dataset))
        .route("/api/datasets/latest", get(latest_dataset))
        .route("/api/datasets/latest/", get(latest_dataset))
        .route(
            "/api/datasets/{id}",
            get(get_dataset).delete(delete_dataset),
        )
        .route("/api/datasets/{id}/csv", get(export_dataset))
}

/// The full application: API routes, body limit, tracing and CORS layers.
pub fn app(state: Arc<AppState>) -> Router {
    let max_upload_bytes = state.config.ingest.max_upload_bytes;
    Router::new()
        .merge(router())
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// Health check endpoint.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: OffsetDateTime::now_utc(),
    })
}

/// Upload a CSV file.
async fn upload_dataset(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<(StatusCode, Json<DatasetRecord>), AppError> {
    let deadline = Instant::now() + ingest_timeout(&state, &headers)?;
    let (filename, contents) = read_upload(multipart).await?;

    let worker = Arc::clone(&state);
    let record = tokio::task::spawn_blocking(move || {
        worker
            .pipeline
            .ingest(&contents, &filename, Some(deadline))
    })
    .await
    .map_err(|e| {
        error!("Ingest task failed: {}", e);
        AppError::Internal
    })??;

    Ok((StatusCode::CREATED, Json(record)))
}

fn ingest_timeout(state: &AppState, headers: &HeaderMap) -> Result<Duration, AppError> {
    let configured = state.config.ingest.timeout();
    let Some(value) = headers.get(TIMEOUT_HEADER) else {
        return Ok(configured);
    };

    let requested = value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .ok_or_else(|| AppError::BadRequest("Invalid X-Timeout-Ms header".to_string()))?;

    Ok(configured.min(Duration::from_millis(requested)))
}

/// Pull the `file` part out of a multipart body.
async fn read_upload(mut multipart: Multipart) -> Result<(String, Vec<u8>), AppError> {
    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_FILENAME)
            .to_string();
        let contents = field.bytes().await.map_err(upload_error)?;
        return Ok((filename, contents.to_vec()));
    }

    Err(AppError::BadRequest("No file provided".to_string()))
}

fn upload_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge
    } else {
        debug!("Malformed multipart body: {}", e);
        AppError::BadRequest("Malformed multipart upload".to_string())
    }
}

/// Summaries of all retained datasets.
async fn list_datasets(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<DatasetSummary>>, AppError> {
    Ok(Json(state.pipeline.list_all()?))
}

/// Newest dataset, or a message when nothing has been uploaded.
async fn latest_dataset(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    match state.pipeline.latest()? {
        Some(record) => Ok(Json(record).into_response()),
        None => Ok(Json(serde_json::json!({ "message": "No data available" })).into_response()),
    }
}

async fn get_dataset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<DatasetRecord>, AppError> {
    Ok(Json(state.pipeline.get(id)?))
}

async fn delete_dataset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.pipeline.delete(id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn export_dataset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let csv = state.pipeline.export_csv(id)?;
    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"dataset-{}.csv\"", id),
        ),
    ];
    Ok((headers, csv))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Schema(SchemaError),
    PayloadTooLarge,
    Unavailable(String),
    Internal,
}

impl From<PipelineError> for AppError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::Schema(e) => AppError::Schema(e),
            PipelineError::Parse(e) => AppError::BadRequest(e.to_string()),
            PipelineError::NotFound(id) => AppError::NotFound(format!("Dataset {} not found", id)),
            PipelineError::DeadlineExceeded => AppError::Unavailable(
                "Upload timed out before it could be stored".to_string(),
            ),
            PipelineError::Store(e) => {
                error!("Store failure: {}", e);
                AppError::Internal
            }
            PipelineError::Export(e) => {
                error!("Export failure: {}", e);
                AppError::Internal
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, serde_json::json!({ "error": msg })),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, serde_json::json!({ "error": msg }))
            }
            AppError::Schema(e) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": e.to_string(), "missing": e.missing }),
            ),
            AppError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                serde_json::json!({ "error": "Upload exceeds the size limit" }),
            ),
            AppError::Unavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                serde_json::json!({ "error": msg }),
            ),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": "Internal server error" }),
            ),
        };

        (status, Json(body)).into_response()
    }
}
