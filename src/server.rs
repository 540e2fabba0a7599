//! HTTP server for quote parsing.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/parse` | Multipart form (`emailText`, optional `file`) → extracted totals |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! Every failure is a single JSON object:
//!
//! ```json
//! { "error": "File type not supported. Please upload PDF, HTML, or text files." }
//! ```
//!
//! `details` is added to 500 responses only when `server.environment` is
//! `development`.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::QuoteError;
use crate::models::{FileRef, FileSource, InputDocument, QuoteResponse};
use crate::pipeline::QuotePipeline;

/// Room for the text field and multipart framing on top of the file limit.
const FORM_OVERHEAD_BYTES: u64 = 1024 * 1024;

#[derive(Clone)]
struct AppState {
    pipeline: Arc<QuotePipeline>,
}

/// Starts the HTTP server on `[server].bind`.
///
/// The oracle client and persistence sink are created here, once, and
/// shared by every request.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pipeline = Arc::new(QuotePipeline::from_config(config).await?);
    let app = build_router(pipeline);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(bind = %config.server.bind, "quote server listening");
    axum::serve(listener, app).await?;

    Ok(())
}

/// Router over an existing pipeline.
pub fn build_router(pipeline: Arc<QuotePipeline>) -> Router {
    let body_limit = pipeline.config().upload.max_file_bytes + FORM_OVERHEAD_BYTES;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/api/parse",
            post(handle_parse).fallback(handle_method_not_allowed),
        )
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(body_limit as usize))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { pipeline })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

struct AppError {
    status: StatusCode,
    message: String,
    details: Option<String>,
}

impl AppError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            details: None,
        }
    }

    fn from_quote(err: QuoteError, expose_details: bool) -> Self {
        let status = err.status();
        let details = if expose_details && status.is_server_error() {
            err.details()
        } else {
            None
        };
        Self {
            status,
            message: err.to_string(),
            details,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
            details: self.details,
        };
        (self.status, Json(body)).into_response()
    }
}

fn form_error(err: MultipartError, max_file_bytes: u64) -> AppError {
    warn!(error = %err, "Form parse error");
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::bad_request(
            QuoteError::PayloadTooLarge {
                size: 0,
                limit_mib: max_file_bytes / (1024 * 1024),
            }
            .to_string(),
        )
    } else {
        AppError::bad_request("Error parsing form data")
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

// ============ POST /api/parse ============

async fn handle_method_not_allowed() -> AppError {
    AppError {
        status: StatusCode::METHOD_NOT_ALLOWED,
        message: "Method not allowed".to_string(),
        details: None,
    }
}

/// Reads the form, runs the pipeline, and returns the enriched result.
async fn handle_parse(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<QuoteResponse>, AppError> {
    let multipart = multipart.map_err(|e| {
        warn!(error = %e, "Form parse error");
        AppError::bad_request("Error parsing form data")
    })?;
    let config = state.pipeline.config();
    let input = read_form(multipart, config.upload.max_file_bytes).await?;

    state
        .pipeline
        .process(input)
        .await
        .map(Json)
        .map_err(|e| AppError::from_quote(e, config.server.expose_error_details()))
}

async fn read_form(mut multipart: Multipart, max_file_bytes: u64) -> Result<InputDocument, AppError> {
    let mut input = InputDocument::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| form_error(e, max_file_bytes))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("emailText") => {
                input.source_text = field
                    .text()
                    .await
                    .map_err(|e| form_error(e, max_file_bytes))?;
            }
            Some("file") => {
                let file_name = field.file_name().map(str::to_string);
                let media_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| form_error(e, max_file_bytes))?;

                // Browsers send an empty, unnamed part for an untouched file input.
                if bytes.is_empty() && file_name.as_deref().unwrap_or("").is_empty() {
                    continue;
                }
                if input.uploaded_file.is_some() {
                    return Err(AppError::bad_request("Only one file may be uploaded."));
                }
                input.uploaded_file = Some(FileRef {
                    file_name,
                    media_type,
                    size: bytes.len() as u64,
                    source: FileSource::Bytes(bytes.to_vec()),
                });
            }
            _ => {}
        }
    }

    Ok(input)
}
