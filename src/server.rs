//! HTTP API over the query engine
//!
//! Endpoints:
//!
//! - `POST /upload` (multipart field `file`): save, register, index in background
//! - `GET  /files`: registered files in registration order
//! - `GET  /search?keyword=<word>`: files containing the keyword
//! - `GET  /stats`: registry and index sizes
//! - `GET  /health`
//!
//! `/upload` bodies are capped at [`AppState::max_upload_bytes`]; a larger
//! body is answered with `413 Payload Too Large`.

use anyhow::Result;
use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};

use crate::config::ServerConfig;
use crate::models::{FilesResponse, StorageStats, UploadResponse};
use crate::query::QueryEngine;
use crate::upload::{sanitize_file_name, save_upload};

/// State shared by every request handler
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<QueryEngine>,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(engine: Arc<QueryEngine>, upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            upload_dir: upload_dir.into(),
            max_upload_bytes: ServerConfig::default().max_upload_bytes,
        }
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    keyword: Option<String>,
}

type ApiError = (StatusCode, Json<FilesResponse>);

/// Build the router with all endpoints
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/upload",
            post(handle_upload).layer(DefaultBodyLimit::max(state.max_upload_bytes)),
        )
        .route("/files", get(handle_files))
        .route("/search", get(handle_search))
        .route("/stats", get(handle_stats))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

/// Bind to the configured address and serve until the process stops
pub async fn run_server(config: &ServerConfig, engine: Arc<QueryEngine>) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", addr, e))?;

    log::info!("Server listening on {}", addr);
    let state = AppState::new(engine, config.upload_dir.clone())
        .with_max_upload_bytes(config.max_upload_bytes);
    serve(listener, state).await
}

/// Serve on an already bound listener
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    axum::serve(listener, router(state))
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))
}

async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let bad_request = |message: String| (StatusCode::BAD_REQUEST, Json(FilesResponse::error(message)));
    // Oversized bodies surface here as 413
    let read_error = |e: MultipartError| {
        (e.status(), Json(FilesResponse::error(format!("error while reading file: {}", e))))
    };

    let (file_name, bytes) = loop {
        let field = multipart
            .next_field()
            .await
            .map_err(read_error)?
            .ok_or_else(|| bad_request("error while reading file: missing 'file' field".to_string()))?;

        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload.txt").to_string();
        let bytes = field.bytes().await.map_err(read_error)?;
        break (file_name, bytes);
    };

    if let Err(e) = sanitize_file_name(&file_name) {
        return Err(bad_request(format!("error while saving file: {:#}", e)));
    }

    let saved = save_upload(&state.upload_dir, &file_name, &bytes).await.map_err(|e| {
        log::error!("Upload of {} failed: {:#}", file_name, e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(FilesResponse::error(format!("error while saving file: {:#}", e))),
        )
    })?;
    let path = saved.to_string_lossy().into_owned();

    state.engine.register_file(path.clone());

    let engine = Arc::clone(&state.engine);
    let index_path = path.clone();
    tokio::spawn(async move {
        if let Err(e) = engine.index_file(&index_path).await {
            log::error!("Background indexing failed: {}", e);
        }
    });

    Ok(Json(UploadResponse {
        message: format!("file {} uploaded", file_name),
        path,
    }))
}

async fn handle_files(State(state): State<AppState>) -> Json<FilesResponse> {
    Json(FilesResponse::files(state.engine.storage().registry().snapshot()))
}

async fn handle_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<FilesResponse>, ApiError> {
    let keyword = params.keyword.unwrap_or_default();
    if keyword.is_empty() {
        return Err((StatusCode::BAD_REQUEST, Json(FilesResponse::error("keyword is required"))));
    }
    log::info!("Search request: keyword={}", keyword);

    // Dropping this handler (client went away) cancels every scan task
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    match state.engine.search_with_cancel(&keyword, &cancel).await {
        Ok(files) => Ok(Json(FilesResponse::matches(files))),
        Err(e) => {
            let failed = e.failed_paths();
            if failed.is_empty() {
                log::warn!("Search for '{}' failed: {}", keyword, e);
            } else {
                log::warn!("Search for '{}' failed on {}: {}", keyword, failed.join(", "), e);
            }
            Err((
                StatusCode::BAD_REQUEST,
                Json(FilesResponse::error(format!("error while searching in files: {}", e))),
            ))
        }
    }
}

async fn handle_stats(State(state): State<AppState>) -> Json<StorageStats> {
    Json(state.engine.storage().stats())
}

async fn handle_health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
