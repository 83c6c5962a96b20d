//! HTTP API v1: the presentation boundary of the try-on workflow.
//!
//! Endpoints:
//!
//! - `GET  /v1/status`             Gateway status and uptime
//! - `GET  /v1/session`            Current workflow snapshot
//! - `GET  /v1/history`            Completed compositions, newest first
//! - `GET  /v1/catalog/persons`    Preset person photos
//! - `POST /v1/person/catalog`     Choose a preset person `{id}`
//! - `POST /v1/person/upload`      Upload a person photo (raw body)
//! - `POST /v1/clothing/select`    Choose a clothing candidate `{id}`
//! - `POST /v1/clothing/upload`    Upload a garment photo (raw body)
//! - `POST /v1/clothing/generate`  Generate a garment `{prompt}`
//! - `POST /v1/result/generate`    Compose the try-on
//! - `POST /v1/reset`              Start over
//! - `GET  /v1/result/download`    The result image as an attachment
//! - `GET  /v1/events`             SSE stream of workflow events
//!
//! Operation endpoints answer `200` with `{outcome, notice, snapshot}`;
//! `outcome` is `applied`, `rejected` or `failed`.

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::sse::{Event as SseEvent, Sse},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tokio_stream::StreamExt;
use tracing::{info, warn};

use bananafit_core::{ImageAsset, LocalFile, Stage};
use bananafit_workflow::{HistoryEntry, Notice, OperationOutcome, WorkflowSnapshot};

use crate::SharedState;

/// Optional request header naming an uploaded file.
pub const FILE_NAME_HEADER: &str = "x-file-name";

/// Base name of the downloaded result image.
const DOWNLOAD_BASENAME: &str = "banana-fit-result";

// ── Router ────────────────────────────────────────────────────────────────

/// Build the v1 API router. Nest this under "/v1" in the main router.
pub fn v1_router(state: SharedState) -> Router {
    Router::new()
        .route("/status", get(status_handler))
        .route("/session", get(session_handler))
        .route("/history", get(history_handler))
        .route("/catalog/persons", get(person_catalog_handler))
        .route("/person/catalog", post(choose_person_handler))
        .route("/person/upload", post(upload_person_handler))
        .route("/clothing/select", post(choose_clothing_handler))
        .route("/clothing/upload", post(upload_clothing_handler))
        .route("/clothing/generate", post(generate_clothing_handler))
        .route("/result/generate", post(generate_result_handler))
        .route("/reset", post(reset_handler))
        .route("/result/download", get(download_handler))
        .route("/events", get(event_stream_handler))
        .with_state(state)
}

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Deserialize)]
struct SelectRequest {
    id: String,
}

#[derive(Deserialize)]
struct GenerateClothingRequest {
    prompt: String,
}

#[derive(Serialize)]
struct OperationResponse {
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    notice: Option<Notice>,
    snapshot: WorkflowSnapshot,
}

impl OperationResponse {
    fn new(outcome: OperationOutcome, snapshot: WorkflowSnapshot) -> Json<Self> {
        let label = outcome.label();
        let notice = match outcome {
            OperationOutcome::Failed(notice) => Some(notice),
            _ => None,
        };
        Json(Self {
            outcome: label,
            notice,
            snapshot,
        })
    }
}

#[derive(Serialize)]
struct HistoryResponse {
    entries: Vec<HistoryEntry>,
    count: usize,
}

#[derive(Serialize)]
struct CatalogResponse {
    persons: Vec<ImageAsset>,
}

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    version: &'static str,
    uptime_secs: u64,
    gateway: String,
    stage: Stage,
    busy: bool,
    history_len: usize,
}

fn upload_from(headers: &HeaderMap, body: Bytes) -> LocalFile {
    let name = headers
        .get(FILE_NAME_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or("upload");
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    LocalFile::memory(name, content_type, body.to_vec())
}

// ── Reads ─────────────────────────────────────────────────────────────────

async fn status_handler(State(state): State<SharedState>) -> Json<StatusResponse> {
    let snapshot = state.coordinator.snapshot();
    let uptime = chrono::Utc::now()
        .signed_duration_since(state.start_time)
        .num_seconds()
        .max(0) as u64;

    Json(StatusResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: uptime,
        gateway: state.coordinator.gateway_name().to_string(),
        stage: snapshot.stage,
        busy: snapshot.busy.any(),
        history_len: snapshot.history_len,
    })
}

async fn session_handler(State(state): State<SharedState>) -> Json<WorkflowSnapshot> {
    Json(state.coordinator.snapshot())
}

async fn history_handler(State(state): State<SharedState>) -> Json<HistoryResponse> {
    let mut entries = state.coordinator.history();
    entries.reverse();
    let count = entries.len();
    Json(HistoryResponse { entries, count })
}

async fn person_catalog_handler(State(state): State<SharedState>) -> Json<CatalogResponse> {
    Json(CatalogResponse {
        persons: state.coordinator.person_presets().to_vec(),
    })
}

// ── Operations ────────────────────────────────────────────────────────────

async fn choose_person_handler(
    State(state): State<SharedState>,
    Json(req): Json<SelectRequest>,
) -> Result<Json<OperationResponse>, StatusCode> {
    let Some(asset) = state.coordinator.find_person(&req.id) else {
        warn!(id = %req.id, "Unknown person preset");
        return Err(StatusCode::NOT_FOUND);
    };
    let outcome = state.coordinator.choose_person_from_catalog(&asset).await;
    Ok(OperationResponse::new(outcome, state.coordinator.snapshot()))
}

async fn upload_person_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<OperationResponse> {
    info!(bytes = body.len(), "Person upload received");
    let file = upload_from(&headers, body);
    let outcome = state.coordinator.upload_person(&file).await;
    OperationResponse::new(outcome, state.coordinator.snapshot())
}

async fn choose_clothing_handler(
    State(state): State<SharedState>,
    Json(req): Json<SelectRequest>,
) -> Result<Json<OperationResponse>, StatusCode> {
    let Some(asset) = state.coordinator.find_clothing(&req.id) else {
        warn!(id = %req.id, "Unknown clothing candidate");
        return Err(StatusCode::NOT_FOUND);
    };
    let outcome = state.coordinator.choose_clothing(&asset).await;
    Ok(OperationResponse::new(outcome, state.coordinator.snapshot()))
}

async fn upload_clothing_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<OperationResponse> {
    info!(bytes = body.len(), "Clothing upload received");
    let file = upload_from(&headers, body);
    let outcome = state.coordinator.upload_clothing(&file).await;
    OperationResponse::new(outcome, state.coordinator.snapshot())
}

async fn generate_clothing_handler(
    State(state): State<SharedState>,
    Json(req): Json<GenerateClothingRequest>,
) -> Json<OperationResponse> {
    let outcome = state.coordinator.generate_clothing(&req.prompt).await;
    OperationResponse::new(outcome, state.coordinator.snapshot())
}

async fn generate_result_handler(State(state): State<SharedState>) -> Json<OperationResponse> {
    let outcome = state.coordinator.generate_result().await;
    OperationResponse::new(outcome, state.coordinator.snapshot())
}

async fn reset_handler(State(state): State<SharedState>) -> Json<OperationResponse> {
    state.coordinator.reset();
    OperationResponse::new(OperationOutcome::Applied, state.coordinator.snapshot())
}

// ── Download ──────────────────────────────────────────────────────────────

/// `GET /v1/result/download`: the composed image, ready to save.
async fn download_handler(State(state): State<SharedState>) -> Result<Response, StatusCode> {
    let Some(result) = state.coordinator.snapshot().result else {
        return Err(StatusCode::NOT_FOUND);
    };
    let bytes = result.decode().map_err(|e| {
        warn!(error = %e, "Stored result is not valid base64");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    let disposition = format!(
        "attachment; filename=\"{DOWNLOAD_BASENAME}.{}\"",
        result.file_extension()
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, result.mime_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

// ── SSE Event Stream ──────────────────────────────────────────────────────

/// `GET /v1/events`: SSE stream of workflow events (stage changes, notices, etc.).
async fn event_stream_handler(
    State(state): State<SharedState>,
) -> Sse<impl futures::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = state.coordinator.event_bus().subscribe();
    let stream = tokio_stream::wrappers::BroadcastStream::new(rx)
        .filter_map(|result| result.ok())
        .map(|event| {
            let data = serde_json::to_string(event.as_ref()).unwrap_or_default();
            Ok(SseEvent::default().event(event.kind()).data(data))
        });

    Sse::new(stream)
}

// ── Tests ─────────────────────────────────────────────────────────────────
