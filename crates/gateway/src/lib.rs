//! HTTP API gateway for BananaFit.
//!
//! Serves one process-lifetime try-on session: health checks plus the v1 API
//! that forwards user intents to the workflow coordinator.
//!
//! Built on Axum.

pub mod api_v1;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, HeaderValue, Method, header};
use axum::{Router, response::Json, routing::get};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use bananafit_config::AppConfig;
use bananafit_core::EventBus;
use bananafit_encoder::HttpAssetEncoder;
use bananafit_workflow::WorkflowCoordinator;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub coordinator: Arc<WorkflowCoordinator>,
    pub start_time: chrono::DateTime<chrono::Utc>,
}

impl GatewayState {
    pub fn new(coordinator: Arc<WorkflowCoordinator>) -> Self {
        Self {
            coordinator,
            start_time: chrono::Utc::now(),
        }
    }
}

pub type SharedState = Arc<GatewayState>;

/// Build the full router: `/health` plus the v1 API under `/v1`.
///
/// Layers applied:
/// - Request body limit (uploads are raw image bytes)
/// - CORS for the configured origins, if any
/// - HTTP trace logging
pub fn build_router(state: SharedState, gateway: &bananafit_config::GatewayConfig) -> Router {
    let mut router = Router::new()
        .route("/health", get(health_handler))
        .nest("/v1", api_v1::v1_router(state))
        .layer(DefaultBodyLimit::max(gateway.max_body_bytes));

    if let Some(cors) = cors_layer(&gateway.allowed_origins) {
        router = router.layer(cors);
    }

    router.layer(tower_http::trace::TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(api_v1::FILE_NAME_HEADER)])
            .max_age(std::time::Duration::from_secs(3600)),
    )
}

/// Build the coordinator from configuration.
///
/// Fails when the encoder's HTTP client cannot be created or no image model
/// is configured.
pub fn build_coordinator(config: &AppConfig) -> Result<Arc<WorkflowCoordinator>, bananafit_core::Error> {
    let encoder = Arc::new(HttpAssetEncoder::from_config(&config.encoder)?);
    let gateway = bananafit_providers::build_from_config(config)?;
    let event_bus = Arc::new(EventBus::default());

    Ok(Arc::new(WorkflowCoordinator::from_catalog(
        encoder,
        gateway,
        &config.catalog,
        event_bus,
    )))
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let coordinator = build_coordinator(&config)?;
    let state = Arc::new(GatewayState::new(coordinator.clone()));
    let app = build_router(state, &config.gateway);

    info!(
        addr = %addr,
        model = %config.generation.model,
        gateway = %coordinator.gateway_name(),
        "Gateway starting"
    );
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
