//! HTTP API for Libris.
//!
//! REST endpoints live under `/api/v1`; `/health` and `/metrics` are
//! unversioned. Successful bodies are wrapped in [`ApiResponse`], errors are
//! rendered by [`LibrisError`](crate::error::LibrisError) itself.

mod handlers;
pub mod v1;

use axum::{routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::service::LibraryService;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: LibraryService,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(service: LibraryService) -> Self {
        Self {
            service,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Build the API router.
///
/// ```rust,ignore
/// let state = AppState::new(LibraryService::new(store, policy));
/// let app = build_router(state);
/// ```
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::prometheus_metrics))
        .nest(v1::V1_PREFIX, v1::v1_router())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

/// Success envelope; errors render through [`ErrorResponse`](crate::error::ErrorResponse).
#[derive(Debug, serde::Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T: serde::Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}
