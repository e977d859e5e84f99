pub mod audit;
pub mod dashboard;
pub mod health;
pub mod metrics;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;
use crate::services::acquisition::AcquisitionError;
use crate::services::camera::CameraError;
use crate::services::workflow::WorkflowError;

/// Build the HTTP surface. `/metrics` is mounted only when a Prometheus
/// handle is supplied.
pub fn router(
    state: AppState,
    prometheus: Option<Arc<PrometheusHandle>>,
    max_upload_bytes: usize,
) -> Router {
    let mut app = Router::new()
        .route("/health", get(health::health_check))
        .route("/api/v1/audit", get(audit::get_snapshot))
        .route(
            "/api/v1/audit/reference",
            post(audit::submit_reference).delete(audit::remove_reference),
        )
        .route(
            "/api/v1/audit/reference/capture",
            post(audit::capture_reference),
        )
        .route("/api/v1/audit/advance", post(audit::advance))
        .route("/api/v1/audit/evidence", post(audit::add_evidence))
        .route("/api/v1/audit/evidence/capture", post(audit::capture_evidence))
        .route("/api/v1/audit/evidence/import", post(audit::import_evidence))
        .route("/api/v1/audit/evidence/{id}", delete(audit::remove_evidence))
        .route("/api/v1/audit/verify", post(audit::start_verification))
        .route("/api/v1/audit/report", get(audit::download_report))
        .route("/api/v1/audit/reset", post(audit::reset))
        .route("/api/v1/dashboard", get(dashboard::list_records))
        .with_state(state);

    if let Some(handle) = prometheus {
        app = app.route(
            "/metrics",
            get(metrics::prometheus_metrics).with_state(handle),
        );
    }

    app.layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
}

/// Error body shared by every handler: `{"error": "..."}`, plus
/// `retryable` for upstream failures.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("The audit workflow is busy")]
    Busy,

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Image(#[from] AcquisitionError),

    #[error(transparent)]
    Camera(#[from] CameraError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    Unavailable(&'static str),

    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Busy => StatusCode::CONFLICT,
            ApiError::Workflow(e) => match e {
                WorkflowError::WrongImageKind { .. } => StatusCode::BAD_REQUEST,
                WorkflowError::UnknownImage(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::CONFLICT,
            },
            ApiError::Image(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::Camera(e) => match e {
                CameraError::PermissionDenied
                | CameraError::NoDevice
                | CameraError::NotStreaming => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = match &self {
            ApiError::Upstream(message) => json!({ "error": message, "retryable": true }),
            other => json!({ "error": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
