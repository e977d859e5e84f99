use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use return_audit_hw::app_state::AppState;
use return_audit_hw::config::AppConfig;
use return_audit_hw::routes;
use return_audit_hw::services::{
    camera::SnapshotFileCamera,
    dashboard::DashboardClient,
    gemini::GeminiClient,
    storage::WebhookUploader,
    workflow::{WorkflowController, WorkflowDelays},
};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing return-audit-hw server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    // Register application metrics
    metrics::describe_histogram!(
        "audit_verification_seconds",
        "Time from verify to report, including AI calls and upload"
    );
    metrics::describe_counter!(
        "audit_verifications_total",
        "Total verification runs started"
    );
    metrics::describe_counter!(
        "audit_verifications_completed",
        "Verification runs that produced a report"
    );
    metrics::describe_counter!(
        "audit_verifications_failed",
        "Verification runs that returned to evidence capture"
    );
    metrics::describe_counter!(
        "audit_reference_extractions_total",
        "Label extractions requested for reference images"
    );
    metrics::describe_counter!(
        "audit_storage_upload_failures",
        "Generated reports the storage webhook did not accept"
    );

    tracing::info!(
        extraction_model = %config.extraction_model,
        verification_model = %config.verification_model,
        language = %config.report_language,
        "Initializing Gemini client"
    );
    let ai = GeminiClient::new(
        &config.gemini_base_url,
        &config.gemini_api_key,
        &config.extraction_model,
        &config.verification_model,
        &config.report_language,
    );

    let uploader = WebhookUploader::new(&config.upload_webhook_url);
    let dashboard = DashboardClient::new(&config.dashboard_url);

    let workflow = WorkflowController::new(
        Arc::new(ai),
        Arc::new(uploader),
        WorkflowDelays {
            success: config.success_delay(),
            failure: config.failure_delay(),
        },
    );

    // Create shared application state
    let mut state = AppState::new(workflow, dashboard);
    if let Some(path) = &config.camera_snapshot_path {
        tracing::info!(path = %path, "Camera capture enabled");
        state = state.with_camera(Box::new(SnapshotFileCamera::new(path)));
    }
    if let Some(dir) = &config.import_dir {
        tracing::info!(dir = %dir, "Evidence import enabled");
        state = state.with_import_dir(dir);
    }

    let app = routes::router(state, Some(prometheus_handle), config.max_upload_bytes);

    tracing::info!("Starting return-audit-hw on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
