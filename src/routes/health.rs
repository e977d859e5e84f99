use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::app_state::AppState;
use crate::models::workflow::WorkflowStep;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub workflow: WorkflowHealth,
}

#[derive(Serialize)]
pub struct WorkflowHealth {
    pub step: WorkflowStep,
    pub busy: bool,
}

/// GET /health: liveness plus the current workflow step.
///
/// Reads the published snapshot, so it answers while a verification run
/// holds the controller.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let step = state.snapshots.borrow().step;
    let busy = state.workflow.try_lock().is_err();

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        workflow: WorkflowHealth {
            step,
            busy,
        },
    })
}
