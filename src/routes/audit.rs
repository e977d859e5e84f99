use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use garde::Validate;
use std::path::{Component, Path as FsPath, PathBuf};
use std::sync::PoisonError;
use tokio::sync::MutexGuard;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::image::{CapturedImage, ImageKind};
use crate::models::workflow::{EvidenceImportRequest, EvidenceUploadResponse, WorkflowSnapshot};
use crate::routes::ApiError;
use crate::services::acquisition::{load_files, AcquisitionError};
use crate::services::camera::CaptureSession;
use crate::services::workflow::{RunOutcome, WorkflowController};

/// Every `image` field of a multipart body, in upload order.
async fn image_fields(multipart: &mut Multipart) -> Result<Vec<Vec<u8>>, ApiError> {
    let mut images = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        if field.name() == Some("image") {
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            images.push(data.to_vec());
        }
    }
    Ok(images)
}

fn controller(state: &AppState) -> Result<MutexGuard<'_, WorkflowController>, ApiError> {
    state.workflow.try_lock().map_err(|_| ApiError::Busy)
}

/// One still from the configured camera. The device blocks, so the session
/// runs on the blocking pool and is released before this returns.
async fn capture_still(state: &AppState, kind: ImageKind) -> Result<CapturedImage, ApiError> {
    let camera = state
        .camera
        .clone()
        .ok_or(ApiError::Unavailable("No camera is configured"))?;

    let still = tokio::task::spawn_blocking(move || {
        let mut device = camera.lock().unwrap_or_else(PoisonError::into_inner);
        let session = CaptureSession::open(&mut **device);
        session.snapshot(kind)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Camera task failed: {e}")))??;
    Ok(still)
}

/// Resolve a bare file name inside the import directory. Anything with a
/// separator, `..` or a root is refused.
fn import_path(dir: &FsPath, name: &str) -> Result<PathBuf, ApiError> {
    let mut components = FsPath::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(file)), None) => Ok(dir.join(file)),
        _ => Err(ApiError::BadRequest(format!("Invalid import file name `{name}`"))),
    }
}

/// GET /api/v1/audit: latest published snapshot, also during a run.
pub async fn get_snapshot(State(state): State<AppState>) -> Json<WorkflowSnapshot> {
    let snapshot = state.snapshots.borrow().clone();
    Json(snapshot)
}

/// POST /api/v1/audit/reference: replace the reference image and read its label.
pub async fn submit_reference(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<WorkflowSnapshot>, ApiError> {
    let bytes = image_fields(&mut multipart)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::BadRequest("Missing multipart field `image`".to_string()))?;
    let image = CapturedImage::from_bytes(bytes, ImageKind::Reference)?;

    let mut workflow = controller(&state)?;
    workflow.submit_reference(image).await?;
    Ok(Json(workflow.snapshot()))
}

/// POST /api/v1/audit/reference/capture: same as an upload, from the camera.
pub async fn capture_reference(
    State(state): State<AppState>,
) -> Result<Json<WorkflowSnapshot>, ApiError> {
    let mut workflow = controller(&state)?;
    let image = capture_still(&state, ImageKind::Reference).await?;
    workflow.submit_reference(image).await?;
    Ok(Json(workflow.snapshot()))
}

/// DELETE /api/v1/audit/reference
pub async fn remove_reference(
    State(state): State<AppState>,
) -> Result<Json<WorkflowSnapshot>, ApiError> {
    let mut workflow = controller(&state)?;
    workflow.remove_reference()?;
    Ok(Json(workflow.snapshot()))
}

/// POST /api/v1/audit/advance
pub async fn advance(State(state): State<AppState>) -> Result<Json<WorkflowSnapshot>, ApiError> {
    let mut workflow = controller(&state)?;
    workflow.advance_to_evidence()?;
    Ok(Json(workflow.snapshot()))
}

/// POST /api/v1/audit/evidence: each `image` field becomes one evidence
/// image. Unreadable files are reported back and do not affect the others.
pub async fn add_evidence(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<EvidenceUploadResponse>, ApiError> {
    let uploads = image_fields(&mut multipart).await?;
    if uploads.is_empty() {
        return Err(ApiError::BadRequest(
            "Missing multipart field `image`".to_string(),
        ));
    }

    let mut workflow = controller(&state)?;
    let mut added = Vec::new();
    let mut rejected = Vec::new();
    for (index, bytes) in uploads.into_iter().enumerate() {
        match CapturedImage::from_bytes(bytes, ImageKind::Evidence) {
            Ok(image) => added.push(workflow.add_evidence(image)?),
            Err(e) => {
                tracing::warn!(index, error = %e, "Evidence upload rejected");
                rejected.push(format!("image #{}: {}", index + 1, e));
            }
        }
    }

    Ok(Json(EvidenceUploadResponse {
        added,
        rejected,
        snapshot: workflow.snapshot(),
    }))
}

/// POST /api/v1/audit/evidence/capture
pub async fn capture_evidence(
    State(state): State<AppState>,
) -> Result<Json<EvidenceUploadResponse>, ApiError> {
    let mut workflow = controller(&state)?;
    let image = capture_still(&state, ImageKind::Evidence).await?;
    let id = workflow.add_evidence(image)?;
    Ok(Json(EvidenceUploadResponse {
        added: vec![id],
        rejected: Vec::new(),
        snapshot: workflow.snapshot(),
    }))
}

/// POST /api/v1/audit/evidence/import: read several files from the import
/// directory at once. Unreadable files are reported back by name.
pub async fn import_evidence(
    State(state): State<AppState>,
    Json(request): Json<EvidenceImportRequest>,
) -> Result<Json<EvidenceUploadResponse>, ApiError> {
    request
        .validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let dir = state
        .import_dir
        .clone()
        .ok_or(ApiError::Unavailable("No import directory is configured"))?;
    let paths = request
        .files
        .iter()
        .map(|name| import_path(&dir, name))
        .collect::<Result<Vec<_>, _>>()?;

    let mut workflow = controller(&state)?;
    let mut added = Vec::new();
    let mut rejected = Vec::new();
    for (path, result) in load_files(&paths, ImageKind::Evidence).await {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match result {
            Ok(image) => added.push(workflow.add_evidence(image)?),
            Err(AcquisitionError::Read { source, .. }) => {
                rejected.push(format!("{name}: {source}"));
            }
            Err(e) => rejected.push(format!("{name}: {e}")),
        }
    }

    tracing::info!(added = added.len(), rejected = rejected.len(), "Evidence imported");
    Ok(Json(EvidenceUploadResponse {
        added,
        rejected,
        snapshot: workflow.snapshot(),
    }))
}

/// DELETE /api/v1/audit/evidence/{id}
pub async fn remove_evidence(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<WorkflowSnapshot>, ApiError> {
    let mut workflow = controller(&state)?;
    workflow.remove_evidence(id)?;
    Ok(Json(workflow.snapshot()))
}

/// POST /api/v1/audit/verify: enter `verifying` and run the pipeline in
/// the background. The controller stays locked until the run ends.
pub async fn start_verification(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<WorkflowSnapshot>), ApiError> {
    let mut workflow = state
        .workflow
        .clone()
        .try_lock_owned()
        .map_err(|_| ApiError::Busy)?;

    let pending = workflow.begin_verification()?;
    let snapshot = workflow.snapshot();

    tokio::spawn(async move {
        match workflow.complete_verification(pending).await {
            RunOutcome::Completed { status } => {
                tracing::info!(status = %status, "Verification run finished");
            }
            RunOutcome::Failed { reason } => {
                tracing::warn!(reason = %reason, "Verification run returned to evidence capture");
            }
        }
    });

    Ok((StatusCode::ACCEPTED, Json(snapshot)))
}

/// GET /api/v1/audit/report: the generated PDF.
pub async fn download_report(State(state): State<AppState>) -> Result<Response, ApiError> {
    let workflow = controller(&state)?;
    let outcome = workflow
        .outcome()
        .ok_or(ApiError::NotFound("No report has been generated"))?;

    let disposition = format!("attachment; filename=\"{}\"", outcome.report.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        outcome.report.pdf.clone(),
    )
        .into_response())
}

/// POST /api/v1/audit/reset: start a new audit from the report view.
pub async fn reset(State(state): State<AppState>) -> Result<Json<WorkflowSnapshot>, ApiError> {
    let mut workflow = controller(&state)?;
    workflow.reset()?;
    Ok(Json(workflow.snapshot()))
}
