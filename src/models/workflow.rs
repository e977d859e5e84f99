use garde::Validate;
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

use crate::models::image::ImageSummary;
use crate::models::label::ClientValidationResult;
use crate::models::report::{ReportMetadata, StorageOutcome};
use crate::models::verification::VerificationVerdict;

/// Externally visible step of the audit workflow.
#[derive(Debug, Clone, Copy, Serialize, Display, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum WorkflowStep {
    CaptureReference,
    CaptureEvidence,
    Verifying,
    Report,
}

/// Point-in-time view of the workflow, published after every change.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowSnapshot {
    pub step: WorkflowStep,
    pub status: String,
    pub validating_reference: bool,
    pub reference: Option<ImageSummary>,
    pub validation: Option<ClientValidationResult>,
    pub evidence: Vec<ImageSummary>,
    pub report: Option<ReportSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub file_name: String,
    pub page_count: usize,
    pub metadata: ReportMetadata,
    pub verdict: VerificationVerdict,
    pub storage: StorageOutcome,
}

/// Body of `POST /api/v1/audit/evidence/import`: bare file names inside the
/// configured import directory.
#[derive(Debug, Deserialize, Validate)]
pub struct EvidenceImportRequest {
    #[garde(length(min = 1, max = 50), inner(length(min = 1, max = 255)))]
    pub files: Vec<String>,
}

/// Response for the evidence upload, capture and import endpoints.
#[derive(Debug, Serialize)]
pub struct EvidenceUploadResponse {
    pub added: Vec<Uuid>,
    pub rejected: Vec<String>,
    pub snapshot: WorkflowSnapshot,
}
