//! Audit workflow controller.
//!
//! Four-step linear flow: capture the reference label, capture evidence of
//! the returned garment, run the verification pipeline, show the report.
//! Only the transitions implemented here exist; a call whose precondition
//! does not hold returns an error and leaves the state untouched.

use chrono::Local;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use uuid::Uuid;

use crate::models::image::{CapturedImage, ImageKind};
use crate::models::label::ClientValidationResult;
use crate::models::report::{GeneratedReport, StorageOutcome};
use crate::models::verification::{AuditStatus, VerificationVerdict};
use crate::models::workflow::{ReportSummary, WorkflowSnapshot, WorkflowStep};
use crate::services::gemini::{AiError, AuditAi};
use crate::services::report::{self, ReportError, ReportInput};
use crate::services::storage::ReportUploader;

pub const STATUS_IDLE: &str = "Starting process...";
pub const STATUS_ANALYZING: &str = "Analyzing garments with AI...";
pub const STATUS_GENERATING: &str = "Generating detailed PDF report...";
pub const STATUS_SYNCING: &str = "Syncing with document storage...";
pub const STATUS_FINALIZING: &str = "Finalizing audit...";
pub const STATUS_FAILED: &str = "Error during analysis. Please try again.";

/// Fixed pauses before leaving the `verifying` step.
#[derive(Debug, Clone, Copy)]
pub struct WorkflowDelays {
    pub success: Duration,
    pub failure: Duration,
}

impl Default for WorkflowDelays {
    fn default() -> Self {
        Self {
            success: Duration::from_millis(500),
            failure: Duration::from_millis(3000),
        }
    }
}

/// Result of a completed verification pipeline.
#[derive(Debug, Clone)]
pub struct AuditOutcome {
    pub verdict: VerificationVerdict,
    pub report: GeneratedReport,
    pub storage: StorageOutcome,
}

enum WorkflowState {
    CaptureReference,
    CaptureEvidence,
    Verifying,
    Report(Box<AuditOutcome>),
}

impl WorkflowState {
    fn step(&self) -> WorkflowStep {
        match self {
            WorkflowState::CaptureReference => WorkflowStep::CaptureReference,
            WorkflowState::CaptureEvidence => WorkflowStep::CaptureEvidence,
            WorkflowState::Verifying => WorkflowStep::Verifying,
            WorkflowState::Report(_) => WorkflowStep::Report,
        }
    }
}

/// Images and label data gathered for the audit in progress.
#[derive(Default)]
struct AuditContext {
    reference: Option<CapturedImage>,
    validation: Option<ClientValidationResult>,
    validating: bool,
    evidence: Vec<CapturedImage>,
}

/// A verification run that has entered `verifying` and awaits its pipeline.
pub struct PendingVerification {
    reference: CapturedImage,
    started: Instant,
}

/// How a verification run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed { status: AuditStatus },
    Failed { reason: String },
}

pub struct WorkflowController {
    ai: Arc<dyn AuditAi>,
    uploader: Arc<dyn ReportUploader>,
    delays: WorkflowDelays,
    state: WorkflowState,
    context: AuditContext,
    status: String,
    snapshots: watch::Sender<WorkflowSnapshot>,
}

impl WorkflowController {
    pub fn new(
        ai: Arc<dyn AuditAi>,
        uploader: Arc<dyn ReportUploader>,
        delays: WorkflowDelays,
    ) -> Self {
        let (snapshots, _) = watch::channel(empty_snapshot());
        Self {
            ai,
            uploader,
            delays,
            state: WorkflowState::CaptureReference,
            context: AuditContext::default(),
            status: STATUS_IDLE.to_string(),
            snapshots,
        }
    }

    /// Receiver that always holds the latest snapshot, readable while a
    /// verification run owns the controller.
    pub fn subscribe(&self) -> watch::Receiver<WorkflowSnapshot> {
        self.snapshots.subscribe()
    }

    pub fn step(&self) -> WorkflowStep {
        self.state.step()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn reference(&self) -> Option<&CapturedImage> {
        self.context.reference.as_ref()
    }

    pub fn validation(&self) -> Option<&ClientValidationResult> {
        self.context.validation.as_ref()
    }

    pub fn evidence(&self) -> &[CapturedImage] {
        &self.context.evidence
    }

    pub fn outcome(&self) -> Option<&AuditOutcome> {
        match &self.state {
            WorkflowState::Report(outcome) => Some(outcome),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        WorkflowSnapshot {
            step: self.step(),
            status: self.status.clone(),
            validating_reference: self.context.validating,
            reference: self.context.reference.as_ref().map(CapturedImage::summary),
            validation: self.context.validation.clone(),
            evidence: self.context.evidence.iter().map(CapturedImage::summary).collect(),
            report: self.outcome().map(|o| ReportSummary {
                file_name: o.report.file_name.clone(),
                page_count: o.report.page_count,
                metadata: o.report.metadata.clone(),
                verdict: o.verdict.clone(),
                storage: o.storage.clone(),
            }),
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.snapshot());
    }

    fn set_status(&mut self, status: &str) {
        self.status = status.to_string();
        tracing::info!(audit_step = %self.step(), status, "Audit status");
        self.publish();
    }

    fn ensure_step(&self, expected: WorkflowStep, action: &'static str) -> Result<(), WorkflowError> {
        let step = self.step();
        if step != expected {
            return Err(WorkflowError::InvalidTransition { step, action });
        }
        Ok(())
    }

    /// Replace the reference image and read its label. An extraction
    /// failure leaves the workflow without validation, which keeps it at
    /// the reference step.
    pub async fn submit_reference(&mut self, image: CapturedImage) -> Result<(), WorkflowError> {
        self.ensure_step(WorkflowStep::CaptureReference, "submit reference")?;
        if image.kind != ImageKind::Reference {
            return Err(WorkflowError::WrongImageKind {
                expected: ImageKind::Reference,
            });
        }

        metrics::counter!("audit_reference_extractions_total").increment(1);
        tracing::info!(image_id = %image.id, "Reference image captured, extracting label");

        self.context.validation = None;
        self.context.validating = true;
        self.context.reference = Some(image);
        self.publish();

        let extracted = match self.context.reference.as_ref() {
            Some(reference) => self.ai.extract_label(reference).await,
            None => Err(AiError::EmptyResponse),
        };

        self.context.validating = false;
        match extracted {
            Ok(validation) => self.context.validation = Some(validation),
            Err(e) => tracing::warn!(error = %e, "Label extraction unavailable"),
        }
        self.publish();
        Ok(())
    }

    /// Discard a reference image that has not been validated.
    pub fn remove_reference(&mut self) -> Result<(), WorkflowError> {
        self.ensure_step(WorkflowStep::CaptureReference, "remove reference")?;
        if self.reference_validated() {
            return Err(WorkflowError::ReferenceLocked);
        }
        self.context.reference = None;
        self.context.validation = None;
        self.publish();
        Ok(())
    }

    fn reference_validated(&self) -> bool {
        self.context.reference.is_some()
            && self.context.validation.as_ref().is_some_and(|v| v.is_valid)
    }

    pub fn can_advance(&self) -> bool {
        self.step() == WorkflowStep::CaptureReference
            && !self.context.validating
            && self.reference_validated()
    }

    /// `capture-reference → capture-evidence`, only with a validated label.
    pub fn advance_to_evidence(&mut self) -> Result<(), WorkflowError> {
        self.ensure_step(WorkflowStep::CaptureReference, "advance to evidence")?;
        if !self.can_advance() {
            return Err(WorkflowError::ReferenceNotValidated);
        }
        self.state = WorkflowState::CaptureEvidence;
        self.publish();
        Ok(())
    }

    pub fn add_evidence(&mut self, image: CapturedImage) -> Result<Uuid, WorkflowError> {
        self.ensure_step(WorkflowStep::CaptureEvidence, "add evidence")?;
        if image.kind != ImageKind::Evidence {
            return Err(WorkflowError::WrongImageKind {
                expected: ImageKind::Evidence,
            });
        }
        let id = image.id;
        self.context.evidence.push(image);
        tracing::debug!(image_id = %id, count = self.context.evidence.len(), "Evidence image added");
        self.publish();
        Ok(id)
    }

    pub fn remove_evidence(&mut self, id: Uuid) -> Result<(), WorkflowError> {
        self.ensure_step(WorkflowStep::CaptureEvidence, "remove evidence")?;
        let before = self.context.evidence.len();
        self.context.evidence.retain(|image| image.id != id);
        if self.context.evidence.len() == before {
            return Err(WorkflowError::UnknownImage(id));
        }
        self.publish();
        Ok(())
    }

    /// Preconditions of `capture-evidence → verifying`.
    pub fn ensure_can_verify(&self) -> Result<(), WorkflowError> {
        self.ensure_step(WorkflowStep::CaptureEvidence, "verify")?;
        if self.context.evidence.is_empty() {
            return Err(WorkflowError::NoEvidence);
        }
        if self.context.reference.is_none() {
            return Err(WorkflowError::ReferenceNotValidated);
        }
        Ok(())
    }

    pub fn can_verify(&self) -> bool {
        self.ensure_can_verify().is_ok()
    }

    /// Run verify → build report → upload in sequence.
    ///
    /// Pipeline failures are not returned as errors: they move the workflow
    /// back to evidence capture, with every captured image kept, after the
    /// failure delay.
    pub async fn run_verification(&mut self) -> Result<RunOutcome, WorkflowError> {
        let pending = self.begin_verification()?;
        Ok(self.complete_verification(pending).await)
    }

    /// Enter `verifying`. The returned token drives
    /// [`complete_verification`](Self::complete_verification).
    pub fn begin_verification(&mut self) -> Result<PendingVerification, WorkflowError> {
        self.ensure_can_verify()?;
        let reference = self
            .context
            .reference
            .clone()
            .ok_or(WorkflowError::ReferenceNotValidated)?;

        metrics::counter!("audit_verifications_total").increment(1);
        self.state = WorkflowState::Verifying;
        self.set_status(STATUS_ANALYZING);
        Ok(PendingVerification {
            reference,
            started: Instant::now(),
        })
    }

    pub async fn complete_verification(&mut self, pending: PendingVerification) -> RunOutcome {
        let PendingVerification { reference, started } = pending;

        match self.pipeline(&reference).await {
            Ok(outcome) => {
                let status = outcome.report.metadata.status;
                self.set_status(STATUS_FINALIZING);
                tokio::time::sleep(self.delays.success).await;
                self.state = WorkflowState::Report(Box::new(outcome));
                self.publish();

                metrics::counter!("audit_verifications_completed").increment(1);
                metrics::histogram!("audit_verification_seconds")
                    .record(started.elapsed().as_secs_f64());
                tracing::info!(
                    status = %status,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Audit completed"
                );
                RunOutcome::Completed { status }
            }
            Err(e) => {
                metrics::counter!("audit_verifications_failed").increment(1);
                tracing::error!(error = %e, "Verification pipeline failed");
                self.set_status(STATUS_FAILED);
                tokio::time::sleep(self.delays.failure).await;
                self.state = WorkflowState::CaptureEvidence;
                self.publish();
                RunOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn pipeline(&mut self, reference: &CapturedImage) -> Result<AuditOutcome, PipelineError> {
        let verdict = self
            .ai
            .verify_return(reference, &self.context.evidence)
            .await?;

        self.set_status(STATUS_GENERATING);
        let report = report::build_report(&ReportInput {
            verdict: &verdict,
            validation: self.context.validation.as_ref(),
            reference,
            evidence: &self.context.evidence,
            generated_at: Local::now().naive_local(),
        })?;

        self.set_status(STATUS_SYNCING);
        // Best-effort: a storage failure is recorded on the outcome and
        // never routes the workflow back.
        let storage = match self.uploader.upload(&report).await {
            Ok(()) => StorageOutcome::Stored,
            Err(e) => {
                metrics::counter!("audit_storage_upload_failures").increment(1);
                tracing::warn!(file_name = %report.file_name, error = %e, "Report upload failed");
                StorageOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };

        Ok(AuditOutcome {
            verdict,
            report,
            storage,
        })
    }

    /// `report → capture-reference`, clearing every captured item.
    pub fn reset(&mut self) -> Result<(), WorkflowError> {
        self.ensure_step(WorkflowStep::Report, "reset")?;
        self.state = WorkflowState::CaptureReference;
        self.context = AuditContext::default();
        self.status = STATUS_IDLE.to_string();
        self.publish();
        tracing::info!("Audit workflow reset");
        Ok(())
    }
}

fn empty_snapshot() -> WorkflowSnapshot {
    WorkflowSnapshot {
        step: WorkflowStep::CaptureReference,
        status: STATUS_IDLE.to_string(),
        validating_reference: false,
        reference: None,
        validation: None,
        evidence: Vec::new(),
        report: None,
    }
}

#[derive(Debug, thiserror::Error)]
enum PipelineError {
    #[error(transparent)]
    Ai(#[from] AiError),

    #[error(transparent)]
    Report(#[from] ReportError),
}

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Cannot {action} during step {step}")]
    InvalidTransition {
        step: WorkflowStep,
        action: &'static str,
    },

    #[error("Reference label has not been validated")]
    ReferenceNotValidated,

    #[error("A validated reference image can be replaced but not removed")]
    ReferenceLocked,

    #[error("At least one evidence image is required")]
    NoEvidence,

    #[error("Expected a {expected} image")]
    WrongImageKind { expected: ImageKind },

    #[error("No evidence image with id {0}")]
    UnknownImage(Uuid),
}
