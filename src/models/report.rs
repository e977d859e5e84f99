use serde::Serialize;

use crate::models::verification::AuditStatus;

/// Metadata record sent alongside the document to the storage endpoint.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub shipping_number: String,
    pub ean: String,
    pub ql: String,
    pub description: String,
    pub status: AuditStatus,
}

/// A rendered audit report ready for download and upload.
#[derive(Debug, Clone)]
pub struct GeneratedReport {
    pub pdf: Vec<u8>,
    pub file_name: String,
    pub metadata: ReportMetadata,
    pub page_count: usize,
}

/// Body of the storage webhook request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadPayload<'a> {
    pub base64: String,
    pub file_name: &'a str,
    #[serde(flatten)]
    pub metadata: &'a ReportMetadata,
}

/// Whether the best-effort upload of a report reached storage.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StorageOutcome {
    Stored,
    Failed { reason: String },
}
