use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;

use crate::models::report::{GeneratedReport, UploadPayload};

/// Destination for finished audit reports.
#[async_trait]
pub trait ReportUploader: Send + Sync {
    async fn upload(&self, report: &GeneratedReport) -> Result<(), StorageError>;
}

/// Client for the spreadsheet/file-storage webhook.
///
/// The webhook answers with an opaque body that is never read; only
/// transport failures and error statuses are reported back.
pub struct WebhookUploader {
    http: Client,
    url: String,
}

impl WebhookUploader {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl ReportUploader for WebhookUploader {
    async fn upload(&self, report: &GeneratedReport) -> Result<(), StorageError> {
        let payload = UploadPayload {
            base64: base64::engine::general_purpose::STANDARD.encode(&report.pdf),
            file_name: &report.file_name,
            metadata: &report.metadata,
        };

        let response = self.http.post(&self.url).json(&payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::Status(status.as_u16()));
        }

        tracing::info!(
            file_name = %report.file_name,
            size_bytes = report.pdf.len(),
            "Report forwarded to storage"
        );
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Storage endpoint returned status {0}")]
    Status(u16),
}
