use base64::Engine;
use serde::Serialize;
use strum::Display;
use uuid::Uuid;

/// Role of a captured image within an audit.
#[derive(Debug, Clone, Copy, Serialize, Display, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ImageKind {
    /// Photograph of the original shipping label.
    Reference,
    /// Photograph of the physically returned garment.
    Evidence,
}

/// An encoded still image held in memory for the current audit.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    pub id: Uuid,
    pub kind: ImageKind,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

impl CapturedImage {
    /// Base64 payload used for inline AI attachments.
    pub fn base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }

    pub fn summary(&self) -> ImageSummary {
        ImageSummary {
            id: self.id,
            kind: self.kind,
            mime_type: self.mime_type,
            size_bytes: self.bytes.len(),
        }
    }
}

/// Byte-free view of a captured image for API responses.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ImageSummary {
    pub id: Uuid,
    pub kind: ImageKind,
    pub mime_type: &'static str,
    pub size_bytes: usize,
}
