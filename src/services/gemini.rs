use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::models::image::CapturedImage;
use crate::models::label::{ClientValidationResult, NOT_DETECTED};
use crate::models::verification::VerificationVerdict;

/// Multimodal AI operations used by the audit workflow.
#[async_trait]
pub trait AuditAi: Send + Sync {
    /// Read label metadata from the reference image and judge whether it is
    /// usable.
    async fn extract_label(
        &self,
        reference: &CapturedImage,
    ) -> Result<ClientValidationResult, AiError>;

    /// Run the three-axis audit of the returned garment against the label.
    async fn verify_return(
        &self,
        reference: &CapturedImage,
        evidence: &[CapturedImage],
    ) -> Result<VerificationVerdict, AiError>;
}

/// Client for the Gemini `generateContent` REST API.
pub struct GeminiClient {
    http: Client,
    base_url: String,
    api_key: String,
    extraction_model: String,
    verification_model: String,
    language: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: &'a str },
    Inline { inline_data: InlineData<'a> },
}

#[derive(Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
    #[serde(rename = "responseSchema")]
    response_schema: Value,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        extraction_model: impl Into<String>,
        verification_model: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            extraction_model: extraction_model.into(),
            verification_model: verification_model.into(),
            language: language.into(),
        }
    }

    async fn generate<T: DeserializeOwned>(
        &self,
        model: &str,
        parts: Vec<Part<'_>>,
        schema: Value,
    ) -> Result<T, AiError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);

        let request_body = GenerateRequest {
            contents: [Content { parts }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: schema,
            },
        };

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let generated: GenerateResponse = response.json().await?;
        let text = generated
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .filter(|t| !t.trim().is_empty())
            .ok_or(AiError::EmptyResponse)?;

        serde_json::from_str(&text).map_err(AiError::Schema)
    }
}

#[async_trait]
impl AuditAi for GeminiClient {
    async fn extract_label(
        &self,
        reference: &CapturedImage,
    ) -> Result<ClientValidationResult, AiError> {
        let prompt = extraction_prompt();
        let parts = vec![Part::Text { text: &prompt }, inline(reference)];

        let start = std::time::Instant::now();
        let result: ClientValidationResult = self
            .generate(&self.extraction_model, parts, extraction_schema())
            .await?;

        tracing::info!(
            image_id = %reference.id,
            duration_ms = start.elapsed().as_millis() as u64,
            is_valid = result.is_valid,
            missing_fields = result.missing_fields.len(),
            "Label extraction complete"
        );
        Ok(result)
    }

    async fn verify_return(
        &self,
        reference: &CapturedImage,
        evidence: &[CapturedImage],
    ) -> Result<VerificationVerdict, AiError> {
        if evidence.is_empty() {
            return Err(AiError::NoEvidence);
        }

        let prompt = audit_prompt(&self.language);
        let mut parts = Vec::with_capacity(evidence.len() + 2);
        parts.push(Part::Text { text: &prompt });
        parts.push(inline(reference));
        parts.extend(evidence.iter().map(inline));

        let start = std::time::Instant::now();
        let verdict: VerificationVerdict = self
            .generate(&self.verification_model, parts, verdict_schema())
            .await?;

        tracing::info!(
            evidence_count = evidence.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            ean_match = %verdict.ean_match,
            visual_match = %verdict.visual_match,
            damage_detected = %verdict.damage_detected,
            "Return audit complete"
        );
        Ok(verdict)
    }
}

fn inline(image: &CapturedImage) -> Part<'_> {
    Part::Inline {
        inline_data: InlineData {
            mime_type: image.mime_type,
            data: image.base64(),
        },
    }
}

fn extraction_prompt() -> String {
    format!(
        concat!(
            "Extract the data from this shipping label. ",
            "Required fields: shippingNumber, ean, ql, brand, color, size, vendorSize, description. ",
            "If a field is not visible, use \"{}\". ",
            "isValid is true only if at least the shipping number was found. ",
            "Return strictly JSON."
        ),
        NOT_DETECTED
    )
}

fn audit_prompt(language: &str) -> String {
    format!(
        r#"Act as an expert textile quality-control inspector. Audit the returned item strictly following this protocol.
The first image is the client's shipping label; every following image shows the returned product.

1. EAN CODE / REFERENCE:
- Task: compare the label's EAN code with any reference visible on the garment.
- Criterion: if the numbers match or the garment clearly corresponds to that reference, status "OK". Otherwise "WARNING".

2. APPEARANCE AND AUTHENTICITY:
- Task: check that model, brand, color and logos of the returned item match the label.
- Criterion: if everything is consistent, status "OK". Any discrepancy, status "WARNING".

3. CONDITION AND INTEGRITY (CRITICAL):
- Task: inspect carefully for
  * Stains: dirt, make-up, fluids.
  * Tears: holes, open seams, loose threads.
  * Signs of use: excessive creasing, missing inner composition labels, visible wear.
  * Tampering: repair attempts or aggressively removed labels.
- COHERENCE RULE: if the garment is SPOTLESS the status is "OK". If you detect ANY of the defects above the status MUST be "WARNING". You cannot state "no damage" and set "WARNING", nor the reverse.

Language: {language}.
Make sure damageDetected is WARNING whenever damageDetails mentions any anomaly."#
    )
}

fn extraction_schema() -> Value {
    let field = json!({ "type": "STRING" });
    json!({
        "type": "OBJECT",
        "properties": {
            "isValid": {
                "type": "BOOLEAN",
                "description": "True if at least the shipping number is found"
            },
            "missingFields": { "type": "ARRAY", "items": { "type": "STRING" } },
            "detectedData": {
                "type": "OBJECT",
                "properties": {
                    "shippingNumber": field,
                    "ean": field,
                    "ql": field,
                    "brand": field,
                    "color": field,
                    "size": field,
                    "vendorSize": field,
                    "description": field
                },
                "required": ["shippingNumber", "ean", "ql", "brand", "color", "size", "vendorSize", "description"]
            }
        },
        "required": ["isValid", "missingFields", "detectedData"]
    })
}

fn verdict_schema() -> Value {
    let axis = json!({ "type": "STRING", "enum": ["OK", "WARNING"] });
    let text = json!({ "type": "STRING" });
    json!({
        "type": "OBJECT",
        "properties": {
            "eanMatch": axis,
            "visualMatch": axis,
            "damageDetected": {
                "type": "STRING",
                "enum": ["OK", "WARNING"],
                "description": "WARNING if there are stains, tears, signs of use or tampering."
            },
            "eanDetails": text,
            "clientEan": text,
            "returnEan": text,
            "shippingNumber": text,
            "visualDetails": text,
            "damageDetails": text,
            "summary": text
        },
        "required": [
            "eanMatch", "visualMatch", "damageDetected", "eanDetails", "clientEan",
            "returnEan", "shippingNumber", "visualDetails", "damageDetails", "summary"
        ]
    })
}

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("AI service returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("AI service returned no content")]
    EmptyResponse,

    #[error("AI response does not match the expected schema: {0}")]
    Schema(#[from] serde_json::Error),

    #[error("At least one evidence image is required")]
    NoEvidence,
}
