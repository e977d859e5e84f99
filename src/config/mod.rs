use garde::Validate;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000").
    #[serde(default = "default_bind_addr")]
    #[garde(length(min = 1))]
    pub bind_addr: String,

    /// Gemini API key
    #[garde(length(min = 1))]
    pub gemini_api_key: String,

    /// Gemini REST base URL (overridable for tests and proxies)
    #[serde(default = "default_gemini_base_url")]
    #[garde(length(min = 1))]
    pub gemini_base_url: String,

    /// Model used for label extraction on the reference image
    #[serde(default = "default_extraction_model")]
    #[garde(length(min = 1))]
    pub extraction_model: String,

    /// Model used for the three-axis audit
    #[serde(default = "default_verification_model")]
    #[garde(length(min = 1))]
    pub verification_model: String,

    /// Language the audit narrative is written in
    #[serde(default = "default_report_language")]
    #[garde(length(min = 1, max = 40))]
    pub report_language: String,

    /// Spreadsheet/file-storage webhook receiving generated reports
    #[garde(length(min = 1))]
    pub upload_webhook_url: String,

    /// Endpoint listing past audit records
    #[garde(length(min = 1))]
    pub dashboard_url: String,

    /// Pause before showing the report after a successful run
    #[serde(default = "default_success_delay_ms")]
    #[garde(range(max = 60_000))]
    pub success_delay_ms: u64,

    /// Pause on the error status before returning to evidence capture
    #[serde(default = "default_failure_delay_ms")]
    #[garde(range(max = 60_000))]
    pub failure_delay_ms: u64,

    /// Request body cap for image uploads
    #[serde(default = "default_max_upload_bytes")]
    #[garde(range(min = 1024))]
    pub max_upload_bytes: usize,

    /// Still file kept current by the camera grabber; enables the capture endpoints
    #[garde(length(min = 1))]
    pub camera_snapshot_path: Option<String>,

    /// Directory evidence files can be imported from
    #[garde(length(min = 1))]
    pub import_dir: Option<String>,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_extraction_model() -> String {
    "gemini-3-flash-preview".to_string()
}

fn default_verification_model() -> String {
    "gemini-3-pro-preview".to_string()
}

fn default_report_language() -> String {
    "Spanish".to_string()
}

fn default_success_delay_ms() -> u64 {
    500
}

fn default_failure_delay_ms() -> u64 {
    3000
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let config: Self = envy::from_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn success_delay(&self) -> Duration {
        Duration::from_millis(self.success_delay_ms)
    }

    pub fn failure_delay(&self) -> Duration {
        Duration::from_millis(self.failure_delay_ms)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration from environment: {0}")]
    Env(#[from] envy::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] garde::Report),
}
