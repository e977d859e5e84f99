use chrono::{DateTime, Local};
use reqwest::Client;
use serde_json::Value;

use crate::models::dashboard::{DashboardRecord, StatusFilter};

/// Read-only client for the audit history endpoint.
pub struct DashboardClient {
    http: Client,
    url: String,
}

impl DashboardClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            url: url.into(),
        }
    }

    /// Fetch the full record list.
    pub async fn fetch_records(&self) -> Result<Vec<DashboardRecord>, DashboardError> {
        let response = self.http.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DashboardError::Status(status.as_u16()));
        }

        let payload: Value = response.json().await?;
        let records = parse_records(payload)?;
        tracing::debug!(count = records.len(), "Dashboard records fetched");
        Ok(records)
    }
}

/// Interpret the endpoint payload: an array of records, or an object
/// carrying an `error` field. Anything else is an empty history.
pub fn parse_records(payload: Value) -> Result<Vec<DashboardRecord>, DashboardError> {
    match payload {
        Value::Array(_) => serde_json::from_value(payload).map_err(DashboardError::Schema),
        Value::Object(ref map) if map.contains_key("error") => {
            let message = match &map["error"] {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Err(DashboardError::Remote(message))
        }
        _ => Ok(Vec::new()),
    }
}

/// Keep records whose shipping number contains `shipping` (case-insensitive)
/// and whose status matches `status`.
pub fn filter_records<'a>(
    records: &'a [DashboardRecord],
    shipping: &str,
    status: StatusFilter,
) -> Vec<&'a DashboardRecord> {
    records
        .iter()
        .filter(|r| matches_shipping(r, shipping) && matches_status(r, status))
        .collect()
}

fn matches_shipping(record: &DashboardRecord, needle: &str) -> bool {
    record
        .shipping_number
        .to_lowercase()
        .contains(&needle.to_lowercase())
}

fn matches_status(record: &DashboardRecord, filter: StatusFilter) -> bool {
    match filter {
        StatusFilter::All => true,
        other => record.status.eq_ignore_ascii_case(&other.to_string()),
    }
}

/// `dd/MM/yyyy HH:mm:ss` in local time, `-` for empty, verbatim when the
/// value is not an RFC 3339 timestamp.
pub fn display_date(raw: &str) -> String {
    if raw.trim().is_empty() {
        return "-".to_string();
    }
    match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(parsed) => parsed
            .with_timezone(&Local)
            .format("%d/%m/%Y %H:%M:%S")
            .to_string(),
        Err(_) => raw.to_string(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("Dashboard request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Dashboard endpoint returned status {0}")]
    Status(u16),

    #[error("Dashboard endpoint reported an error: {0}")]
    Remote(String),

    #[error("Dashboard records are malformed: {0}")]
    Schema(#[from] serde_json::Error),
}
