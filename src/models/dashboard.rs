use garde::Validate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A historical audit entry as stored by the spreadsheet backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardRecord {
    pub date: String,
    pub shipping_number: String,
    pub ean: String,
    pub ql: String,
    pub description: String,
    pub status: String,
    pub link: String,
}

/// Status predicate of the dashboard filter.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Display, EnumString, PartialEq, Eq)]
#[strum(ascii_case_insensitive)]
pub enum StatusFilter {
    #[default]
    All,
    #[strum(serialize = "OK")]
    #[serde(rename = "OK")]
    Ok,
    Warning,
}

/// Query string of `GET /api/v1/dashboard`.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct DashboardQuery {
    #[garde(length(max = 100))]
    #[serde(default)]
    pub shipping: String,

    #[garde(skip)]
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub total: usize,
    pub records: Vec<DashboardRow>,
}

/// Dashboard record with its display-formatted date.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardRow {
    pub display_date: String,
    #[serde(flatten)]
    pub record: DashboardRecord,
}
