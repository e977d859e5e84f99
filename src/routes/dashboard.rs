use axum::extract::{Query, State};
use axum::Json;
use garde::Validate;

use crate::app_state::AppState;
use crate::models::dashboard::{DashboardQuery, DashboardResponse, DashboardRow, StatusFilter};
use crate::routes::ApiError;
use crate::services::dashboard::{display_date, filter_records};

/// GET /api/v1/dashboard?shipping=&status=: past audits, filtered.
pub async fn list_records(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DashboardResponse>, ApiError> {
    query
        .validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") => StatusFilter::All,
        Some(raw) => raw
            .parse::<StatusFilter>()
            .map_err(|_| ApiError::BadRequest(format!("Unknown status filter `{raw}`")))?,
    };

    let records = state.dashboard.fetch_records().await.map_err(|e| {
        tracing::warn!(error = %e, "Dashboard fetch failed");
        ApiError::Upstream(e.to_string())
    })?;

    let rows = filter_records(&records, query.shipping.trim(), status)
        .into_iter()
        .map(|record| DashboardRow {
            display_date: display_date(&record.date),
            record: record.clone(),
        })
        .collect();

    Ok(Json(DashboardResponse {
        total: records.len(),
        records: rows,
    }))
}
