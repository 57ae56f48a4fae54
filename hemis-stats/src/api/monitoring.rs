//! Contingent reporting endpoints

use axum::{extract::State, Json};
use hemis_common::{Summary, Table};

use super::error::ApiResult;
use crate::AppState;

/// GET /api/monitoring/faculty-table-data
///
/// Faculty × education-form table.
pub async fn faculty_table_data(State(state): State<AppState>) -> ApiResult<Json<Table>> {
    Ok(Json(state.reports.get_table().await?))
}

/// GET /api/monitoring/student-contingent
///
/// Dashboard summary, always projected from the same table as the endpoint above.
pub async fn student_contingent(State(state): State<AppState>) -> ApiResult<Json<Summary>> {
    Ok(Json(state.reports.get_summary().await?))
}
