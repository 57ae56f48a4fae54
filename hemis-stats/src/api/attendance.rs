//! Attendance endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use super::error::{ApiError, ApiResult};
use crate::attendance::{AttendanceQuery, AttendanceReport, FilterOptions, GroupBy, OptionsQuery};
use crate::AppState;

/// Query parameters for option discovery
///
/// Kept as strings so malformed values get a JSON 400 instead of a plain-text rejection.
#[derive(Debug, Default, Deserialize)]
pub struct OptionsParams {
    pub faculty_id: Option<String>,
    pub education_form_id: Option<String>,
    pub curriculum_id: Option<String>,
}

/// Query parameters for attendance statistics
#[derive(Debug, Default, Deserialize)]
pub struct StatParams {
    pub group_id: Option<String>,
    pub semester: Option<String>,
    pub group_by: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Parse an optional numeric parameter; empty counts as absent
fn parse_opt<T: std::str::FromStr>(name: &str, value: Option<&str>) -> ApiResult<Option<T>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|_| ApiError::BadRequest(format!("{} must be an integer, got {:?}", name, v))),
    }
}

/// GET /api/monitoring/attendance/options
pub async fn attendance_options(
    State(state): State<AppState>,
    Query(params): Query<OptionsParams>,
) -> ApiResult<Json<FilterOptions>> {
    let query = OptionsQuery {
        faculty_id: parse_opt("faculty_id", params.faculty_id.as_deref())?,
        education_form_id: parse_opt("education_form_id", params.education_form_id.as_deref())?,
        curriculum_id: parse_opt("curriculum_id", params.curriculum_id.as_deref())?,
    };

    Ok(Json(state.attendance.filter_options(&query).await?))
}

/// GET /api/monitoring/attendance/stat
///
/// `group_id` is required.
pub async fn attendance_stat(
    State(state): State<AppState>,
    Query(params): Query<StatParams>,
) -> ApiResult<Json<AttendanceReport>> {
    let group_id: i64 = parse_opt("group_id", params.group_id.as_deref())?
        .ok_or_else(|| ApiError::BadRequest("group_id is required".to_string()))?;

    let mut query = AttendanceQuery::new(group_id);
    query.semester = parse_opt("semester", params.semester.as_deref())?;
    if let Some(page) = parse_opt("page", params.page.as_deref())? {
        query.page = page;
    }
    if let Some(limit) = parse_opt("limit", params.limit.as_deref())? {
        query.limit = limit;
    }
    if let Some(group_by) = params.group_by.as_deref().filter(|g| !g.is_empty()) {
        query.group_by = group_by.parse::<GroupBy>()?;
    }

    Ok(Json(state.attendance.attendance_stat(&query).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_opt() {
        assert_eq!(parse_opt::<i64>("x", None).unwrap(), None);
        assert_eq!(parse_opt::<i64>("x", Some("  ")).unwrap(), None);
        assert_eq!(parse_opt::<i64>("x", Some("12")).unwrap(), Some(12));
        assert!(matches!(parse_opt::<i64>("x", Some("abc")), Err(ApiError::BadRequest(_))));
    }
}
