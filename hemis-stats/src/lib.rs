//! hemis-stats library - student contingent reporting over the HEMIS API
//!
//! Rebuilds the faculty × education-form table from many single-count upstream
//! queries and serves it, plus a summary derived from it, over HTTP.

use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod aggregator;
pub mod api;
pub mod attendance;
pub mod cache;
pub mod dimensions;
pub mod fetcher;
pub mod filters;
pub mod reconciler;
pub mod report;
pub mod retry;
pub mod summary;
pub mod upstream;

use attendance::AttendanceService;
use report::ReportService;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub reports: Arc<ReportService>,
    pub attendance: Arc<AttendanceService>,
}

impl AppState {
    /// Create new application state
    pub fn new(reports: ReportService, attendance: AttendanceService) -> Self {
        Self {
            reports: Arc::new(reports),
            attendance: Arc::new(attendance),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    let monitoring = Router::new()
        .route("/api/monitoring/faculty-table-data", get(api::faculty_table_data))
        .route("/api/monitoring/student-contingent", get(api::student_contingent))
        .route("/api/monitoring/attendance/options", get(api::attendance_options))
        .route("/api/monitoring/attendance/stat", get(api::attendance_stat));

    Router::new()
        .merge(monitoring)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
