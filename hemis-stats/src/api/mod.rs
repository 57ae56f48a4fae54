//! HTTP API handlers for hemis-stats

pub mod attendance;
pub mod error;
pub mod health;
pub mod monitoring;

pub use attendance::{attendance_options, attendance_stat};
pub use error::{ApiError, ApiResult};
pub use health::health_routes;
pub use monitoring::{faculty_table_data, student_contingent};
