//! HEMIS upstream API seam
//!
//! [`HemisApi`] is the only way the engine talks to HEMIS. Production code uses
//! [`HemisClient`]; tests substitute scripted fakes.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::filters::CountFilter;

pub mod client;
pub mod envelope;

pub use client::HemisClient;

pub const STUDENT_LIST: &str = "/v1/data/student-list";
pub const DEPARTMENT_LIST: &str = "/v1/data/department-list";
pub const CLASSIFIER_LIST: &str = "/v1/data/classifier-list";
pub const CURRICULUM_LIST: &str = "/v1/data/curriculum-list";
pub const GROUP_LIST: &str = "/v1/data/group-list";
pub const SEMESTER_LIST: &str = "/v1/data/semester-list";
pub const ATTENDANCE_STAT: &str = "/v1/data/attendance-stat";

/// Query parameters for one upstream request
pub type Params = Vec<(&'static str, String)>;

/// Upstream request errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("Network error: {0}")]
    Transport(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("API error {0}: {1}")]
    Status(u16, String),

    #[error("Parse error: {0}")]
    Decode(String),
}

/// HEMIS REST API
///
/// Implementors provide `get_json`; the typed endpoint helpers are built on top of it.
#[async_trait]
pub trait HemisApi: Send + Sync {
    /// GET `endpoint` with `params`, returning the decoded JSON body of a 2xx response
    async fn get_json(&self, endpoint: &str, params: &[(&'static str, String)])
        -> Result<Value, UpstreamError>;

    /// One page (`limit=1`) of the student listing; only the pagination total matters
    async fn student_count_page(&self, filter: &CountFilter) -> Result<Value, UpstreamError> {
        self.get_json(STUDENT_LIST, &filter.query_params()).await
    }

    async fn department_list(&self, limit: u32) -> Result<Value, UpstreamError> {
        self.get_json(DEPARTMENT_LIST, &[("limit", limit.to_string())])
            .await
    }

    async fn classifier_list(&self, params: &[(&'static str, String)]) -> Result<Value, UpstreamError> {
        self.get_json(CLASSIFIER_LIST, params).await
    }
}
