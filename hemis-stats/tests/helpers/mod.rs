//! In-process HEMIS stand-in for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use hemis_common::config::AggregationConfig;
use hemis_stats::attendance::AttendanceService;
use hemis_stats::cache::InMemoryCache;
use hemis_stats::report::ReportService;
use hemis_stats::retry::RetryPolicy;
use hemis_stats::upstream::{
    HemisApi, UpstreamError, ATTENDANCE_STAT, CLASSIFIER_LIST, DEPARTMENT_LIST, STUDENT_LIST,
};
use hemis_stats::AppState;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// (faculty, form) filter of one count query
pub type CountKey = (Option<i64>, Option<i64>);

#[derive(Clone)]
enum CountReply {
    Total(u64),
    /// Total reported under `data.pagination` instead of top-level `pagination`
    Nested(u64),
    Timeout,
}

/// Scripted HEMIS: faculties, forms and per-filter student counts
///
/// Counts that are not scripted report 0. Every call is recorded.
#[derive(Default)]
pub struct FakeHemis {
    faculties: Vec<(i64, String)>,
    departments_down: bool,
    forms: Vec<(i64, String)>,
    counts: HashMap<CountKey, CountReply>,
    attendance: Option<Value>,
    count_calls: Mutex<HashMap<CountKey, usize>>,
    total_calls: AtomicUsize,
}

impl FakeHemis {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn faculty(mut self, id: i64, name: &str) -> Self {
        self.faculties.push((id, name.to_string()));
        self
    }

    pub fn form(mut self, id: i64, name: &str) -> Self {
        self.forms.push((id, name.to_string()));
        self
    }

    pub fn departments_down(mut self) -> Self {
        self.departments_down = true;
        self
    }

    pub fn faculty_total(self, faculty: i64, total: u64) -> Self {
        self.with_count((Some(faculty), None), CountReply::Total(total))
    }

    pub fn faculty_total_nested(self, faculty: i64, total: u64) -> Self {
        self.with_count((Some(faculty), None), CountReply::Nested(total))
    }

    pub fn faculty_timeout(self, faculty: i64) -> Self {
        self.with_count((Some(faculty), None), CountReply::Timeout)
    }

    pub fn form_total(self, form: i64, total: u64) -> Self {
        self.with_count((None, Some(form)), CountReply::Total(total))
    }

    pub fn cell(self, faculty: i64, form: i64, total: u64) -> Self {
        self.with_count((Some(faculty), Some(form)), CountReply::Total(total))
    }

    pub fn attendance(mut self, payload: Value) -> Self {
        self.attendance = Some(payload);
        self
    }

    fn with_count(mut self, key: CountKey, reply: CountReply) -> Self {
        self.counts.insert(key, reply);
        self
    }

    pub fn count_calls(&self, key: CountKey) -> usize {
        self.count_calls.lock().unwrap().get(&key).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.total_calls.load(Ordering::SeqCst)
    }

    fn departments(&self) -> Value {
        let mut items: Vec<Value> = self
            .faculties
            .iter()
            .map(|(id, name)| json!({"id": id, "name": name, "structureType": {"code": "11", "name": "Fakultet"}}))
            .collect();
        // A non-faculty unit that must be ignored
        items.push(json!({"id": 9000, "name": "Rektorat", "structureType": {"code": "12"}}));
        json!({"success": true, "data": {"items": items}})
    }

    fn classifier(&self) -> Value {
        let options: Vec<Value> = self
            .forms
            .iter()
            .map(|(id, name)| json!({"code": id.to_string(), "name": name}))
            .collect();
        json!({"success": true, "data": {"items": [{"classifier": "h_education_form", "options": options}]}})
    }

    fn student_count(&self, params: &[(&'static str, String)]) -> Result<Value, UpstreamError> {
        let param = |name: &str| {
            params
                .iter()
                .find(|(k, _)| *k == name)
                .and_then(|(_, v)| v.parse::<i64>().ok())
        };
        let key = (param("_department"), param("_education_form"));
        *self.count_calls.lock().unwrap().entry(key).or_insert(0) += 1;

        match self.counts.get(&key).cloned().unwrap_or(CountReply::Total(0)) {
            CountReply::Total(total) => Ok(json!({"success": true, "pagination": {"totalCount": total}})),
            CountReply::Nested(total) => {
                Ok(json!({"success": true, "data": {"items": [], "pagination": {"totalCount": total}}}))
            }
            CountReply::Timeout => Err(UpstreamError::Timeout),
        }
    }
}

#[async_trait]
impl HemisApi for FakeHemis {
    async fn get_json(&self, endpoint: &str, params: &[(&'static str, String)]) -> Result<Value, UpstreamError> {
        self.total_calls.fetch_add(1, Ordering::SeqCst);
        match endpoint {
            STUDENT_LIST => self.student_count(params),
            DEPARTMENT_LIST if self.departments_down => {
                Err(UpstreamError::Status(503, "Service Unavailable".to_string()))
            }
            DEPARTMENT_LIST => Ok(self.departments()),
            CLASSIFIER_LIST if !self.forms.is_empty() => Ok(self.classifier()),
            ATTENDANCE_STAT => self
                .attendance
                .clone()
                .ok_or_else(|| UpstreamError::Status(500, "Internal Server Error".to_string())),
            _ => Err(UpstreamError::Status(404, format!("not found: {}", endpoint))),
        }
    }
}

/// Report service over `fake` with an in-memory cache and no retry sleeps
pub fn report_service(fake: Arc<FakeHemis>) -> ReportService {
    let config = AggregationConfig {
        max_workers: 4,
        ..AggregationConfig::default()
    };
    report_service_with(fake, &config)
}

pub fn report_service_with(fake: Arc<FakeHemis>, config: &AggregationConfig) -> ReportService {
    ReportService::with_policy(fake, Arc::new(InMemoryCache::new()), config, RetryPolicy::immediate(3))
}

pub fn app_state(fake: Arc<FakeHemis>) -> AppState {
    AppState::new(report_service(fake.clone()), AttendanceService::new(fake))
}
