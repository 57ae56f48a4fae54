//! Attendance reporting
//!
//! Filter option discovery for the attendance dashboard and a normalized passthrough
//! of the HEMIS attendance statistics endpoint. Optional option lists degrade to empty
//! (or to a static range for semesters) rather than failing the whole request.

use hemis_common::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;

use crate::dimensions::DimensionResolver;
use crate::upstream::{
    envelope, HemisApi, Params, ATTENDANCE_STAT, CURRICULUM_LIST, GROUP_LIST, SEMESTER_LIST,
};

/// Education forms offered as attendance filters, in display order
pub const ATTENDANCE_FORM_ORDER: [i64; 13] = [11, 13, 15, 14, 12, 16, 20, 21, 19, 18, 17, 22, 23];

const OPTION_LIST_LIMIT: u32 = 200;
const SEMESTER_LIST_LIMIT: u32 = 50;
const STATIC_SEMESTERS: std::ops::RangeInclusive<i64> = 1..=12;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOption {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub faculties: Vec<FilterOption>,
    pub education_forms: Vec<FilterOption>,
    pub curricula: Vec<FilterOption>,
    pub groups: Vec<FilterOption>,
    pub semesters: Vec<FilterOption>,
}

/// Narrowing filters for option discovery
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptionsQuery {
    pub faculty_id: Option<i64>,
    pub education_form_id: Option<i64>,
    pub curriculum_id: Option<i64>,
}

/// Aggregation level of attendance statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    #[default]
    Group,
    Department,
    University,
}

impl GroupBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupBy::Group => "group",
            GroupBy::Department => "department",
            GroupBy::University => "university",
        }
    }
}

impl FromStr for GroupBy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "group" => Ok(GroupBy::Group),
            "department" => Ok(GroupBy::Department),
            "university" => Ok(GroupBy::University),
            other => Err(Error::InvalidInput(format!("unsupported group_by: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceQuery {
    pub group_id: i64,
    pub semester: Option<i64>,
    pub group_by: GroupBy,
    pub page: u32,
    pub limit: u32,
}

impl AttendanceQuery {
    pub fn new(group_id: i64) -> Self {
        Self {
            group_id,
            semester: None,
            group_by: GroupBy::default(),
            page: 1,
            limit: 200,
        }
    }

    fn params(&self) -> Params {
        let mut params = vec![
            ("page", self.page.max(1).to_string()),
            ("limit", self.limit.max(1).to_string()),
            ("group_by", self.group_by.as_str().to_string()),
            ("_group", self.group_id.to_string()),
        ];
        if let Some(semester) = self.semester {
            params.push(("_semester", semester.to_string()));
        }
        params
    }
}

/// One attendance statistics row
///
/// `absent_on` / `absent_off` are the raw HEMIS "on"/"off" absence figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRow {
    pub entity: String,
    pub date: String,
    pub timestamp: String,
    pub university: String,
    pub department: String,
    pub group: String,
    pub students: u64,
    pub lessons: u64,
    pub absent_on: u64,
    pub absent_off: u64,
    pub on_percent: f64,
    pub off_percent: f64,
    pub total_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceReport {
    pub rows: Vec<AttendanceRow>,
    pub count: usize,
}

pub struct AttendanceService {
    api: Arc<dyn HemisApi>,
    resolver: DimensionResolver,
}

impl AttendanceService {
    pub fn new(api: Arc<dyn HemisApi>) -> Self {
        Self {
            resolver: DimensionResolver::new(api.clone()),
            api,
        }
    }

    pub async fn filter_options(&self, query: &OptionsQuery) -> Result<FilterOptions> {
        let mut faculties: Vec<FilterOption> = self
            .resolver
            .resolve_faculties()
            .await?
            .into_iter()
            .map(|m| FilterOption { id: m.id, name: m.name })
            .collect();
        faculties.sort_by(|a, b| a.name.cmp(&b.name));

        let mut education_forms: Vec<FilterOption> = self
            .resolver
            .resolve_forms()
            .await
            .into_iter()
            .filter(|m| ATTENDANCE_FORM_ORDER.contains(&m.id))
            .map(|m| FilterOption { id: m.id, name: m.name })
            .collect();
        education_forms.sort_by_key(|f| ATTENDANCE_FORM_ORDER.iter().position(|id| *id == f.id));

        let mut curriculum_params = vec![("limit", OPTION_LIST_LIMIT.to_string())];
        if let Some(id) = query.faculty_id {
            curriculum_params.push(("_department", id.to_string()));
        }
        if let Some(id) = query.education_form_id {
            curriculum_params.push(("_education_form", id.to_string()));
        }
        let curricula = self
            .named_options(CURRICULUM_LIST, &curriculum_params, "Curriculum")
            .await;

        let mut group_params = vec![("limit", OPTION_LIST_LIMIT.to_string())];
        if let Some(id) = query.curriculum_id {
            group_params.push(("_curriculum", id.to_string()));
        }
        if let Some(id) = query.faculty_id {
            group_params.push(("_department", id.to_string()));
        }
        if let Some(id) = query.education_form_id {
            group_params.push(("_education_form", id.to_string()));
        }
        let groups = self.named_options(GROUP_LIST, &group_params, "Group").await;

        let semesters = self.semesters().await;

        Ok(FilterOptions {
            faculties,
            education_forms,
            curricula,
            groups,
            semesters,
        })
    }

    pub async fn attendance_stat(&self, query: &AttendanceQuery) -> Result<AttendanceReport> {
        let payload = self
            .api
            .get_json(ATTENDANCE_STAT, &query.params())
            .await
            .map_err(|e| Error::Upstream(format!("attendance-stat: {}", e)))?;

        let rows: Vec<AttendanceRow> = envelope::items(&payload).iter().map(attendance_row).collect();
        tracing::debug!(group_id = query.group_id, rows = rows.len(), "Attendance statistics fetched");

        Ok(AttendanceReport {
            count: rows.len(),
            rows,
        })
    }

    /// `{id, name}` options from a listing; name falls back to code, then `"<label> <id>"`
    async fn named_options(&self, endpoint: &str, params: &[(&'static str, String)], label: &str) -> Vec<FilterOption> {
        let payload = match self.api.get_json(endpoint, params).await {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(endpoint, error = %e, "Option list fetch failed");
                return Vec::new();
            }
        };

        let mut options: Vec<FilterOption> = envelope::items(&payload)
            .iter()
            .filter_map(|item| {
                let id = envelope::id_field(item, "id")?;
                let name = envelope::text_field(item, "name")
                    .or_else(|| envelope::text_field(item, "code"))
                    .unwrap_or_else(|| format!("{} {}", label, id));
                Some(FilterOption { id, name })
            })
            .collect();
        options.sort_by(|a, b| a.name.cmp(&b.name));
        options
    }

    async fn semesters(&self) -> Vec<FilterOption> {
        let fallback = || {
            STATIC_SEMESTERS
                .map(|i| FilterOption { id: i, name: i.to_string() })
                .collect::<Vec<_>>()
        };

        let payload = match self
            .api
            .get_json(SEMESTER_LIST, &[("limit", SEMESTER_LIST_LIMIT.to_string())])
            .await
        {
            Ok(payload) => payload,
            Err(e) => {
                tracing::debug!(error = %e, "Semester list unavailable, using 1..=12");
                return fallback();
            }
        };

        let mut semesters: Vec<FilterOption> = envelope::items(&payload)
            .iter()
            .filter_map(|item| {
                let id = envelope::id_field(item, "id").or_else(|| envelope::id_field(item, "code"))?;
                let name = envelope::text_field(item, "name").unwrap_or_else(|| id.to_string());
                Some(FilterOption { id, name })
            })
            .collect();

        if semesters.is_empty() {
            return fallback();
        }
        semesters.sort_by_key(|s| s.id);
        semesters
    }
}

/// First present key among lower- and upper-case spellings
fn field<'a>(item: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| item.get(*k))
        .find(|v| !v.is_null())
}

fn text(item: &Value, keys: &[&str]) -> String {
    field(item, keys).map(envelope::display_string).unwrap_or_default()
}

fn count(item: &Value, keys: &[&str]) -> u64 {
    field(item, keys).and_then(envelope::coerce_count).unwrap_or(0)
}

fn percent(item: &Value, keys: &[&str]) -> f64 {
    match field(item, keys) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn attendance_row(item: &Value) -> AttendanceRow {
    AttendanceRow {
        entity: text(item, &["_entityname", "entity", "_entityName"]),
        date: text(item, &["date", "DATE"]),
        timestamp: text(item, &["timestamp", "TIMESTAMP"]),
        university: text(item, &["university", "UNIVERSITY"]),
        department: text(item, &["department", "DEPARTMENT"]),
        group: text(item, &["group", "GROUP"]),
        students: count(item, &["students", "STUDENTS"]),
        lessons: count(item, &["lessons", "LESSONS"]),
        absent_on: count(item, &["absent_on", "ABSENT_ON"]),
        absent_off: count(item, &["absent_off", "ABSENT_OFF"]),
        on_percent: percent(item, &["on_percent", "ON_PERCENT"]),
        off_percent: percent(item, &["off_percent", "OFF_PERCENT"]),
        total_percent: percent(item, &["total_percent", "TOTAL_PERCENT"]),
    }
}
