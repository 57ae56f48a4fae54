//! Count query filter sets

use std::fmt;

/// Constraint set of one upstream count query
///
/// Always scoped to a student status (the "active" code in practice). Equality is
/// structural, so two filters with the same constraints are the same query no matter
/// how they were built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CountFilter {
    pub faculty: Option<i64>,
    pub form: Option<i64>,
    pub status: i64,
}

impl CountFilter {
    /// All students of one faculty
    pub fn faculty(faculty_id: i64, status: i64) -> Self {
        Self {
            faculty: Some(faculty_id),
            form: None,
            status,
        }
    }

    /// All students of one education form
    pub fn form(form_id: i64, status: i64) -> Self {
        Self {
            faculty: None,
            form: Some(form_id),
            status,
        }
    }

    /// One faculty × form cell
    pub fn cell(faculty_id: i64, form_id: i64, status: i64) -> Self {
        Self {
            faculty: Some(faculty_id),
            form: Some(form_id),
            status,
        }
    }

    /// Student-list query parameters; `limit=1` since only the total is read
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("page", "1".to_string()), ("limit", "1".to_string())];
        if let Some(id) = self.faculty {
            params.push(("_department", id.to_string()));
        }
        if let Some(id) = self.form {
            params.push(("_education_form", id.to_string()));
        }
        params.push(("_student_status", self.status.to_string()));
        params
    }
}

impl fmt::Display for CountFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "status={}", self.status)?;
        if let Some(id) = self.faculty {
            write!(f, " faculty={}", id)?;
        }
        if let Some(id) = self.form {
            write!(f, " form={}", id)?;
        }
        Ok(())
    }
}
