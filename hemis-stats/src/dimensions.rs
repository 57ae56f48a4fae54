//! Dimension discovery: faculties and education forms
//!
//! Faculty discovery failure is fatal to a run (nothing to reconcile). Education forms
//! degrade instead: classifier lookup → full classifier scan → static catalog.

use hemis_common::report::UNKNOWN_LABEL;
use hemis_common::{Error, Member, Result};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

use crate::upstream::{envelope, HemisApi};

/// `structureType.code` of top-level academic faculties
pub const FACULTY_STRUCTURE_CODE: &str = "11";
/// Classifier holding education forms
pub const EDUCATION_FORM_CLASSIFIER: &str = "h_education_form";

const DEPARTMENT_LIMIT: u32 = 1000;
const CLASSIFIER_SCAN_LIMIT: u32 = 200;

/// Known education forms, used when the classifier cannot be read
pub fn static_form_catalog() -> Vec<Member> {
    vec![
        Member::new(11, "Kunduzgi"),
        Member::new(12, "Kechki"),
        Member::new(13, "Sirtqi"),
        Member::new(14, "Masofaviy"),
        Member::new(15, "Ikkinchi oliy (sirtqi)"),
        Member::new(16, "Ikkinchi oliy (kunduzgi)"),
        Member::new(17, "Magistratura (kunduzgi)"),
    ]
}

pub struct DimensionResolver {
    api: Arc<dyn HemisApi>,
}

impl DimensionResolver {
    pub fn new(api: Arc<dyn HemisApi>) -> Self {
        Self { api }
    }

    /// Top-level faculties from the department listing
    pub async fn resolve_faculties(&self) -> Result<Vec<Member>> {
        let payload = self
            .api
            .department_list(DEPARTMENT_LIMIT)
            .await
            .map_err(|e| Error::Upstream(format!("department-list: {}", e)))?;

        let faculties = faculties_from_payload(&payload);
        tracing::info!(count = faculties.len(), "Resolved faculties");
        Ok(faculties)
    }

    /// Education forms; never fails
    pub async fn resolve_forms(&self) -> Vec<Member> {
        // Method 1: filtered classifier lookup
        match self
            .api
            .classifier_list(&[("classifier", EDUCATION_FORM_CLASSIFIER.to_string())])
            .await
        {
            Ok(payload) => {
                let forms = envelope::items(&payload)
                    .first()
                    .map(forms_from_classifier)
                    .unwrap_or_default();
                if !forms.is_empty() {
                    tracing::debug!(count = forms.len(), "Education forms from classifier lookup");
                    return forms;
                }
            }
            Err(e) => tracing::debug!(error = %e, "Classifier lookup failed, scanning all classifiers"),
        }

        // Method 2: scan every classifier for the matching code
        match self
            .api
            .classifier_list(&[("limit", CLASSIFIER_SCAN_LIMIT.to_string())])
            .await
        {
            Ok(payload) => {
                let forms = envelope::items(&payload)
                    .iter()
                    .find(|item| {
                        envelope::text_field(item, "classifier").as_deref()
                            == Some(EDUCATION_FORM_CLASSIFIER)
                    })
                    .map(forms_from_classifier)
                    .unwrap_or_default();
                if !forms.is_empty() {
                    tracing::debug!(count = forms.len(), "Education forms from classifier scan");
                    return forms;
                }
                tracing::warn!("Education form classifier not found in classifier scan");
            }
            Err(e) => tracing::error!(error = %e, "Failed to fetch education forms"),
        }

        tracing::warn!("Using static education form catalog");
        static_form_catalog()
    }
}

/// Faculties (structural code 11) from a department listing, de-duplicated by id
pub fn faculties_from_payload(payload: &Value) -> Vec<Member> {
    let mut seen = HashSet::new();
    envelope::items(payload)
        .iter()
        .filter(|item| {
            item.get("structureType")
                .and_then(|st| st.get("code"))
                .map(envelope::display_string)
                .as_deref()
                == Some(FACULTY_STRUCTURE_CODE)
        })
        .filter_map(|item| {
            let id = envelope::id_field(item, "id")?;
            let name = envelope::text_field(item, "name").unwrap_or_else(|| UNKNOWN_LABEL.to_string());
            Some(Member::new(id, name))
        })
        .filter(|m| seen.insert(m.id))
        .collect()
}

/// Education forms from a classifier item's `options`
///
/// Options carry the form id in `code`. Entries without a usable positive id or a
/// name are dropped.
pub fn forms_from_classifier(item: &Value) -> Vec<Member> {
    let Some(options) = item.get("options").and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    options
        .iter()
        .filter_map(|opt| {
            let id = envelope::id_field(opt, "code")?;
            let name = envelope::text_field(opt, "name")?;
            (id > 0).then(|| Member::new(id, name))
        })
        .filter(|m| seen.insert(m.id))
        .collect()
}
