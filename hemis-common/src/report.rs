//! Report data model shared by the reporting API and its consumers
//!
//! A [`Table`] is the faculty × education-form contingency table. A [`Summary`] is
//! always a projection of exactly one `Table`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Map key and column id of the residual bucket
pub const OTHER_KEY: &str = "other";
/// Display name of the residual bucket
pub const OTHER_LABEL: &str = "Boshqa";
/// Display name used when an upstream entity has no usable name
pub const UNKNOWN_LABEL: &str = "Noma'lum";

/// Dimension member: a faculty or an education form
///
/// Identity is `id`; `name` is display-only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Member {
    pub id: i64,
    pub name: String,
}

impl Member {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Column identifier: a tracked education form, or the residual bucket
///
/// Serializes as a JSON integer for forms and as `"other"` for the residual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ColumnKey {
    Form(i64),
    Other,
}

impl ColumnKey {
    /// Key used in `values` / `by_form` maps
    pub fn as_key(&self) -> String {
        self.to_string()
    }

    /// Parse a map key back into a column id
    pub fn parse(key: &str) -> Option<Self> {
        if key == OTHER_KEY {
            return Some(ColumnKey::Other);
        }
        key.parse::<i64>().ok().map(ColumnKey::Form)
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKey::Form(id) => write!(f, "{}", id),
            ColumnKey::Other => f.write_str(OTHER_KEY),
        }
    }
}

impl Serialize for ColumnKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ColumnKey::Form(id) => serializer.serialize_i64(*id),
            ColumnKey::Other => serializer.serialize_str(OTHER_KEY),
        }
    }
}

impl<'de> Deserialize<'de> for ColumnKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Id(i64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Id(id) => Ok(ColumnKey::Form(id)),
            Raw::Text(text) => ColumnKey::parse(&text)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid column id: {}", text))),
        }
    }
}

/// Table column header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub id: ColumnKey,
    pub name: String,
}

/// One faculty row
///
/// After reconciliation `total == values.values().sum()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub faculty_id: i64,
    pub faculty_name: String,
    pub values: BTreeMap<String, u64>,
    pub total: u64,
}

impl Row {
    pub fn values_sum(&self) -> u64 {
        self.values.values().sum()
    }
}

/// Column totals and grand total
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub by_form: BTreeMap<String, u64>,
    pub grand_total: u64,
}

/// Faculty × education-form contingency table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
    pub totals: Totals,
}

impl Table {
    /// Check row, column and grand total consistency
    pub fn is_consistent(&self) -> bool {
        let rows_ok = self.rows.iter().all(|r| r.total == r.values_sum());
        let row_sum: u64 = self.rows.iter().map(|r| r.total).sum();
        let col_sum: u64 = self.totals.by_form.values().sum();
        rows_ok && row_sum == self.totals.grand_total && col_sum == self.totals.grand_total
    }

    /// Display name for a column key, if the column exists
    pub fn column_name(&self, key: ColumnKey) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.id == key)
            .map(|c| c.name.as_str())
    }
}

/// Name/count pair in a summary list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedCount {
    pub name: String,
    pub count: u64,
}

/// Dashboard summary derived from a [`Table`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total_students: u64,
    pub faculty_counts: Vec<NamedCount>,
    pub education_form_counts: Vec<NamedCount>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_key_serializes_form_as_number_and_other_as_string() {
        let cols = vec![
            Column { id: ColumnKey::Form(11), name: "Kunduzgi".to_string() },
            Column { id: ColumnKey::Other, name: OTHER_LABEL.to_string() },
        ];
        let json = serde_json::to_value(&cols).unwrap();
        assert_eq!(json[0]["id"], 11);
        assert_eq!(json[1]["id"], "other");

        let back: Vec<Column> = serde_json::from_value(json).unwrap();
        assert_eq!(back, cols);
    }

    #[test]
    fn test_column_key_parse() {
        assert_eq!(ColumnKey::parse("13"), Some(ColumnKey::Form(13)));
        assert_eq!(ColumnKey::parse("other"), Some(ColumnKey::Other));
        assert_eq!(ColumnKey::parse("kunduzgi"), None);
        assert_eq!(ColumnKey::Form(13).as_key(), "13");
    }

    #[test]
    fn test_table_consistency_check() {
        let mut values = BTreeMap::new();
        values.insert("11".to_string(), 60);
        values.insert("other".to_string(), 40);
        let mut table = Table {
            columns: vec![],
            rows: vec![Row {
                faculty_id: 1,
                faculty_name: "Fizika".to_string(),
                values: values.clone(),
                total: 100,
            }],
            totals: Totals { by_form: values, grand_total: 100 },
        };
        assert!(table.is_consistent());

        table.totals.grand_total = 99;
        assert!(!table.is_consistent());
    }
}
