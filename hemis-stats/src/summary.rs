//! Table → summary projection

use hemis_common::report::{NamedCount, OTHER_LABEL, UNKNOWN_LABEL};
use hemis_common::{ColumnKey, Summary, Table};

/// Project a table into the dashboard summary
///
/// Pure: every number comes from `table`, so the two views always agree.
/// Form counts follow column order.
pub fn project(table: &Table) -> Summary {
    let faculty_counts = table
        .rows
        .iter()
        .map(|r| NamedCount {
            name: r.faculty_name.clone(),
            count: r.total,
        })
        .collect();

    let mut education_form_counts: Vec<NamedCount> = table
        .columns
        .iter()
        .filter_map(|c| {
            let count = *table.totals.by_form.get(&c.id.as_key())?;
            Some(NamedCount {
                name: form_label(table, c.id),
                count,
            })
        })
        .collect();

    // Totals without a column header still count toward the grand total
    for (key, count) in &table.totals.by_form {
        let listed = ColumnKey::parse(key).is_some_and(|k| table.column_name(k).is_some());
        if !listed {
            let name = match ColumnKey::parse(key) {
                Some(ColumnKey::Other) => OTHER_LABEL.to_string(),
                _ => UNKNOWN_LABEL.to_string(),
            };
            education_form_counts.push(NamedCount { name, count: *count });
        }
    }

    Summary {
        total_students: table.totals.grand_total,
        faculty_counts,
        education_form_counts,
    }
}

fn form_label(table: &Table, key: ColumnKey) -> String {
    match key {
        ColumnKey::Other => OTHER_LABEL.to_string(),
        ColumnKey::Form(_) => table
            .column_name(key)
            .unwrap_or(UNKNOWN_LABEL)
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hemis_common::report::Column;
    use hemis_common::{Row, Totals};
    use std::collections::BTreeMap;

    fn table() -> Table {
        let row = |id: i64, name: &str, vals: &[(&str, u64)]| Row {
            faculty_id: id,
            faculty_name: name.to_string(),
            values: vals.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            total: vals.iter().map(|(_, v)| v).sum(),
        };
        let rows = vec![
            row(1, "Biologiya", &[("11", 60), ("13", 30), ("other", 10)]),
            row(2, "Tarix", &[("11", 50)]),
        ];
        let by_form: BTreeMap<String, u64> =
            [("11", 110u64), ("13", 30), ("other", 10)].iter().map(|(k, v)| (k.to_string(), *v)).collect();
        Table {
            columns: vec![
                Column { id: ColumnKey::Form(11), name: "Kunduzgi".into() },
                Column { id: ColumnKey::Form(13), name: "Sirtqi".into() },
                Column { id: ColumnKey::Other, name: OTHER_LABEL.into() },
            ],
            rows,
            totals: Totals { by_form, grand_total: 150 },
        }
    }

    #[test]
    fn test_projection_matches_table() {
        let t = table();
        assert!(t.is_consistent());
        let s = project(&t);

        assert_eq!(s.total_students, 150);
        assert_eq!(s.faculty_counts.iter().map(|f| f.count).sum::<u64>(), 150);
        assert_eq!(s.education_form_counts.iter().map(|f| f.count).sum::<u64>(), 150);

        let names: Vec<&str> = s.education_form_counts.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Kunduzgi", "Sirtqi", OTHER_LABEL]);
        assert_eq!(s.faculty_counts[0].name, "Biologiya");
        assert_eq!(s.faculty_counts[0].count, 100);
    }

    #[test]
    fn test_total_without_column_gets_fallback_label() {
        let mut t = table();
        t.columns.retain(|c| c.id != ColumnKey::Form(13));
        let s = project(&t);

        assert!(s.education_form_counts.iter().any(|f| f.name == UNKNOWN_LABEL && f.count == 30));
        assert_eq!(s.education_form_counts.iter().map(|f| f.count).sum::<u64>(), 150);
    }

    #[test]
    fn test_empty_table() {
        let s = project(&Table::default());
        assert_eq!(s.total_students, 0);
        assert!(s.faculty_counts.is_empty());
        assert!(s.education_form_counts.is_empty());
    }
}
