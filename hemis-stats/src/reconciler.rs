//! Table reconciliation
//!
//! Turns phase-1 totals plus sparse cells into a [`Table`] whose row, column and grand
//! totals agree. A faculty whose true total exceeds its tracked breakdown gets the
//! difference in an `"other"` bucket. A breakdown above the true total keeps the larger
//! value (never under-report) and is logged as an upstream inconsistency.

use hemis_common::report::{Column, OTHER_LABEL};
use hemis_common::{ColumnKey, Row, Table, Totals};
use std::collections::BTreeMap;

use crate::aggregator::{SparseCells, Tallied};

/// Display order of known education forms; unknown names sort after, by id
pub const CANONICAL_FORM_ORDER: [&str; 10] = [
    "Kunduzgi",
    "Sirtqi",
    "Kechki",
    "Masofaviy",
    "Maxsus sirtqi",
    "Ikkinchi oliy (sirtqi)",
    "Ikkinchi oliy (kunduzgi)",
    "Ikkinchi oliy (kechki)",
    "Qo'shma (kunduzgi)",
    "Qo'shma (sirtqi)",
];

fn display_rank(name: &str) -> usize {
    CANONICAL_FORM_ORDER
        .iter()
        .position(|known| *known == name)
        .unwrap_or(CANONICAL_FORM_ORDER.len())
}

pub fn reconcile(faculties: &[Tallied], forms: &[Tallied], cells: &SparseCells) -> Table {
    let mut sorted_forms: Vec<&Tallied> = forms.iter().collect();
    sorted_forms.sort_by_key(|f| (display_rank(&f.member.name), f.id()));

    let mut rows = Vec::with_capacity(faculties.len());
    let mut has_other = false;

    for faculty in faculties {
        let mut values = BTreeMap::new();
        let mut breakdown_sum = 0u64;

        for form in &sorted_forms {
            let count = cells.get(faculty.id(), form.id());
            if count > 0 {
                values.insert(ColumnKey::Form(form.id()).as_key(), count);
                breakdown_sum += count;
            }
        }

        let true_total = faculty.total;
        let total = if true_total > breakdown_sum {
            values.insert(ColumnKey::Other.as_key(), true_total - breakdown_sum);
            has_other = true;
            true_total
        } else {
            if breakdown_sum > true_total {
                tracing::warn!(
                    faculty_id = faculty.id(),
                    faculty = %faculty.member.name,
                    true_total,
                    breakdown_sum,
                    "Faculty breakdown exceeds reported total, keeping the larger value"
                );
            }
            breakdown_sum
        };

        if total == 0 {
            continue;
        }

        rows.push(Row {
            faculty_id: faculty.id(),
            faculty_name: faculty.member.name.clone(),
            values,
            total,
        });
    }

    rows.sort_by(|a, b| {
        a.faculty_name
            .cmp(&b.faculty_name)
            .then(a.faculty_id.cmp(&b.faculty_id))
    });

    let mut columns: Vec<Column> = sorted_forms
        .iter()
        .map(|f| Column {
            id: ColumnKey::Form(f.id()),
            name: f.member.name.clone(),
        })
        .collect();
    if has_other {
        columns.push(Column {
            id: ColumnKey::Other,
            name: OTHER_LABEL.to_string(),
        });
    }

    // Column totals come from the final rows, not from phase-1 form totals
    let by_form: BTreeMap<String, u64> = columns
        .iter()
        .map(|c| {
            let key = c.id.as_key();
            let sum = rows.iter().filter_map(|r| r.values.get(&key)).sum::<u64>();
            (key, sum)
        })
        .collect();

    let grand_total: u64 = rows.iter().map(|r| r.total).sum();

    Table {
        columns,
        rows,
        totals: Totals {
            by_form,
            grand_total,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hemis_common::Member;

    fn tallied(id: i64, name: &str, total: u64) -> Tallied {
        Tallied {
            member: Member::new(id, name),
            total,
        }
    }

    #[test]
    fn test_residual_goes_to_other() {
        let faculties = vec![tallied(1, "Fizika", 100)];
        let forms = vec![tallied(11, "Kunduzgi", 500), tallied(13, "Sirtqi", 300)];
        let mut cells = SparseCells::new();
        cells.insert(1, 11, 60);
        cells.insert(1, 13, 30);

        let table = reconcile(&faculties, &forms, &cells);
        let row = &table.rows[0];
        assert_eq!(row.values["11"], 60);
        assert_eq!(row.values["13"], 30);
        assert_eq!(row.values["other"], 10);
        assert_eq!(row.total, 100);
        assert_eq!(table.columns.last().unwrap().id, ColumnKey::Other);
        assert_eq!(table.columns.last().unwrap().name, OTHER_LABEL);
        assert!(table.is_consistent());
    }

    #[test]
    fn test_breakdown_above_total_keeps_larger() {
        let faculties = vec![tallied(1, "Fizika", 40)];
        let forms = vec![tallied(11, "Kunduzgi", 45)];
        let mut cells = SparseCells::new();
        cells.insert(1, 11, 45);

        let table = reconcile(&faculties, &forms, &cells);
        assert_eq!(table.rows[0].total, 45);
        assert!(!table.rows[0].values.contains_key("other"));
        assert!(table.columns.iter().all(|c| c.id != ColumnKey::Other));
        assert!(table.is_consistent());
    }

    #[test]
    fn test_columns_follow_canonical_order() {
        let forms = vec![
            tallied(99, "Eksternat", 1),
            tallied(12, "Kechki", 1),
            tallied(13, "Sirtqi", 1),
            tallied(11, "Kunduzgi", 1),
            tallied(50, "Boshqa shakl", 1),
        ];
        let table = reconcile(&[], &forms, &SparseCells::new());
        let ids: Vec<ColumnKey> = table.columns.iter().map(|c| c.id).collect();
        assert_eq!(
            ids,
            vec![
                ColumnKey::Form(11),
                ColumnKey::Form(13),
                ColumnKey::Form(12),
                ColumnKey::Form(50),
                ColumnKey::Form(99),
            ]
        );
    }

    #[test]
    fn test_rows_sorted_by_name_and_zero_rows_dropped() {
        let faculties = vec![
            tallied(3, "Tarix", 5),
            tallied(1, "Biologiya", 7),
            tallied(2, "Kimyo", 0),
        ];
        let forms = vec![tallied(11, "Kunduzgi", 12)];
        let mut cells = SparseCells::new();
        cells.insert(3, 11, 5);
        cells.insert(1, 11, 7);

        let table = reconcile(&faculties, &forms, &cells);
        let names: Vec<&str> = table.rows.iter().map(|r| r.faculty_name.as_str()).collect();
        assert_eq!(names, vec!["Biologiya", "Tarix"]);
        assert_eq!(table.totals.grand_total, 12);
        assert!(table.is_consistent());
    }

    #[test]
    fn test_column_totals_sum_rows_only() {
        // Phase-1 form total (90) includes students outside the active faculties
        let faculties = vec![tallied(1, "A", 20), tallied(2, "B", 30)];
        let forms = vec![tallied(11, "Kunduzgi", 90)];
        let mut cells = SparseCells::new();
        cells.insert(1, 11, 20);
        cells.insert(2, 11, 25);

        let table = reconcile(&faculties, &forms, &cells);
        assert_eq!(table.totals.by_form["11"], 45);
        assert_eq!(table.totals.by_form["other"], 5);
        assert_eq!(table.totals.grand_total, 50);
        assert!(table.is_consistent());
    }

    #[test]
    fn test_other_always_positive() {
        let faculties = vec![tallied(1, "A", 10), tallied(2, "B", 8), tallied(3, "C", 3)];
        let forms = vec![tallied(11, "Kunduzgi", 20), tallied(13, "Sirtqi", 5)];
        let mut cells = SparseCells::new();
        cells.insert(1, 11, 10);
        cells.insert(2, 11, 6);
        cells.insert(3, 13, 5);

        let table = reconcile(&faculties, &forms, &cells);
        for row in &table.rows {
            if let Some(other) = row.values.get("other") {
                assert!(*other > 0);
            }
            assert!(row.values.values().all(|v| *v > 0));
        }
        assert!(table.is_consistent());
    }
}
