//! Roll case-level KPIs up by one grouping column

use crate::kpi::KpiTable;
use crate::models::{DimensionSummaryRow, Kpis};
use std::collections::HashMap;

/// Member label for records whose grouping value is missing
pub const MISSING_MEMBER: &str = "(missing)";

#[derive(Debug, Default)]
struct GroupAcc {
    cases: usize,
    late: usize,
    tol_violation: usize,
    otif_fail: usize,
    order_value: f64,
    order_value_fail: f64,
}

impl GroupAcc {
    fn add(&mut self, kpis: &Kpis, order_value: Option<f64>) {
        self.cases += 1;
        self.late += kpis.is_late as usize;
        self.tol_violation += kpis.is_tol_violation as usize;
        self.otif_fail += kpis.is_otif_fail as usize;
        if let Some(v) = order_value {
            self.order_value += v;
            if kpis.is_otif_fail {
                self.order_value_fail += v;
            }
        }
    }

    fn rate(&self, count: usize) -> f64 {
        count as f64 / self.cases as f64
    }
}

/// One summary row per distinct value of `column`, in first-appearance
/// order. Missing values form their own group. A column absent from the
/// source yields no rows.
pub fn group_table(table: &KpiTable, column: &str) -> Vec<DimensionSummaryRow> {
    let Some(col) = table.source.raw.column_index(column) else {
        return Vec::new();
    };
    let with_value = table.has_order_value();

    let mut index: HashMap<Option<&str>, usize> = HashMap::new();
    let mut groups: Vec<(Option<&str>, GroupAcc)> = Vec::new();

    for (case, kpis) in table.iter() {
        let member = table.source.raw.cell(case.row, col);
        let slot = *index.entry(member).or_insert_with(|| {
            groups.push((member, GroupAcc::default()));
            groups.len() - 1
        });
        groups[slot].1.add(kpis, case.order_value);
    }

    groups
        .into_iter()
        .map(|(member, acc)| {
            let (sum_value, sum_fail, value_rate) = if with_value {
                let rate = (acc.order_value != 0.0).then(|| acc.order_value_fail / acc.order_value);
                (Some(acc.order_value), Some(acc.order_value_fail), rate)
            } else {
                (None, None, None)
            };
            DimensionSummaryRow {
                dimension: column.to_string(),
                member: member.unwrap_or(MISSING_MEMBER).to_string(),
                cases: acc.cases,
                late_rate_cases: acc.rate(acc.late),
                tol_violation_rate_cases: acc.rate(acc.tol_violation),
                otif_fail_rate_cases: acc.rate(acc.otif_fail),
                otif_fail_cases: acc.otif_fail,
                sum_order_value: sum_value,
                sum_order_value_otif_fail: sum_fail,
                otif_fail_rate_value: value_rate,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kpi::enrich;
    use crate::models::CaseTable;
    use crate::table::RawTable;
    use std::path::Path;

    fn kpi_table(text: &str) -> KpiTable {
        let raw = RawTable::parse_bytes(text.as_bytes(), 3, Path::new("t.csv")).unwrap();
        enrich(CaseTable::from_raw(raw))
    }

    /// `n` cases in group `g`, the first `fails` of them over-delivered
    fn rows(g: &str, n: usize, fails: usize, value: &str) -> String {
        (0..n)
            .map(|i| {
                let delivered = if i < fails { 12 } else { 10 };
                format!("{g}{i};{g};10;{delivered};{value}\n")
            })
            .collect()
    }

    const HEADER: &str = "CASE_KEY;FACTORY;ORDERED_QUANTITY;DELIVERED_QUANTITY;ORDER_VALUE\n";

    #[test]
    fn test_failure_rate_exact() {
        let t = kpi_table(&format!("{HEADER}{}", rows("F1", 10, 3, "100")));
        let out = group_table(&t, "FACTORY");
        assert_eq!(out.len(), 1);
        let r = &out[0];
        assert_eq!(r.dimension, "FACTORY");
        assert_eq!(r.member, "F1");
        assert_eq!(r.cases, 10);
        assert_eq!(r.otif_fail_rate_cases, 0.3);
        assert_eq!(r.tol_violation_rate_cases, 0.3);
        assert_eq!(r.late_rate_cases, 0.0);
        assert_eq!(r.otif_fail_cases, 3);
        assert_eq!(r.sum_order_value, Some(1000.0));
        assert_eq!(r.sum_order_value_otif_fail, Some(300.0));
        assert_eq!(r.otif_fail_rate_value, Some(0.3));
    }

    #[test]
    fn test_zero_value_group_has_undefined_value_rate() {
        let t = kpi_table(&format!("{HEADER}{}", rows("F0", 4, 1, "0")));
        let r = &group_table(&t, "FACTORY")[0];
        assert_eq!(r.sum_order_value, Some(0.0));
        assert_eq!(r.otif_fail_rate_value, None);
        assert_eq!(r.otif_fail_rate_cases, 0.25);
    }

    #[test]
    fn test_missing_members_kept_in_appearance_order() {
        let text = format!(
            "{HEADER}{}{}{}",
            rows("F2", 2, 0, "5"),
            "x1;;10;10;5\nx2;;10;20;5\n",
            rows("F1", 1, 1, "5"),
        );
        let out = group_table(&kpi_table(&text), "FACTORY");
        let members: Vec<&str> = out.iter().map(|r| r.member.as_str()).collect();
        assert_eq!(members, vec!["F2", MISSING_MEMBER, "F1"]);
        assert_eq!(out[1].cases, 2);
        assert_eq!(out[1].otif_fail_cases, 1);
    }

    #[test]
    fn test_without_order_value_column() {
        let t = kpi_table("CASE_KEY;FACTORY;ORDERED_QUANTITY;DELIVERED_QUANTITY\na;F;1;1\n");
        let r = &group_table(&t, "FACTORY")[0];
        assert_eq!(r.sum_order_value, None);
        assert_eq!(r.otif_fail_rate_value, None);
    }

    #[test]
    fn test_absent_column_yields_nothing() {
        let t = kpi_table(&format!("{HEADER}{}", rows("F1", 2, 0, "1")));
        assert!(group_table(&t, "CUST_COUNTRY").is_empty());
    }
}
