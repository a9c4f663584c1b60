//! Data-quality scans over the case table
//!
//! Independent of the KPI pipeline: each scan picks the records matching
//! one anomaly and orders them by severity.

use crate::config::{DELIVERED_QUANTITY, ORDER_VALUE, UNIT_PRICE};
use crate::models::{Case, CaseTable};
use crate::ranking::desc_missing_last;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlagReason {
    UnitPriceZero,
    OrderValueZero,
    /// Order value off from unit price x delivered quantity by more than the threshold
    ValueMismatch { threshold: f64 },
}

impl FlagReason {
    pub fn label(&self) -> String {
        match self {
            FlagReason::UnitPriceZero => "UNIT_PRICE==0".to_string(),
            FlagReason::OrderValueZero => "ORDER_VALUE==0".to_string(),
            FlagReason::ValueMismatch { threshold } => {
                format!("VALUE_REL_ERR>{}", threshold_text(*threshold))
            }
        }
    }

    pub fn file_name(&self) -> String {
        match self {
            FlagReason::UnitPriceZero => "flag_unit_price_zero.csv".to_string(),
            FlagReason::OrderValueZero => "flag_order_value_zero.csv".to_string(),
            FlagReason::ValueMismatch { threshold } => format!(
                "flag_value_mismatch_relerr_gt_{}pct.csv",
                (threshold * 100.0 * 1e4).round() / 1e4
            ),
        }
    }
}

/// Two decimals when that is exact, otherwise every digit
fn threshold_text(threshold: f64) -> String {
    let fixed = format!("{:.2}", threshold);
    if fixed.parse::<f64>() == Ok(threshold) {
        fixed
    } else {
        threshold.to_string()
    }
}

#[derive(Debug, Clone)]
pub struct FlaggedCase<'a> {
    pub case: &'a Case,
    pub rel_err: Option<f64>,
}

/// Records flagged for one reason, most severe first
#[derive(Debug, Clone)]
pub struct FlagSet<'a> {
    pub reason: FlagReason,
    pub cases: Vec<FlaggedCase<'a>>,
}

impl FlagSet<'_> {
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Header and rows for export: reason first, then the source columns,
    /// then the relative error for mismatch flags
    pub fn render(&self, table: &CaseTable) -> (Vec<String>, Vec<Vec<String>>) {
        let with_err = matches!(self.reason, FlagReason::ValueMismatch { .. });
        let label = self.reason.label();

        let mut header = vec!["FLAG_REASON".to_string()];
        header.extend(table.raw.headers.iter().cloned());
        if with_err {
            header.push("VALUE_REL_ERR".to_string());
        }

        let rows = self
            .cases
            .iter()
            .map(|f| {
                let mut row = vec![label.clone()];
                row.extend(table.export_row(f.case));
                if with_err {
                    row.push(f.rel_err.map(|e| e.to_string()).unwrap_or_default());
                }
                row
            })
            .collect();

        (header, rows)
    }
}

/// `|order_value - unit_price * delivered| / (unit_price * delivered)`;
/// missing when an operand is missing or the approximation is zero
pub fn value_rel_err(case: &Case) -> Option<f64> {
    let approx = case.unit_price? * case.delivered_quantity?;
    if approx == 0.0 {
        return None;
    }
    Some((case.order_value? - approx).abs() / approx)
}

/// Run every scan whose columns exist; only non-empty sets are returned
pub fn scan_flags(table: &CaseTable, rel_err_threshold: f64) -> Vec<FlagSet<'_>> {
    let mut sets = Vec::new();

    if table.has_column(UNIT_PRICE) {
        let mut cases: Vec<FlaggedCase> = table
            .cases
            .iter()
            .filter(|c| c.unit_price == Some(0.0))
            .map(|case| FlaggedCase { case, rel_err: None })
            .collect();
        cases.sort_by(|a, b| {
            desc_missing_last(a.case.order_value, b.case.order_value)
                .then_with(|| key_asc(a.case, b.case))
        });
        sets.push(FlagSet {
            reason: FlagReason::UnitPriceZero,
            cases,
        });
    }

    if table.has_column(ORDER_VALUE) {
        let mut cases: Vec<FlaggedCase> = table
            .cases
            .iter()
            .filter(|c| c.order_value == Some(0.0))
            .map(|case| FlaggedCase { case, rel_err: None })
            .collect();
        cases.sort_by(|a, b| {
            desc_missing_last(a.case.unit_price, b.case.unit_price)
                .then_with(|| key_asc(a.case, b.case))
        });
        sets.push(FlagSet {
            reason: FlagReason::OrderValueZero,
            cases,
        });
    }

    if [ORDER_VALUE, UNIT_PRICE, DELIVERED_QUANTITY]
        .iter()
        .all(|c| table.has_column(c))
    {
        let mut cases: Vec<FlaggedCase> = table
            .cases
            .iter()
            .filter_map(|case| {
                let err = value_rel_err(case)?;
                (err > rel_err_threshold).then_some(FlaggedCase {
                    case,
                    rel_err: Some(err),
                })
            })
            .collect();
        cases.sort_by(|a, b| {
            desc_missing_last(a.rel_err, b.rel_err)
                .then_with(|| desc_missing_last(a.case.order_value, b.case.order_value))
                .then_with(|| key_asc(a.case, b.case))
        });
        sets.push(FlagSet {
            reason: FlagReason::ValueMismatch {
                threshold: rel_err_threshold,
            },
            cases,
        });
    }

    sets.retain(|s| !s.is_empty());
    sets
}

fn key_asc(a: &Case, b: &Case) -> Ordering {
    match (&a.case_key, &b.case_key) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::RawTable;
    use std::path::Path;

    fn table(text: &str) -> CaseTable {
        CaseTable::from_raw(RawTable::parse_bytes(text.as_bytes(), 3, Path::new("t.csv")).unwrap())
    }

    const HEADER: &str = "CASE_KEY;ORDER_VALUE;UNIT_PRICE;DELIVERED_QUANTITY\n";

    fn keys<'a>(set: &'a FlagSet) -> Vec<&'a str> {
        set.cases
            .iter()
            .map(|f| f.case.case_key.as_deref().unwrap_or(""))
            .collect()
    }

    #[test]
    fn test_relative_error_threshold_is_strict() {
        let t = table(&format!("{HEADER}hi;115;10;10\nedge;110;10;10\nok;100;10;10\n"));
        let sets = scan_flags(&t, 0.10);
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].reason.label(), "VALUE_REL_ERR>0.10");
        assert_eq!(keys(&sets[0]), vec!["hi"]);
        assert!((sets[0].cases[0].rel_err.unwrap() - 0.15).abs() < 1e-12);
    }

    #[test]
    fn test_zero_denominator_excluded() {
        let t = table(&format!("{HEADER}z;50;0;10\n"));
        assert_eq!(value_rel_err(&t.cases[0]), None);
        let sets = scan_flags(&t, 0.10);
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].reason, FlagReason::UnitPriceZero);
    }

    #[test]
    fn test_zero_scans_sorted_by_severity() {
        let t = table(&format!(
            "{HEADER}b;10;0;1\na;10;0;1\nc;99;0;1\nd;;0;1\ne;0;7;0\nf;0;9;0\n"
        ));
        let sets = scan_flags(&t, 0.10);
        let price = sets.iter().find(|s| s.reason == FlagReason::UnitPriceZero).unwrap();
        assert_eq!(keys(price), vec!["c", "a", "b", "d"]);
        let value = sets.iter().find(|s| s.reason == FlagReason::OrderValueZero).unwrap();
        assert_eq!(keys(value), vec!["f", "e"]);
    }

    #[test]
    fn test_render_layout() {
        let t = table(&format!("{HEADER}hi;1.150,0;10;10\n"));
        let sets = scan_flags(&t, 0.10);
        let (header, rows) = sets[0].render(&t);
        assert_eq!(header.first().map(String::as_str), Some("FLAG_REASON"));
        assert_eq!(header.last().map(String::as_str), Some("VALUE_REL_ERR"));
        assert_eq!(rows[0][0], "VALUE_REL_ERR>0.10");
        assert_eq!(rows[0][2], "1150");
        assert_eq!(sets[0].reason.file_name(), "flag_value_mismatch_relerr_gt_10pct.csv");
    }

    #[test]
    fn test_label_keeps_threshold_precision() {
        let t = table(&format!("{HEADER}hi;113;10;10\nlow;112;10;10\n"));
        let sets = scan_flags(&t, 0.125);
        assert_eq!(sets[0].reason.label(), "VALUE_REL_ERR>0.125");
        assert_eq!(sets[0].reason.file_name(), "flag_value_mismatch_relerr_gt_12.5pct.csv");
        assert_eq!(keys(&sets[0]), vec!["hi"]);
    }

    #[test]
    fn test_scans_need_their_columns() {
        let t = table("CASE_KEY;FACTORY;ORDERED_QUANTITY;DELIVERED_QUANTITY\na;F;0;0\n");
        assert!(scan_flags(&t, 0.10).is_empty());
    }
}
