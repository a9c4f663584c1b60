//! KPI engineering: tolerance band, lateness and OTIF failure per case
//!
//! Missing inputs never count against a case. A comparison with a missing
//! operand is "not violated", and the combined flag only ORs booleans.

use crate::models::{Case, CaseTable, Kpis};
use chrono::{Duration, NaiveDateTime};

/// Case table with one KPI record per case, in case order
#[derive(Debug, Clone)]
pub struct KpiTable {
    pub source: CaseTable,
    pub kpis: Vec<Kpis>,
}

impl KpiTable {
    pub fn iter(&self) -> impl Iterator<Item = (&Case, &Kpis)> {
        self.source.cases.iter().zip(self.kpis.iter())
    }

    pub fn len(&self) -> usize {
        self.kpis.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kpis.is_empty()
    }

    pub fn has_order_value(&self) -> bool {
        self.source.has_order_value()
    }

    pub fn late_rate(&self) -> f64 {
        self.rate(|k| k.is_late)
    }

    pub fn tol_violation_rate(&self) -> f64 {
        self.rate(|k| k.is_tol_violation)
    }

    pub fn otif_fail_rate(&self) -> f64 {
        self.rate(|k| k.is_otif_fail)
    }

    fn rate(&self, flag: impl Fn(&Kpis) -> bool) -> f64 {
        if self.kpis.is_empty() {
            return 0.0;
        }
        self.kpis.iter().filter(|k| flag(k)).count() as f64 / self.kpis.len() as f64
    }
}

/// Add KPI columns to every case of the table
pub fn enrich(table: CaseTable) -> KpiTable {
    let dates_available = table.has_dates();
    let kpis = table
        .cases
        .iter()
        .map(|case| engineer_case(case, dates_available))
        .collect();
    KpiTable {
        source: table,
        kpis,
    }
}

/// KPIs for one case. With `dates_available == false` lateness is false and
/// the day delta missing for every case.
pub fn engineer_case(case: &Case, dates_available: bool) -> Kpis {
    let (tol_lower, tol_upper) = tolerance_bounds(
        case.ordered_quantity,
        case.min_tolerance_pct,
        case.max_tolerance_pct,
    );

    let below = matches!((case.delivered_quantity, tol_lower), (Some(d), Some(l)) if d < l);
    let above = matches!((case.delivered_quantity, tol_upper), (Some(d), Some(u)) if d > u);
    let is_tol_violation = below || above;

    // above wins when a malformed band makes both sides true
    let outside_tol_qty = match (case.delivered_quantity, tol_lower, tol_upper) {
        (Some(d), _, Some(u)) if above => d - u,
        (Some(d), Some(l), _) if below => l - d,
        _ => 0.0,
    };

    let delta_days = if dates_available {
        match (case.delivered_date, case.promised_date) {
            (Some(delivered), Some(promised)) => Some(delta_days(delivered, promised)),
            _ => None,
        }
    } else {
        None
    };
    let is_late = delta_days.is_some_and(|d| d > 0);

    Kpis {
        tol_lower,
        tol_upper,
        is_tol_violation,
        outside_tol_qty,
        delta_days,
        is_late,
        is_otif_fail: is_late || is_tol_violation,
    }
}

/// `[ordered * (1 + min%/100), ordered * (1 + max%/100)]`; an absent
/// percentage counts as zero
pub fn tolerance_bounds(
    ordered: Option<f64>,
    min_pct: Option<f64>,
    max_pct: Option<f64>,
) -> (Option<f64>, Option<f64>) {
    let bound = |pct: Option<f64>| ordered.map(|q| q * (1.0 + pct.unwrap_or(0.0) / 100.0));
    (bound(min_pct), bound(max_pct))
}

/// Whole days from `promised` to `delivered`, floored
pub fn delta_days(delivered: NaiveDateTime, promised: NaiveDateTime) -> i64 {
    let elapsed = delivered - promised;
    let whole = elapsed.num_days();
    if elapsed < Duration::days(whole) {
        whole - 1
    } else {
        whole
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn case(ordered: f64, delivered: Option<f64>, tmin: Option<f64>, tmax: Option<f64>) -> Case {
        Case {
            ordered_quantity: Some(ordered),
            delivered_quantity: delivered,
            min_tolerance_pct: tmin,
            max_tolerance_pct: tmax,
            ..Case::default()
        }
    }

    #[test]
    fn test_bounds_default_to_ordered() {
        assert_eq!(tolerance_bounds(Some(100.0), None, None), (Some(100.0), Some(100.0)));
        assert_eq!(
            tolerance_bounds(Some(100.0), Some(-10.0), Some(5.0)),
            (Some(90.0), Some(105.0))
        );
        assert_eq!(tolerance_bounds(None, Some(-10.0), Some(5.0)), (None, None));
    }

    #[test]
    fn test_boundary_is_not_violation() {
        let k = engineer_case(&case(100.0, Some(90.0), Some(-10.0), Some(5.0)), true);
        assert!(!k.is_tol_violation);
        let k = engineer_case(&case(100.0, Some(105.0), Some(-10.0), Some(5.0)), true);
        assert!(!k.is_tol_violation);
        assert_eq!(k.outside_tol_qty, 0.0);
    }

    #[test]
    fn test_outside_quantity_magnitude() {
        let k = engineer_case(&case(100.0, Some(80.0), Some(-10.0), Some(5.0)), true);
        assert!(k.is_tol_violation);
        assert_eq!(k.outside_tol_qty, 10.0);

        let k = engineer_case(&case(100.0, Some(110.0), Some(-10.0), Some(5.0)), true);
        assert!(k.is_tol_violation);
        assert_eq!(k.outside_tol_qty, 5.0);
        assert!(k.is_otif_fail);
    }

    #[test]
    fn test_missing_delivered_quantity_is_not_violation() {
        let k = engineer_case(&case(100.0, None, Some(-10.0), Some(5.0)), true);
        assert!(!k.is_tol_violation);
        assert_eq!(k.outside_tol_qty, 0.0);
        assert!(!k.is_otif_fail);
    }

    #[test]
    fn test_lateness() {
        let mut c = case(10.0, Some(10.0), None, None);
        c.promised_date = Some(day(1, 0));
        c.delivered_date = Some(day(3, 6));
        let k = engineer_case(&c, true);
        assert_eq!(k.delta_days, Some(2));
        assert!(k.is_late);
        assert!(k.is_otif_fail);

        c.delivered_date = Some(day(1, 12));
        let k = engineer_case(&c, true);
        assert_eq!(k.delta_days, Some(0));
        assert!(!k.is_late);
    }

    #[test]
    fn test_missing_date_is_not_late() {
        let mut c = case(10.0, Some(10.0), None, None);
        c.promised_date = Some(day(1, 0));
        let k = engineer_case(&c, true);
        assert_eq!(k.delta_days, None);
        assert!(!k.is_late);
    }

    #[test]
    fn test_absent_date_columns() {
        let mut c = case(10.0, Some(10.0), None, None);
        c.promised_date = Some(day(1, 0));
        c.delivered_date = Some(day(9, 0));
        let k = engineer_case(&c, false);
        assert_eq!(k.delta_days, None);
        assert!(!k.is_late);
    }

    #[test]
    fn test_delta_days_floors() {
        assert_eq!(delta_days(day(1, 12), day(2, 0)), -1);
        assert_eq!(delta_days(day(2, 0), day(1, 0)), 1);
        assert_eq!(delta_days(day(1, 0), day(3, 0)), -2);
        assert_eq!(delta_days(day(1, 0), day(1, 0)), 0);
    }
}
