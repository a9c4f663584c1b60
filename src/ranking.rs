//! Cross-dimension ranking and presentation filters over summary rows

use crate::models::DimensionSummaryRow;
use serde::Serialize;
use std::cmp::Ordering;

/// Descending order with missing (or NaN) values last
pub(crate) fn desc_missing_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    let a = a.filter(|v| !v.is_nan());
    let b = b.filter(|v| !v.is_nan());
    match (a, b) {
        (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Concatenate per-dimension tables and sort by OTIF fail rate, then case
/// count, both descending. The sort is stable.
pub fn rank_all(tables: Vec<Vec<DimensionSummaryRow>>) -> Vec<DimensionSummaryRow> {
    let mut all: Vec<DimensionSummaryRow> = tables.into_iter().flatten().collect();
    all.sort_by(|a, b| {
        desc_missing_last(Some(a.otif_fail_rate_cases), Some(b.otif_fail_rate_cases))
            .then_with(|| b.cases.cmp(&a.cases))
    });
    all
}

/// Rate columns a presentation table can be ranked by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    LateRate,
    TolViolationRate,
    OtifFailRate,
    OtifFailRateValue,
}

impl Metric {
    pub fn column(&self) -> &'static str {
        match self {
            Metric::LateRate => "late_rate_cases",
            Metric::TolViolationRate => "tol_violation_rate_cases",
            Metric::OtifFailRate => "otif_fail_rate_cases",
            Metric::OtifFailRateValue => "otif_fail_rate_value",
        }
    }

    /// Short name used in output file names
    pub fn slug(&self) -> &'static str {
        match self {
            Metric::LateRate => "late_rate",
            Metric::TolViolationRate => "tol_violation_rate",
            Metric::OtifFailRate => "otif_fail_rate",
            Metric::OtifFailRateValue => "otif_fail_rate_value",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Metric::LateRate => "Late delivery rate",
            Metric::TolViolationRate => "Quantity tolerance violation rate",
            Metric::OtifFailRate => "OTIF fail rate",
            Metric::OtifFailRateValue => "OTIF fail rate (value-weighted)",
        }
    }

    pub fn value(&self, row: &DimensionSummaryRow) -> Option<f64> {
        match self {
            Metric::LateRate => Some(row.late_rate_cases),
            Metric::TolViolationRate => Some(row.tol_violation_rate_cases),
            Metric::OtifFailRate => Some(row.otif_fail_rate_cases),
            Metric::OtifFailRateValue => row.otif_fail_rate_value,
        }
    }

    /// Whether the table carries this metric at all
    fn available(&self, rows: &[DimensionSummaryRow]) -> bool {
        match self {
            Metric::OtifFailRateValue => rows.iter().any(|r| r.sum_order_value.is_some()),
            _ => true,
        }
    }
}

/// Groups with at least `min_cases` records, best `n` by `metric`.
/// `None` means there is nothing to present.
pub fn top_n(
    rows: &[DimensionSummaryRow],
    metric: Metric,
    min_cases: usize,
    n: usize,
) -> Option<Vec<DimensionSummaryRow>> {
    if rows.is_empty() || !metric.available(rows) {
        return None;
    }
    let mut kept: Vec<DimensionSummaryRow> = rows
        .iter()
        .filter(|r| r.cases >= min_cases)
        .cloned()
        .collect();
    if kept.is_empty() {
        return None;
    }
    kept.sort_by(|a, b| desc_missing_last(metric.value(a), metric.value(b)));
    kept.truncate(n);
    (!kept.is_empty()).then_some(kept)
}

/// Position of a group relative to the median late and tolerance rates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProblemClass {
    /// Neither rate above its median
    Stable,
    /// Late above median, tolerance violations not
    Timeliness,
    /// Tolerance violations above median, lateness not
    Quantity,
    Mixed,
}

impl ProblemClass {
    pub fn classify(tol_rate: f64, late_rate: f64, tol_median: f64, late_median: f64) -> Self {
        match (tol_rate > tol_median, late_rate > late_median) {
            (false, false) => ProblemClass::Stable,
            (false, true) => ProblemClass::Timeliness,
            (true, false) => ProblemClass::Quantity,
            (true, true) => ProblemClass::Mixed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProblemClassRow {
    pub dimension: String,
    pub member: String,
    pub cases: usize,
    pub tol_violation_rate_cases: f64,
    pub late_rate_cases: f64,
    pub sum_order_value: Option<f64>,
    pub tol_rate_median: f64,
    pub late_rate_median: f64,
    pub problem_class: ProblemClass,
    /// Among the largest groups by order value (or case count)
    pub labelled: bool,
}

impl ProblemClassRow {
    pub const HEADER: [&'static str; 10] = [
        "dimension",
        "member",
        "cases",
        "tol_violation_rate_cases",
        "late_rate_cases",
        "sum_order_value",
        "tol_rate_median",
        "late_rate_median",
        "problem_class",
        "labelled",
    ];
}

/// Late rate against tolerance violation rate for every group with at least
/// `min_cases` records. Reference lines are medians of those groups.
pub fn problem_classes(
    rows: &[DimensionSummaryRow],
    min_cases: usize,
    label_count: usize,
) -> Option<Vec<ProblemClassRow>> {
    let kept: Vec<&DimensionSummaryRow> = rows.iter().filter(|r| r.cases >= min_cases).collect();
    if kept.is_empty() {
        return None;
    }

    let tol_median = median(kept.iter().map(|r| r.tol_violation_rate_cases).collect())?;
    let late_median = median(kept.iter().map(|r| r.late_rate_cases).collect())?;

    let by_value = kept
        .iter()
        .any(|r| r.sum_order_value.is_some_and(f64::is_finite));
    let mut rank: Vec<usize> = (0..kept.len()).collect();
    rank.sort_by(|&a, &b| {
        if by_value {
            desc_missing_last(kept[a].sum_order_value, kept[b].sum_order_value)
        } else {
            kept[b].cases.cmp(&kept[a].cases)
        }
    });
    let mut labelled = vec![false; kept.len()];
    for &i in rank.iter().take(label_count) {
        labelled[i] = true;
    }

    Some(
        kept.iter()
            .zip(labelled)
            .map(|(r, labelled)| ProblemClassRow {
                dimension: r.dimension.clone(),
                member: r.member.clone(),
                cases: r.cases,
                tol_violation_rate_cases: r.tol_violation_rate_cases,
                late_rate_cases: r.late_rate_cases,
                sum_order_value: r.sum_order_value,
                tol_rate_median: tol_median,
                late_rate_median: late_median,
                problem_class: ProblemClass::classify(
                    r.tol_violation_rate_cases,
                    r.late_rate_cases,
                    tol_median,
                    late_median,
                ),
                labelled,
            })
            .collect(),
    )
}

/// Median ignoring NaN; even counts average the two middle values
pub fn median(mut values: Vec<f64>) -> Option<f64> {
    values.retain(|v| !v.is_nan());
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}
