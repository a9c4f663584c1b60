//! Console rendering of headline KPIs and top-N tables

use crate::config::Dimension;
use crate::kpi::KpiTable;
use crate::models::DimensionSummaryRow;
use crate::ranking::Metric;
use crate::sequence::SequenceSummary;
use std::fmt::Write;

pub fn section_header(title: &str) -> String {
    format!("\n{}\n  {}\n{}\n", "═".repeat(80), title, "═".repeat(80))
}

pub fn subsection(title: &str) -> String {
    format!("\n{}\n{}\n", title, "─".repeat(70))
}

fn bar(rate: f64) -> String {
    "#".repeat((rate * 100.0 / 5.0).max(0.0) as usize)
}

/// Thousands-separated integer, `0` for anything non-finite
pub fn fmt_int(x: f64) -> String {
    if !x.is_finite() {
        return "0".to_string();
    }
    let n = x.round() as i64;
    let digits = n.unsigned_abs().to_string();
    let mut out = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if n < 0 {
        format!("-{}", out)
    } else {
        out
    }
}

pub fn otif_headline(table: &KpiTable) -> String {
    let mut out = section_header("OTIF KPIs");
    let _ = writeln!(out, "  Total cases:                 {:>12}", table.len());
    let _ = writeln!(out, "  Late delivery rate:          {:>11.1}%", table.late_rate() * 100.0);
    let _ = writeln!(
        out,
        "  Tolerance violation rate:    {:>11.1}%",
        table.tol_violation_rate() * 100.0
    );
    let _ = writeln!(out, "  OTIF fail rate:              {:>11.1}%", table.otif_fail_rate() * 100.0);
    out
}

/// Top-N table for one dimension and metric, labels carry N and order value
pub fn top_table(
    dimension: &Dimension,
    metric: Metric,
    rows: &[DimensionSummaryRow],
    top_n: usize,
    min_cases: usize,
) -> String {
    let mut out = subsection(&format!(
        "{}: {} (Top {}, N>={})",
        dimension.label,
        metric.title(),
        top_n,
        min_cases
    ));
    let _ = writeln!(out, "  {:40} {:>10} {:>10}  {}", "Member", "Rate", "Cases", "Visual");
    let _ = writeln!(out, "  {}", "─".repeat(68));
    for row in rows {
        let mut label = row.member.clone();
        if let Some(v) = row.sum_order_value {
            label = format!("{} (V={})", label, fmt_int(v));
        }
        match metric.value(row) {
            Some(rate) => {
                let _ = writeln!(
                    out,
                    "  {:40} {:>9.1}% {:>10}  {}",
                    truncate(&label, 40),
                    rate * 100.0,
                    row.cases,
                    bar(rate)
                );
            }
            None => {
                let _ = writeln!(out, "  {:40} {:>10} {:>10}", truncate(&label, 40), "n/a", row.cases);
            }
        }
    }
    out
}

pub fn sequence_summary(summary: &SequenceSummary, top_n: usize) -> String {
    let mut out = section_header("CORE SEQUENCE CHECK");
    let _ = writeln!(out, "  Total cases (with at least 1 core event): {}", summary.total_cases);
    let _ = writeln!(
        out,
        "  Cases with timestamp violating core sequence: {}",
        summary.violating_cases
    );
    let _ = writeln!(out, "  Share: {:.2}%", summary.share_pct);

    if !summary.distribution.is_empty() {
        out.push_str(&subsection("Top first-violation transitions"));
        let _ = writeln!(out, "  {:50} {:>8} {:>10}", "Transition", "Cases", "Share");
        for row in summary.distribution.iter().take(top_n) {
            let _ = writeln!(
                out,
                "  {:50} {:>8} {:>9.2}%",
                row.first_violation_between, row.case_count, row.share_pct_of_all_cases
            );
        }
    }
    out
}

/// Flag reason labels with their record counts
pub fn flag_counts(flagged: &[(String, usize)]) -> String {
    let mut out = subsection("Data quality flags");
    if flagged.is_empty() {
        out.push_str("  No records flagged\n");
    }
    for (reason, count) in flagged {
        let _ = writeln!(out, "  {:24} {:>8} records", reason, count);
    }
    out
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() > max_len {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fmt_int() {
        assert_eq!(fmt_int(0.0), "0");
        assert_eq!(fmt_int(999.4), "999");
        assert_eq!(fmt_int(1234567.0), "1,234,567");
        assert_eq!(fmt_int(-1000.0), "-1,000");
        assert_eq!(fmt_int(f64::NAN), "0");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long member name", 10), "a very ...");
    }

    #[test]
    fn test_top_table_lines() {
        let row = DimensionSummaryRow {
            dimension: "FACTORY".into(),
            member: "Plant North".into(),
            cases: 250,
            late_rate_cases: 0.25,
            tol_violation_rate_cases: 0.0,
            otif_fail_rate_cases: 0.25,
            otif_fail_cases: 62,
            sum_order_value: Some(12345.0),
            sum_order_value_otif_fail: Some(100.0),
            otif_fail_rate_value: None,
        };
        let dim = Dimension::new("FACTORY", "factory", "Factory");
        let text = top_table(&dim, Metric::LateRate, &[row], 15, 200);
        assert!(text.contains("Factory: Late delivery rate (Top 15, N>=200)"));
        assert!(text.contains("Plant North (V=12,345)"));
        assert!(text.contains("25.0%"));
        assert!(text.contains("#####"));
    }
}
