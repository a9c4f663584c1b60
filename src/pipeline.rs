//! End-to-end runs: OTIF root-cause tables and the core sequence check
//!
//! Each run computes everything in memory and commits its files in one
//! batch at the end.

use crate::aggregate::group_table;
use crate::config::{
    AnalysisConfig, Dimension, SequenceConfig, ACTIVITY, DELIVERED_DATE, NUMERIC_COLUMNS,
    PROMISED_DATE,
};
use crate::error::Result;
use crate::flags::{scan_flags, FlagReason};
use crate::kpi::{enrich, KpiTable};
use crate::models::{
    event_records, CaseSequenceRow, CaseTable, DimensionSummaryRow, Event, ViolationShareRow,
};
use crate::normalize::{parse_number, parse_timestamp};
use crate::output::{records_bytes, OutputBatch};
use crate::ranking::{problem_classes, rank_all, top_n, Metric, ProblemClassRow};
use crate::report;
use crate::sequence::{check_sequences, SequenceSummary};
use crate::table::RawTable;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Case tables need more than this many columns to be accepted
const CASE_TABLE_MIN_COLUMNS: usize = 3;
/// Event logs need at least case, activity and timestamp
const EVENT_LOG_MIN_COLUMNS: usize = 2;

/// Metrics presented as top-N tables per dimension
const PRESENTED_METRICS: [Metric; 2] = [Metric::TolViolationRate, Metric::LateRate];

/// Manifest written next to the OTIF outputs
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub total_cases: usize,
    pub late_rate: f64,
    pub tol_violation_rate: f64,
    pub otif_fail_rate: f64,
    pub dimensions: Vec<String>,
    pub flagged: Vec<(String, usize)>,
    pub files: Vec<PathBuf>,
}

#[derive(Debug)]
pub struct OtifOutcome {
    pub kpis: KpiTable,
    pub dimension_tables: Vec<(Dimension, Vec<DimensionSummaryRow>)>,
    pub ranking: Vec<DimensionSummaryRow>,
    pub summary: RunSummary,
}

impl OtifOutcome {
    /// Headline KPIs, per-dimension top-N tables and flag counts
    pub fn console_report(&self, config: &AnalysisConfig) -> String {
        let mut out = report::otif_headline(&self.kpis);
        for (dimension, rows) in &self.dimension_tables {
            for metric in PRESENTED_METRICS {
                if let Some(top) = top_n(rows, metric, config.min_cases, config.top_n) {
                    out.push_str(&report::top_table(
                        dimension,
                        metric,
                        &top,
                        config.top_n,
                        config.min_cases,
                    ));
                }
            }
        }
        out.push_str(&report::flag_counts(&self.summary.flagged));
        out
    }
}

/// Read, enrich, aggregate, rank and flag the case table
pub fn run_otif(config: &AnalysisConfig) -> Result<OtifOutcome> {
    info!("Reading case table from {:?}", config.case_csv);
    let raw = RawTable::read(&config.case_csv, CASE_TABLE_MIN_COLUMNS)?;
    info!("Parsed {} records with {} columns", raw.len(), raw.headers.len());

    let table = CaseTable::from_raw(raw);
    info!(
        "{} of {} numeric columns present",
        table.numeric_columns_present(),
        NUMERIC_COLUMNS.len()
    );
    let unreadable = unreadable_cells(&table);
    if unreadable.numbers > 0 || unreadable.dates > 0 {
        debug!(
            "{} numeric and {} date cells could not be parsed and are treated as missing",
            unreadable.numbers, unreadable.dates
        );
    }
    if !table.has_dates() {
        warn!("Promised/delivered date columns absent; lateness is false for all cases");
    }

    let kpis = enrich(table);
    info!(
        "Engineered KPIs: late {:.1}%, tolerance {:.1}%, OTIF fail {:.1}%",
        kpis.late_rate() * 100.0,
        kpis.tol_violation_rate() * 100.0,
        kpis.otif_fail_rate() * 100.0
    );

    let dims = config.resolve_dimensions(&kpis.source.raw.headers);
    let mut batch = OutputBatch::new();
    let mut dimension_tables = Vec::with_capacity(dims.len());

    for dimension in dims {
        let rows = group_table(&kpis, &dimension.column);
        info!("{}: {} groups", dimension.label, rows.len());
        let tables_dir = config.tables_dir();
        for metric in PRESENTED_METRICS {
            batch.retire(tables_dir.join(top_file_name(config.top_n, &dimension, metric)));
        }
        batch.retire(tables_dir.join(format!("quadrants_{}.csv", dimension.slug)));
        batch.add_csv(
            tables_dir.join(format!("rates_{}.csv", dimension.slug)),
            &DimensionSummaryRow::HEADER,
            &rows,
        )?;

        for metric in PRESENTED_METRICS {
            match top_n(&rows, metric, config.min_cases, config.top_n) {
                Some(top) => batch.add_csv(
                    tables_dir.join(top_file_name(config.top_n, &dimension, metric)),
                    &DimensionSummaryRow::HEADER,
                    &top,
                )?,
                None => debug!(
                    "Skipping top-{} {} for {}: nothing with N>={}",
                    config.top_n,
                    metric.column(),
                    dimension.slug,
                    config.min_cases
                ),
            }
        }

        if let Some(classes) = problem_classes(&rows, config.min_cases, config.label_count) {
            batch.add_csv(
                tables_dir.join(format!("quadrants_{}.csv", dimension.slug)),
                &ProblemClassRow::HEADER,
                &classes,
            )?;
        }

        dimension_tables.push((dimension, rows));
    }

    let ranking = if dimension_tables.is_empty() {
        warn!("No grouping dimensions found in the case table");
        Vec::new()
    } else {
        let ranking = rank_all(dimension_tables.iter().map(|(_, rows)| rows.clone()).collect());
        batch.add_csv(
            config.output_dir.join("otif_ranking_all_dimensions.csv"),
            &DimensionSummaryRow::HEADER,
            &ranking,
        )?;
        ranking
    };

    for reason in [
        FlagReason::UnitPriceZero,
        FlagReason::OrderValueZero,
        FlagReason::ValueMismatch {
            threshold: config.rel_err_threshold,
        },
    ] {
        batch.retire(config.flags_dir().join(reason.file_name()));
    }

    let mut flagged = Vec::new();
    for set in scan_flags(&kpis.source, config.rel_err_threshold) {
        info!("Flagged {} records: {}", set.len(), set.reason.label());
        let (header, rows) = set.render(&kpis.source);
        batch.add(
            config.flags_dir().join(set.reason.file_name()),
            records_bytes(&header, &rows)?,
        );
        flagged.push((set.reason.label(), set.len()));
    }

    let manifest_path = config.output_dir.join("run_summary.json");
    let mut files = batch.paths();
    files.push(manifest_path.clone());
    let summary = RunSummary {
        total_cases: kpis.len(),
        late_rate: kpis.late_rate(),
        tol_violation_rate: kpis.tol_violation_rate(),
        otif_fail_rate: kpis.otif_fail_rate(),
        dimensions: dimension_tables.iter().map(|(d, _)| d.column.clone()).collect(),
        flagged,
        files,
    };
    batch.add_json(manifest_path, &summary)?;

    let written = batch.commit()?;
    info!("Wrote {} files under {:?}", written.len(), config.output_dir);

    Ok(OtifOutcome {
        kpis,
        dimension_tables,
        ranking,
        summary,
    })
}

fn top_file_name(top_n: usize, dimension: &Dimension, metric: Metric) -> String {
    format!("top{}_{}_{}.csv", top_n, dimension.slug, metric.slug())
}

/// Present cells of the typed columns that did not parse
#[derive(Debug, Default, PartialEq)]
struct UnreadableCells {
    numbers: usize,
    dates: usize,
}

fn unreadable_cells(table: &CaseTable) -> UnreadableCells {
    UnreadableCells {
        numbers: count_unreadable(table, &NUMERIC_COLUMNS, |cell| parse_number(cell).is_some()),
        dates: count_unreadable(table, &[PROMISED_DATE, DELIVERED_DATE], |cell| {
            parse_timestamp(cell).is_some()
        }),
    }
}

fn count_unreadable(table: &CaseTable, columns: &[&str], readable: impl Fn(&str) -> bool) -> usize {
    columns
        .iter()
        .filter_map(|c| table.raw.column_index(c))
        .map(|col| {
            (0..table.raw.len())
                .filter(|&row| table.raw.cell(row, col).is_some_and(|cell| !readable(cell)))
                .count()
        })
        .sum()
}

/// Events with a usable timestamp, plus the number of rows dropped
pub fn load_events(path: &Path) -> Result<(Vec<Event>, usize)> {
    let raw = RawTable::read(path, EVENT_LOG_MIN_COLUMNS)?;
    let records = event_records(&raw)?;
    let total = records.len();

    let mut events = Vec::with_capacity(total);
    let mut dropped = 0;
    for (i, record) in records.iter().enumerate() {
        match record.to_event() {
            Some(event) => events.push(event),
            None => {
                if dropped < 5 {
                    warn!("Dropping event row {}: {:?}", i, record);
                }
                dropped += 1;
            }
        }
    }
    if dropped > 0 {
        warn!("Dropped {} of {} event rows without case, activity or timestamp", dropped, total);
    }
    Ok((events, dropped))
}

#[derive(Debug)]
pub struct SequenceOutcome {
    pub summary: SequenceSummary,
    pub dropped_rows: usize,
    pub files: Vec<PathBuf>,
}

/// First-violation check over the event log
pub fn run_sequence_check(config: &SequenceConfig) -> Result<SequenceOutcome> {
    info!("Reading event log from {:?}", config.event_csv);
    let (events, dropped_rows) = load_events(&config.event_csv)?;
    info!("Loaded {} events", events.len());

    let summary = check_sequences(&events);
    info!(
        "{} of {} cases violate the core sequence ({:.2}%)",
        summary.violating_cases, summary.total_cases, summary.share_pct
    );

    let mut batch = OutputBatch::new();
    batch.add_csv(config.case_level_path(), &CaseSequenceRow::HEADER, &summary.cases)?;
    batch.add_csv(
        config.distribution_path(),
        &ViolationShareRow::HEADER,
        &summary.distribution,
    )?;
    batch.add_text(config.kpi_path(), &summary.kpi_text());
    let files = batch.commit()?;

    Ok(SequenceOutcome {
        summary,
        dropped_rows,
        files,
    })
}

/// Distinct non-empty activity names of an event log
pub fn distinct_activities(path: &Path) -> Result<BTreeSet<String>> {
    let raw = RawTable::read(path, EVENT_LOG_MIN_COLUMNS)?;
    let col = raw.require_column(ACTIVITY)?;
    Ok((0..raw.len())
        .filter_map(|row| raw.cell(row, col).map(str::to_string))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreadable_cells_counts_numbers_and_dates() {
        let raw = RawTable::parse_bytes(
            b"CASE_KEY;ORDER_VALUE;UNIT_PRICE;PROMISED_DATE;DELIVERED_DATE\n\
              a;1.234,5;x;01.03.2024;soon\n\
              b;;7;someday;2024-03-02\n",
            3,
            Path::new("t.csv"),
        )
        .unwrap();
        let table = CaseTable::from_raw(raw);
        assert_eq!(table.numeric_columns_present(), 2);
        assert_eq!(
            unreadable_cells(&table),
            UnreadableCells {
                numbers: 1,
                dates: 2
            }
        );
    }
}
