use crate::config::{
    ACTIVITY, CASE_KEY, DELIVERED_DATE, DELIVERED_QUANTITY, EVENT_TIME, MAX_ORDER_TOLERANCE,
    MIN_ORDER_TOLERANCE, NUMERIC_COLUMNS, ORDERED_QUANTITY, ORDER_VALUE, PROMISED_DATE, UNIT_PRICE,
};
use crate::error::Result;
use crate::normalize::{parse_number, parse_timestamp};
use crate::table::RawTable;
use chrono::NaiveDateTime;
use serde::Serialize;

/// Raw event row as read from the activity table
#[derive(Debug, Clone)]
pub struct EventRecord {
    pub case_key: Option<String>,
    pub activity: Option<String>,
    pub event_time: Option<String>,
}

/// One timestamped activity occurrence of a case
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub case_key: String,
    pub activity: String,
    pub time: NaiveDateTime,
}

impl EventRecord {
    /// `None` when the case, activity or timestamp is unusable
    pub fn to_event(&self) -> Option<Event> {
        let time = parse_timestamp(self.event_time.as_deref()?)?;
        Some(Event {
            case_key: self.case_key.clone()?,
            activity: self.activity.clone()?,
            time,
        })
    }
}

/// Pull the three event columns out of a raw activity table
pub fn event_records(raw: &RawTable) -> Result<Vec<EventRecord>> {
    let case_col = raw.require_column(CASE_KEY)?;
    let act_col = raw.require_column(ACTIVITY)?;
    let time_col = raw.require_column(EVENT_TIME)?;

    Ok((0..raw.len())
        .map(|i| EventRecord {
            case_key: raw.cell(i, case_col).map(str::to_string),
            activity: raw.cell(i, act_col).map(str::to_string),
            event_time: raw.cell(i, time_col).map(str::to_string),
        })
        .collect())
}

/// One order/delivery record with its typed input columns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Case {
    /// Row index into the raw table this case was read from
    pub row: usize,
    pub case_key: Option<String>,
    pub ordered_quantity: Option<f64>,
    pub delivered_quantity: Option<f64>,
    pub min_tolerance_pct: Option<f64>,
    pub max_tolerance_pct: Option<f64>,
    pub order_value: Option<f64>,
    pub unit_price: Option<f64>,
    pub promised_date: Option<NaiveDateTime>,
    pub delivered_date: Option<NaiveDateTime>,
}

/// Case table: the raw source plus typed cases, one per raw row
#[derive(Debug, Clone)]
pub struct CaseTable {
    pub raw: RawTable,
    pub cases: Vec<Case>,
}

impl CaseTable {
    pub fn from_raw(raw: RawTable) -> Self {
        let col = |name: &str| raw.column_index(name);
        let (key, ordered, delivered) = (col(CASE_KEY), col(ORDERED_QUANTITY), col(DELIVERED_QUANTITY));
        let (tmin, tmax) = (col(MIN_ORDER_TOLERANCE), col(MAX_ORDER_TOLERANCE));
        let (value, price) = (col(ORDER_VALUE), col(UNIT_PRICE));
        let (promised, delivered_at) = (col(PROMISED_DATE), col(DELIVERED_DATE));

        let text = |row: usize, c: Option<usize>| c.and_then(|c| raw.cell(row, c));
        let number = |row: usize, c: Option<usize>| parse_number(text(row, c));
        let date = |row: usize, c: Option<usize>| text(row, c).and_then(parse_timestamp);

        let cases = (0..raw.len())
            .map(|row| Case {
                row,
                case_key: text(row, key).map(str::to_string),
                ordered_quantity: number(row, ordered),
                delivered_quantity: number(row, delivered),
                min_tolerance_pct: number(row, tmin),
                max_tolerance_pct: number(row, tmax),
                order_value: number(row, value),
                unit_price: number(row, price),
                promised_date: date(row, promised),
                delivered_date: date(row, delivered_at),
            })
            .collect();

        Self { raw, cases }
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.raw.column_index(name).is_some()
    }

    /// Lateness can only be judged when both date columns exist in the source
    pub fn has_dates(&self) -> bool {
        self.has_column(PROMISED_DATE) && self.has_column(DELIVERED_DATE)
    }

    pub fn has_order_value(&self) -> bool {
        self.has_column(ORDER_VALUE)
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Source row of a case with numeric columns rendered in canonical form
    pub fn export_row(&self, case: &Case) -> Vec<String> {
        self.raw
            .headers
            .iter()
            .enumerate()
            .map(|(col, header)| {
                let numeric = match header.as_str() {
                    ORDERED_QUANTITY => Some(case.ordered_quantity),
                    DELIVERED_QUANTITY => Some(case.delivered_quantity),
                    MIN_ORDER_TOLERANCE => Some(case.min_tolerance_pct),
                    MAX_ORDER_TOLERANCE => Some(case.max_tolerance_pct),
                    ORDER_VALUE => Some(case.order_value),
                    UNIT_PRICE => Some(case.unit_price),
                    _ => None,
                };
                match numeric {
                    Some(v) => v.map(|v| v.to_string()).unwrap_or_default(),
                    None => self.raw.cell(case.row, col).unwrap_or_default().to_string(),
                }
            })
            .collect()
    }

    pub fn numeric_columns_present(&self) -> usize {
        NUMERIC_COLUMNS.iter().filter(|c| self.has_column(c)).count()
    }
}

/// Derived quality signals of one case
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Kpis {
    pub tol_lower: Option<f64>,
    pub tol_upper: Option<f64>,
    pub is_tol_violation: bool,
    pub outside_tol_qty: f64,
    pub delta_days: Option<i64>,
    pub is_late: bool,
    pub is_otif_fail: bool,
}

/// Per-dimension failure summary for one member value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionSummaryRow {
    pub dimension: String,
    pub member: String,
    pub cases: usize,
    pub late_rate_cases: f64,
    pub tol_violation_rate_cases: f64,
    pub otif_fail_rate_cases: f64,
    pub otif_fail_cases: usize,
    pub sum_order_value: Option<f64>,
    pub sum_order_value_otif_fail: Option<f64>,
    pub otif_fail_rate_value: Option<f64>,
}

impl DimensionSummaryRow {
    pub const HEADER: [&'static str; 10] = [
        "dimension",
        "member",
        "cases",
        "late_rate_cases",
        "tol_violation_rate_cases",
        "otif_fail_rate_cases",
        "otif_fail_cases",
        "sum_order_value",
        "sum_order_value_otif_fail",
        "otif_fail_rate_value",
    ];
}

/// Case-level result of the sequence check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseSequenceRow {
    #[serde(rename = "CASE_KEY")]
    pub case_key: String,
    pub has_violation: bool,
    pub first_violation_between: Option<String>,
}

impl CaseSequenceRow {
    pub const HEADER: [&'static str; 3] = ["CASE_KEY", "has_violation", "first_violation_between"];
}

/// One line of the first-violation distribution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViolationShareRow {
    pub first_violation_between: String,
    pub case_count: usize,
    pub share_pct_of_all_cases: f64,
}

impl ViolationShareRow {
    pub const HEADER: [&'static str; 3] =
        ["first_violation_between", "case_count", "share_pct_of_all_cases"];
}
