//! Synthetic order-to-cash data with controlled defect rates
//!
//! Produces a `;`-delimited case table with European decimals and a matching
//! event log. Every generated case remembers which defects were injected so
//! runs over the files can be checked against the truth.

use crate::config::{
    ACTIVITY, CASE_KEY, DELIVERED_DATE, DELIVERED_QUANTITY, EVENT_TIME, MAX_ORDER_TOLERANCE,
    MIN_ORDER_TOLERANCE, ORDERED_QUANTITY, ORDER_VALUE, PROMISED_DATE, UNIT_PRICE,
};
use crate::error::Result;
use crate::models::Event;
use crate::output::records_bytes;
use crate::sequence::CORE_CHAIN;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::prelude::*;

const FACTORIES: [&str; 5] = ["Plant North", "Plant South", "Plant East", "Plant West", "Mill Central"];
const DELIVERY_COMPANIES: [&str; 4] = ["Nordfracht", "TransAlp", "Baltic Cargo", "RailWay Log"];
const PRODUCT_TYPES: [&str; 3] = ["Board", "Veneer", "Timber"];
const CUST_MARKETS: [&str; 4] = ["DACH", "Nordics", "Benelux", "Iberia"];

/// (min %, max %) tolerance bands a case can carry
const TOLERANCE_BANDS: [(f64, f64); 4] = [(0.0, 0.0), (-2.0, 2.0), (-5.0, 5.0), (-10.0, 10.0)];

/// Activity outside the core chain, logged for some cases
const INVOICE_ACTIVITY: &str = "Create invoice";

#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub cases: usize,
    /// Base probability of a late delivery, scaled per factory
    pub late_rate: f64,
    pub tol_violation_rate: f64,
    /// Probability of swapping the timestamps of two adjacent core activities
    pub swap_rate: f64,
    /// Probability of a zero or unreadable price/value cell
    pub dirty_rate: f64,
    pub start: NaiveDate,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            cases: 5000,
            late_rate: 0.15,
            tol_violation_rate: 0.08,
            swap_rate: 0.05,
            dirty_rate: 0.01,
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
        }
    }
}

/// How a price or value cell was corrupted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirtyCell {
    UnitPriceZero,
    OrderValueZero,
    UnitPriceUnreadable,
}

#[derive(Debug, Clone)]
pub struct SyntheticCase {
    pub case_key: String,
    pub delivery_company: &'static str,
    pub factory: &'static str,
    pub product_type: &'static str,
    pub cust_market: &'static str,
    pub ordered_quantity: f64,
    pub delivered_quantity: f64,
    pub min_tolerance_pct: f64,
    pub max_tolerance_pct: f64,
    pub unit_price: f64,
    pub order_value: f64,
    pub promised_date: NaiveDate,
    pub delivered_date: NaiveDate,
    pub late: bool,
    pub tol_violation: bool,
    /// Index `i` of the swapped pair `CORE_CHAIN[i]`, `CORE_CHAIN[i + 1]`
    pub swapped: Option<usize>,
    pub dirty: Option<DirtyCell>,
}

impl SyntheticCase {
    /// Expected first-violation label of the event log
    pub fn expected_violation(&self) -> Option<String> {
        self.swapped
            .map(|i| format!("{} -> {}", CORE_CHAIN[i], CORE_CHAIN[i + 1]))
    }
}

#[derive(Debug, Clone)]
pub struct SyntheticData {
    pub cases: Vec<SyntheticCase>,
    pub events: Vec<Event>,
}

/// Generate `config.cases` cases and their event log
pub fn generate(config: &SyntheticConfig, rng: &mut impl Rng) -> SyntheticData {
    let mut cases = Vec::with_capacity(config.cases);
    let mut events = Vec::with_capacity(config.cases * (CORE_CHAIN.len() + 1));

    for i in 0..config.cases {
        let case = generate_case(i, config, rng);
        events.extend(case_events(&case, rng));
        cases.push(case);
    }

    SyntheticData { cases, events }
}

fn generate_case(index: usize, config: &SyntheticConfig, rng: &mut impl Rng) -> SyntheticCase {
    let factory_idx = rng.gen_range(0..FACTORIES.len());
    // later factories in the list run late more often
    let factory_bias = 0.5 + factory_idx as f64 / (FACTORIES.len() - 1) as f64;
    let late = rng.gen_bool((config.late_rate * factory_bias).clamp(0.0, 1.0));

    let ordered_quantity = rng.gen_range(100..=5000) as f64;
    let (min_tolerance_pct, max_tolerance_pct) = TOLERANCE_BANDS[rng.gen_range(0..TOLERANCE_BANDS.len())];
    let tol_violation = rng.gen_bool(config.tol_violation_rate.clamp(0.0, 1.0));
    let delivered_quantity = delivered_quantity(
        ordered_quantity,
        min_tolerance_pct,
        max_tolerance_pct,
        tol_violation,
        rng,
    );

    let unit_price = (rng.gen_range(2.0..250.0_f64) * 100.0).round() / 100.0;
    let order_value = ((unit_price * delivered_quantity) * 100.0).round() / 100.0;

    let promised_date = config.start + Duration::days(rng.gen_range(0..365));
    let delivered_date = if late {
        promised_date + Duration::days(rng.gen_range(1..=10))
    } else {
        promised_date - Duration::days(rng.gen_range(0..=3))
    };

    let swapped = rng
        .gen_bool(config.swap_rate.clamp(0.0, 1.0))
        .then(|| rng.gen_range(0..CORE_CHAIN.len() - 1));
    let dirty = rng
        .gen_bool(config.dirty_rate.clamp(0.0, 1.0))
        .then(|| match rng.gen_range(0..3) {
            0 => DirtyCell::UnitPriceZero,
            1 => DirtyCell::OrderValueZero,
            _ => DirtyCell::UnitPriceUnreadable,
        });

    SyntheticCase {
        case_key: format!("C{:07}", index + 1),
        delivery_company: DELIVERY_COMPANIES[rng.gen_range(0..DELIVERY_COMPANIES.len())],
        factory: FACTORIES[factory_idx],
        product_type: PRODUCT_TYPES[rng.gen_range(0..PRODUCT_TYPES.len())],
        cust_market: CUST_MARKETS[rng.gen_range(0..CUST_MARKETS.len())],
        ordered_quantity,
        delivered_quantity,
        min_tolerance_pct,
        max_tolerance_pct,
        unit_price,
        order_value,
        promised_date,
        delivered_date,
        late,
        tol_violation,
        swapped,
        dirty,
    }
}

/// Whole-unit delivered quantity, strictly outside the band for violations
/// and within half of it otherwise
fn delivered_quantity(
    ordered: f64,
    min_pct: f64,
    max_pct: f64,
    violation: bool,
    rng: &mut impl Rng,
) -> f64 {
    if violation {
        let overshoot = rng.gen_range(0.01..0.15);
        if rng.gen_bool(0.5) {
            (ordered * (1.0 + max_pct / 100.0 + overshoot)).ceil() + 1.0
        } else {
            ((ordered * (1.0 + min_pct / 100.0 - overshoot)).floor() - 1.0).max(0.0)
        }
    } else if max_pct == min_pct {
        ordered
    } else {
        let pct = rng.gen_range(min_pct / 2.0..=max_pct / 2.0);
        (ordered * (1.0 + pct / 100.0)).round()
    }
}

fn case_events(case: &SyntheticCase, rng: &mut impl Rng) -> Vec<Event> {
    let mut time: NaiveDateTime = (case.promised_date - Duration::days(30))
        .and_hms_opt(8, 0, 0)
        .unwrap_or_default();

    let mut times = Vec::with_capacity(CORE_CHAIN.len());
    for _ in CORE_CHAIN {
        time += Duration::hours(rng.gen_range(4..72));
        times.push(time);
    }
    if let Some(i) = case.swapped {
        times.swap(i, i + 1);
    }

    let mut events: Vec<Event> = CORE_CHAIN
        .iter()
        .zip(times)
        .map(|(activity, time)| Event {
            case_key: case.case_key.clone(),
            activity: activity.to_string(),
            time,
        })
        .collect();

    if rng.gen_bool(0.5) {
        events.push(Event {
            case_key: case.case_key.clone(),
            activity: INVOICE_ACTIVITY.to_string(),
            time: time + Duration::hours(rng.gen_range(1..48)),
        });
    }
    events
}

/// European rendering with `.` thousands and `,` decimals, e.g. `1.234,50`
pub fn european(x: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, x.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));

    let mut grouped = String::new();
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    let sign = if x < 0.0 { "-" } else { "" };
    if frac_part.is_empty() {
        format!("{}{}", sign, grouped)
    } else {
        format!("{}{},{}", sign, grouped, frac_part)
    }
}

/// Quantities are whole numbers and carry no thousands separator, since a
/// lone `.` reads as a decimal point
fn quantity(x: f64) -> String {
    format!("{}", x as i64)
}

fn date(d: NaiveDate) -> String {
    d.format("%d.%m.%Y").to_string()
}

/// `;`-delimited case table
pub fn case_table_bytes(cases: &[SyntheticCase]) -> Result<Vec<u8>> {
    let header: Vec<String> = [
        CASE_KEY,
        "DELIVERY_COMPANY",
        "FACTORY",
        "PRODUCT_TYPE",
        "CUST_MARKET",
        ORDERED_QUANTITY,
        DELIVERED_QUANTITY,
        MIN_ORDER_TOLERANCE,
        MAX_ORDER_TOLERANCE,
        UNIT_PRICE,
        ORDER_VALUE,
        PROMISED_DATE,
        DELIVERED_DATE,
    ]
    .iter()
    .map(|h| h.to_string())
    .collect();

    let rows: Vec<Vec<String>> = cases
        .iter()
        .map(|c| {
            let unit_price = match c.dirty {
                Some(DirtyCell::UnitPriceZero) => "0".to_string(),
                Some(DirtyCell::UnitPriceUnreadable) => "n.v.".to_string(),
                _ => european(c.unit_price, 2),
            };
            let order_value = match c.dirty {
                Some(DirtyCell::OrderValueZero) => "0,00".to_string(),
                _ => european(c.order_value, 2),
            };
            vec![
                c.case_key.clone(),
                c.delivery_company.to_string(),
                c.factory.to_string(),
                c.product_type.to_string(),
                c.cust_market.to_string(),
                quantity(c.ordered_quantity),
                quantity(c.delivered_quantity),
                european(c.min_tolerance_pct, 1),
                european(c.max_tolerance_pct, 1),
                unit_price,
                order_value,
                date(c.promised_date),
                date(c.delivered_date),
            ]
        })
        .collect();

    semicolon_bytes(&header, &rows)
}

/// Comma-delimited event log ordered by case, then time
pub fn event_log_bytes(events: &[Event]) -> Result<Vec<u8>> {
    let header = vec![
        CASE_KEY.to_string(),
        ACTIVITY.to_string(),
        EVENT_TIME.to_string(),
    ];
    let rows: Vec<Vec<String>> = events
        .iter()
        .map(|e| {
            vec![
                e.case_key.clone(),
                e.activity.clone(),
                e.time.format("%Y-%m-%d %H:%M:%S").to_string(),
            ]
        })
        .collect();
    records_bytes(&header, &rows)
}

fn semicolon_bytes(header: &[String], rows: &[Vec<String>]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_writer(Vec::new());
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| std::io::Error::other(e.to_string()).into())
}
