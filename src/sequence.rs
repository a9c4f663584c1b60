//! Core-chain sequence check over the event log
//!
//! For every case the earliest timestamp of each milestone activity is
//! taken, and the observed milestones are walked in reference order. The
//! first adjacent pair running backwards in time is the case's violation.

use crate::models::{CaseSequenceRow, Event, ViolationShareRow};
use chrono::NaiveDateTime;
use std::collections::{BTreeMap, HashMap};

/// Expected end-to-end milestone order
pub const CORE_CHAIN: [&str; 6] = [
    "Order received",
    "Confirm sale",
    "Start production",
    "Finished production",
    "Load shipment",
    "Goods delivered",
];

/// First-seen timestamp per activity for one case
pub type FirstSeen = HashMap<String, NaiveDateTime>;

/// Outcome of the check for a single case
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceCheck<'c> {
    pub between: Option<(&'c str, &'c str)>,
}

impl<'c> SequenceCheck<'c> {
    pub fn has_violation(&self) -> bool {
        self.between.is_some()
    }

    /// `"<earlier> -> <later>"`, or `None` when the case is in order
    pub fn label(&self) -> Option<String> {
        self.between.map(|(prev, curr)| format!("{} -> {}", prev, curr))
    }
}

/// First violation against the core chain
pub fn first_violation(first_seen: &FirstSeen) -> SequenceCheck<'static> {
    first_violation_in(&CORE_CHAIN, first_seen)
}

/// First violation against an arbitrary reference chain. Fewer than two
/// observed milestones is not enough evidence and never violates.
pub fn first_violation_in<'c>(chain: &[&'c str], first_seen: &FirstSeen) -> SequenceCheck<'c> {
    let available: Vec<(&'c str, NaiveDateTime)> = chain
        .iter()
        .filter_map(|a| first_seen.get(*a).map(|t| (*a, *t)))
        .collect();

    let between = available
        .windows(2)
        .find(|pair| pair[1].1 < pair[0].1)
        .map(|pair| (pair[0].0, pair[1].0));

    SequenceCheck { between }
}

/// Earliest timestamp per (case, chain activity). Cases without any chain
/// event do not appear.
pub fn first_seen_times(events: &[Event], chain: &[&str]) -> BTreeMap<String, FirstSeen> {
    let mut cases: BTreeMap<String, FirstSeen> = BTreeMap::new();
    for event in events {
        if !chain.contains(&event.activity.as_str()) {
            continue;
        }
        let seen = cases.entry(event.case_key.clone()).or_default();
        seen.entry(event.activity.clone())
            .and_modify(|t| {
                if event.time < *t {
                    *t = event.time;
                }
            })
            .or_insert(event.time);
    }
    cases
}

/// Aggregate result of a sequence-check run
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceSummary {
    pub total_cases: usize,
    pub violating_cases: usize,
    /// Percentage (0-100) of cases with a violation
    pub share_pct: f64,
    pub cases: Vec<CaseSequenceRow>,
    pub distribution: Vec<ViolationShareRow>,
}

impl SequenceSummary {
    /// The three-line KPI text written next to the tables
    pub fn kpi_text(&self) -> String {
        format!(
            "Total cases (with at least 1 core event): {}\n\
             Cases with timestamp violating core sequence: {}\n\
             Share: {:.2}%\n",
            self.total_cases, self.violating_cases, self.share_pct
        )
    }
}

/// Run the check over every case of the event log
pub fn check_sequences(events: &[Event]) -> SequenceSummary {
    let first_seen = first_seen_times(events, &CORE_CHAIN);

    let cases: Vec<CaseSequenceRow> = first_seen
        .iter()
        .map(|(case_key, seen)| {
            let check = first_violation(seen);
            CaseSequenceRow {
                case_key: case_key.clone(),
                has_violation: check.has_violation(),
                first_violation_between: check.label(),
            }
        })
        .collect();

    let total_cases = cases.len();
    let violating_cases = cases.iter().filter(|c| c.has_violation).count();
    let share_pct = if total_cases > 0 {
        violating_cases as f64 / total_cases as f64 * 100.0
    } else {
        0.0
    };

    SequenceSummary {
        total_cases,
        violating_cases,
        share_pct,
        distribution: violation_distribution(&cases, total_cases),
        cases,
    }
}

/// Violation labels ranked by case count; ties keep first-appearance order.
/// Shares are relative to all cases, not only the violating ones.
fn violation_distribution(cases: &[CaseSequenceRow], total_cases: usize) -> Vec<ViolationShareRow> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for label in cases.iter().filter_map(|c| c.first_violation_between.as_deref()) {
        let count = counts.entry(label).or_insert(0);
        if *count == 0 {
            order.push(label.to_string());
        }
        *count += 1;
    }

    let mut rows: Vec<ViolationShareRow> = order
        .into_iter()
        .map(|label| {
            let case_count = counts.get(label.as_str()).copied().unwrap_or(0);
            ViolationShareRow {
                share_pct_of_all_cases: round2(case_count as f64 / total_cases as f64 * 100.0),
                first_violation_between: label,
                case_count,
            }
        })
        .collect();
    rows.sort_by(|a, b| b.case_count.cmp(&a.case_count));
    rows
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 3, day)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn seen(entries: &[(&str, u32)]) -> FirstSeen {
        entries.iter().map(|(a, d)| (a.to_string(), at(*d))).collect()
    }

    fn event(case: &str, activity: &str, day: u32) -> Event {
        Event {
            case_key: case.to_string(),
            activity: activity.to_string(),
            time: at(day),
        }
    }

    #[test]
    fn test_in_order_chain() {
        let s = seen(&[
            ("Order received", 1),
            ("Confirm sale", 2),
            ("Start production", 3),
            ("Finished production", 4),
            ("Load shipment", 5),
            ("Goods delivered", 6),
        ]);
        let check = first_violation(&s);
        assert!(!check.has_violation());
        assert_eq!(check.label(), None);
    }

    #[test]
    fn test_short_circuits_on_first_violation() {
        // 5 precedes 4, and 6 precedes 5 as well; only the first is reported
        let s = seen(&[
            ("Order received", 1),
            ("Confirm sale", 2),
            ("Start production", 3),
            ("Finished production", 10),
            ("Load shipment", 8),
            ("Goods delivered", 4),
        ]);
        let check = first_violation(&s);
        assert_eq!(check.between, Some(("Finished production", "Load shipment")));
    }

    #[test]
    fn test_single_activity_is_insufficient() {
        let check = first_violation(&seen(&[("Order received", 5)]));
        assert!(!check.has_violation());
        assert_eq!(check.between, None);
        assert!(!first_violation(&FirstSeen::new()).has_violation());
    }

    #[test]
    fn test_gaps_compare_adjacent_present_activities() {
        let s = seen(&[("Order received", 5), ("Load shipment", 3)]);
        assert_eq!(
            first_violation(&s).label().as_deref(),
            Some("Order received -> Load shipment")
        );
    }

    #[test]
    fn test_equal_timestamps_are_not_violations() {
        let s = seen(&[("Confirm sale", 2), ("Start production", 2)]);
        assert!(!first_violation(&s).has_violation());
    }

    #[test]
    fn test_custom_chain() {
        let chain = ["a", "b", "c"];
        let s = seen(&[("a", 3), ("b", 4), ("c", 1)]);
        assert_eq!(first_violation_in(&chain, &s).between, Some(("b", "c")));
    }

    #[test]
    fn test_first_seen_keeps_minimum_and_drops_other_activities() {
        let events = vec![
            event("A", "Confirm sale", 5),
            event("A", "Confirm sale", 2),
            event("A", "Invoice sent", 1),
            event("B", "Invoice sent", 1),
        ];
        let times = first_seen_times(&events, &CORE_CHAIN);
        assert_eq!(times.len(), 1);
        assert_eq!(times["A"]["Confirm sale"], at(2));
        assert!(!times["A"].contains_key("Invoice sent"));
    }

    #[test]
    fn test_three_case_scenario() {
        let mut events = Vec::new();
        for (i, activity) in CORE_CHAIN.iter().enumerate() {
            events.push(event("A", activity, i as u32 + 1));
        }
        events.push(event("B", "Order received", 1));
        events.push(event("B", "Confirm sale", 5));
        events.push(event("B", "Start production", 3));
        events.push(event("C", "Order received", 1));

        let summary = check_sequences(&events);
        assert_eq!(summary.total_cases, 3);
        assert_eq!(summary.violating_cases, 1);
        assert!((summary.share_pct - 33.333_333).abs() < 1e-3);
        assert_eq!(summary.distribution.len(), 1);
        assert_eq!(
            summary.distribution[0].first_violation_between,
            "Confirm sale -> Start production"
        );
        assert_eq!(summary.distribution[0].case_count, 1);
        assert_eq!(summary.distribution[0].share_pct_of_all_cases, 33.33);

        let b = summary.cases.iter().find(|c| c.case_key == "B").unwrap();
        assert!(b.has_violation);
        let c = summary.cases.iter().find(|c| c.case_key == "C").unwrap();
        assert_eq!(c.first_violation_between, None);
        assert!(summary.kpi_text().contains("Share: 33.33%"));
    }

    #[test]
    fn test_distribution_ranked_by_count() {
        let mut events = Vec::new();
        for case in ["x1", "x2"] {
            events.push(event(case, "Load shipment", 5));
            events.push(event(case, "Goods delivered", 4));
        }
        events.push(event("y", "Order received", 5));
        events.push(event("y", "Confirm sale", 4));

        let summary = check_sequences(&events);
        assert_eq!(summary.distribution[0].case_count, 2);
        assert_eq!(summary.distribution[0].first_violation_between, "Load shipment -> Goods delivered");
        assert_eq!(summary.distribution[1].case_count, 1);
    }

    #[test]
    fn test_empty_log() {
        let summary = check_sequences(&[]);
        assert_eq!(summary.total_cases, 0);
        assert_eq!(summary.share_pct, 0.0);
        assert!(summary.distribution.is_empty());
    }
}
