//! Joining per-segment charts and rule hits into the annotated output table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::chart::{ChartKind, ControlLimits, SegmentChart};
use super::rules::{Rule, RuleViolationSet};

/// One row of the output table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedRow<K> {
    pub timestamp: K,
    pub value: Option<f64>,
    pub limits: Option<ControlLimits>,
    /// Index of the segment the row belongs to.
    pub segment: usize,
    pub chart: ChartKind,
    /// `1` where the rule fired at this timestamp, `0` elsewhere. Has one
    /// entry per applicable rule.
    pub flags: BTreeMap<Rule, u8>,
}

impl<K> AnnotatedRow<K> {
    pub fn fired(&self, rule: Rule) -> bool {
        self.flags.get(&rule).is_some_and(|&f| f == 1)
    }

    /// Whether any rule fired on this row.
    pub fn any_fired(&self) -> bool {
        self.flags.values().any(|&f| f == 1)
    }
}

/// A complete chart: every segment's rows in chronological order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedResult<K> {
    pub chart: ChartKind,
    /// Rules with a flag column, in canonical order.
    pub rules: Vec<Rule>,
    pub rows: Vec<AnnotatedRow<K>>,
}

impl<K> AnnotatedResult<K> {
    /// Chart label, e.g. `"X-chart"` or `"p-chart"`.
    pub fn label(&self) -> &'static str {
        self.chart.label()
    }

    /// Timestamps at which `rule` fired, in row order.
    pub fn flagged(&self, rule: Rule) -> impl Iterator<Item = &K> + '_ {
        self.rows
            .iter()
            .filter(move |r| r.fired(rule))
            .map(|r| &r.timestamp)
    }

    /// Number of rows flagged by `rule`.
    pub fn count(&self, rule: Rule) -> usize {
        self.rows.iter().filter(|r| r.fired(rule)).count()
    }
}

/// Concatenate segment charts and their rule hits into one table.
///
/// Segments must arrive in chronological order; they are not re-sorted.
/// Flags are looked up by timestamp, never by position, so rows sharing a
/// timestamp share their flags.
pub fn aggregate<K: Ord>(
    chart: ChartKind,
    rules: &[Rule],
    segments: impl IntoIterator<Item = (SegmentChart<K>, RuleViolationSet<K>)>,
) -> AnnotatedResult<K> {
    let mut rows = Vec::new();
    for (seg_chart, violations) in segments {
        let segment = seg_chart.segment;
        rows.extend(seg_chart.rows.into_iter().map(|row| {
            let flags = rules
                .iter()
                .map(|&rule| (rule, u8::from(violations.contains(rule, &row.timestamp))))
                .collect();
            AnnotatedRow {
                timestamp: row.timestamp,
                value: row.value,
                limits: row.limits,
                segment,
                chart,
                flags,
            }
        }));
    }
    AnnotatedResult {
        chart,
        rules: rules.to_vec(),
        rows,
    }
}
