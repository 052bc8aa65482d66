//! Run rules for detecting non-random patterns in control charts.
//!
//! Eight sliding-window tests for special-cause variation. Every rule looks
//! at a fixed-length trailing window ending at the candidate point, and a
//! point is only eligible once its full window exists. A window that
//! contains an undefined value, or a row whose limits are undefined, is
//! never evaluated.
//!
//! All comparisons are strict: a value sitting exactly on a limit or zone
//! line is not beyond it.
//!
//! # References
//!
//! - Nelson, L.S. (1984). "The Shewhart Control Chart — Tests for Special Causes",
//!   *Journal of Quality Technology* 16(4), pp. 237-239.
//! - Western Electric (1956). *Statistical Quality Control Handbook*.
//! - NHS Improvement (2018). *Making data count*.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::chart::{ChartKind, ChartRow, ControlLimits};
use super::config::RuleSetKind;

/// Identifier of one of the eight canonical rules.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Rule {
    Rule1,
    Rule2,
    Rule3,
    Rule4,
    Rule5,
    Rule6,
    Rule7,
    Rule8,
}

impl Rule {
    pub const ALL: [Rule; 8] = [
        Rule::Rule1,
        Rule::Rule2,
        Rule::Rule3,
        Rule::Rule4,
        Rule::Rule5,
        Rule::Rule6,
        Rule::Rule7,
        Rule::Rule8,
    ];

    pub fn number(self) -> u8 {
        match self {
            Rule::Rule1 => 1,
            Rule::Rule2 => 2,
            Rule::Rule3 => 3,
            Rule::Rule4 => 4,
            Rule::Rule5 => 5,
            Rule::Rule6 => 6,
            Rule::Rule7 => 7,
            Rule::Rule8 => 8,
        }
    }

    /// Column label, `"Rule N"`.
    pub fn label(self) -> &'static str {
        match self {
            Rule::Rule1 => "Rule 1",
            Rule::Rule2 => "Rule 2",
            Rule::Rule3 => "Rule 3",
            Rule::Rule4 => "Rule 4",
            Rule::Rule5 => "Rule 5",
            Rule::Rule6 => "Rule 6",
            Rule::Rule7 => "Rule 7",
            Rule::Rule8 => "Rule 8",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Rule::Rule1 => "a point beyond the control limits",
            Rule::Rule2 => "2 of 3 consecutive points beyond 2 sigma on the same side",
            Rule::Rule3 => "4 of 5 consecutive points beyond 1 sigma on the same side",
            Rule::Rule4 => "8 consecutive points on one side of the center line",
            Rule::Rule5 => "6 consecutive points steadily increasing or decreasing",
            Rule::Rule6 => "8 consecutive points outside the 1 sigma band, either side",
            Rule::Rule7 => "15 consecutive points inside the 1 sigma band",
            Rule::Rule8 => "14 consecutive points alternating up and down",
        }
    }

    /// Number of points the rule inspects. The first `window_len() - 1`
    /// points of a run can never fire.
    pub fn window_len(self) -> usize {
        match self {
            Rule::Rule1 => 1,
            Rule::Rule2 => 3,
            Rule::Rule3 => 5,
            Rule::Rule4 => 8,
            Rule::Rule5 => 6,
            Rule::Rule6 => 8,
            Rule::Rule7 => 15,
            Rule::Rule8 => 14,
        }
    }

    /// Test a full window whose last element is the candidate point.
    ///
    /// `window.len()` must equal [`Rule::window_len`]; shorter windows never
    /// fire.
    pub fn fires(self, window: &[Point]) -> bool {
        if window.len() != self.window_len() {
            return false;
        }
        match self {
            Rule::Rule1 => window.iter().any(|p| p.limits.is_beyond(p.value)),
            Rule::Rule2 => beyond_same_side(window, 2, |l| (l.plus2sd, l.minus2sd)),
            Rule::Rule3 => beyond_same_side(window, 4, |l| (l.plus1sd, l.minus1sd)),
            Rule::Rule4 => {
                window.iter().all(|p| p.value > p.limits.cl)
                    || window.iter().all(|p| p.value < p.limits.cl)
            }
            Rule::Rule5 => {
                window.windows(2).all(|w| w[1].value > w[0].value)
                    || window.windows(2).all(|w| w[1].value < w[0].value)
            }
            Rule::Rule6 => window
                .iter()
                .all(|p| p.value > p.limits.plus1sd || p.value < p.limits.minus1sd),
            Rule::Rule7 => window
                .iter()
                .all(|p| (p.value - p.limits.cl).abs() <= p.limits.sigma()),
            Rule::Rule8 => {
                let diffs: Vec<f64> = window.windows(2).map(|w| w[1].value - w[0].value).collect();
                diffs.windows(2).all(|d| d[0] * d[1] < 0.0)
            }
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// At least `needed` points strictly above the upper line, or at least
/// `needed` strictly below the lower line. Sides are counted independently.
fn beyond_same_side(
    window: &[Point],
    needed: usize,
    lines: impl Fn(&ControlLimits) -> (f64, f64),
) -> bool {
    let above = window
        .iter()
        .filter(|p| p.value > lines(&p.limits).0)
        .count();
    let below = window
        .iter()
        .filter(|p| p.value < lines(&p.limits).1)
        .count();
    above >= needed || below >= needed
}

/// A defined chart value with the limits in force at that row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub value: f64,
    pub limits: ControlLimits,
}

/// Rules evaluated for a chart of `kind` under `set`.
///
/// Variables primary charts (X and X-bar) get the full set; attributes and
/// companion charts get the reduced subset.
///
/// | Set | Variables | Attributes / companion |
/// |-----|-----------|------------------------|
/// | Nelson | 1-8 | 1, 4, 5, 8 |
/// | NHS Improvement | 1, 2, 4, 5, 7 | 1, 4, 5 |
pub fn applicable_rules(kind: ChartKind, set: RuleSetKind) -> Vec<Rule> {
    let variables = !kind.is_non_negative();
    let rules: &[Rule] = match (set, variables) {
        (RuleSetKind::Nelson, true) => &Rule::ALL,
        (RuleSetKind::Nelson, false) => &[Rule::Rule1, Rule::Rule4, Rule::Rule5, Rule::Rule8],
        (RuleSetKind::NhsImprovement, true) => &[
            Rule::Rule1,
            Rule::Rule2,
            Rule::Rule4,
            Rule::Rule5,
            Rule::Rule7,
        ],
        (RuleSetKind::NhsImprovement, false) => &[Rule::Rule1, Rule::Rule4, Rule::Rule5],
    };
    rules.to_vec()
}

/// Timestamps at which each evaluated rule fired.
///
/// Every evaluated rule has an entry, possibly empty, so a missing entry
/// means the rule was not applicable rather than that it never fired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "K: Serialize",
    deserialize = "K: Deserialize<'de> + Ord"
))]
pub struct RuleViolationSet<K> {
    hits: BTreeMap<Rule, BTreeSet<K>>,
}

impl<K: Ord> RuleViolationSet<K> {
    /// An empty set covering `rules`.
    pub fn new(rules: &[Rule]) -> Self {
        Self {
            hits: rules.iter().map(|&r| (r, BTreeSet::new())).collect(),
        }
    }

    /// Record a hit. Ignored for rules the set does not cover.
    pub fn insert(&mut self, rule: Rule, timestamp: K) {
        if let Some(set) = self.hits.get_mut(&rule) {
            set.insert(timestamp);
        }
    }

    pub fn contains(&self, rule: Rule, timestamp: &K) -> bool {
        self.hits
            .get(&rule)
            .is_some_and(|set| set.contains(timestamp))
    }

    /// Timestamps for `rule`, or `None` if the rule was not evaluated.
    pub fn get(&self, rule: Rule) -> Option<&BTreeSet<K>> {
        self.hits.get(&rule)
    }

    /// Rules covered, in canonical order.
    pub fn rules(&self) -> impl Iterator<Item = Rule> + '_ {
        self.hits.keys().copied()
    }

    /// Total number of (rule, timestamp) hits.
    pub fn total(&self) -> usize {
        self.hits.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Split rows into maximal runs of defined points, each tagged with the
/// index of its first row.
fn defined_runs<K>(rows: &[ChartRow<K>]) -> Vec<(usize, Vec<Point>)> {
    let mut runs = Vec::new();
    let mut current: Vec<Point> = Vec::new();
    let mut start = 0;
    for (i, row) in rows.iter().enumerate() {
        match row.point() {
            Some((value, limits)) => {
                if current.is_empty() {
                    start = i;
                }
                current.push(Point {
                    value,
                    limits: *limits,
                });
            }
            None => {
                if !current.is_empty() {
                    runs.push((start, std::mem::take(&mut current)));
                }
            }
        }
    }
    if !current.is_empty() {
        runs.push((start, current));
    }
    runs
}

/// Evaluate `rules` over one segment's chart rows.
///
/// Each rule slides its window over every run of defined points; the hit is
/// recorded at the timestamp of the window's last row.
///
/// # Examples
///
/// ```
/// use u_spc::spc::{evaluate, ChartKind, ControlLimits, Rule, SegmentChart};
///
/// let limits = ControlLimits::from_sigma(0.0, 1.0, false);
/// let points: Vec<(u32, Option<f64>)> = (0..8).map(|t| (t, Some(0.5))).collect();
/// let chart = SegmentChart::broadcast(ChartKind::Individual, 0, limits, points);
///
/// let hits = evaluate(&chart.rows, &[Rule::Rule4]);
/// assert!(hits.contains(Rule::Rule4, &7));
/// assert!(!hits.contains(Rule::Rule4, &6));
/// ```
pub fn evaluate<K: Ord + Clone>(rows: &[ChartRow<K>], rules: &[Rule]) -> RuleViolationSet<K> {
    let mut violations = RuleViolationSet::new(rules);
    for (start, run) in defined_runs(rows) {
        for &rule in rules {
            let len = rule.window_len();
            for (offset, window) in run.windows(len).enumerate() {
                if rule.fires(window) {
                    let last = start + offset + len - 1;
                    violations.insert(rule, rows[last].timestamp.clone());
                }
            }
        }
    }
    violations
}
