//! Core control chart types.
//!
//! Defines the building blocks shared by every chart family: control limits
//! with their sigma zones, the per-row chart table the rule evaluator
//! consumes, chart labels, and the non-fatal diagnostics raised along the way.
//!
//! # References
//!
//! - Montgomery, D.C. (2019). *Introduction to Statistical Quality Control*, 8th ed.
//! - ASTM E2587 — Standard Practice for Use of Control Charts

use std::fmt;

use serde::{Deserialize, Serialize};

/// Control limits and sigma zones for one segment.
///
/// Computed once per segment from its baseline and held constant across
/// every row of that segment.
///
/// # Invariants
///
/// - `lcl <= minus2sd <= minus1sd <= cl <= plus1sd <= plus2sd <= ucl`, except
///   that `lcl` may be raised to zero for non-negative quantities
/// - `lcl >= 0` when the limits were built with `clamp_at_zero`
/// - All values are finite
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlLimits {
    /// Center line (baseline mean).
    pub cl: f64,
    /// Lower control limit (CL - 3 sigma, possibly clamped at zero).
    pub lcl: f64,
    /// Upper control limit (CL + 3 sigma).
    pub ucl: f64,
    pub plus1sd: f64,
    pub minus1sd: f64,
    pub plus2sd: f64,
    pub minus2sd: f64,
}

impl ControlLimits {
    /// Build limits at `cl +/- k * sigma` for k = 1, 2, 3.
    ///
    /// Returns `None` when `cl` or `sigma` is not finite or `sigma` is
    /// negative.
    pub fn from_sigma(cl: f64, sigma: f64, clamp_at_zero: bool) -> Option<Self> {
        if !cl.is_finite() || !sigma.is_finite() || sigma < 0.0 {
            return None;
        }
        let lcl = cl - 3.0 * sigma;
        Some(Self {
            cl,
            lcl: if clamp_at_zero { lcl.max(0.0) } else { lcl },
            ucl: cl + 3.0 * sigma,
            plus1sd: cl + sigma,
            minus1sd: cl - sigma,
            plus2sd: cl + 2.0 * sigma,
            minus2sd: cl - 2.0 * sigma,
        })
    }

    /// Build limits from an explicit (possibly asymmetric) pair of control
    /// limits, placing the zones at `cl +/- k * (ucl - cl) / 3`.
    ///
    /// Used by the range and sigma charts, whose factor-table limits are not
    /// symmetric about the center line.
    pub fn from_bounds(cl: f64, lcl: f64, ucl: f64, clamp_at_zero: bool) -> Option<Self> {
        if !cl.is_finite() || !lcl.is_finite() || !ucl.is_finite() || ucl < cl || lcl > cl {
            return None;
        }
        let zone = (ucl - cl) / 3.0;
        Some(Self {
            cl,
            lcl: if clamp_at_zero { lcl.max(0.0) } else { lcl },
            ucl,
            plus1sd: cl + zone,
            minus1sd: cl - zone,
            plus2sd: cl + 2.0 * zone,
            minus2sd: cl - 2.0 * zone,
        })
    }

    /// Width of one sigma zone (`+1sd - cl`).
    pub fn sigma(&self) -> f64 {
        self.plus1sd - self.cl
    }

    /// True when the limits have collapsed onto the center line.
    pub fn is_degenerate(&self) -> bool {
        self.sigma() == 0.0
    }

    pub fn is_beyond(&self, value: f64) -> bool {
        value > self.ucl || value < self.lcl
    }
}

/// The chart a table of rows belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChartKind {
    Individual,
    MovingRange,
    XBar,
    Range,
    Sigma,
    C,
    U,
    P,
    NP,
}

impl ChartKind {
    /// Label carried by every row of an annotated result.
    pub fn label(self) -> &'static str {
        match self {
            ChartKind::Individual => "X-chart",
            ChartKind::MovingRange => "mR-chart",
            ChartKind::XBar => "Xbar-chart",
            ChartKind::Range => "R-chart",
            ChartKind::Sigma => "S-chart",
            ChartKind::C => "c-chart",
            ChartKind::U => "u-chart",
            ChartKind::P => "p-chart",
            ChartKind::NP => "np-chart",
        }
    }

    /// Whether the charted quantity is non-negative by construction.
    pub fn is_non_negative(self) -> bool {
        !matches!(self, ChartKind::Individual | ChartKind::XBar)
    }

    /// Whether this is the dispersion chart of a two-chart family.
    pub fn is_companion(self) -> bool {
        matches!(
            self,
            ChartKind::MovingRange | ChartKind::Range | ChartKind::Sigma
        )
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One row of a chart with its segment's limits broadcast onto it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartRow<K> {
    pub timestamp: K,
    /// The charted statistic. `None` when undefined (missing input, first
    /// moving range of a segment, subgroup with no usable values).
    pub value: Option<f64>,
    /// `None` when the segment's limits could not be computed.
    pub limits: Option<ControlLimits>,
}

impl<K> ChartRow<K> {
    /// The value together with its limits, when both are defined.
    pub fn point(&self) -> Option<(f64, &ControlLimits)> {
        match (self.value, self.limits.as_ref()) {
            (Some(v), Some(l)) => Some((v, l)),
            _ => None,
        }
    }
}

/// The chart table of one segment: rows plus the limits shared by all of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentChart<K> {
    pub kind: ChartKind,
    pub segment: usize,
    pub limits: Option<ControlLimits>,
    pub rows: Vec<ChartRow<K>>,
}

impl<K> SegmentChart<K> {
    /// Attach `limits` to every row of `points`.
    pub fn broadcast(
        kind: ChartKind,
        segment: usize,
        limits: Option<ControlLimits>,
        points: Vec<(K, Option<f64>)>,
    ) -> Self {
        let rows = points
            .into_iter()
            .map(|(timestamp, value)| ChartRow {
                timestamp,
                value,
                limits,
            })
            .collect();
        Self {
            kind,
            segment,
            limits,
            rows,
        }
    }
}

/// Everything the limit calculator produces for one segment.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentCharts<K> {
    pub primary: SegmentChart<K>,
    /// Moving range, range or sigma chart for two-chart families.
    pub companion: Option<SegmentChart<K>>,
    /// Number of charted points (rows or subgroups) in the baseline.
    pub baseline_points: usize,
    pub diagnostics: Vec<Diagnostic>,
}

/// A non-fatal condition found while computing a report.
///
/// Data-quality warnings and numeric degeneracies never abort the
/// computation; they are returned next to the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Diagnostic {
    /// The whole series has no more points than the recommended minimum.
    TooFewPoints { points: usize, minimum: usize },
    /// A segment's baseline is shorter than the recommended minimum.
    UnderpoweredBaseline {
        segment: usize,
        points: usize,
        minimum: usize,
    },
    /// Rows repeat a timestamp on a family that charts individual rows.
    DuplicateTimestamps { count: usize },
    /// Rows with a missing target value; they are never flagged.
    MissingValues { count: usize },
    /// A subgroup's size differs from the configured subgroup size.
    SubgroupSizeMismatch {
        segment: usize,
        subgroups: usize,
        expected: usize,
    },
    /// The baseline has no variation, so `ucl == lcl == cl`.
    ZeroVariance { segment: usize, chart: ChartKind },
    /// The limits could not be computed; rules are not evaluated.
    UndefinedLimits { segment: usize, chart: ChartKind },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::TooFewPoints { points, minimum } => write!(
                f,
                "only {points} data points; more than {minimum} are recommended"
            ),
            Diagnostic::UnderpoweredBaseline {
                segment,
                points,
                minimum,
            } => write!(
                f,
                "segment {segment} baseline has {points} points; at least {minimum} are recommended"
            ),
            Diagnostic::DuplicateTimestamps { count } => {
                write!(f, "{count} rows repeat a timestamp")
            }
            Diagnostic::MissingValues { count } => {
                write!(f, "{count} rows have a missing value")
            }
            Diagnostic::SubgroupSizeMismatch {
                segment,
                subgroups,
                expected,
            } => write!(
                f,
                "segment {segment}: {subgroups} subgroups differ from the configured size {expected}"
            ),
            Diagnostic::ZeroVariance { segment, chart } => write!(
                f,
                "segment {segment} {chart} baseline has zero variance; limits collapse onto the center line"
            ),
            Diagnostic::UndefinedLimits { segment, chart } => write!(
                f,
                "segment {segment} {chart} limits are undefined; no rules evaluated"
            ),
        }
    }
}
