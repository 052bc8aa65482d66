//! Variables control charts: Individual-MR, X-bar-R, and X-bar-S.
//!
//! These charts monitor continuous (variables) data. Subgroup charts group
//! same-timestamp rows and track their mean and within-subgroup spread; the
//! Individual chart handles one observation per timestamp and estimates
//! spread from the moving range of consecutive points.
//!
//! Every function here computes limits for one [`Segment`] from its baseline
//! only, then broadcasts them across all rows of the segment.
//!
//! # References
//!
//! - Montgomery, D.C. (2019). *Introduction to Statistical Quality Control*, 8th ed.,
//!   Chapter 6: Control Charts for Variables.
//! - ASTM E2587 — Standard Practice for Use of Control Charts
//! - Shewhart, W.A. (1931). *Economic Control of Quality of Manufactured Product*.

use u_numflow::stats;

use super::chart::{ChartKind, ControlLimits, Diagnostic, SegmentChart, SegmentCharts};
use super::constants::{ChartFactors, D2_MOVING_RANGE, D4_MOVING_RANGE};
use super::segment::Segment;

/// Factor set used by an X-bar chart and its companion.
///
/// Both variants chart the subgroup range (max - min); they differ only in
/// the constants applied to R-bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispersion {
    /// A2/D3/D4, companion labelled as an R chart.
    Range,
    /// A3/B3/B4, companion labelled as an S chart.
    Sigma,
}

// ---------------------------------------------------------------------------
// Individual-MR
// ---------------------------------------------------------------------------

/// Individual and Moving Range (I-MR) limits for one segment.
///
/// # Algorithm
///
/// 1. Moving ranges: MR_i = |x_i - x_{i-1}| for i >= 1. The first row of the
///    segment has no moving range.
/// 2. CL = mean of baseline values, MR-bar = mean of baseline moving ranges.
/// 3. sigma-hat = MR-bar / d2 with d2 = 1.128; I chart limits are
///    CL +/- {1, 2, 3} * sigma-hat.
/// 4. MR chart: CL = MR-bar, UCL = D4 * MR-bar with D4 = 3.267, zones at
///    (UCL - CL) / 3, LCL clamped at zero.
///
/// Limits are undefined when the baseline has fewer than two usable values.
///
/// # Reference
///
/// Montgomery, D.C. (2019), Section 6.4.
pub fn individual_limits<K: Clone>(segment: &Segment<'_, K>) -> SegmentCharts<K> {
    let rows = segment.rows();
    let values: Vec<Option<f64>> = rows
        .iter()
        .map(|o| Some(o.value).filter(|v| v.is_finite()))
        .collect();

    let moving_ranges: Vec<Option<f64>> = std::iter::once(None)
        .chain(values.windows(2).map(|w| match (w[0], w[1]) {
            (Some(a), Some(b)) => Some((b - a).abs()),
            _ => None,
        }))
        .collect();

    let baseline_len = segment.baseline().len();
    let baseline_values: Vec<f64> = values[..baseline_len].iter().flatten().copied().collect();
    let baseline_mrs: Vec<f64> = moving_ranges[..baseline_len]
        .iter()
        .flatten()
        .copied()
        .collect();

    let x_bar = stats::mean(&baseline_values);
    let mr_bar = stats::mean(&baseline_mrs);

    let i_limits = match (x_bar, mr_bar) {
        (Some(cl), Some(mr)) => ControlLimits::from_sigma(
            cl,
            mr / D2_MOVING_RANGE,
            ChartKind::Individual.is_non_negative(),
        ),
        _ => None,
    };
    let mr_limits = mr_bar.and_then(|mr| {
        let ucl = D4_MOVING_RANGE * mr;
        ControlLimits::from_bounds(
            mr,
            2.0 * mr - ucl,
            ucl,
            ChartKind::MovingRange.is_non_negative(),
        )
    });

    let mut diagnostics = Vec::new();
    limit_diagnostics(segment.index, ChartKind::Individual, i_limits, &mut diagnostics);
    limit_diagnostics(segment.index, ChartKind::MovingRange, mr_limits, &mut diagnostics);

    let timestamps = rows.iter().map(|o| o.timestamp.clone());
    SegmentCharts {
        primary: SegmentChart::broadcast(
            ChartKind::Individual,
            segment.index,
            i_limits,
            timestamps.clone().zip(values).collect(),
        ),
        companion: Some(SegmentChart::broadcast(
            ChartKind::MovingRange,
            segment.index,
            mr_limits,
            timestamps.zip(moving_ranges).collect(),
        )),
        baseline_points: baseline_values.len(),
        diagnostics,
    }
}

// ---------------------------------------------------------------------------
// X-bar-R / X-bar-S
// ---------------------------------------------------------------------------

/// One same-timestamp group of rows.
#[derive(Debug, Clone)]
struct Subgroup<K> {
    timestamp: K,
    /// Rows in the group, including missing values.
    size: usize,
    mean: Option<f64>,
    range: Option<f64>,
    in_baseline: bool,
}

/// X-bar limits with a Range or Sigma companion for one segment.
///
/// # Algorithm
///
/// 1. Group rows by timestamp; for each subgroup compute the mean (X-bar) and
///    the range R = max - min.
/// 2. X-double-bar and R-bar over baseline subgroups.
/// 3. X-bar chart: CL = X-double-bar, UCL/LCL = CL +/- A2 * R-bar (A3 * R-bar
///    for [`Dispersion::Sigma`]), zones at (UCL - CL) / 3.
/// 4. Companion: CL = R-bar, UCL = D4 * R-bar, LCL = D3 * R-bar
///    (B4 / B3 for [`Dispersion::Sigma`]), zones at (UCL - CL) / 3.
///
/// The factors come from the configured subgroup size. Subgroups of a
/// different size are still charted but reported as
/// [`Diagnostic::SubgroupSizeMismatch`].
///
/// # Reference
///
/// Montgomery, D.C. (2019), Sections 6.2-6.3.
pub fn xbar_limits<K: Clone + PartialEq>(
    segment: &Segment<'_, K>,
    factors: &ChartFactors,
    dispersion: Dispersion,
) -> SegmentCharts<K> {
    let subgroups = group_by_timestamp(segment);

    let baseline_means: Vec<f64> = subgroups
        .iter()
        .filter(|g| g.in_baseline)
        .filter_map(|g| g.mean)
        .collect();
    let baseline_ranges: Vec<f64> = subgroups
        .iter()
        .filter(|g| g.in_baseline)
        .filter_map(|g| g.range)
        .collect();

    let (a, lower, upper, companion_kind) = match dispersion {
        Dispersion::Range => (factors.a2, factors.d3, factors.d4, ChartKind::Range),
        Dispersion::Sigma => (factors.a3, factors.b3, factors.b4, ChartKind::Sigma),
    };

    let grand_mean = stats::mean(&baseline_means);
    let r_bar = stats::mean(&baseline_ranges);

    let xbar_limits = match (grand_mean, r_bar) {
        (Some(cl), Some(r)) => ControlLimits::from_bounds(
            cl,
            cl - a * r,
            cl + a * r,
            ChartKind::XBar.is_non_negative(),
        ),
        _ => None,
    };
    let spread_limits = r_bar.and_then(|r| {
        ControlLimits::from_bounds(r, lower * r, upper * r, companion_kind.is_non_negative())
    });

    let mut diagnostics = Vec::new();
    let mismatched = subgroups.iter().filter(|g| g.size != factors.n).count();
    if mismatched > 0 {
        diagnostics.push(Diagnostic::SubgroupSizeMismatch {
            segment: segment.index,
            subgroups: mismatched,
            expected: factors.n,
        });
    }
    limit_diagnostics(segment.index, ChartKind::XBar, xbar_limits, &mut diagnostics);
    limit_diagnostics(segment.index, companion_kind, spread_limits, &mut diagnostics);

    let baseline_points = subgroups.iter().filter(|g| g.in_baseline).count();
    let (means, ranges): (Vec<_>, Vec<_>) = subgroups
        .into_iter()
        .map(|g| ((g.timestamp.clone(), g.mean), (g.timestamp, g.range)))
        .unzip();

    SegmentCharts {
        primary: SegmentChart::broadcast(ChartKind::XBar, segment.index, xbar_limits, means),
        companion: Some(SegmentChart::broadcast(
            companion_kind,
            segment.index,
            spread_limits,
            ranges,
        )),
        baseline_points,
        diagnostics,
    }
}

/// Split a segment into runs of equal timestamps.
fn group_by_timestamp<K: Clone + PartialEq>(segment: &Segment<'_, K>) -> Vec<Subgroup<K>> {
    let rows = segment.rows();
    let mut groups = Vec::new();
    let mut start = 0;
    while start < rows.len() {
        let timestamp = &rows[start].timestamp;
        let end = start
            + rows[start..]
                .iter()
                .take_while(|o| o.timestamp == *timestamp)
                .count();
        let values: Vec<f64> = rows[start..end]
            .iter()
            .map(|o| o.value)
            .filter(|v| v.is_finite())
            .collect();
        groups.push(Subgroup {
            timestamp: timestamp.clone(),
            size: end - start,
            mean: stats::mean(&values),
            range: subgroup_range(&values),
            in_baseline: segment.in_baseline(start),
        });
        start = end;
    }
    groups
}

/// Compute the range (max - min) of a subgroup, `None` when empty.
fn subgroup_range(subgroup: &[f64]) -> Option<f64> {
    let max_val = stats::max(subgroup)?;
    let min_val = stats::min(subgroup)?;
    Some(max_val - min_val)
}

/// Record degenerate or undefined limits for one chart.
pub(crate) fn limit_diagnostics(
    segment: usize,
    chart: ChartKind,
    limits: Option<ControlLimits>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match limits {
        None => diagnostics.push(Diagnostic::UndefinedLimits { segment, chart }),
        Some(l) if l.is_degenerate() => {
            diagnostics.push(Diagnostic::ZeroVariance { segment, chart })
        }
        Some(_) => {}
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
