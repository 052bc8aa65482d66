//! Attributes control charts: c, u, p, and np.
//!
//! These charts monitor discrete (count/proportion) data. Limits come from
//! the Poisson (c, u) or binomial (p, np) variance of the baseline rather than
//! from an observed spread.
//!
//! # Chart Selection Guide
//!
//! | Chart | Data Type | Sample Size |
//! |-------|-----------|-------------|
//! | c     | Count of defects | Constant area |
//! | u     | Defects per unit | Variable area |
//! | p     | Proportion defective | Variable |
//! | np    | Count defective | Constant |
//!
//! Where the half-width depends on the sample size, the baseline mean sample
//! size n-bar is used for every row, so limits stay constant within a segment.
//!
//! # References
//!
//! - Montgomery, D.C. (2019). *Introduction to Statistical Quality Control*, 8th ed.,
//!   Chapter 7: Control Charts for Attributes.
//! - ASTM E2587 — Standard Practice for Use of Control Charts

use u_numflow::stats;

use super::chart::{ChartKind, ControlLimits, Diagnostic, SegmentChart, SegmentCharts};
use super::config::ChartFamily;
use super::segment::Segment;
use super::series::Observation;
use super::variables::limit_diagnostics;

/// Sample size of a row, when present and positive.
fn units<K>(o: &Observation<K>) -> Option<f64> {
    o.sample_size.filter(|&n| n > 0).map(|n| n as f64)
}

/// The charted statistic for one row.
fn statistic<K>(family: ChartFamily, o: &Observation<K>) -> Option<f64> {
    if !o.value.is_finite() {
        return None;
    }
    match family {
        ChartFamily::AttributesRate | ChartFamily::AttributesProportion => {
            units(o).map(|n| o.value / n)
        }
        _ => Some(o.value),
    }
}

/// Limits for one of the attributes families on one segment.
///
/// # Formulas
///
/// With CL the baseline mean of the charted statistic:
///
/// - c:  sigma = sqrt(CL)
/// - u:  sigma = sqrt(CL / n-bar)
/// - p:  sigma = sqrt(CL * (1 - CL) / n-bar)
/// - np: sigma = sqrt(CL * (1 - p)), p = sum(count) / sum(n) over the baseline
///
/// UCL/LCL = CL +/- 3 sigma, zones at 1 and 2 sigma, LCL clamped at zero.
/// A negative variance (e.g. counts exceeding `n`) leaves the limits undefined.
///
/// Only the four attributes families are accepted; others yield undefined
/// limits.
///
/// # Reference
///
/// Montgomery, D.C. (2019), Sections 7.2-7.3.
pub fn attributes_limits<K: Clone>(
    segment: &Segment<'_, K>,
    family: ChartFamily,
) -> SegmentCharts<K> {
    let kind = match family {
        ChartFamily::AttributesCount => ChartKind::C,
        ChartFamily::AttributesRate => ChartKind::U,
        ChartFamily::AttributesProportion => ChartKind::P,
        _ => ChartKind::NP,
    };

    let rows = segment.rows();
    let values: Vec<Option<f64>> = rows.iter().map(|o| statistic(family, o)).collect();

    let baseline = segment.baseline();
    let baseline_values: Vec<f64> = values[..baseline.len()].iter().flatten().copied().collect();
    let baseline_units: Vec<f64> = baseline
        .iter()
        .filter(|o| o.value.is_finite())
        .filter_map(units)
        .collect();

    let cl = stats::mean(&baseline_values);
    let sigma = cl.and_then(|cl| match family {
        ChartFamily::AttributesCount => Some(cl.sqrt()),
        ChartFamily::AttributesRate => stats::mean(&baseline_units).map(|n| (cl / n).sqrt()),
        ChartFamily::AttributesProportion => {
            stats::mean(&baseline_units).map(|n| (cl * (1.0 - cl) / n).sqrt())
        }
        ChartFamily::AttributesCountFixedN => {
            let total_n: f64 = baseline_units.iter().sum();
            (total_n > 0.0).then(|| {
                let p = baseline_values.iter().sum::<f64>() / total_n;
                (cl * (1.0 - p)).sqrt()
            })
        }
        _ => None,
    });

    let limits = match (cl, sigma) {
        (Some(cl), Some(sigma)) => ControlLimits::from_sigma(cl, sigma, kind.is_non_negative()),
        _ => None,
    };

    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    limit_diagnostics(segment.index, kind, limits, &mut diagnostics);

    SegmentCharts {
        primary: SegmentChart::broadcast(
            kind,
            segment.index,
            limits,
            rows.iter()
                .map(|o| o.timestamp.clone())
                .zip(values)
                .collect(),
        ),
        companion: None,
        baseline_points: baseline_values.len(),
        diagnostics,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
