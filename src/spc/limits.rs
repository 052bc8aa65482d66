//! Per-segment control-limit dispatch.
//!
//! Routes a segment to the calculator for the configured chart family and
//! adds the checks shared by every family.

use crate::error::{Result, SpcError};

use super::attributes::attributes_limits;
use super::chart::{Diagnostic, SegmentCharts};
use super::config::{ChartConfig, ChartFamily};
use super::segment::Segment;
use super::series::ObservationSeries;
use super::variables::{individual_limits, xbar_limits, Dispersion};

/// Compute the chart tables and limits of one segment.
///
/// `Individual` returns only the X chart; `MovingRange` keeps the moving
/// range companion. Baselines with fewer charted points than
/// `config.min_baseline_points` raise [`Diagnostic::UnderpoweredBaseline`].
///
/// # Errors
///
/// Returns [`SpcError::MissingSubgroupSize`] or
/// [`SpcError::SubgroupSizeOutOfRange`] for an Xbar family whose subgroup
/// size is missing or outside the constant table.
pub fn compute_limits<K: Clone + PartialEq>(
    segment: &Segment<'_, K>,
    config: &ChartConfig<K>,
) -> Result<SegmentCharts<K>> {
    let family = config.family;
    let mut charts = if family.is_attributes_family() {
        attributes_limits(segment, family)
    } else if family.is_subgroup_family() {
        let factors = config
            .factors()?
            .ok_or_else(|| SpcError::MissingSubgroupSize {
                family: family.name().to_string(),
            })?;
        let dispersion = if family == ChartFamily::XbarRange {
            Dispersion::Range
        } else {
            Dispersion::Sigma
        };
        xbar_limits(segment, &factors, dispersion)
    } else {
        individual_limits(segment)
    };

    if !family.has_companion() {
        charts.companion = None;
        charts.diagnostics.retain(|d| !is_companion_diagnostic(d));
    }

    if charts.baseline_points < config.min_baseline_points {
        charts.diagnostics.push(Diagnostic::UnderpoweredBaseline {
            segment: segment.index,
            points: charts.baseline_points,
            minimum: config.min_baseline_points,
        });
    }
    Ok(charts)
}

fn is_companion_diagnostic(d: &Diagnostic) -> bool {
    match d {
        Diagnostic::ZeroVariance { chart, .. } | Diagnostic::UndefinedLimits { chart, .. } => {
            chart.is_companion()
        }
        _ => false,
    }
}

/// Verify that every row carries a positive sample size when the family
/// needs one.
///
/// # Errors
///
/// - [`SpcError::MissingSampleSize`] for the first row without `n`
/// - [`SpcError::InvalidSampleSize`] for the first row with `n == 0`
pub fn check_sample_sizes<K>(series: &ObservationSeries<K>, family: ChartFamily) -> Result<()> {
    if !family.requires_sample_size() {
        return Ok(());
    }
    for (row, o) in series.iter().enumerate() {
        match o.sample_size {
            None => {
                return Err(SpcError::MissingSampleSize {
                    family: family.name().to_string(),
                    row,
                })
            }
            Some(0) => return Err(SpcError::InvalidSampleSize { row }),
            Some(_) => {}
        }
    }
    Ok(())
}
