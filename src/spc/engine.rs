//! The analysis pipeline: validate, segment, compute limits, evaluate rules,
//! aggregate.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::{Result, SpcError};

use super::aggregate::{aggregate, AnnotatedResult, AnnotatedRow};
use super::chart::{ChartKind, ControlLimits, Diagnostic, SegmentChart};
use super::config::{ChartConfig, ChartFamily, RuleSetKind};
use super::limits::{check_sample_sizes, compute_limits};
use super::rules::{applicable_rules, evaluate, RuleViolationSet};
use super::segment::{segment, Segment};
use super::series::ObservationSeries;

/// Bounds required of a timestamp key.
#[cfg(not(feature = "parallel"))]
pub trait TimeKey: Ord + Clone + std::fmt::Debug {}
#[cfg(not(feature = "parallel"))]
impl<T: Ord + Clone + std::fmt::Debug> TimeKey for T {}

/// Bounds required of a timestamp key.
#[cfg(feature = "parallel")]
pub trait TimeKey: Ord + Clone + std::fmt::Debug + Send + Sync {}
#[cfg(feature = "parallel")]
impl<T: Ord + Clone + std::fmt::Debug + Send + Sync> TimeKey for T {}

/// Limits in force for one segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentLimits<K> {
    pub segment: usize,
    /// Timestamp of the segment's first row.
    pub start: K,
    pub baseline_points: usize,
    pub primary: Option<ControlLimits>,
    pub companion: Option<ControlLimits>,
}

/// Everything [`analyze`] produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpcReport<K> {
    pub family: ChartFamily,
    pub rule_set: RuleSetKind,
    pub primary: AnnotatedResult<K>,
    /// Moving range, range or sigma chart for two-chart families.
    pub companion: Option<AnnotatedResult<K>>,
    pub limits: Vec<SegmentLimits<K>>,
    pub diagnostics: Vec<Diagnostic>,
}

impl<K> SpcReport<K> {
    /// Primary rows followed by companion rows, each carrying its chart kind.
    pub fn stacked_rows(&self) -> impl Iterator<Item = &AnnotatedRow<K>> + '_ {
        self.primary
            .rows
            .iter()
            .chain(self.companion.iter().flat_map(|c| c.rows.iter()))
    }

    /// Whether any rule fired on either chart.
    pub fn has_signals(&self) -> bool {
        self.stacked_rows().any(AnnotatedRow::any_fired)
    }
}

/// Per-segment output before aggregation.
struct SegmentOutcome<K> {
    limits: SegmentLimits<K>,
    primary: (SegmentChart<K>, RuleViolationSet<K>),
    companion: Option<(SegmentChart<K>, RuleViolationSet<K>)>,
    diagnostics: Vec<Diagnostic>,
}

/// Compute limits and rule hits for one segment.
fn analyze_segment<K: TimeKey>(
    segment: &Segment<'_, K>,
    config: &ChartConfig<K>,
) -> Result<SegmentOutcome<K>> {
    let charts = compute_limits(segment, config)?;

    let primary_rules = applicable_rules(charts.primary.kind, config.rule_set);
    let primary_hits = evaluate(&charts.primary.rows, &primary_rules);
    let companion = charts.companion.map(|chart| {
        let rules = applicable_rules(chart.kind, config.rule_set);
        let hits = evaluate(&chart.rows, &rules);
        (chart, hits)
    });

    if let Some(l) = &charts.primary.limits {
        debug!(
            "segment {}: {} cl={:.4} lcl={:.4} ucl={:.4} from {} baseline points",
            segment.index, charts.primary.kind, l.cl, l.lcl, l.ucl, charts.baseline_points
        );
    }
    debug!(
        "segment {}: {} primary rule hits, {} companion rule hits",
        segment.index,
        primary_hits.total(),
        companion.as_ref().map_or(0, |(_, h)| h.total())
    );

    let start = segment
        .rows()
        .first()
        .map(|o| o.timestamp.clone())
        .ok_or(SpcError::EmptySegment {
            segment: segment.index,
        })?;

    Ok(SegmentOutcome {
        limits: SegmentLimits {
            segment: segment.index,
            start,
            baseline_points: charts.baseline_points,
            primary: charts.primary.limits,
            companion: companion.as_ref().and_then(|(c, _)| c.limits),
        },
        primary: (charts.primary, primary_hits),
        companion,
        diagnostics: charts.diagnostics,
    })
}

/// Series-wide data-quality checks.
fn data_quality<K: Ord>(
    series: &ObservationSeries<K>,
    config: &ChartConfig<K>,
) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let points = if config.family.is_subgroup_family() {
        series.subgroup_sizes().len()
    } else {
        series.len()
    };
    if points <= config.min_baseline_points {
        diagnostics.push(Diagnostic::TooFewPoints {
            points,
            minimum: config.min_baseline_points,
        });
    }

    if !config.family.is_subgroup_family() {
        let count = series.duplicate_timestamps();
        if count > 0 {
            diagnostics.push(Diagnostic::DuplicateTimestamps { count });
        }
    }

    let count = series.missing_values();
    if count > 0 {
        diagnostics.push(Diagnostic::MissingValues { count });
    }
    diagnostics
}

/// Run the full control-chart analysis.
///
/// Validates the configuration and data, splits the series at the change
/// dates, computes each segment's limits from its own baseline, evaluates the
/// applicable rules per segment and joins everything into one annotated
/// table per chart.
///
/// # Errors
///
/// Every configuration or data error is reported before any computation:
/// unknown subgroup sizes, missing or zero sample sizes, malformed change
/// dates, unordered or empty input, and empty segments or baselines. See
/// [`crate::error::SpcError`].
///
/// # Examples
///
/// ```
/// use u_spc::spc::{analyze, ChartConfig, ChartFamily, ObservationSeries, Rule};
///
/// let mut values = vec![10.0; 19];
/// values.push(100.0);
/// let series = ObservationSeries::from_values(values.into_iter().enumerate());
///
/// let report = analyze(&series, &ChartConfig::new(ChartFamily::Individual)).unwrap();
/// assert_eq!(report.primary.label(), "X-chart");
/// assert!(report.primary.rows[19].fired(Rule::Rule1));
/// ```
#[instrument(skip(series, config), fields(family = %config.family, rows = series.len()))]
pub fn analyze<K: TimeKey>(
    series: &ObservationSeries<K>,
    config: &ChartConfig<K>,
) -> Result<SpcReport<K>> {
    config.validate()?;
    check_sample_sizes(series, config.family)?;
    let segments = segment(series, &config.change_dates, config.baseline_date.as_ref())?;
    debug!("Analyzing {} segment(s)", segments.len());

    let mut diagnostics = data_quality(series, config);

    #[cfg(feature = "parallel")]
    let outcomes: Vec<SegmentOutcome<K>> = segments
        .par_iter()
        .map(|s| analyze_segment(s, config))
        .collect::<Result<_>>()?;
    #[cfg(not(feature = "parallel"))]
    let outcomes: Vec<SegmentOutcome<K>> = segments
        .iter()
        .map(|s| analyze_segment(s, config))
        .collect::<Result<_>>()?;

    let mut limits = Vec::with_capacity(outcomes.len());
    let mut primary_parts = Vec::with_capacity(outcomes.len());
    let mut companion_parts = Vec::new();
    for outcome in outcomes {
        limits.push(outcome.limits);
        primary_parts.push(outcome.primary);
        companion_parts.extend(outcome.companion);
        diagnostics.extend(outcome.diagnostics);
    }

    let primary_kind = primary_parts
        .first()
        .map_or(ChartKind::Individual, |(c, _)| c.kind);
    let primary = aggregate(
        primary_kind,
        &applicable_rules(primary_kind, config.rule_set),
        primary_parts,
    );
    let companion_kind = companion_parts.first().map(|(c, _)| c.kind);
    let companion = companion_kind.map(|kind| {
        aggregate(
            kind,
            &applicable_rules(kind, config.rule_set),
            companion_parts,
        )
    });

    for d in &diagnostics {
        warn!("{}", d);
    }

    Ok(SpcReport {
        family: config.family,
        rule_set: config.rule_set,
        primary,
        companion,
        limits,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spc::rules::Rule;

    fn spike_series() -> ObservationSeries<usize> {
        let mut values = vec![10.0; 19];
        values.push(100.0);
        ObservationSeries::from_values(values.into_iter().enumerate())
    }

    #[test]
    fn test_spike_fires_rule1_only_at_spike() {
        let report = analyze(&spike_series(), &ChartConfig::new(ChartFamily::Individual)).unwrap();
        let limits = report.limits[0].primary.expect("limits");
        assert!((limits.cl - 14.5).abs() < 1e-10);
        let flagged: Vec<usize> = report.primary.flagged(Rule::Rule1).copied().collect();
        assert_eq!(flagged, vec![19]);
        assert!(report.companion.is_none());
        assert_eq!(report.primary.rules, Rule::ALL.to_vec());
    }

    #[test]
    fn test_moving_range_companion_result() {
        let config = ChartConfig::new(ChartFamily::MovingRange);
        let report = analyze(&spike_series(), &config).unwrap();
        let companion = report.companion.as_ref().expect("mR chart");
        assert_eq!(companion.label(), "mR-chart");
        assert_eq!(companion.rows.len(), 20);
        assert_eq!(companion.rows[0].value, None);
        assert_eq!(
            companion.rules,
            vec![Rule::Rule1, Rule::Rule4, Rule::Rule5, Rule::Rule8]
        );
        assert_eq!(report.stacked_rows().count(), 40);
        assert!(report.has_signals());
    }

    #[test]
    fn test_data_quality_diagnostics() {
        let series = ObservationSeries::from_values(vec![
            (1_u32, 1.0),
            (2, 2.0),
            (2, 1.5),
            (3, f64::NAN),
            (4, 1.0),
        ]);
        let report = analyze(&series, &ChartConfig::new(ChartFamily::Individual)).unwrap();
        assert!(report.diagnostics.contains(&Diagnostic::TooFewPoints {
            points: 5,
            minimum: 20,
        }));
        assert!(report
            .diagnostics
            .contains(&Diagnostic::DuplicateTimestamps { count: 1 }));
        assert!(report
            .diagnostics
            .contains(&Diagnostic::MissingValues { count: 1 }));
    }

    #[test]
    fn test_too_few_points_at_minimum() {
        let config = ChartConfig::new(ChartFamily::Individual);
        let warned = |n: usize| {
            let series = ObservationSeries::from_values((0..n).map(|t| (t, (t % 4) as f64)));
            analyze(&series, &config)
                .unwrap()
                .diagnostics
                .iter()
                .any(|d| matches!(d, Diagnostic::TooFewPoints { .. }))
        };
        assert!(warned(19));
        assert!(warned(20));
        assert!(!warned(21));
    }

    #[test]
    fn test_change_dates_produce_segment_limits() {
        let series = ObservationSeries::from_values(
            (0..40_usize).map(|t| (t, if t < 20 { (t % 2) as f64 } else { 10.0 + (t % 2) as f64 })),
        );
        let config = ChartConfig::new(ChartFamily::Individual)
            .with_change_dates(vec![20])
            .with_min_baseline_points(10);
        let report = analyze(&series, &config).unwrap();
        assert_eq!(report.limits.len(), 2);
        assert_eq!(report.limits[1].start, 20);
        let first = report.limits[0].primary.unwrap();
        let second = report.limits[1].primary.unwrap();
        assert!((first.cl - 0.5).abs() < 1e-12);
        assert!((second.cl - 10.5).abs() < 1e-12);
        // The level shift is absorbed by re-baselining.
        assert_eq!(report.primary.count(Rule::Rule1), 0);
        assert_eq!(report.primary.rows[25].segment, 1);
    }

    #[test]
    fn test_fail_fast_errors() {
        let series = spike_series();
        let config = ChartConfig::new(ChartFamily::XbarRange).with_subgroup_size(30);
        assert_eq!(
            analyze(&series, &config),
            Err(SpcError::SubgroupSizeOutOfRange { size: 30 })
        );

        let config = ChartConfig::new(ChartFamily::AttributesProportion);
        assert!(matches!(
            analyze(&series, &config),
            Err(SpcError::MissingSampleSize { row: 0, .. })
        ));

        let config = ChartConfig::new(ChartFamily::Individual).with_change_dates(vec![25]);
        assert_eq!(
            analyze(&series, &config),
            Err(SpcError::ChangeDateOutOfRange { position: 0 })
        );

        let empty = ObservationSeries::<usize>::new();
        assert_eq!(
            analyze(&empty, &ChartConfig::new(ChartFamily::Individual)),
            Err(SpcError::EmptySeries)
        );
    }

    #[test]
    fn test_report_serializes() {
        let report = analyze(&spike_series(), &ChartConfig::new(ChartFamily::MovingRange)).unwrap();
        let json = serde_json::to_string(&report).unwrap();
        let back: SpcReport<usize> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.family, ChartFamily::MovingRange);
        assert_eq!(back.primary.rows.len(), report.primary.rows.len());
        assert_eq!(
            back.primary.flagged(Rule::Rule1).collect::<Vec<_>>(),
            report.primary.flagged(Rule::Rule1).collect::<Vec<_>>()
        );
        assert_eq!(back.companion.map(|c| c.chart), Some(ChartKind::MovingRange));
        assert_eq!(back.diagnostics, report.diagnostics);
    }
}
