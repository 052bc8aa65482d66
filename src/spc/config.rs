//! Chart family selection and per-analysis configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::constants::ChartFactors;
use crate::error::{Result, SpcError};

/// Default minimum number of baseline points before a baseline is reported
/// as statistically underpowered.
pub const DEFAULT_MIN_BASELINE_POINTS: usize = 20;

/// The control chart family to compute.
///
/// # Chart Selection Guide
///
/// | Family | Monitored quantity | Companion | Needs `n` |
/// |--------|--------------------|-----------|-----------|
/// | `Individual` | individual values | — | no |
/// | `MovingRange` | individual values | moving range | no |
/// | `XbarRange` | subgroup means | subgroup range | no (subgroup size in config) |
/// | `XbarSigma` | subgroup means | subgroup std dev | no (subgroup size in config) |
/// | `AttributesCount` (c) | defect counts | — | no |
/// | `AttributesRate` (u) | defects per unit | — | yes |
/// | `AttributesProportion` (p) | proportion defective | — | yes |
/// | `AttributesCountFixedN` (np) | defective counts | — | yes |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChartFamily {
    Individual,
    /// Individual chart paired with a Moving Range companion (XmR).
    MovingRange,
    XbarRange,
    XbarSigma,
    AttributesCount,
    AttributesRate,
    AttributesProportion,
    AttributesCountFixedN,
}

impl ChartFamily {
    /// All families, in declaration order.
    pub const ALL: [ChartFamily; 8] = [
        ChartFamily::Individual,
        ChartFamily::MovingRange,
        ChartFamily::XbarRange,
        ChartFamily::XbarSigma,
        ChartFamily::AttributesCount,
        ChartFamily::AttributesRate,
        ChartFamily::AttributesProportion,
        ChartFamily::AttributesCountFixedN,
    ];

    /// Whether observations sharing a timestamp form one subgroup.
    pub fn is_subgroup_family(self) -> bool {
        matches!(self, ChartFamily::XbarRange | ChartFamily::XbarSigma)
    }

    /// Whether the family monitors count or proportion data.
    pub fn is_attributes_family(self) -> bool {
        matches!(
            self,
            ChartFamily::AttributesCount
                | ChartFamily::AttributesRate
                | ChartFamily::AttributesProportion
                | ChartFamily::AttributesCountFixedN
        )
    }

    /// Whether every row must carry a `sample_size`.
    pub fn requires_sample_size(self) -> bool {
        matches!(
            self,
            ChartFamily::AttributesRate
                | ChartFamily::AttributesProportion
                | ChartFamily::AttributesCountFixedN
        )
    }

    /// Whether the family produces a second (dispersion) chart.
    pub fn has_companion(self) -> bool {
        matches!(
            self,
            ChartFamily::MovingRange | ChartFamily::XbarRange | ChartFamily::XbarSigma
        )
    }

    /// The name the family is known by in reports.
    pub fn name(self) -> &'static str {
        match self {
            ChartFamily::Individual => "Individual-chart",
            ChartFamily::MovingRange => "XmR-chart",
            ChartFamily::XbarRange => "XbarR-chart",
            ChartFamily::XbarSigma => "XbarS-chart",
            ChartFamily::AttributesCount => "c-chart",
            ChartFamily::AttributesRate => "u-chart",
            ChartFamily::AttributesProportion => "p-chart",
            ChartFamily::AttributesCountFixedN => "np-chart",
        }
    }
}

impl fmt::Display for ChartFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChartFamily {
    type Err = SpcError;

    /// Parse a family from its report name (`"XmR-chart"`, `"p-chart"`, ...)
    /// or its enum spelling (`"XbarRange"`, ...). Matching ignores ASCII case.
    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim();
        ChartFamily::ALL
            .iter()
            .copied()
            .find(|family| {
                key.eq_ignore_ascii_case(family.name())
                    || key.eq_ignore_ascii_case(&format!("{family:?}"))
            })
            .ok_or_else(|| SpcError::UnknownChartFamily(s.to_string()))
    }
}

/// Which run-rule catalogue to evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RuleSetKind {
    /// The eight-rule set; attributes and companion charts use the reduced
    /// subset {1, 4, 5, 8}.
    #[default]
    Nelson,
    /// The five-rule set from the NHS Improvement guide to run and control
    /// charts: {1, 2, 4, 5, 7}; attributes and companion charts use {1, 4, 5}.
    NhsImprovement,
}

/// Configuration for one analysis run.
///
/// `K` is the sortable timestamp key of the series.
///
/// # Examples
///
/// ```
/// use u_spc::spc::{ChartConfig, ChartFamily};
///
/// let config = ChartConfig::<u32>::new(ChartFamily::XbarRange)
///     .with_subgroup_size(5)
///     .with_change_dates(vec![30, 60]);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartConfig<K> {
    pub family: ChartFamily,
    /// Required for Xbar families, 2..=25.
    pub subgroup_size: Option<usize>,
    /// Last timestamp (inclusive) of the baseline. Ignored when change dates
    /// are present.
    pub baseline_date: Option<K>,
    /// Strictly increasing dates at which limits are re-baselined.
    pub change_dates: Vec<K>,
    pub rule_set: RuleSetKind,
    /// Baselines shorter than this are reported as underpowered.
    pub min_baseline_points: usize,
}

impl<K> ChartConfig<K> {
    pub fn new(family: ChartFamily) -> Self {
        Self {
            family,
            subgroup_size: None,
            baseline_date: None,
            change_dates: Vec::new(),
            rule_set: RuleSetKind::default(),
            min_baseline_points: DEFAULT_MIN_BASELINE_POINTS,
        }
    }

    pub fn with_subgroup_size(mut self, n: usize) -> Self {
        self.subgroup_size = Some(n);
        self
    }

    pub fn with_baseline_date(mut self, date: K) -> Self {
        self.baseline_date = Some(date);
        self
    }

    pub fn with_change_dates(mut self, dates: Vec<K>) -> Self {
        self.change_dates = dates;
        self
    }

    pub fn with_rule_set(mut self, kind: RuleSetKind) -> Self {
        self.rule_set = kind;
        self
    }

    pub fn with_min_baseline_points(mut self, points: usize) -> Self {
        self.min_baseline_points = points;
        self
    }

    /// Resolve the constant-table factors for subgroup families.
    ///
    /// Returns `Ok(None)` for families that do not use the tables.
    pub fn factors(&self) -> Result<Option<ChartFactors>> {
        if !self.family.is_subgroup_family() {
            return Ok(None);
        }
        let n = self.subgroup_size.ok_or_else(|| SpcError::MissingSubgroupSize {
            family: self.family.name().to_string(),
        })?;
        ChartFactors::for_subgroup_size(n).map(Some)
    }
}

impl<K: Ord> ChartConfig<K> {
    /// Check everything that can be checked without looking at the data.
    ///
    /// Range checks of change dates against the series happen during
    /// segmentation.
    pub fn validate(&self) -> Result<()> {
        self.factors()?;
        for (position, pair) in self.change_dates.windows(2).enumerate() {
            if pair[1] <= pair[0] {
                return Err(SpcError::ChangeDatesNotIncreasing {
                    position: position + 1,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_report_names() {
        assert_eq!(
            "XmR-chart".parse::<ChartFamily>(),
            Ok(ChartFamily::MovingRange)
        );
        assert_eq!(
            "Individual-chart".parse::<ChartFamily>(),
            Ok(ChartFamily::Individual)
        );
        assert_eq!("p-chart".parse::<ChartFamily>(), Ok(ChartFamily::AttributesProportion));
        assert_eq!("np-chart".parse::<ChartFamily>(), Ok(ChartFamily::AttributesCountFixedN));
        assert_eq!("u-chart".parse::<ChartFamily>(), Ok(ChartFamily::AttributesRate));
        assert_eq!("c-chart".parse::<ChartFamily>(), Ok(ChartFamily::AttributesCount));
        assert_eq!("xbars-chart".parse::<ChartFamily>(), Ok(ChartFamily::XbarSigma));
    }

    #[test]
    fn test_parse_enum_names() {
        assert_eq!("XbarRange".parse::<ChartFamily>(), Ok(ChartFamily::XbarRange));
        assert_eq!(
            "attributescount".parse::<ChartFamily>(),
            Ok(ChartFamily::AttributesCount)
        );
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(
            "pareto-chart".parse::<ChartFamily>(),
            Err(SpcError::UnknownChartFamily("pareto-chart".into()))
        );
    }

    #[test]
    fn test_display_round_trip() {
        for family in ChartFamily::ALL {
            assert_eq!(family.to_string().parse::<ChartFamily>(), Ok(family));
        }
    }

    #[test]
    fn test_family_properties() {
        assert!(ChartFamily::MovingRange.has_companion());
        assert!(!ChartFamily::Individual.has_companion());
        assert!(ChartFamily::XbarSigma.is_subgroup_family());
        assert!(ChartFamily::AttributesProportion.requires_sample_size());
        assert!(!ChartFamily::AttributesCount.requires_sample_size());
        assert!(ChartFamily::AttributesCount.is_attributes_family());
    }

    #[test]
    fn test_validate_missing_subgroup_size() {
        let config = ChartConfig::<u32>::new(ChartFamily::XbarRange);
        assert!(matches!(
            config.validate(),
            Err(SpcError::MissingSubgroupSize { .. })
        ));
    }

    #[test]
    fn test_validate_subgroup_out_of_range() {
        let config = ChartConfig::<u32>::new(ChartFamily::XbarSigma).with_subgroup_size(30);
        assert_eq!(
            config.validate(),
            Err(SpcError::SubgroupSizeOutOfRange { size: 30 })
        );
    }

    #[test]
    fn test_subgroup_size_ignored_for_individual() {
        let config = ChartConfig::<u32>::new(ChartFamily::Individual).with_subgroup_size(99);
        assert!(config.validate().is_ok());
        assert_eq!(config.factors(), Ok(None));
    }

    #[test]
    fn test_validate_change_dates_order() {
        let config =
            ChartConfig::new(ChartFamily::Individual).with_change_dates(vec![10_u32, 20, 20]);
        assert_eq!(
            config.validate(),
            Err(SpcError::ChangeDatesNotIncreasing { position: 2 })
        );
    }

    #[test]
    fn test_config_serde() {
        let config = ChartConfig::new(ChartFamily::AttributesProportion)
            .with_baseline_date(12_u32)
            .with_rule_set(RuleSetKind::NhsImprovement);
        let json = serde_json::to_string(&config).unwrap();
        let back: ChartConfig<u32> = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
