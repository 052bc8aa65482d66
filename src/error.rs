//! Error types for control chart computation.
//!
//! Every variant here is fatal: it is raised before any segment is processed
//! and no partial result is produced. Non-fatal conditions (data quality,
//! numeric degeneracy) are reported as [`Diagnostic`](crate::spc::Diagnostic)
//! values alongside a successful result instead.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpcError {
    #[error("Unknown chart family: {0}")]
    UnknownChartFamily(String),

    #[error("Chart family {family} requires a subgroup size")]
    MissingSubgroupSize { family: String },

    #[error("Subgroup size {size} is outside the supported range 2..=25")]
    SubgroupSizeOutOfRange { size: usize },

    #[error("Chart family {family} requires a sample size on every row (missing at row {row})")]
    MissingSampleSize { family: String, row: usize },

    #[error("Sample size must be positive (row {row})")]
    InvalidSampleSize { row: usize },

    #[error("Change dates must be strictly increasing (position {position})")]
    ChangeDatesNotIncreasing { position: usize },

    #[error("Change date at position {position} lies outside the series time span")]
    ChangeDateOutOfRange { position: usize },

    #[error("Segment {segment} contains no observations")]
    EmptySegment { segment: usize },

    #[error("Baseline window contains no observations")]
    EmptyBaseline,

    #[error("Observation series is empty")]
    EmptySeries,

    #[error("Observation series is not in chronological order (row {row})")]
    UnorderedSeries { row: usize },
}

pub type Result<T> = std::result::Result<T, SpcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let e = SpcError::SubgroupSizeOutOfRange { size: 30 };
        assert_eq!(
            e.to_string(),
            "Subgroup size 30 is outside the supported range 2..=25"
        );

        let e = SpcError::UnknownChartFamily("pareto".into());
        assert_eq!(e.to_string(), "Unknown chart family: pareto");
    }
}
