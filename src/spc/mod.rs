//! Statistical Process Control (SPC) charts with segment-wise baselines.
//!
//! Computes control limits for variables and attributes charts, evaluates
//! the eight canonical run rules over them and joins the results into an
//! annotated table per chart.
//!
//! # Variables Charts
//!
//! - `Individual` / `MovingRange` — X chart, optionally with its moving range chart
//! - `XbarRange` — X-bar and Range charts for subgroup data (n=2..25)
//! - `XbarSigma` — X-bar and S charts for subgroup data, range-based with A3/B3/B4 (n=2..25)
//!
//! # Attributes Charts
//!
//! - `AttributesProportion` (p) — proportion nonconforming
//! - `AttributesCountFixedN` (np) — count of nonconforming items
//! - `AttributesCount` (c) — count of defects
//! - `AttributesRate` (u) — defects per unit
//!
//! # Pipeline
//!
//! [`analyze`] runs [`segment()`] -> [`compute_limits`] -> [`evaluate`] ->
//! [`aggregate`] and returns an [`SpcReport`]. Each stage is public and can
//! be driven on its own.
//!
//! # References
//!
//! - Montgomery, D.C. (2019). *Introduction to Statistical Quality Control*, 8th ed.
//! - ASTM E2587 — Standard Practice for Use of Control Charts
//! - Nelson, L.S. (1984). "The Shewhart Control Chart — Tests for Special Causes",
//!   *Journal of Quality Technology* 16(4), pp. 237-239.

mod aggregate;
mod attributes;
mod chart;
mod config;
mod constants;
mod engine;
mod limits;
mod rules;
mod segment;
mod series;
mod variables;

pub use aggregate::{aggregate, AnnotatedResult, AnnotatedRow};
pub use attributes::attributes_limits;
pub use chart::{ChartKind, ChartRow, ControlLimits, Diagnostic, SegmentChart, SegmentCharts};
pub use config::{ChartConfig, ChartFamily, RuleSetKind, DEFAULT_MIN_BASELINE_POINTS};
pub use constants::{
    ChartFactors, D2_MOVING_RANGE, D4_MOVING_RANGE, MAX_SUBGROUP_SIZE, MIN_SUBGROUP_SIZE,
};
pub use engine::{analyze, SegmentLimits, SpcReport, TimeKey};
pub use limits::{check_sample_sizes, compute_limits};
pub use rules::{applicable_rules, evaluate, Point, Rule, RuleViolationSet};
pub use segment::{segment, Segment};
pub use series::{infer_subgroup_size, Observation, ObservationSeries};
pub use variables::{individual_limits, xbar_limits, Dispersion};
