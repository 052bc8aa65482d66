//! # u-spc
//!
//! Statistical process control (SPC): control limits for variables and
//! attributes charts, run-rule detection, and re-baselining at change points.
//!
//! This crate operates on ordered series of raw `f64` measurements keyed by
//! any sortable timestamp. It knows nothing about plotting or the domain the
//! data comes from; the output is a plain annotated table per chart.
//!
//! ## Modules
//!
//! - [`spc`] — Chart families (XmR, X-bar-R, X-bar-S, p, np, c, u), segmentation,
//!   run rules and the [`spc::analyze`] pipeline
//! - [`error`] — Error type shared by every fallible operation
//!
//! ## Design Philosophy
//!
//! - **Domain-agnostic**: No manufacturing or process-specific types
//! - **Numerical stability**: Leverages `u-numflow` for stable statistics
//! - **Research-backed**: All algorithms reference academic literature
//!
//! ## Example
//!
//! ```
//! use u_spc::spc::{analyze, ChartConfig, ChartFamily, ObservationSeries, Rule};
//!
//! // 20 proportions with n = 50; the 7th is a full defect batch.
//! let counts = [2.0, 3.0, 2.0, 4.0, 3.0, 2.0, 50.0, 3.0, 2.0, 3.0,
//!               4.0, 2.0, 3.0, 2.0, 3.0, 4.0, 2.0, 3.0, 2.0, 3.0];
//! let series = ObservationSeries::from_counts(
//!     counts.iter().enumerate().map(|(t, &c)| (t, c, 50)),
//! );
//!
//! let config = ChartConfig::new(ChartFamily::AttributesProportion);
//! let report = analyze(&series, &config).unwrap();
//! assert_eq!(report.primary.label(), "p-chart");
//! assert!(report.primary.rows[6].fired(Rule::Rule1));
//! ```

pub mod error;
pub mod spc;

pub use error::{Result, SpcError};
