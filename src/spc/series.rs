//! Input observations.
//!
//! An [`ObservationSeries`] is an ordered sequence of `(timestamp, value,
//! sample_size)` rows. The engine only ever borrows it; every derived table
//! is a fresh allocation.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpcError};

/// One measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation<K> {
    /// Sortable time key. Rows sharing a key form a subgroup for Xbar charts.
    pub timestamp: K,
    /// Measured value, or the count for attributes charts. `NaN` marks a
    /// missing value.
    pub value: f64,
    /// Units inspected (`n`); required by the p, u and np families.
    pub sample_size: Option<u64>,
}

impl<K> Observation<K> {
    pub fn new(timestamp: K, value: f64) -> Self {
        Self {
            timestamp,
            value,
            sample_size: None,
        }
    }

    pub fn with_sample_size(timestamp: K, value: f64, sample_size: u64) -> Self {
        Self {
            timestamp,
            value,
            sample_size: Some(sample_size),
        }
    }
}

/// An ordered sequence of observations.
///
/// # Examples
///
/// ```
/// use u_spc::spc::ObservationSeries;
///
/// let series = ObservationSeries::from_values(vec![(1_u32, 10.0), (2, 11.5), (3, 9.8)]);
/// assert_eq!(series.len(), 3);
/// assert!(series.check_order().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ObservationSeries<K> {
    observations: Vec<Observation<K>>,
}

impl<K> ObservationSeries<K> {
    pub fn new() -> Self {
        Self {
            observations: Vec::new(),
        }
    }

    /// Build a series of `(timestamp, value)` rows without sample sizes.
    pub fn from_values(rows: impl IntoIterator<Item = (K, f64)>) -> Self {
        rows.into_iter()
            .map(|(timestamp, value)| Observation::new(timestamp, value))
            .collect()
    }

    /// Build a series of `(timestamp, count, n)` rows.
    pub fn from_counts(rows: impl IntoIterator<Item = (K, f64, u64)>) -> Self {
        rows.into_iter()
            .map(|(timestamp, value, n)| Observation::with_sample_size(timestamp, value, n))
            .collect()
    }

    pub fn push(&mut self, observation: Observation<K>) {
        self.observations.push(observation);
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn as_slice(&self) -> &[Observation<K>] {
        &self.observations
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Observation<K>> {
        self.observations.iter()
    }

    /// Number of rows whose value is missing (`NaN` or infinite).
    pub fn missing_values(&self) -> usize {
        self.observations
            .iter()
            .filter(|o| !o.value.is_finite())
            .count()
    }
}

impl<K: Ord> ObservationSeries<K> {
    /// Verify that timestamps never decrease.
    pub fn check_order(&self) -> Result<()> {
        match self
            .observations
            .windows(2)
            .position(|w| w[1].timestamp < w[0].timestamp)
        {
            Some(i) => Err(SpcError::UnorderedSeries { row: i + 1 }),
            None => Ok(()),
        }
    }

    /// Number of rows that repeat the previous row's timestamp.
    ///
    /// Assumes chronological order.
    pub fn duplicate_timestamps(&self) -> usize {
        self.observations
            .windows(2)
            .filter(|w| w[0].timestamp == w[1].timestamp)
            .count()
    }

    /// Size of every run of equal timestamps, in order.
    pub fn subgroup_sizes(&self) -> Vec<usize> {
        let mut sizes = Vec::new();
        let mut iter = self.observations.iter().peekable();
        while let Some(first) = iter.next() {
            let mut size = 1;
            while iter.next_if(|o| o.timestamp == first.timestamp).is_some() {
                size += 1;
            }
            sizes.push(size);
        }
        sizes
    }
}

impl<K> FromIterator<Observation<K>> for ObservationSeries<K> {
    fn from_iter<I: IntoIterator<Item = Observation<K>>>(iter: I) -> Self {
        Self {
            observations: iter.into_iter().collect(),
        }
    }
}

impl<K> From<Vec<Observation<K>>> for ObservationSeries<K> {
    fn from(observations: Vec<Observation<K>>) -> Self {
        Self { observations }
    }
}

impl<'a, K> IntoIterator for &'a ObservationSeries<K> {
    type Item = &'a Observation<K>;
    type IntoIter = std::slice::Iter<'a, Observation<K>>;

    fn into_iter(self) -> Self::IntoIter {
        self.observations.iter()
    }
}

/// Infer a constant subgroup size from repeated timestamps.
///
/// Returns `Some(n)` when every timestamp occurs exactly `n >= 2` times,
/// `None` otherwise (single observations, or subgroups of varying size).
///
/// # Examples
///
/// ```
/// use u_spc::spc::{infer_subgroup_size, ObservationSeries};
///
/// let series = ObservationSeries::from_values(vec![
///     (1_u32, 10.0), (1, 10.4), (1, 9.9),
///     (2, 10.1), (2, 9.7), (2, 10.2),
/// ]);
/// assert_eq!(infer_subgroup_size(&series), Some(3));
/// ```
pub fn infer_subgroup_size<K: Ord>(series: &ObservationSeries<K>) -> Option<usize> {
    let sizes = series.subgroup_sizes();
    let first = *sizes.first()?;
    if first >= 2 && sizes.iter().all(|&s| s == first) {
        Some(first)
    } else {
        None
    }
}
