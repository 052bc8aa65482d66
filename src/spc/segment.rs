//! Splitting a series into independently baselined segments.
//!
//! Each change date starts a new segment whose limits are recomputed from
//! that segment alone. Boundaries are half-open, `[start, d1), [d1, d2), ...`,
//! except the final segment, which runs through the last row.

use crate::error::{Result, SpcError};

use super::series::{Observation, ObservationSeries};

/// A contiguous slice of the series plus its baseline window.
///
/// The baseline is always a non-empty prefix of the segment: either every row
/// up to and including the baseline date, or, when change dates are in use,
/// the whole segment. It is fixed at construction and travels with the
/// segment, so limit computation never consults global state.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment<'a, K> {
    /// Zero-based position in chronological order.
    pub index: usize,
    /// Row offset of the segment's first observation in the full series.
    pub offset: usize,
    rows: &'a [Observation<K>],
    baseline_len: usize,
}

impl<'a, K> Segment<'a, K> {
    /// Build a segment with an explicit baseline length.
    ///
    /// Returns [`SpcError::EmptyBaseline`] when `baseline_len` is zero or
    /// exceeds the segment.
    pub fn new(
        index: usize,
        offset: usize,
        rows: &'a [Observation<K>],
        baseline_len: usize,
    ) -> Result<Self> {
        if rows.is_empty() {
            return Err(SpcError::EmptySegment { segment: index });
        }
        if baseline_len == 0 || baseline_len > rows.len() {
            return Err(SpcError::EmptyBaseline);
        }
        Ok(Self {
            index,
            offset,
            rows,
            baseline_len,
        })
    }

    pub fn rows(&self) -> &'a [Observation<K>] {
        self.rows
    }

    pub fn baseline(&self) -> &'a [Observation<K>] {
        &self.rows[..self.baseline_len]
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether the row at `i` (segment-relative) belongs to the baseline.
    pub fn in_baseline(&self, i: usize) -> bool {
        i < self.baseline_len
    }
}

/// Split `series` at `change_dates`.
///
/// Without change dates the result is a single segment whose baseline runs
/// through `baseline_date` (inclusive), or the whole series when no baseline
/// date is given. With change dates every segment is its own baseline and
/// `baseline_date` is ignored.
///
/// # Errors
///
/// - [`SpcError::EmptySeries`] for an empty series
/// - [`SpcError::UnorderedSeries`] if timestamps decrease
/// - [`SpcError::ChangeDatesNotIncreasing`] / [`SpcError::ChangeDateOutOfRange`]
///   for malformed change dates; each must lie strictly between the first and
///   last timestamps
/// - [`SpcError::EmptySegment`] if a segment would contain no rows
/// - [`SpcError::EmptyBaseline`] if the baseline date precedes every row
///
/// # Examples
///
/// ```
/// use u_spc::spc::{segment, ObservationSeries};
///
/// let series = ObservationSeries::from_values((1..=10_u32).map(|t| (t, t as f64)));
/// let segments = segment(&series, &[4, 8], None).unwrap();
/// let lens: Vec<usize> = segments.iter().map(|s| s.len()).collect();
/// assert_eq!(lens, vec![3, 4, 3]);
/// ```
pub fn segment<'a, K: Ord>(
    series: &'a ObservationSeries<K>,
    change_dates: &[K],
    baseline_date: Option<&K>,
) -> Result<Vec<Segment<'a, K>>> {
    let rows = series.as_slice();
    let (first, last) = match (rows.first(), rows.last()) {
        (Some(f), Some(l)) => (&f.timestamp, &l.timestamp),
        _ => return Err(SpcError::EmptySeries),
    };
    series.check_order()?;

    if change_dates.is_empty() {
        let baseline_len = match baseline_date {
            Some(date) => rows.partition_point(|o| o.timestamp <= *date),
            None => rows.len(),
        };
        return Ok(vec![Segment::new(0, 0, rows, baseline_len)?]);
    }

    for (position, date) in change_dates.iter().enumerate() {
        if position > 0 && *date <= change_dates[position - 1] {
            return Err(SpcError::ChangeDatesNotIncreasing { position });
        }
        if date <= first || date >= last {
            return Err(SpcError::ChangeDateOutOfRange { position });
        }
    }

    let mut bounds = Vec::with_capacity(change_dates.len() + 2);
    bounds.push(0);
    bounds.extend(
        change_dates
            .iter()
            .map(|date| rows.partition_point(|o| o.timestamp < *date)),
    );
    bounds.push(rows.len());

    bounds
        .windows(2)
        .enumerate()
        .map(|(index, w)| {
            let slice = &rows[w[0]..w[1]];
            Segment::new(index, w[0], slice, slice.len())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(n: u32) -> ObservationSeries<u32> {
        ObservationSeries::from_values((1..=n).map(|t| (t, f64::from(t))))
    }

    #[test]
    fn test_single_segment_whole_baseline() {
        let s = series(10);
        let segs = segment(&s, &[], None).unwrap();
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].baseline().len(), 10);
    }

    #[test]
    fn test_baseline_date_inclusive() {
        let s = series(10);
        let segs = segment(&s, &[], Some(&4)).unwrap();
        assert_eq!(segs[0].baseline().len(), 4);
        assert_eq!(segs[0].len(), 10);
        assert!(segs[0].in_baseline(3));
        assert!(!segs[0].in_baseline(4));
    }

    #[test]
    fn test_baseline_date_after_series_uses_everything() {
        let s = series(10);
        let segs = segment(&s, &[], Some(&100)).unwrap();
        assert_eq!(segs[0].baseline().len(), 10);
    }

    #[test]
    fn test_baseline_date_before_series() {
        let s = ObservationSeries::from_values((5..=10_u32).map(|t| (t, 1.0)));
        assert_eq!(segment(&s, &[], Some(&2)), Err(SpcError::EmptyBaseline));
    }

    #[test]
    fn test_change_dates_boundaries() {
        let s = series(10);
        let segs = segment(&s, &[4, 8], None).unwrap();
        assert_eq!(segs.len(), 3);
        assert_eq!(segs[0].rows().last().unwrap().timestamp, 3);
        assert_eq!(segs[1].rows().first().unwrap().timestamp, 4);
        assert_eq!(segs[1].rows().last().unwrap().timestamp, 7);
        assert_eq!(segs[2].rows().first().unwrap().timestamp, 8);
        assert_eq!(segs[2].rows().last().unwrap().timestamp, 10);
        assert_eq!(segs[2].offset, 7);
        for seg in &segs {
            assert_eq!(seg.baseline().len(), seg.len());
        }
    }

    #[test]
    fn test_change_dates_ignore_baseline_date() {
        let s = series(10);
        let segs = segment(&s, &[6], Some(&2)).unwrap();
        assert_eq!(segs[0].baseline().len(), 5);
        assert_eq!(segs[1].baseline().len(), 5);
    }

    #[test]
    fn test_duplicate_timestamps_stay_together() {
        let s = ObservationSeries::from_values(vec![
            (1_u32, 1.0),
            (2, 1.0),
            (2, 2.0),
            (3, 1.0),
            (3, 2.0),
            (4, 1.0),
        ]);
        let segs = segment(&s, &[3], None).unwrap();
        assert_eq!(segs[0].len(), 3);
        assert_eq!(segs[1].len(), 3);
    }

    #[test]
    fn test_change_date_out_of_range() {
        let s = series(10);
        assert_eq!(
            segment(&s, &[0], None),
            Err(SpcError::ChangeDateOutOfRange { position: 0 })
        );
        assert_eq!(
            segment(&s, &[5, 10], None),
            Err(SpcError::ChangeDateOutOfRange { position: 1 })
        );
        assert_eq!(
            segment(&s, &[1], None),
            Err(SpcError::ChangeDateOutOfRange { position: 0 })
        );
    }

    #[test]
    fn test_change_dates_not_increasing() {
        let s = series(10);
        assert_eq!(
            segment(&s, &[6, 4], None),
            Err(SpcError::ChangeDatesNotIncreasing { position: 1 })
        );
    }

    #[test]
    fn test_empty_segment_from_gap() {
        let s = ObservationSeries::from_values(vec![(1_u32, 1.0), (2, 1.0), (10, 1.0), (11, 1.0)]);
        assert_eq!(
            segment(&s, &[4, 6], None),
            Err(SpcError::EmptySegment { segment: 1 })
        );
    }

    #[test]
    fn test_empty_series() {
        let s = ObservationSeries::<u32>::new();
        assert_eq!(segment(&s, &[], None), Err(SpcError::EmptySeries));
    }

    #[test]
    fn test_unordered_series() {
        let s = ObservationSeries::from_values(vec![(1_u32, 1.0), (3, 1.0), (2, 1.0)]);
        assert_eq!(
            segment(&s, &[], None),
            Err(SpcError::UnorderedSeries { row: 2 })
        );
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(200))]

            #[test]
            fn segments_reconstruct_series(
                steps in proptest::collection::vec(0_u32..3, 2..60),
                cuts in proptest::collection::btree_set(1_u32..100, 0..5),
            ) {
                let mut t = 0_u32;
                let rows: Vec<(u32, f64)> = steps
                    .iter()
                    .map(|&s| { t += s; (t, f64::from(t)) })
                    .collect();
                let s = ObservationSeries::from_values(rows);
                let cuts: Vec<u32> = cuts.into_iter().collect();

                if let Ok(segs) = segment(&s, &cuts, None) {
                    let rebuilt: Vec<u32> = segs
                        .iter()
                        .flat_map(|seg| seg.rows().iter().map(|o| o.timestamp))
                        .collect();
                    let original: Vec<u32> = s.iter().map(|o| o.timestamp).collect();
                    prop_assert_eq!(rebuilt, original);

                    let mut expected_offset = 0;
                    for seg in &segs {
                        prop_assert_eq!(seg.offset, expected_offset);
                        prop_assert!(!seg.is_empty());
                        expected_offset += seg.len();
                    }
                    // No timestamp spans two segments.
                    for pair in segs.windows(2) {
                        let left = pair[0].rows().last().unwrap().timestamp;
                        let right = pair[1].rows().first().unwrap().timestamp;
                        prop_assert!(left < right);
                    }
                }
            }
        }
    }
}
