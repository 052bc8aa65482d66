//! Control chart factor tables for subgroup sizes n = 2..=25.
//!
//! Constants are sourced from ASTM E2587 — Standard Practice for Use of
//! Control Charts in Statistical Process Control — and Montgomery (2019),
//! Appendix Table VI. Only the subgroup-based chart families consult them.

use crate::error::{Result, SpcError};

/// Smallest subgroup size covered by the tables.
pub const MIN_SUBGROUP_SIZE: usize = 2;

/// Largest subgroup size covered by the tables.
pub const MAX_SUBGROUP_SIZE: usize = 25;

const TABLE_LEN: usize = MAX_SUBGROUP_SIZE - MIN_SUBGROUP_SIZE + 1;

// Index 0 corresponds to n=2.

/// A2 factors: X-bar limits from R-bar.
const A2: [f64; TABLE_LEN] = [
    1.880, 1.023, 0.729, 0.577, 0.483, 0.419, 0.373, 0.337, 0.308, 0.285, 0.266, 0.249, 0.235,
    0.223, 0.212, 0.203, 0.194, 0.187, 0.180, 0.173, 0.167, 0.162, 0.157, 0.153,
];

/// A3 factors: X-bar limits of the X-bar/S family.
const A3: [f64; TABLE_LEN] = [
    2.659, 1.954, 1.628, 1.427, 1.287, 1.182, 1.099, 1.032, 0.975, 0.927, 0.886, 0.850, 0.817,
    0.789, 0.763, 0.739, 0.718, 0.698, 0.680, 0.663, 0.647, 0.633, 0.619, 0.606,
];

/// d2 factors: mean of the relative range distribution (sigma-hat = R-bar / d2).
const D2: [f64; TABLE_LEN] = [
    1.128, 1.693, 2.059, 2.326, 2.534, 2.704, 2.847, 2.970, 3.078, 3.173, 3.258, 3.336, 3.407,
    3.472, 3.532, 3.588, 3.640, 3.689, 3.735, 3.778, 3.819, 3.858, 3.895, 3.931,
];

/// D3 factors: R chart lower limit.
const D3: [f64; TABLE_LEN] = [
    0.0, 0.0, 0.0, 0.0, 0.0, 0.076, 0.136, 0.184, 0.223, 0.256, 0.283, 0.307, 0.328, 0.347, 0.363,
    0.378, 0.391, 0.403, 0.415, 0.425, 0.434, 0.443, 0.451, 0.459,
];

/// D4 factors: R chart upper limit.
const D4: [f64; TABLE_LEN] = [
    3.267, 2.574, 2.282, 2.114, 2.004, 1.924, 1.864, 1.816, 1.777, 1.744, 1.717, 1.693, 1.672,
    1.653, 1.637, 1.622, 1.608, 1.597, 1.585, 1.575, 1.566, 1.557, 1.548, 1.541,
];

/// B3 factors: S chart lower limit.
const B3: [f64; TABLE_LEN] = [
    0.0, 0.0, 0.0, 0.0, 0.030, 0.118, 0.185, 0.239, 0.284, 0.321, 0.354, 0.382, 0.406, 0.428,
    0.448, 0.466, 0.482, 0.497, 0.510, 0.523, 0.534, 0.545, 0.555, 0.565,
];

/// B4 factors: S chart upper limit.
const B4: [f64; TABLE_LEN] = [
    3.267, 2.568, 2.266, 2.089, 1.970, 1.882, 1.815, 1.761, 1.716, 1.679, 1.646, 1.618, 1.594,
    1.572, 1.552, 1.534, 1.518, 1.503, 1.490, 1.477, 1.466, 1.455, 1.445, 1.435,
];

/// The full set of factors for one subgroup size.
///
/// # Examples
///
/// ```
/// use u_spc::spc::ChartFactors;
///
/// let f = ChartFactors::for_subgroup_size(5).unwrap();
/// assert!((f.a2 - 0.577).abs() < 1e-12);
/// assert!(ChartFactors::for_subgroup_size(26).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartFactors {
    /// Subgroup size these factors apply to.
    pub n: usize,
    pub a2: f64,
    pub a3: f64,
    pub d2: f64,
    pub d3: f64,
    pub d4: f64,
    pub b3: f64,
    pub b4: f64,
}

impl ChartFactors {
    /// Look up the factors for subgroup size `n`.
    ///
    /// Returns [`SpcError::SubgroupSizeOutOfRange`] outside 2..=25.
    pub fn for_subgroup_size(n: usize) -> Result<Self> {
        if !(MIN_SUBGROUP_SIZE..=MAX_SUBGROUP_SIZE).contains(&n) {
            return Err(SpcError::SubgroupSizeOutOfRange { size: n });
        }
        let idx = n - MIN_SUBGROUP_SIZE;
        Ok(Self {
            n,
            a2: A2[idx],
            a3: A3[idx],
            d2: D2[idx],
            d3: D3[idx],
            d4: D4[idx],
            b3: B3[idx],
            b4: B4[idx],
        })
    }
}

/// d2 for a moving range of two consecutive points.
pub const D2_MOVING_RANGE: f64 = D2[0];

/// D4 for a moving range of two consecutive points.
pub const D4_MOVING_RANGE: f64 = D4[0];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_bounds() {
        assert!(ChartFactors::for_subgroup_size(1).is_err());
        assert!(ChartFactors::for_subgroup_size(2).is_ok());
        assert!(ChartFactors::for_subgroup_size(25).is_ok());
        assert_eq!(
            ChartFactors::for_subgroup_size(26),
            Err(SpcError::SubgroupSizeOutOfRange { size: 26 })
        );
    }

    #[test]
    fn test_known_values() {
        let f = ChartFactors::for_subgroup_size(2).unwrap();
        assert!((f.d2 - 1.128).abs() < 1e-12);
        assert!((f.d4 - 3.267).abs() < 1e-12);

        let f = ChartFactors::for_subgroup_size(10).unwrap();
        assert!((f.a2 - 0.308).abs() < 1e-12);
        assert!((f.b3 - 0.284).abs() < 1e-12);

        let f = ChartFactors::for_subgroup_size(25).unwrap();
        assert!((f.a3 - 0.606).abs() < 1e-12);
        assert!((f.d3 - 0.459).abs() < 1e-12);
        assert!((f.b4 - 1.435).abs() < 1e-12);
    }

    #[test]
    fn test_monotone_factors() {
        // A2, A3, D4 and B4 shrink as n grows; d2, D3 and B3 never decrease.
        for n in MIN_SUBGROUP_SIZE..MAX_SUBGROUP_SIZE {
            let a = ChartFactors::for_subgroup_size(n).unwrap();
            let b = ChartFactors::for_subgroup_size(n + 1).unwrap();
            assert!(b.a2 < a.a2, "A2 at n={n}");
            assert!(b.a3 < a.a3, "A3 at n={n}");
            assert!(b.d4 < a.d4, "D4 at n={n}");
            assert!(b.b4 < a.b4, "B4 at n={n}");
            assert!(b.d2 > a.d2, "d2 at n={n}");
            assert!(b.d3 >= a.d3, "D3 at n={n}");
            assert!(b.b3 >= a.b3, "B3 at n={n}");
        }
    }
}
