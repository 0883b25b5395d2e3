//! Series transforms applied before a distance kernel runs.

use serde::{Deserialize, Serialize};

use crate::series::TimeSeries;

/// A deterministic, length-preserving transform of a series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transform {
    /// The series itself.
    #[default]
    Identity,
    /// Keogh-Pazzani first derivative estimate.
    Derivative,
}

impl Transform {
    /// Apply the transform, producing a new series with a fresh identity.
    ///
    /// [`Transform::Identity`] returns a clone that keeps the input identity.
    #[must_use = "returns a new series; the original is unchanged"]
    pub fn apply(self, series: &TimeSeries) -> TimeSeries {
        match self {
            Self::Identity => series.clone(),
            Self::Derivative => derivative(series),
        }
    }
}

/// Compute the length-preserving Keogh-Pazzani first derivative.
///
/// For interior points: `d[i] = ((x[i] - x[i-1]) + (x[i+1] - x[i-1]) / 2) / 2`.
/// The first and last points copy their neighbour's estimate. A series of
/// length 1 maps to `[0.0]`; length 2 maps both points to `x[1] - x[0]`.
#[must_use = "returns a new derivative series; the original is unchanged"]
pub fn derivative(series: &TimeSeries) -> TimeSeries {
    let x = series.as_ref();
    let n = x.len();

    let values = match n {
        1 => vec![0.0],
        2 => vec![x[1] - x[0]; 2],
        _ => {
            let mut d = vec![0.0; n];
            for i in 1..n - 1 {
                d[i] = ((x[i] - x[i - 1]) + (x[i + 1] - x[i - 1]) / 2.0) / 2.0;
            }
            d[0] = d[1];
            d[n - 1] = d[n - 2];
            d
        }
    };

    // Finite input can still overflow here; distance calls report that as a
    // numeric anomaly.
    TimeSeries::new_unchecked(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(values: &[f64]) -> TimeSeries {
        TimeSeries::new(values.to_vec()).unwrap()
    }

    #[test]
    fn derivative_of_linear_is_constant() {
        let d = derivative(&ts(&[0.0, 2.0, 4.0, 6.0, 8.0]));
        assert_eq!(d.as_ref(), &[2.0, 2.0, 2.0, 2.0, 2.0]);
    }

    #[test]
    fn derivative_hand_computed() {
        // d[1] = ((1-0) + (4-0)/2) / 2 = 1.5
        // d[2] = ((4-1) + (9-1)/2) / 2 = 3.5
        let d = derivative(&ts(&[0.0, 1.0, 4.0, 9.0]));
        assert_eq!(d.as_ref(), &[1.5, 1.5, 3.5, 3.5]);
    }

    #[test]
    fn derivative_preserves_length() {
        for n in 1..6 {
            let values: Vec<f64> = (0..n).map(|i| (i * i) as f64).collect();
            assert_eq!(derivative(&ts(&values)).len(), n);
        }
    }

    #[test]
    fn derivative_of_single_point_is_zero() {
        assert_eq!(derivative(&ts(&[7.0])).as_ref(), &[0.0]);
    }

    #[test]
    fn derivative_of_pair_is_their_slope() {
        assert_eq!(derivative(&ts(&[1.0, 4.0])).as_ref(), &[3.0, 3.0]);
    }

    #[test]
    fn derivative_gets_fresh_identity() {
        let s = ts(&[1.0, 2.0, 3.0]);
        assert_ne!(derivative(&s).id(), s.id());
    }

    #[test]
    fn identity_keeps_identity() {
        let s = ts(&[1.0, 2.0, 3.0]);
        assert_eq!(Transform::Identity.apply(&s).id(), s.id());
    }
}
