//! Weighted DTW with a logistic phase-difference penalty.

use crate::constraint::BandConstraint;
use crate::distance::Distance;
use crate::dtw::warping_cost;
use crate::measure::DistanceMeasure;
use crate::series::TimeSeriesView;

/// Weighted DTW. Cell `(i, j)` costs `w(|i - j|) * (a[i] - b[j])^2` with
/// `w(k) = 1 / (1 + exp(-g * (k - L / 2)))` and `L` the longer length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wdtw {
    g: f64,
}

impl Wdtw {
    /// Create a WDTW calculator with weight steepness `g`.
    #[must_use]
    pub fn new(g: f64) -> Self {
        Self { g }
    }

    /// Return the weight steepness.
    #[must_use]
    pub fn g(&self) -> f64 {
        self.g
    }

    fn weights(&self, len: usize) -> Vec<f64> {
        let half = len as f64 / 2.0;
        (0..len)
            .map(|k| 1.0 / (1.0 + (-self.g * (k as f64 - half)).exp()))
            .collect()
    }
}

impl DistanceMeasure for Wdtw {
    fn distance(&self, a: TimeSeriesView<'_>, b: TimeSeriesView<'_>, cutoff: f64) -> Distance {
        let (a, b) = (a.as_slice(), b.as_slice());
        let weights = self.weights(a.len().max(b.len()));
        Distance::new(warping_cost(
            a.len(),
            b.len(),
            BandConstraint::Unconstrained,
            cutoff,
            |i, j| weights[i.abs_diff(j)] * (a[i] - b[j]).powi(2),
        ))
    }
}
