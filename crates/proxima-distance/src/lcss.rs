//! Longest common subsequence distance.

use crate::constraint::BandConstraint;
use crate::distance::Distance;
use crate::measure::DistanceMeasure;
use crate::series::TimeSeriesView;

/// LCSS: `1 - L / min(n, m)` where `L` counts points matched within
/// `epsilon` inside the warping band. Always in `[0, 1]`.
///
/// The cutoff is ignored; the value is always computed exactly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lcss {
    band_size: usize,
    epsilon: f64,
}

impl Lcss {
    /// Create an LCSS calculator with an absolute band radius and matching threshold.
    #[must_use]
    pub fn new(band_size: usize, epsilon: f64) -> Self {
        Self { band_size, epsilon }
    }
}

impl DistanceMeasure for Lcss {
    fn distance(&self, a: TimeSeriesView<'_>, b: TimeSeriesView<'_>, _cutoff: f64) -> Distance {
        let (a, b) = (a.as_slice(), b.as_slice());
        let (n, m) = (a.len(), b.len());
        let band = BandConstraint::from_radius(self.band_size, n, m);

        let mut prev = vec![0_usize; m + 1];
        let mut curr = vec![0_usize; m + 1];
        for i in 1..=n {
            for j in 1..=m {
                curr[j] = if band.contains(i - 1, j - 1)
                    && (a[i - 1] - b[j - 1]).abs() <= self.epsilon
                {
                    prev[j - 1] + 1
                } else {
                    prev[j].max(curr[j - 1])
                };
            }
            std::mem::swap(&mut prev, &mut curr);
        }

        let matched = prev[m] as f64;
        Distance::new(1.0 - matched / n.min(m) as f64)
    }
}
