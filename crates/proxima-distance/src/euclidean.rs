//! Lock-step squared Euclidean distance.

use crate::constraint::BandConstraint;
use crate::distance::Distance;
use crate::dtw::warping_cost;
use crate::measure::DistanceMeasure;
use crate::series::TimeSeriesView;

/// Sum of squared point differences.
///
/// Equal-length inputs are compared point by point. Unequal lengths run the
/// warping recurrence with a zero radius, which the band widens to the length
/// difference: the shortest alignment that covers both series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Euclidean;

impl DistanceMeasure for Euclidean {
    fn distance(&self, a: TimeSeriesView<'_>, b: TimeSeriesView<'_>, cutoff: f64) -> Distance {
        let (a, b) = (a.as_slice(), b.as_slice());
        if a.len() != b.len() {
            let band = BandConstraint::from_radius(0, a.len(), b.len());
            return Distance::new(warping_cost(a.len(), b.len(), band, cutoff, |i, j| {
                (a[i] - b[j]).powi(2)
            }));
        }

        let mut total = 0.0;
        for (x, y) in a.iter().zip(b) {
            total += (x - y).powi(2);
            if total > cutoff {
                return Distance::INFINITY;
            }
        }
        Distance::new(total)
    }
}
